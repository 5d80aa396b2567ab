//! Platform-issued commands.

use serde::{Deserialize, Serialize};

/// Command kinds the platform can issue.
///
/// Only some of them have an Omni encoding; the rest encode to nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandKind {
    /// Raw body supplied by the caller (`custom`).
    Custom,
    /// Request a single position report (`positionSingle`).
    PositionSingle,
    /// Request periodic position reports (`positionPeriodic`).
    PositionPeriodic,
    /// Stop the engine by releasing the lock (`engineStop`).
    EngineStop,
    /// Disarm the alarm by releasing the lock (`alarmDisarm`).
    AlarmDisarm,
    /// Resume the engine (`engineResume`).
    EngineResume,
    /// Arm the alarm (`alarmArm`).
    AlarmArm,
    /// Reboot the device (`rebootDevice`).
    RebootDevice,
    /// Any other platform command name.
    #[serde(untagged)]
    Other(String),
}

impl CommandKind {
    /// Get the platform command name.
    pub fn as_str(&self) -> &str {
        match self {
            CommandKind::Custom => "custom",
            CommandKind::PositionSingle => "positionSingle",
            CommandKind::PositionPeriodic => "positionPeriodic",
            CommandKind::EngineStop => "engineStop",
            CommandKind::AlarmDisarm => "alarmDisarm",
            CommandKind::EngineResume => "engineResume",
            CommandKind::AlarmArm => "alarmArm",
            CommandKind::RebootDevice => "rebootDevice",
            CommandKind::Other(name) => name,
        }
    }

    /// Parse a platform command name.
    pub fn from_name(name: &str) -> CommandKind {
        match name {
            "custom" => CommandKind::Custom,
            "positionSingle" => CommandKind::PositionSingle,
            "positionPeriodic" => CommandKind::PositionPeriodic,
            "engineStop" => CommandKind::EngineStop,
            "alarmDisarm" => CommandKind::AlarmDisarm,
            "engineResume" => CommandKind::EngineResume,
            "alarmArm" => CommandKind::AlarmArm,
            "rebootDevice" => CommandKind::RebootDevice,
            other => CommandKind::Other(other.to_string()),
        }
    }

    /// Whether the device answers this command with an unlock result that
    /// should be correlated back to it.
    pub fn awaits_unlock_result(&self) -> bool {
        matches!(self, CommandKind::EngineStop | CommandKind::AlarmDisarm)
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command addressed to one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Platform identifier of the target device.
    pub device_id: u64,
    /// What to do.
    #[serde(rename = "type")]
    pub kind: CommandKind,
    /// Raw body for custom commands.
    #[serde(default)]
    pub data: Option<String>,
    /// Report interval for periodic position requests.
    #[serde(default)]
    pub frequency: Option<i64>,
}

impl Command {
    /// Create a command with no payload.
    pub fn new(device_id: u64, kind: CommandKind) -> Self {
        Command {
            device_id,
            kind,
            data: None,
            frequency: None,
        }
    }

    /// Create a custom command carrying a raw body.
    pub fn custom(device_id: u64, data: impl Into<String>) -> Self {
        Command {
            data: Some(data.into()),
            ..Command::new(device_id, CommandKind::Custom)
        }
    }

    /// Create a periodic position request.
    pub fn position_periodic(device_id: u64, frequency: i64) -> Self {
        Command {
            frequency: Some(frequency),
            ..Command::new(device_id, CommandKind::PositionPeriodic)
        }
    }
}
