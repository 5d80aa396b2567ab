//! Seams to the host platform and per-connection state.
//!
//! The decoder and encoder never own devices, positions or sockets. The host
//! supplies them through these traits and keeps one [`ConnectionSession`] per
//! device connection, passing it into every call.

use std::net::SocketAddr;

use chrono::{DateTime, FixedOffset, Local, TimeZone};

use crate::commands::CommandKind;
use crate::types::Fix;

/// A device known to the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSession {
    /// Platform device identifier.
    pub device_id: u64,
    /// Protocol identity (IMEI) of the device.
    pub unique_id: String,
}

/// Resolves protocol identities to platform devices and back.
pub trait DeviceLookup {
    /// Find the device behind `unique_id` on a connection from `remote`.
    fn resolve(&self, remote: Option<SocketAddr>, unique_id: &str) -> Option<DeviceSession>;

    /// Protocol identity of a platform device.
    fn unique_id(&self, device_id: u64) -> Option<String>;
}

/// Supplies the last known fix of a device.
pub trait PositionProvider {
    /// Last known fix, `None` if the device never reported one.
    fn last_fix(&self, device_id: u64) -> Option<Fix>;
}

/// Accepts outbound sentences for a connection. Delivery is fire-and-forget.
pub trait ReplySink {
    /// Queue `data` for `remote`.
    fn send(&mut self, data: Vec<u8>, remote: Option<SocketAddr>);
}

impl ReplySink for Vec<Vec<u8>> {
    fn send(&mut self, data: Vec<u8>, _remote: Option<SocketAddr>) {
        self.push(data);
    }
}

/// Wall-clock source for reply timestamps and time-of-day fixes.
pub trait Clock {
    /// Current time with the local offset.
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Clock backed by the system's local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Clock that always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl FixedClock {
    /// Build from a UTC offset in seconds and a unix timestamp.
    pub fn at(offset_secs: i32, unix_secs: i64) -> Option<Self> {
        let offset = FixedOffset::east_opt(offset_secs)?;
        offset.timestamp_opt(unix_secs, 0).single().map(FixedClock)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// State of one device connection.
///
/// Holds the kind of the last stop/disarm command sent on this connection so
/// that a later unlock result can be correlated with it. A new command
/// replaces the previous one; nothing expires it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionSession {
    remote: Option<SocketAddr>,
    pending_command: Option<CommandKind>,
}

impl ConnectionSession {
    /// Create state for a connection from `remote`.
    pub fn new(remote: Option<SocketAddr>) -> Self {
        ConnectionSession {
            remote,
            pending_command: None,
        }
    }

    /// Remote address of the connection.
    pub fn remote(&self) -> Option<SocketAddr> {
        self.remote
    }

    /// Record the command awaiting a device response.
    pub fn set_pending_command(&mut self, kind: CommandKind) {
        if let Some(previous) = self.pending_command.replace(kind.clone()) {
            log::debug!("pending command {} replaced by {}", previous, kind);
        }
    }

    /// The command awaiting a device response.
    pub fn pending_command(&self) -> Option<&CommandKind> {
        self.pending_command.as_ref()
    }
}
