//! Reply and command encoding.
//!
//! Every outbound sentence has the same shape:
//!
//! ```text
//! 0xFF 0xFF *CMDS,<marker>,<imei>,<yyMMddHHmmss>,<body>#<LF>\n
//! ```
//!
//! `<LF>` is sent as the literal four characters, followed by a real line
//! feed. The timestamp is always the server's wall clock.

use chrono::{DateTime, FixedOffset};
use omni_metrics::{metric_defs, metrics, MetricLabels};

use crate::commands::{Command, CommandKind};
use crate::config::ProtocolConfig;
use crate::constants::{
    FIELD_SEPARATOR, FRAME_END, FRAME_START, OUTBOUND_PREAMBLE, OUTBOUND_TERMINATOR,
    SERVER_MARKER, SUB_PROTOCOL, TIMESTAMP_FORMAT,
};
use crate::error::{ProtocolError, ProtocolResult};
use crate::frame::join_fields;
use crate::session::{Clock, ConnectionSession, DeviceLookup, SystemClock};

/// Frame an outbound sentence for `identity` (marker and IMEI, comma-joined).
pub fn frame_sentence(identity: &str, body: &str, now: &DateTime<FixedOffset>) -> Vec<u8> {
    let text = format!(
        "{start}{marker}{sep}{identity}{sep}{time}{sep}{body}{end}{terminator}",
        start = FRAME_START,
        marker = SERVER_MARKER,
        sep = FIELD_SEPARATOR,
        identity = identity,
        time = now.format(TIMESTAMP_FORMAT),
        body = body,
        end = FRAME_END,
        terminator = OUTBOUND_TERMINATOR,
    );
    let mut buf = Vec::with_capacity(OUTBOUND_PREAMBLE.len() + text.len());
    buf.extend_from_slice(&OUTBOUND_PREAMBLE);
    buf.extend_from_slice(text.as_bytes());
    buf
}

/// Build an acknowledgement for a received sentence.
///
/// Echoes fields 1 and 2 (sub-protocol marker and IMEI) of `fields`.
pub fn build_reply(fields: &[&str], body: &str, now: &DateTime<FixedOffset>) -> Vec<u8> {
    let identity: Vec<&str> = fields.iter().skip(1).take(2).copied().collect();
    frame_sentence(&join_fields(&identity), body, now)
}

/// Encodes platform commands.
#[derive(Debug, Clone)]
pub struct Encoder<C = SystemClock> {
    config: ProtocolConfig,
    clock: C,
    labels: MetricLabels,
}

impl Encoder<SystemClock> {
    /// Create an encoder using the system clock.
    pub fn new(config: ProtocolConfig) -> Self {
        Encoder::with_clock(config, SystemClock)
    }
}

impl<C: Clock> Encoder<C> {
    /// Create an encoder with an explicit clock.
    pub fn with_clock(config: ProtocolConfig, clock: C) -> Self {
        let labels = MetricLabels::new(config.protocol.clone());
        Encoder {
            config,
            clock,
            labels,
        }
    }

    /// Encode a platform command.
    ///
    /// Returns `Ok(None)` for command kinds the device does not support. Stop
    /// and disarm commands are recorded as pending on `connection` when one
    /// is given.
    pub fn encode(
        &self,
        command: &Command,
        devices: &dyn DeviceLookup,
        connection: Option<&mut ConnectionSession>,
    ) -> ProtocolResult<Option<Vec<u8>>> {
        let now = self.clock.now();
        let body = match &command.kind {
            CommandKind::Custom => command
                .data
                .clone()
                .ok_or(ProtocolError::MissingCommandData("data"))?,
            CommandKind::PositionSingle => "D0".to_string(),
            CommandKind::PositionPeriodic => {
                let frequency = command
                    .frequency
                    .ok_or(ProtocolError::MissingCommandData("frequency"))?;
                format!("D1,{}", frequency)
            }
            CommandKind::EngineStop | CommandKind::AlarmDisarm => {
                format!("L0,0,{},{}", self.config.unlock_code, now.timestamp())
            }
            other => {
                log::debug!("{} is not supported by {}", other, self.config.protocol);
                return Ok(None);
            }
        };

        let unique_id = devices.unique_id(command.device_id).ok_or_else(|| {
            log::warn!("cannot encode {}: device {} has no unique id", command.kind, command.device_id);
            ProtocolError::UnknownDevice(command.device_id)
        })?;

        if command.kind.awaits_unlock_result() {
            if let Some(connection) = connection {
                connection.set_pending_command(command.kind.clone());
            }
        }

        log::debug!("encoding {} for {}: {}", command.kind, unique_id, body);
        metrics::counter!(
            metric_defs::ENCODER_COMMANDS.name,
            &self.labels.with(&[("command", command.kind.to_string())])
        )
        .increment(1);

        let identity = format!("{}{}{}", SUB_PROTOCOL, FIELD_SEPARATOR, unique_id);
        Ok(Some(frame_sentence(&identity, &body, &now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FixedClock;

    fn clock() -> FixedClock {
        // 2020-03-18 12:30:20 UTC+3
        FixedClock::at(3 * 3600, 1_584_523_820).unwrap()
    }

    #[test]
    fn test_frame_sentence_layout() {
        let frame = frame_sentence("OM,123456789123456", "D0", &clock().now());
        assert_eq!(&frame[..2], &[0xFF, 0xFF]);
        assert_eq!(
            std::str::from_utf8(&frame[2..]).unwrap(),
            "*CMDS,OM,123456789123456,200318123020,D0#<LF>\n"
        );
    }

    #[test]
    fn test_build_reply_echoes_identity() {
        let fields = ["CMDR", "OM", "862205059172132", "000000000000", "W0", "3"];
        let reply = build_reply(&fields, "Re,W0", &clock().now());
        assert_eq!(
            std::str::from_utf8(&reply[2..]).unwrap(),
            "*CMDS,OM,862205059172132,200318123020,Re,W0#<LF>\n"
        );
    }
}
