//! Message type table.
//!
//! Each type code declares where its fields start, how many it consumes and
//! whether the device expects an acknowledgement. The decoder checks the
//! declared arity before reading so a short sentence fails as a whole. D0 is
//! the exception: a report without a time of day carries nothing, so only
//! its time field is required up front.

use crate::constants::BODY_START_INDEX;

/// Type codes that are acknowledged and kept verbatim but not decoded.
pub const RAW_RESULT_CODES: &[&str] = &["D1", "S4", "S6", "S7", "V0", "G0", "K0", "I0", "M0"];

/// Sentence types sent by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// `L0`: result of an unlock command.
    UnlockResult,
    /// `L1`: lock engaged.
    Locked,
    /// `L3`: vehicle power switch.
    Ignition,
    /// `L5`: external lock device control.
    ExternalLock,
    /// `L6`: battery lock control.
    BatteryLock,
    /// `D0`: position report.
    Location,
    /// `Q0`: battery report.
    Battery,
    /// `H0`: heartbeat.
    Heartbeat,
    /// `S5`: status report with fault code.
    Status,
    /// `W0`: alarm report.
    Alarm,
    /// A type stored as a raw `result` attribute.
    RawResult(&'static str),
}

impl MessageType {
    /// Look up a type code.
    pub fn from_code(code: &str) -> Option<MessageType> {
        match code {
            "L0" => Some(MessageType::UnlockResult),
            "L1" => Some(MessageType::Locked),
            "L3" => Some(MessageType::Ignition),
            "L5" => Some(MessageType::ExternalLock),
            "L6" => Some(MessageType::BatteryLock),
            "D0" => Some(MessageType::Location),
            "Q0" => Some(MessageType::Battery),
            "H0" => Some(MessageType::Heartbeat),
            "S5" => Some(MessageType::Status),
            "W0" => Some(MessageType::Alarm),
            _ => RAW_RESULT_CODES
                .iter()
                .copied()
                .find(|c| *c == code)
                .map(MessageType::RawResult),
        }
    }

    /// Get the two-character type code.
    pub fn code(&self) -> &'static str {
        match self {
            MessageType::UnlockResult => "L0",
            MessageType::Locked => "L1",
            MessageType::Ignition => "L3",
            MessageType::ExternalLock => "L5",
            MessageType::BatteryLock => "L6",
            MessageType::Location => "D0",
            MessageType::Battery => "Q0",
            MessageType::Heartbeat => "H0",
            MessageType::Status => "S5",
            MessageType::Alarm => "W0",
            MessageType::RawResult(code) => code,
        }
    }

    /// Index of the first field this type reads.
    pub fn body_start(&self) -> usize {
        match self {
            // Field 5 of D0 is a report sequence flag that carries no data
            MessageType::Location => BODY_START_INDEX + 1,
            _ => BODY_START_INDEX,
        }
    }

    /// Number of fields this type consumes.
    pub fn arity(&self) -> usize {
        match self {
            MessageType::UnlockResult => 2,
            MessageType::Locked => 3,
            MessageType::Ignition => 1,
            MessageType::ExternalLock | MessageType::BatteryLock => 0,
            MessageType::Location => 9,
            MessageType::Battery => 2,
            MessageType::Heartbeat => 5,
            MessageType::Status => 6,
            MessageType::Alarm => 1,
            MessageType::RawResult(_) => 0,
        }
    }

    /// Minimum field count of a well-formed sentence of this type.
    pub fn required_len(&self) -> usize {
        self.body_start() + self.arity()
    }

    /// Field count checked before any field is read.
    pub fn leading_len(&self) -> usize {
        match self {
            MessageType::Location => self.body_start() + 1,
            _ => self.required_len(),
        }
    }

    /// Body of the acknowledgement the device expects, if any.
    pub fn reply_body(&self) -> Option<&'static str> {
        match self {
            MessageType::UnlockResult => Some("Re,L0"),
            MessageType::Locked => Some("Re,L1"),
            MessageType::Alarm => Some("Re,W0"),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        for code in ["L0", "L1", "L3", "L5", "L6", "D0", "Q0", "H0", "S5", "W0", "D1", "M0"] {
            let message_type = MessageType::from_code(code).expect("known code");
            assert_eq!(message_type.code(), code);
        }
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(MessageType::from_code("Z9"), None);
        assert_eq!(MessageType::from_code(""), None);
        assert_eq!(MessageType::from_code("l0"), None);
    }

    #[test]
    fn test_required_len() {
        assert_eq!(MessageType::Location.required_len(), 15);
        assert_eq!(MessageType::Battery.required_len(), 7);
        assert_eq!(MessageType::RawResult("K0").required_len(), 5);
    }

    #[test]
    fn test_leading_len() {
        assert_eq!(MessageType::Location.leading_len(), 7);
        assert_eq!(MessageType::Heartbeat.leading_len(), 10);
        assert_eq!(MessageType::ExternalLock.leading_len(), 5);
    }

    #[test]
    fn test_reply_bodies() {
        assert_eq!(MessageType::UnlockResult.reply_body(), Some("Re,L0"));
        assert_eq!(MessageType::Locked.reply_body(), Some("Re,L1"));
        assert_eq!(MessageType::Alarm.reply_body(), Some("Re,W0"));
        assert_eq!(MessageType::Status.reply_body(), None);
    }
}
