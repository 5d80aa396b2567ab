//! Decoder and encoder settings.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PROTOCOL_NAME, DEFAULT_UNLOCK_CODE};

/// Settings shared by the decoder and encoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Protocol name stamped on telemetry updates.
    pub protocol: String,
    /// Code sent with the unlock command.
    pub unlock_code: String,
    /// Whether acknowledgement replies are written back to the device.
    pub send_replies: bool,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        ProtocolConfig {
            protocol: DEFAULT_PROTOCOL_NAME.to_string(),
            unlock_code: DEFAULT_UNLOCK_CODE.to_string(),
            send_replies: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ProtocolConfig = serde_json::from_str(r#"{"unlock_code": "9876"}"#).unwrap();
        assert_eq!(config.unlock_code, "9876");
        assert_eq!(config.protocol, "omni");
        assert!(config.send_replies);
    }
}
