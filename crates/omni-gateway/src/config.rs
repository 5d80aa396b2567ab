//! Gateway configuration.
//!
//! Loaded from YAML:
//!
//! ```yaml
//! listen: 0.0.0.0:5126
//! max_sentence_len: 1024
//! protocol:
//!   unlock_code: "1234"
//! devices:
//!   - id: 1
//!     unique_id: "862205059172132"
//!     name: scooter-17
//!     last_fix:
//!       time: 2024-03-22T10:00:00Z
//!       valid: true
//!       latitude: 22.5
//!       longitude: 114.1
//! ```

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;

use omni_protocol::{Fix, ProtocolConfig};
use serde::{Deserialize, Serialize};

use crate::codec::DEFAULT_MAX_SENTENCE_LEN;
use crate::error::{GatewayError, GatewayResult};

/// Default listen address.
pub const DEFAULT_LISTEN: &str = "0.0.0.0:5126";

/// Top-level gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Address the device listener binds to.
    pub listen: SocketAddr,
    /// Optional Prometheus scrape address.
    pub metrics_listen: Option<SocketAddr>,
    /// Longest accepted inbound sentence in bytes.
    pub max_sentence_len: usize,
    /// Protocol settings shared by decoder and encoder.
    pub protocol: ProtocolConfig,
    /// Known devices.
    pub devices: Vec<DeviceConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            listen: SocketAddr::from(([0, 0, 0, 0], 5126)),
            metrics_listen: None,
            max_sentence_len: DEFAULT_MAX_SENTENCE_LEN,
            protocol: ProtocolConfig::default(),
            devices: Vec::new(),
        }
    }
}

/// A device the gateway accepts sentences from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Platform device id.
    pub id: u64,
    /// Identifier the device reports (usually the IMEI).
    pub unique_id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Last known fix to seed updates with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fix: Option<Fix>,
}

impl GatewayConfig {
    /// Parse a configuration from YAML text.
    pub fn from_yaml(text: &str) -> GatewayResult<Self> {
        let config: GatewayConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> GatewayResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| GatewayError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> GatewayResult<()> {
        if self.max_sentence_len == 0 {
            return Err(GatewayError::ConfigInvalid(
                "max_sentence_len must be positive".to_string(),
            ));
        }

        let mut ids = HashSet::new();
        let mut unique_ids = HashSet::new();
        for device in &self.devices {
            if device.unique_id.is_empty() {
                return Err(GatewayError::ConfigInvalid(format!(
                    "device {} has an empty unique_id",
                    device.id
                )));
            }
            if !ids.insert(device.id) {
                return Err(GatewayError::ConfigInvalid(format!(
                    "duplicate device id {}",
                    device.id
                )));
            }
            if !unique_ids.insert(device.unique_id.as_str()) {
                return Err(GatewayError::ConfigInvalid(format!(
                    "duplicate unique_id {}",
                    device.unique_id
                )));
            }
        }
        Ok(())
    }
}
