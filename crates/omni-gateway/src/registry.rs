//! In-memory device directory.
//!
//! Serves as both the [`DeviceLookup`] and the [`PositionProvider`] for the
//! decoder. Fixes from decoded updates are written back so the next sentence
//! from the same device is seeded with them.

use std::collections::HashMap;

use omni_protocol::{DeviceLookup, DeviceSession, Fix, PositionProvider, TelemetryUpdate};
use parking_lot::RwLock;

use crate::config::DeviceConfig;

/// A registered device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceEntry {
    /// Platform device id.
    pub id: u64,
    /// Reported identifier.
    pub unique_id: String,
    /// Display name.
    pub name: Option<String>,
}

/// Thread-safe device directory.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    by_unique_id: HashMap<String, u64>,
    devices: HashMap<u64, DeviceEntry>,
    fixes: RwLock<HashMap<u64, Fix>>,
}

impl DeviceRegistry {
    /// Build a registry from configured devices.
    pub fn new(devices: &[DeviceConfig]) -> Self {
        let mut registry = DeviceRegistry::default();
        let mut fixes = HashMap::new();
        for device in devices {
            registry
                .by_unique_id
                .insert(device.unique_id.clone(), device.id);
            registry.devices.insert(
                device.id,
                DeviceEntry {
                    id: device.id,
                    unique_id: device.unique_id.clone(),
                    name: device.name.clone(),
                },
            );
            if let Some(fix) = &device.last_fix {
                fixes.insert(device.id, fix.clone());
            }
        }
        registry.fixes = RwLock::new(fixes);
        registry
    }

    /// Look up a device by platform id.
    pub fn device(&self, id: u64) -> Option<&DeviceEntry> {
        self.devices.get(&id)
    }

    /// Number of registered devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether no devices are registered.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Keep the fix of a decoded update if it was refreshed by the sentence.
    pub fn record(&self, update: &TelemetryUpdate) {
        if update.outdated || !self.devices.contains_key(&update.device_id) {
            return;
        }
        self.fixes.write().insert(update.device_id, update.fix.clone());
    }
}

impl DeviceLookup for DeviceRegistry {
    fn resolve(
        &self,
        _remote: Option<std::net::SocketAddr>,
        unique_id: &str,
    ) -> Option<DeviceSession> {
        let id = *self.by_unique_id.get(unique_id)?;
        Some(DeviceSession {
            device_id: id,
            unique_id: unique_id.to_string(),
        })
    }

    fn unique_id(&self, device_id: u64) -> Option<String> {
        self.devices.get(&device_id).map(|d| d.unique_id.clone())
    }
}

impl PositionProvider for DeviceRegistry {
    fn last_fix(&self, device_id: u64) -> Option<Fix> {
        self.fixes.read().get(&device_id).cloned()
    }
}
