//! TCP gateway for Omni tracker devices.
//!
//! Hosts the [`omni_protocol`] decoder and encoder behind a socket listener:
//!
//! - [`SentenceCodec`] cuts the inbound byte stream at `#`.
//! - [`GatewayConfig`] is the YAML configuration.
//! - [`DeviceRegistry`] resolves identities and remembers last fixes.
//! - [`Gateway`] runs one connection session per socket and routes platform
//!   commands to the right device.

pub mod codec;
pub mod config;
pub mod error;
pub mod registry;
pub mod server;

pub use codec::{Oversized, SentenceCodec};
pub use config::{DeviceConfig, GatewayConfig};
pub use error::{GatewayError, GatewayResult};
pub use registry::{DeviceEntry, DeviceRegistry};
pub use server::Gateway;
