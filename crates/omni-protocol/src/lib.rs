//! Omni Tracker Protocol
//!
//! Decoder and encoder for the ASCII protocol spoken by Omni lock-equipped
//! GPS trackers (scooter and bike locks). Device sentences are comma-separated
//! fields framed by `*` and `#`:
//!
//! ```text
//! *CMDR,OM,<imei>,<yyMMddHHmmss>,<type>[,<field>...]#
//! ```
//!
//! The two-character type code at field 4 selects how the remaining fields
//! are read. The server answers some types, and issues its own commands, with
//! `CMDS` sentences preceded by two `0xFF` bytes.
//!
//! This crate does no I/O. The host resolves devices, supplies last known
//! fixes and delivers outbound bytes through the traits in [`session`].
//!
//! # Example
//!
//! ```rust,ignore
//! use omni_protocol::{ConnectionSession, DecodeContext, Decoder, ProtocolConfig};
//!
//! let decoder = Decoder::new(ProtocolConfig::default());
//! let mut connection = ConnectionSession::new(Some(peer));
//! let mut replies = Vec::new();
//! let mut ctx = DecodeContext {
//!     connection: &mut connection,
//!     devices: &registry,
//!     positions: &registry,
//!     replies: &mut replies,
//! };
//! if let Some(update) = decoder.decode(&mut ctx, "*CMDR,OM,862205059172132,000000000000,Q0,412,80#")? {
//!     println!("{:?}", update.attributes);
//! }
//! ```

pub mod commands;
pub mod config;
pub mod constants;
pub mod cursor;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod message;
pub mod session;
pub mod types;

pub use commands::*;
pub use config::*;
pub use cursor::FieldCursor;
pub use decoder::*;
pub use encoder::*;
pub use error::*;
pub use frame::*;
pub use message::*;
pub use session::*;
pub use types::*;
