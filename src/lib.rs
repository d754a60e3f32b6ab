//! # Radar Link Emulator
//!
//! A CCU/RSM binary protocol link emulator over TCP. Two binaries share this
//! library: `rsm` emulates the responding radar-side units, `ccu` emulates
//! the controlling unit that drives a session against one or more of them.

pub mod ccu;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod queue;
pub mod rsm;
pub mod transport;

pub use error::{CommsError, ProtocolError, Result, TransportError};
pub use protocol::{Body, Direction, Header, Message, ParamKind};
pub use queue::Queue;

/// The current version of the radar link emulator.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
