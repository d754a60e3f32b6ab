//! Typed error kinds per §7. Every fallible operation in the protocol,
//! transport, queue, RSM and CCU layers returns (or wraps) one of these
//! variants; `main` in each binary collects them through `anyhow`.

use thiserror::Error;

/// The five error kinds named in §7.
#[derive(Debug, Error)]
pub enum CommsError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("resource error: {0}")]
    Resource(String),

    #[error("timed out waiting for response")]
    Timeout,

    #[error("configuration error: {0}")]
    Config(String),
}

/// Malformed or unexpected wire-level content, per §3's frame invariants.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("body_length {0} exceeds maximum of {1}")]
    BodyTooLong(usize, usize),

    #[error("body_length field {declared} does not match received body of {actual} bytes")]
    BodyLengthMismatch { declared: usize, actual: usize },

    #[error("reserved flag bits are non-zero: {0:#04b}")]
    ReservedBitsSet(u8),

    #[error("direction bit mismatch: expected {expected}, got {actual}")]
    DirectionMismatch { expected: bool, actual: bool },

    #[error("unknown message type {0}")]
    UnknownMessageType(u8),

    #[error("unexpected message type {actual}, expected {expected}")]
    UnexpectedMessageType { expected: u8, actual: u8 },

    #[error("LAK mismatch: expected {expected:#04x}, got {actual:#04x}")]
    LakMismatch { expected: u8, actual: u8 },
}

/// Transport-level I/O failure, per §7: read/write failure, peer close.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("peer closed the connection")]
    PeerClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CommsError>;
