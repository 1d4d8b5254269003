// Codec errors: malformed outbound messages and malformed inbound frames
use thiserror::Error;

/// Outbound message cannot be turned into a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("payload length {length} exceeds maximum of 1024")]
    PayloadTooLarge { length: usize },

    #[error("declared length {declared} does not match payload size {actual}")]
    LengthMismatch { declared: u32, actual: usize },
}

/// Inbound bytes do not form a valid frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("truncated frame: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("unknown message type {0}")]
    UnknownType(u32),

    #[error("declared payload length {length} exceeds maximum of 1024")]
    PayloadTooLarge { length: u32 },
}
