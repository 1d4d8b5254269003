// Connection errors: transport setup and mid-transfer failures
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("cannot connect to {address}: {reason}")]
    Connect { address: String, reason: io::Error },

    #[error("send failed: {0}")]
    Send(#[source] io::Error),

    #[error("receive failed: {0}")]
    Recv(#[source] io::Error),

    /// Peer ended the stream; `received` bytes of the pending frame had arrived.
    #[error("connection closed by peer after {received} bytes of frame")]
    ConnectionClosed { received: usize },

    #[error("connection is not open")]
    NotOpen,
}

impl ConnectionError {
    pub fn kind(&self) -> &'static str {
        match self {
            ConnectionError::Connect { .. } => "ConnectError",
            ConnectionError::Send(_) => "SendError",
            ConnectionError::Recv(_) => "RecvError",
            ConnectionError::ConnectionClosed { .. } => "ConnectionClosed",
            ConnectionError::NotOpen => "NotOpen",
        }
    }

    /// Peer closed cleanly between frames.
    pub fn is_clean_close(&self) -> bool {
        matches!(self, ConnectionError::ConnectionClosed { received: 0 })
    }
}
