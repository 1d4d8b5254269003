use qrtr_core::{DecodeError, EncodeError, MessageType};
use qrtr_transport::ConnectionError;
use thiserror::Error;

/// Any failure surfaced by a [`Session`](crate::Session).
///
/// Codec and connection errors pass through unchanged; nothing at this
/// layer retries.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("unexpected {received} while waiting for {expected}")]
    UnexpectedMessage {
        expected: MessageType,
        received: MessageType,
    },
}

impl SessionError {
    /// Taxonomy name, for user-facing error lines.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::Encode(_) => "EncodeError",
            SessionError::Decode(_) => "DecodeError",
            SessionError::Connection(e) => e.kind(),
            SessionError::UnexpectedMessage { .. } => "UnexpectedMessage",
        }
    }

    pub fn is_clean_close(&self) -> bool {
        matches!(self, SessionError::Connection(e) if e.is_clean_close())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        let cases: Vec<(SessionError, &str)> = vec![
            (EncodeError::PayloadTooLarge { length: 2000 }.into(), "EncodeError"),
            (DecodeError::UnknownType(99).into(), "DecodeError"),
            (ConnectionError::NotOpen.into(), "NotOpen"),
            (ConnectionError::ConnectionClosed { received: 12 }.into(), "ConnectionClosed"),
            (
                SessionError::UnexpectedMessage {
                    expected: MessageType::Response,
                    received: MessageType::Request,
                },
                "UnexpectedMessage",
            ),
        ];
        for (err, kind) in cases {
            assert_eq!(err.kind(), kind);
        }
    }

    #[test]
    fn only_boundary_close_is_clean() {
        let clean: SessionError = ConnectionError::ConnectionClosed { received: 0 }.into();
        let torn: SessionError = ConnectionError::ConnectionClosed { received: 500 }.into();
        assert!(clean.is_clean_close());
        assert!(!torn.is_clean_close());
    }
}
