// Serve loop: drive a Session against a ServiceRegistry until the peer leaves
use crate::error::SessionError;
use crate::registry::ServiceRegistry;
use crate::session::Session;
use qrtr_core::MessageType;
use qrtr_transport::Transport;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeStats {
    pub requests: u64,
    pub responses_sent: u64,
    pub notifications: u64,
    pub unanswered: u64,
    pub dropped: u64,
    pub bytes_received: u64,
}

/// Answer Requests and deliver Notifications until the peer closes.
///
/// A frame that fails to decode is skipped: frames are fixed-size, so the
/// stream stays aligned. A close on a frame boundary ends the loop with
/// `Ok`; any other error is returned.
pub fn serve<T: Transport>(
    session: &mut Session<T>,
    registry: &ServiceRegistry,
) -> Result<ServeStats, SessionError> {
    let mut stats = ServeStats::default();

    loop {
        let message = match session.await_message() {
            Ok(message) => message,
            Err(SessionError::Decode(e)) => {
                warn!(error = %e, "dropping malformed frame");
                stats.dropped += 1;
                continue;
            }
            Err(e) if e.is_clean_close() => break,
            Err(e) => return Err(e),
        };
        stats.bytes_received += u64::from(message.length);

        match message.msg_type {
            MessageType::Request => {
                stats.requests += 1;
                match registry.dispatch(&message) {
                    Some(reply) => {
                        session.send_response(&message, &reply)?;
                        stats.responses_sent += 1;
                    }
                    None => {
                        debug!(service_id = message.service_id, "no response for request");
                        stats.unanswered += 1;
                    }
                }
            }
            MessageType::Notification => {
                stats.notifications += 1;
                let _ = registry.dispatch(&message);
            }
            MessageType::Response => {
                warn!(
                    client_id = message.client_id,
                    service_id = message.service_id,
                    "unexpected response from peer"
                );
                stats.dropped += 1;
            }
        }
    }

    info!(
        peer = %session.connection().peer(),
        requests = stats.requests,
        notifications = stats.notifications,
        dropped = stats.dropped,
        "session finished"
    );
    Ok(stats)
}
