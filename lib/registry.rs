// Service registry: per-service_id handlers for the layer above Session
use qrtr_core::Message;
use std::collections::HashMap;

/// Handles messages addressed to one service.
///
/// Returning `Some(payload)` for a Request produces a Response with that
/// payload. The return value is ignored for Notifications.
pub trait ServiceHandler: Send + Sync {
    fn handle(&self, message: &Message) -> Option<Vec<u8>>;
}

impl<F> ServiceHandler for F
where
    F: Fn(&Message) -> Option<Vec<u8>> + Send + Sync,
{
    fn handle(&self, message: &Message) -> Option<Vec<u8>> {
        self(message)
    }
}

/// Replies with the number of payload bytes received.
pub struct ByteCountEcho;

impl ServiceHandler for ByteCountEcho {
    fn handle(&self, message: &Message) -> Option<Vec<u8>> {
        Some(format!("received {} bytes", message.length).into_bytes())
    }
}

/// Replies with the request payload unchanged.
pub struct PayloadEcho;

impl ServiceHandler for PayloadEcho {
    fn handle(&self, message: &Message) -> Option<Vec<u8>> {
        Some(message.payload.clone())
    }
}

#[derive(Default)]
pub struct ServiceRegistry {
    handlers: HashMap<u32, Box<dyn ServiceHandler>>,
    fallback: Option<Box<dyn ServiceHandler>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any handler already registered for `service_id`.
    pub fn register<H: ServiceHandler + 'static>(&mut self, service_id: u32, handler: H) -> &mut Self {
        self.handlers.insert(service_id, Box::new(handler));
        self
    }

    /// Used for service ids without a registered handler.
    pub fn set_fallback<H: ServiceHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.fallback = Some(Box::new(handler));
        self
    }

    pub fn is_registered(&self, service_id: u32) -> bool {
        self.handlers.contains_key(&service_id)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// `None` when no handler (and no fallback) matches, or the handler
    /// has nothing to say.
    pub fn dispatch(&self, message: &Message) -> Option<Vec<u8>> {
        self.handlers
            .get(&message.service_id)
            .or(self.fallback.as_ref())
            .and_then(|handler| handler.handle(message))
    }
}
