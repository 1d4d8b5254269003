// Session: typed conversation over one Connection
use crate::config::{Config, Endpoint};
use crate::error::SessionError;
use qrtr_core::{decode, encode, Message, MessageType};
use qrtr_transport::{
    tcp_target, CloseHandle, Connection, TcpTransport, Transport, UnixSocketTransport,
};
use tracing::{debug, info};

/// Sequences connect, exchange and close for one client.
///
/// The session does not look at `service_id`; routing is the job of a
/// [`ServiceRegistry`](crate::ServiceRegistry) or the embedding
/// application. Only one request may be outstanding at a time since
/// frames carry no request identifier.
pub struct Session<T: Transport = TcpTransport> {
    connection: Connection<T>,
    client_id: u32,
}

impl Session<TcpTransport> {
    pub fn connect(address: &str, port: u16, client_id: u32) -> Result<Self, SessionError> {
        let connection = Connection::connect(address, port)?;
        Ok(Session::new(connection, client_id))
    }
}

impl Session<Box<dyn Transport>> {
    /// Open whichever endpoint the configuration names.
    pub fn from_config(config: &Config) -> Result<Self, SessionError> {
        let transport: Box<dyn Transport> = match config.endpoint {
            Endpoint::Tcp { ref host, port } => Box::new(TcpTransport::with_options(
                &tcp_target(host, port),
                config.socket.clone(),
            )),
            Endpoint::Unix(ref path) => {
                Box::new(UnixSocketTransport::with_options(path, config.socket.clone()))
            }
        };
        let connection = Connection::open(transport)?;
        Ok(Session::new(connection, config.client_id))
    }
}

impl<T: Transport> Session<T> {
    pub fn new(connection: Connection<T>, client_id: u32) -> Self {
        info!(peer = %connection.peer(), client_id, "session started");
        Session {
            connection,
            client_id,
        }
    }

    pub fn client_id(&self) -> u32 {
        self.client_id
    }

    pub fn connection(&self) -> &Connection<T> {
        &self.connection
    }

    pub fn send_request(&mut self, service_id: u32, payload: &[u8]) -> Result<(), SessionError> {
        self.send_message(&Message::request(self.client_id, service_id, payload))
    }

    pub fn send_notification(&mut self, service_id: u32, payload: &[u8]) -> Result<(), SessionError> {
        self.send_message(&Message::notification(self.client_id, service_id, payload))
    }

    /// Answer `request`, keeping its client and service addressing.
    pub fn send_response(&mut self, request: &Message, payload: &[u8]) -> Result<(), SessionError> {
        self.send_message(&request.reply(payload))
    }

    pub fn send_message(&mut self, message: &Message) -> Result<(), SessionError> {
        let frame = encode(message)?;
        self.connection.send_frame(&frame)?;
        debug!(
            msg_type = %message.msg_type,
            client_id = message.client_id,
            service_id = message.service_id,
            length = message.length,
            "message sent"
        );
        Ok(())
    }

    /// Block until the next message arrives; branch on `msg_type`.
    pub fn await_message(&mut self) -> Result<Message, SessionError> {
        let frame = self.connection.receive_frame()?;
        let message = decode(&frame)?;
        debug!(
            msg_type = %message.msg_type,
            client_id = message.client_id,
            service_id = message.service_id,
            length = message.length,
            "message received"
        );
        Ok(message)
    }

    /// Send a Request and wait for its Response.
    ///
    /// Notifications arriving first are skipped. A Request from the peer
    /// while waiting is an error.
    pub fn call(&mut self, service_id: u32, payload: &[u8]) -> Result<Message, SessionError> {
        self.send_request(service_id, payload)?;
        loop {
            let message = self.await_message()?;
            match message.msg_type {
                MessageType::Response => return Ok(message),
                MessageType::Notification => {
                    debug!(service_id = message.service_id, "skipping notification during call");
                }
                MessageType::Request => {
                    return Err(SessionError::UnexpectedMessage {
                        expected: MessageType::Response,
                        received: MessageType::Request,
                    })
                }
            }
        }
    }

    pub fn close_handle(&self) -> std::io::Result<CloseHandle> {
        self.connection.close_handle()
    }

    pub fn close(&mut self) {
        self.connection.close();
    }
}
