// qrtr: typed request/response/notification sessions over fixed-size frames

// Re-export core protocol and types
pub use qrtr_core::{
    decode, encode, DecodeError, EncodeError, Message, MessageType, FRAME_SIZE, HEADER_SIZE,
    MAX_PAYLOAD,
};

// Re-export transport abstractions
pub use qrtr_transport::{
    tcp_target, CloseHandle, Connection, ConnectionError, ConnectionState, ShutdownHandle,
    SocketOptions, TcpTransport, TcpTransportListener, Transport, TransportListener,
    UnixSocketListener, UnixSocketTransport,
};

mod config;
mod error;
mod logging;
mod registry;
mod server;
mod session;

pub use config::{Config, Endpoint, DEFAULT_SERVER_ADDR, DEFAULT_SERVER_PORT};
pub use error::SessionError;
pub use logging::init_logging;
pub use registry::{ByteCountEcho, PayloadEcho, ServiceHandler, ServiceRegistry};
pub use server::{serve, ServeStats};
pub use session::Session;
