// Transport module: byte-stream sockets and whole-frame connections
pub mod traits;
pub mod error;
pub mod options;
pub mod unix;
pub mod tcp;
pub mod connection;

pub use traits::*;
pub use error::*;
pub use options::*;
pub use unix::*;
pub use tcp::*;
pub use connection::*;
