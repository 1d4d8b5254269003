// Core module: Frame codec and message types (NO I/O dependencies)
pub mod types;
pub mod error;
pub mod protocol;

pub use types::*;
pub use error::*;
pub use protocol::*;
