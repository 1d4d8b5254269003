// Transport abstraction - allows pluggable byte-stream backends
use std::io::Result;

pub trait Transport: Send {
    /// Write some prefix of `data`, returning how many bytes were taken.
    fn send(&mut self, data: &[u8]) -> Result<usize>;
    /// Read into `buf`; `Ok(0)` means the peer closed the stream.
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize>;
    fn connect(&mut self) -> Result<()>;
    fn disconnect(&mut self) -> Result<()>;
    /// Remote endpoint, for diagnostics.
    fn peer(&self) -> &str;
    /// A handle that can shut the stream down from another thread.
    fn shutdown_handle(&self) -> Result<Box<dyn ShutdownHandle>>;
}

pub trait TransportListener: Send {
    type Connection: Transport;

    fn bind(&mut self) -> Result<()>;
    fn accept(&mut self) -> Result<Self::Connection>;
}

/// Shuts a stream down in both directions, waking any blocked reader.
pub trait ShutdownHandle: Send + Sync {
    fn shutdown(&self) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, data: &[u8]) -> Result<usize> {
        (**self).send(data)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).receive(buf)
    }

    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn disconnect(&mut self) -> Result<()> {
        (**self).disconnect()
    }

    fn peer(&self) -> &str {
        (**self).peer()
    }

    fn shutdown_handle(&self) -> Result<Box<dyn ShutdownHandle>> {
        (**self).shutdown_handle()
    }
}

pub(crate) fn not_connected() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::NotConnected, "Not connected")
}
