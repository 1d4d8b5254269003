// Connection: whole-frame transfer over a fragmenting byte stream
use crate::error::ConnectionError;
use crate::options::SocketOptions;
use crate::tcp::{tcp_target, TcpTransport};
use crate::traits::{not_connected, ShutdownHandle, Transport};
use crate::unix::UnixSocketTransport;
use qrtr_core::FRAME_SIZE;
use std::fmt;
use std::io::{self, ErrorKind};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    /// Terminal; build a new Connection to talk again.
    Closed,
}

/// Owns one stream transport and moves exactly one frame per call.
///
/// Sends and receives loop over short writes/reads until the whole
/// [`FRAME_SIZE`] bytes have moved. Any I/O failure, including the peer
/// closing mid-frame, tears the connection down.
///
/// Not safe to drive from two threads at once; use a [`CloseHandle`] to
/// cancel a blocked call from elsewhere.
pub struct Connection<T: Transport = TcpTransport> {
    transport: Option<T>,
    peer: String,
}

impl Connection<TcpTransport> {
    pub fn connect(address: &str, port: u16) -> Result<Self, ConnectionError> {
        Self::connect_with(address, port, SocketOptions::default())
    }

    pub fn connect_with(
        address: &str,
        port: u16,
        options: SocketOptions,
    ) -> Result<Self, ConnectionError> {
        Self::open(TcpTransport::with_options(&tcp_target(address, port), options))
    }
}

impl Connection<UnixSocketTransport> {
    pub fn connect_unix(path: &str, options: SocketOptions) -> Result<Self, ConnectionError> {
        Self::open(UnixSocketTransport::with_options(path, options))
    }
}

impl<T: Transport> Connection<T> {
    /// Connect `transport` and adopt it.
    pub fn open(mut transport: T) -> Result<Self, ConnectionError> {
        transport.connect().map_err(|reason| ConnectionError::Connect {
            address: transport.peer().to_string(),
            reason,
        })?;
        Ok(Self::from_transport(transport))
    }

    /// Adopt an already-connected transport.
    pub fn from_transport(transport: T) -> Self {
        let peer = transport.peer().to_string();
        info!(%peer, "connection open");
        Connection {
            transport: Some(transport),
            peer,
        }
    }

    pub fn state(&self) -> ConnectionState {
        if self.transport.is_some() {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    pub fn send_frame(&mut self, frame: &[u8]) -> Result<(), ConnectionError> {
        let transport = self.transport.as_mut().ok_or(ConnectionError::NotOpen)?;
        if frame.len() != FRAME_SIZE {
            return Err(ConnectionError::Send(io::Error::new(
                ErrorKind::InvalidInput,
                format!("frame is {} bytes, expected {}", frame.len(), FRAME_SIZE),
            )));
        }

        match write_all(transport, frame) {
            Ok(()) => {
                debug!(peer = %self.peer, bytes = frame.len(), "frame sent");
                Ok(())
            }
            Err(e) => {
                self.teardown(&e);
                Err(e)
            }
        }
    }

    pub fn receive_frame(&mut self) -> Result<Vec<u8>, ConnectionError> {
        let transport = self.transport.as_mut().ok_or(ConnectionError::NotOpen)?;
        let mut frame = vec![0u8; FRAME_SIZE];

        match read_exact(transport, &mut frame) {
            Ok(()) => {
                debug!(peer = %self.peer, bytes = frame.len(), "frame received");
                Ok(frame)
            }
            Err(e) => {
                self.teardown(&e);
                Err(e)
            }
        }
    }

    /// Release the socket. Calling it again is a no-op.
    pub fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.disconnect() {
                warn!(peer = %self.peer, error = %e, "error while closing connection");
            }
            info!(peer = %self.peer, "connection closed");
        }
    }

    /// Handle that can close this connection from another thread, unblocking
    /// a pending `receive_frame` with `ConnectionClosed`.
    pub fn close_handle(&self) -> io::Result<CloseHandle> {
        let transport = self.transport.as_ref().ok_or_else(not_connected)?;
        Ok(CloseHandle {
            inner: transport.shutdown_handle()?,
            peer: self.peer.clone(),
        })
    }

    fn teardown(&mut self, cause: &ConnectionError) {
        if cause.is_clean_close() {
            debug!(peer = %self.peer, "peer closed connection");
        } else {
            warn!(peer = %self.peer, error = %cause, "connection failed");
        }
        self.close();
    }
}

impl<T: Transport> fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.peer)
            .field("state", &self.state())
            .finish()
    }
}

impl<T: Transport> Drop for Connection<T> {
    fn drop(&mut self) {
        self.close();
    }
}

pub struct CloseHandle {
    inner: Box<dyn ShutdownHandle>,
    peer: String,
}

impl CloseHandle {
    pub fn close(&self) -> io::Result<()> {
        debug!(peer = %self.peer, "closing connection from handle");
        self.inner.shutdown()
    }
}

fn write_all<T: Transport>(transport: &mut T, frame: &[u8]) -> Result<(), ConnectionError> {
    let mut written = 0;
    while written < frame.len() {
        match transport.send(&frame[written..]) {
            Ok(0) => {
                return Err(ConnectionError::Send(io::Error::new(
                    ErrorKind::WriteZero,
                    format!("transport accepted 0 bytes after {}", written),
                )))
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(ConnectionError::Send(e)),
        }
    }
    Ok(())
}

fn read_exact<T: Transport>(transport: &mut T, buf: &mut [u8]) -> Result<(), ConnectionError> {
    let mut received = 0;
    while received < buf.len() {
        match transport.receive(&mut buf[received..]) {
            Ok(0) => return Err(ConnectionError::ConnectionClosed { received }),
            Ok(n) => received += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(ConnectionError::Recv(e)),
        }
    }
    Ok(())
}
