// TCP transport implementation
use crate::options::SocketOptions;
use crate::traits::{not_connected, ShutdownHandle, Transport, TransportListener};
use std::io::{Error, ErrorKind, Read, Result, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use tracing::debug;

/// `host:port`, bracketing bare IPv6 literals.
pub fn tcp_target(address: &str, port: u16) -> String {
    if address.contains(':') && !address.starts_with('[') {
        format!("[{}]:{}", address, port)
    } else {
        format!("{}:{}", address, port)
    }
}

pub struct TcpTransport {
    address: String,
    options: SocketOptions,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new(address: &str) -> Self {
        Self::with_options(address, SocketOptions::default())
    }

    pub fn with_options(address: &str, options: SocketOptions) -> Self {
        TcpTransport {
            address: address.to_string(),
            options,
            stream: None,
        }
    }

    /// Wrap a stream that is already connected (e.g. one returned by `accept`).
    pub fn from_stream(stream: TcpStream, options: SocketOptions) -> Result<Self> {
        let address = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "<unknown>".to_string());
        let transport = TcpTransport {
            address,
            options,
            stream: Some(stream),
        };
        transport.configure()?;
        Ok(transport)
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn configure(&self) -> Result<()> {
        if let Some(ref stream) = self.stream {
            stream.set_read_timeout(self.options.read_timeout)?;
            stream.set_nodelay(self.options.nodelay)?;
            self.options.apply_buffers(stream)?;
            self.options.apply_keepalive(stream)?;
        }
        Ok(())
    }

    fn connect_addr(&self, addr: &SocketAddr) -> Result<TcpStream> {
        match self.options.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(addr, timeout),
            None => TcpStream::connect(addr),
        }
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, data: &[u8]) -> Result<usize> {
        if let Some(ref mut stream) = self.stream {
            stream.write(data)
        } else {
            Err(not_connected())
        }
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        if let Some(ref mut stream) = self.stream {
            stream.read(buf)
        } else {
            Err(not_connected())
        }
    }

    fn connect(&mut self) -> Result<()> {
        // Host names resolve to several addresses; take the first that answers
        let mut last_err = None;
        for addr in self.address.to_socket_addrs()? {
            match self.connect_addr(&addr) {
                Ok(stream) => {
                    debug!(%addr, "tcp connected");
                    self.stream = Some(stream);
                    return self.configure();
                }
                Err(e) => {
                    debug!(%addr, error = %e, "tcp connect attempt failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            Error::new(ErrorKind::NotFound, format!("no addresses resolved for {}", self.address))
        }))
    }

    fn disconnect(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            match stream.shutdown(Shutdown::Both) {
                Err(e) if e.kind() != ErrorKind::NotConnected => return Err(e),
                _ => {}
            }
        }
        Ok(())
    }

    fn peer(&self) -> &str {
        &self.address
    }

    fn shutdown_handle(&self) -> Result<Box<dyn ShutdownHandle>> {
        match self.stream {
            Some(ref stream) => Ok(Box::new(TcpShutdown(stream.try_clone()?))),
            None => Err(not_connected()),
        }
    }
}

struct TcpShutdown(TcpStream);

impl ShutdownHandle for TcpShutdown {
    fn shutdown(&self) -> Result<()> {
        match self.0.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != ErrorKind::NotConnected => Err(e),
            _ => Ok(()),
        }
    }
}

pub struct TcpTransportListener {
    address: String,
    options: SocketOptions,
    listener: Option<TcpListener>,
}

impl TcpTransportListener {
    pub fn new(address: &str, options: SocketOptions) -> Self {
        TcpTransportListener {
            address: address.to_string(),
            options,
            listener: None,
        }
    }

    /// Bound address; useful when binding to port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        match self.listener {
            Some(ref listener) => listener.local_addr(),
            None => Err(not_connected()),
        }
    }
}

impl TransportListener for TcpTransportListener {
    type Connection = TcpTransport;

    fn bind(&mut self) -> Result<()> {
        self.listener = Some(TcpListener::bind(&self.address)?);
        Ok(())
    }

    fn accept(&mut self) -> Result<TcpTransport> {
        let listener = self.listener.as_ref().ok_or_else(not_connected)?;
        let (stream, addr) = listener.accept()?;
        debug!(%addr, "tcp accepted");
        TcpTransport::from_stream(stream, self.options.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn ipv6_literals_are_bracketed() {
        assert_eq!(tcp_target("::1", 80), "[::1]:80");
        assert_eq!(tcp_target("[::1]", 80), "[::1]:80");
        assert_eq!(tcp_target("localhost", 80), "localhost:80");
    }

    #[test]
    fn io_before_connect_is_not_connected() {
        let mut transport = TcpTransport::new("127.0.0.1:1");
        assert!(!transport.is_connected());
        let err = transport.send(b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConnected);
        assert!(transport.shutdown_handle().is_err());
        assert!(transport.disconnect().is_ok());
    }

    #[test]
    fn connect_with_timeout() {
        let options = SocketOptions {
            connect_timeout: Some(Duration::from_secs(2)),
            ..SocketOptions::default()
        };
        let mut listener = TcpTransportListener::new("127.0.0.1:0", SocketOptions::default());
        listener.bind().unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let mut client = TcpTransport::with_options(&addr, options.clone());
        client.connect().unwrap();
        assert!(client.is_connected());
        listener.accept().unwrap();

        // Nothing listens on the port once the listener is gone
        drop(listener);
        let mut refused = TcpTransport::with_options(&addr, options);
        assert!(refused.connect().is_err());
        assert!(!refused.is_connected());
    }

    #[test]
    fn listener_accepts_with_options() {
        let options = SocketOptions {
            nodelay: true,
            keepalive: true,
            buffer_size: Some(64 * 1024),
            ..SocketOptions::default()
        };
        let mut listener = TcpTransportListener::new("127.0.0.1:0", options.clone());
        listener.bind().unwrap();
        let addr = listener.local_addr().unwrap();

        let mut client = TcpTransport::with_options(&addr.to_string(), options);
        client.connect().unwrap();
        let mut server = listener.accept().unwrap();

        assert_eq!(client.send(b"hi").unwrap(), 2);
        let mut buf = [0u8; 2];
        let mut got = 0;
        while got < 2 {
            got += server.receive(&mut buf[got..]).unwrap();
        }
        assert_eq!(&buf, b"hi");
    }
}
