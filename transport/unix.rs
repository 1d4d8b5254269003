// Unix socket transport implementation
use crate::options::SocketOptions;
use crate::traits::{not_connected, ShutdownHandle, Transport, TransportListener};
use std::fs;
use std::io::{Error, ErrorKind, Read, Result, Write};
use std::net::Shutdown;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::{UnixListener, UnixStream};
use tracing::debug;

pub struct UnixSocketTransport {
    socket_path: String,
    options: SocketOptions,
    stream: Option<UnixStream>,
}

impl UnixSocketTransport {
    pub fn new(socket_path: &str) -> Self {
        Self::with_options(socket_path, SocketOptions::default())
    }

    pub fn with_options(socket_path: &str, options: SocketOptions) -> Self {
        UnixSocketTransport {
            socket_path: socket_path.to_string(),
            options,
            stream: None,
        }
    }

    pub fn from_stream(socket_path: &str, stream: UnixStream, options: SocketOptions) -> Result<Self> {
        let transport = UnixSocketTransport {
            socket_path: socket_path.to_string(),
            options,
            stream: Some(stream),
        };
        transport.configure()?;
        Ok(transport)
    }

    fn configure(&self) -> Result<()> {
        if let Some(ref stream) = self.stream {
            stream.set_read_timeout(self.options.read_timeout)?;
            self.options.apply_buffers(stream)?;
        }
        Ok(())
    }
}

impl Transport for UnixSocketTransport {
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
        let stream = UnixStream::connect(&self.socket_path)?;
        debug!(path = %self.socket_path, "unix socket connected");
        self.stream = Some(stream);
        self.configure()
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
        &self.socket_path
    }

    fn shutdown_handle(&self) -> Result<Box<dyn ShutdownHandle>> {
        match self.stream {
            Some(ref stream) => Ok(Box::new(UnixShutdown(stream.try_clone()?))),
            None => Err(not_connected()),
        }
    }
}

struct UnixShutdown(UnixStream);

impl ShutdownHandle for UnixShutdown {
    fn shutdown(&self) -> Result<()> {
        match self.0.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != ErrorKind::NotConnected => Err(e),
            _ => Ok(()),
        }
    }
}

pub struct UnixSocketListener {
    socket_path: String,
    options: SocketOptions,
    listener: Option<UnixListener>,
}

impl UnixSocketListener {
    pub fn new(socket_path: &str, options: SocketOptions) -> Self {
        UnixSocketListener {
            socket_path: socket_path.to_string(),
            options,
            listener: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.socket_path
    }
}

impl TransportListener for UnixSocketListener {
    type Connection = UnixSocketTransport;

    fn bind(&mut self) -> Result<()> {
        // A previous run may have left its socket file behind; anything
        // else at the path is not ours to delete
        match fs::symlink_metadata(&self.socket_path) {
            Ok(meta) if meta.file_type().is_socket() => fs::remove_file(&self.socket_path)?,
            Ok(_) => {
                return Err(Error::new(
                    ErrorKind::AlreadyExists,
                    format!("{} exists and is not a socket", self.socket_path),
                ))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        self.listener = Some(UnixListener::bind(&self.socket_path)?);
        Ok(())
    }

    fn accept(&mut self) -> Result<UnixSocketTransport> {
        let listener = self.listener.as_ref().ok_or_else(not_connected)?;
        let (stream, _addr) = listener.accept()?;
        debug!(path = %self.socket_path, "unix socket accepted");
        UnixSocketTransport::from_stream(&self.socket_path, stream, self.options.clone())
    }
}

impl Drop for UnixSocketListener {
    fn drop(&mut self) {
        if self.listener.take().is_some() {
            let _ = fs::remove_file(&self.socket_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn socket_path(dir: &tempfile::TempDir) -> String {
        dir.path().join("qrtr.sock").to_str().unwrap().to_string()
    }

    #[test]
    fn bind_replaces_stale_socket_and_drop_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = socket_path(&dir);
        // std leaves the file behind when the listener goes away
        drop(UnixListener::bind(&path).unwrap());
        assert!(Path::new(&path).exists());

        let mut listener = UnixSocketListener::new(&path, SocketOptions::default());
        listener.bind().unwrap();
        let mut client = UnixSocketTransport::new(&path);
        client.connect().unwrap();
        listener.accept().unwrap();

        drop(listener);
        assert!(!Path::new(&path).exists());
    }

    #[test]
    fn bind_refuses_to_delete_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = socket_path(&dir);
        fs::write(&path, b"keep me").unwrap();

        let mut listener = UnixSocketListener::new(&path, SocketOptions::default());
        let err = listener.bind().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&path).unwrap(), b"keep me");
        drop(listener);
        assert!(Path::new(&path).exists());
    }

    #[test]
    fn unbound_listener_leaves_path_alone_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = socket_path(&dir);
        drop(UnixListener::bind(&path).unwrap());

        drop(UnixSocketListener::new(&path, SocketOptions::default()));
        assert!(Path::new(&path).exists());
    }
}
