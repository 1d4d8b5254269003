// Socket tuning applied after a stream is established
use nix::sys::socket::{setsockopt, sockopt};
use std::io::Result;
use std::os::fd::AsFd;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocketOptions {
    /// None blocks until the OS gives up.
    pub connect_timeout: Option<Duration>,
    /// None keeps reads fully blocking.
    pub read_timeout: Option<Duration>,
    /// Applied to both SO_RCVBUF and SO_SNDBUF.
    pub buffer_size: Option<usize>,
    pub keepalive: bool,
    pub nodelay: bool,
}

impl SocketOptions {
    pub(crate) fn apply_buffers<F: AsFd>(&self, fd: &F) -> Result<()> {
        if let Some(size) = self.buffer_size {
            setsockopt(fd, sockopt::RcvBuf, &size).map_err(std::io::Error::from)?;
            setsockopt(fd, sockopt::SndBuf, &size).map_err(std::io::Error::from)?;
        }
        Ok(())
    }

    pub(crate) fn apply_keepalive<F: AsFd>(&self, fd: &F) -> Result<()> {
        if self.keepalive {
            setsockopt(fd, sockopt::KeepAlive, &true).map_err(std::io::Error::from)?;
        }
        Ok(())
    }
}
