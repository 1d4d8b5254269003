// Configuration read from environment variables
//
// QRTR_SERVER_ADDR: server host or IP (default: 127.0.0.1)
// QRTR_SERVER_PORT: server TCP port (default: 5005)
// QRTR_UNIX_SOCKET: Unix socket path; takes precedence over TCP when set
// QRTR_CLIENT_ID: client identifier (default: process id)
// QRTR_CONNECT_TIMEOUT_MS: connect timeout, 0 = none (default: 0)
// QRTR_RECV_TIMEOUT_MS: read timeout, 0 = blocking (default: 0)
// QRTR_SOCKET_BUFFER_SIZE: SO_RCVBUF/SO_SNDBUF in bytes (default: OS)
// QRTR_KEEPALIVE: 1/true to enable SO_KEEPALIVE (default: false)
use qrtr_transport::SocketOptions;
use std::env;
use std::time::Duration;

pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1";
pub const DEFAULT_SERVER_PORT: u16 = 5005;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    Unix(String),
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Endpoint::Tcp { host, port } => write!(f, "{}:{}", host, port),
            Endpoint::Unix(path) => write!(f, "unix:{}", path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub endpoint: Endpoint,
    pub client_id: u32,
    pub socket: SocketOptions,
}

impl Default for Config {
    fn default() -> Self {
        Config::from_vars(|_| None)
    }
}

impl Config {
    pub fn from_env() -> Self {
        Config::from_vars(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unparsable values fall back
    /// to defaults.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());

        let endpoint = match lookup("QRTR_UNIX_SOCKET").filter(|s| !s.is_empty()) {
            Some(path) => Endpoint::Unix(path),
            None => Endpoint::Tcp {
                host: lookup("QRTR_SERVER_ADDR")
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string()),
                port: lookup("QRTR_SERVER_PORT")
                    .and_then(|s| s.trim().parse().ok())
                    .unwrap_or(DEFAULT_SERVER_PORT),
            },
        };

        let client_id = lookup("QRTR_CLIENT_ID")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or_else(std::process::id);

        let socket = SocketOptions {
            connect_timeout: parsed("QRTR_CONNECT_TIMEOUT_MS")
                .filter(|&ms| ms > 0)
                .map(Duration::from_millis),
            read_timeout: parsed("QRTR_RECV_TIMEOUT_MS")
                .filter(|&ms| ms > 0)
                .map(Duration::from_millis),
            buffer_size: parsed("QRTR_SOCKET_BUFFER_SIZE")
                .filter(|&size| size > 0)
                .map(|size| size as usize),
            keepalive: lookup("QRTR_KEEPALIVE")
                .map(|s| parse_flag(&s))
                .unwrap_or(false),
            nodelay: true,
        };

        Config {
            endpoint,
            client_id,
            socket,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = config_from(&[]);
        assert_eq!(
            config.endpoint,
            Endpoint::Tcp { host: "127.0.0.1".to_string(), port: 5005 }
        );
        assert_eq!(config.client_id, std::process::id());
        assert_eq!(config.socket.connect_timeout, None);
        assert_eq!(config.socket.read_timeout, None);
        assert!(!config.socket.keepalive);
    }

    #[test]
    fn reads_all_variables() {
        let config = config_from(&[
            ("QRTR_SERVER_ADDR", "10.0.0.2"),
            ("QRTR_SERVER_PORT", "7000"),
            ("QRTR_CLIENT_ID", "7"),
            ("QRTR_CONNECT_TIMEOUT_MS", "250"),
            ("QRTR_RECV_TIMEOUT_MS", "1000"),
            ("QRTR_SOCKET_BUFFER_SIZE", "65536"),
            ("QRTR_KEEPALIVE", "yes"),
        ]);
        assert_eq!(config.endpoint.to_string(), "10.0.0.2:7000");
        assert_eq!(config.client_id, 7);
        assert_eq!(config.socket.connect_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.socket.read_timeout, Some(Duration::from_secs(1)));
        assert_eq!(config.socket.buffer_size, Some(65536));
        assert!(config.socket.keepalive);
    }

    #[test]
    fn unix_socket_wins_over_tcp() {
        let config = config_from(&[("QRTR_UNIX_SOCKET", "/tmp/qrtr.sock"), ("QRTR_SERVER_PORT", "1")]);
        assert_eq!(config.endpoint, Endpoint::Unix("/tmp/qrtr.sock".to_string()));
        assert_eq!(config.endpoint.to_string(), "unix:/tmp/qrtr.sock");
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        let config = config_from(&[
            ("QRTR_SERVER_PORT", "not-a-port"),
            ("QRTR_RECV_TIMEOUT_MS", "0"),
            ("QRTR_KEEPALIVE", "maybe"),
        ]);
        assert_eq!(
            config.endpoint,
            Endpoint::Tcp { host: DEFAULT_SERVER_ADDR.to_string(), port: DEFAULT_SERVER_PORT }
        );
        assert_eq!(config.socket.read_timeout, None);
        assert!(!config.socket.keepalive);
    }
}
