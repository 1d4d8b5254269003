// qrtr-daemon: reference server, answers requests per service_id
use clap::Parser;
use crossbeam::channel::{unbounded, Receiver, Sender};
use qrtr::{
    init_logging, serve, tcp_target, ByteCountEcho, Config, Connection, Endpoint, PayloadEcho,
    ServeStats, ServiceRegistry, Session, TcpTransportListener, Transport, TransportListener,
    UnixSocketListener, DEFAULT_SERVER_ADDR, DEFAULT_SERVER_PORT,
};
use std::io;
use std::process;
use std::sync::Arc;
use std::thread;
use tracing::{error, info, warn, Level};

// Service 0 echoes the payload; everything else echoes the byte count
const ECHO_SERVICE: u32 = 0;
// Server-side client_id carried on frames the daemon originates
const DAEMON_CLIENT_ID: u32 = 0;

#[derive(Parser)]
#[command(name = "qrtr-daemon")]
#[command(about = "QRTR reference server", long_about = None)]
#[command(version = "0.1.0")]
struct Cli {
    /// Address to bind (default: QRTR_SERVER_ADDR or 127.0.0.1)
    #[arg(short, long)]
    bind: Option<String>,

    /// TCP port (default: QRTR_SERVER_PORT or 5005)
    #[arg(short, long)]
    port: Option<u16>,

    /// Listen on a Unix socket path instead of TCP
    #[arg(short, long, value_name = "PATH")]
    unix: Option<String>,

    /// Log every frame
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

// Session threads report here; the monitor keeps running totals
enum SessionEvent {
    Opened { peer: String },
    Closed { peer: String, stats: Option<ServeStats> },
}

fn main() {
    let cli = Cli::parse();
    init_logging(if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::WARN
    } else {
        Level::INFO
    });

    let config = apply_overrides(Config::from_env(), &cli);
    let registry = Arc::new(daemon_registry());

    let (events, rx) = unbounded::<SessionEvent>();
    if let Err(e) = thread::Builder::new()
        .name("qrtr-monitor".to_string())
        .spawn(move || monitor(rx))
    {
        error!(error = %e, "failed to spawn monitor");
        process::exit(1);
    }

    let result = match config.endpoint {
        Endpoint::Tcp { ref host, port } => {
            let address = tcp_target(host, port);
            run(TcpTransportListener::new(&address, config.socket.clone()), &address, registry, events)
        }
        Endpoint::Unix(ref path) => {
            run(UnixSocketListener::new(path, config.socket.clone()), path, registry, events)
        }
    };

    if let Err(e) = result {
        error!(endpoint = %config.endpoint, error = %e, "listener failed");
        process::exit(1);
    }
}

fn daemon_registry() -> ServiceRegistry {
    let mut registry = ServiceRegistry::new();
    registry.register(ECHO_SERVICE, PayloadEcho).set_fallback(ByteCountEcho);
    registry
}

fn apply_overrides(mut config: Config, cli: &Cli) -> Config {
    if let Some(ref path) = cli.unix {
        config.endpoint = Endpoint::Unix(path.clone());
    } else if cli.bind.is_some() || cli.port.is_some() {
        let (host, port) = match config.endpoint {
            Endpoint::Tcp { host, port } => (host, port),
            Endpoint::Unix(_) => (DEFAULT_SERVER_ADDR.to_string(), DEFAULT_SERVER_PORT),
        };
        config.endpoint = Endpoint::Tcp {
            host: cli.bind.clone().unwrap_or(host),
            port: cli.port.unwrap_or(port),
        };
    }
    config
}

fn run<L>(
    mut listener: L,
    endpoint: &str,
    registry: Arc<ServiceRegistry>,
    events: Sender<SessionEvent>,
) -> io::Result<()>
where
    L: TransportListener,
    L::Connection: 'static,
{
    listener.bind()?;
    info!(%endpoint, "qrtr daemon listening");
    accept_loop(listener, registry, events)
}

/// Accept forever, giving every client its own session thread so an idle
/// client never holds up the others.
fn accept_loop<L>(
    mut listener: L,
    registry: Arc<ServiceRegistry>,
    events: Sender<SessionEvent>,
) -> io::Result<()>
where
    L: TransportListener,
    L::Connection: 'static,
{
    let mut next_id: u64 = 0;
    loop {
        let transport = match listener.accept() {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };

        next_id += 1;
        let registry = Arc::clone(&registry);
        let events = events.clone();
        let spawned = thread::Builder::new()
            .name(format!("qrtr-session-{}", next_id))
            .spawn(move || session_thread(transport, &registry, &events));
        if let Err(e) = spawned {
            error!(error = %e, "failed to spawn session thread");
        }
    }
}

fn session_thread<T: Transport>(
    transport: T,
    registry: &ServiceRegistry,
    events: &Sender<SessionEvent>,
) {
    let mut session = Session::new(Connection::from_transport(transport), DAEMON_CLIENT_ID);
    let peer = session.connection().peer().to_string();
    // A gone monitor must not take sessions down with it
    let _ = events.send(SessionEvent::Opened { peer: peer.clone() });

    let stats = match serve(&mut session, registry) {
        Ok(stats) => Some(stats),
        Err(e) => {
            warn!(%peer, kind = e.kind(), error = %e, "session ended with error");
            None
        }
    };
    session.close();
    let _ = events.send(SessionEvent::Closed { peer, stats });
}

fn monitor(rx: Receiver<SessionEvent>) {
    let mut active: usize = 0;
    let mut requests: u64 = 0;
    for event in rx.iter() {
        match event {
            SessionEvent::Opened { peer } => {
                active += 1;
                info!(%peer, active, "client connected");
            }
            SessionEvent::Closed { peer, stats } => {
                active = active.saturating_sub(1);
                let stats = stats.unwrap_or_default();
                requests += stats.requests;
                info!(
                    %peer,
                    active,
                    requests = stats.requests,
                    responses = stats.responses_sent,
                    bytes = stats.bytes_received,
                    total_requests = requests,
                    "client disconnected"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qrtr::SocketOptions;
    use std::time::Duration;

    fn tcp(host: &str, port: u16) -> Endpoint {
        Endpoint::Tcp { host: host.to_string(), port }
    }

    #[test]
    fn flags_override_environment() {
        let cli = Cli::parse_from(["qrtr-daemon", "--port", "6000"]);
        let config = apply_overrides(Config::default(), &cli);
        assert_eq!(config.endpoint, tcp(DEFAULT_SERVER_ADDR, 6000));
    }

    #[test]
    fn unix_flag_replaces_tcp_endpoint() {
        let cli = Cli::parse_from(["qrtr-daemon", "-u", "/tmp/qrtr.sock"]);
        let config = apply_overrides(Config::default(), &cli);
        assert_eq!(config.endpoint, Endpoint::Unix("/tmp/qrtr.sock".to_string()));
    }

    #[test]
    fn bind_flag_leaves_unix_config_for_tcp() {
        let mut base = Config::default();
        base.endpoint = Endpoint::Unix("/tmp/old.sock".to_string());
        let cli = Cli::parse_from(["qrtr-daemon", "--bind", "0.0.0.0"]);
        let config = apply_overrides(base, &cli);
        assert_eq!(config.endpoint, tcp("0.0.0.0", DEFAULT_SERVER_PORT));
    }

    #[test]
    fn idle_clients_do_not_starve_later_ones() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.sock");
        let path = path.to_str().unwrap().to_string();

        let mut listener = UnixSocketListener::new(&path, SocketOptions::default());
        listener.bind().unwrap();
        let (events, rx) = unbounded();
        let registry = Arc::new(daemon_registry());
        thread::spawn(move || accept_loop(listener, registry, events));

        let options = SocketOptions {
            read_timeout: Some(Duration::from_secs(5)),
            ..SocketOptions::default()
        };
        // Never sends anything, so its session never ends
        let _idle: Vec<_> = (0..4)
            .map(|_| Connection::connect_unix(&path, options.clone()).unwrap())
            .collect();

        let connection = Connection::connect_unix(&path, options).unwrap();
        let mut session = Session::new(connection, 9);
        let response = session.call(3, b"ping").unwrap();
        assert_eq!(response.payload, b"received 4 bytes");

        let echoed = session.call(ECHO_SERVICE, b"hello").unwrap();
        assert_eq!(echoed.payload, b"hello");
        session.close();

        let opened = rx
            .iter()
            .filter(|e| matches!(e, SessionEvent::Opened { .. }))
            .take(5)
            .count();
        assert_eq!(opened, 5);
    }
}
