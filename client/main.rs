// qrtr-send: send requests/notifications to a QRTR server, or listen for messages
use clap::{Args, Parser, Subcommand};
use qrtr::{init_logging, Config, Endpoint, Session, SessionError, Transport};
use qrtr_client::{format_message_text, parse_payload};
use std::fmt;
use std::process;
use std::thread;
use std::time::Duration;
use tracing::Level;

#[derive(Parser)]
#[command(name = "qrtr-send")]
#[command(about = "Send QRTR messages and print what comes back", long_about = None)]
#[command(version = "0.1.0")]
struct Cli {
    /// Server host or IP (default: QRTR_SERVER_ADDR or 127.0.0.1)
    #[arg(short = 'H', long, global = true)]
    host: Option<String>,

    /// Server port (default: QRTR_SERVER_PORT or 5005)
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Connect to a Unix socket path instead of TCP
    #[arg(short, long, value_name = "PATH", global = true)]
    unix: Option<String>,

    /// Client identifier carried on every frame (default: QRTR_CLIENT_ID or pid)
    #[arg(short = 'i', long, global = true)]
    client_id: Option<u32>,

    /// Log every frame
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PayloadArgs {
    /// Target service id
    #[arg(short, long)]
    service: u32,

    /// Interpret PAYLOAD as hex digits
    #[arg(short = 'x', long)]
    hex: bool,

    /// Message payload (at most 1024 bytes)
    #[arg(value_name = "PAYLOAD", default_value = "")]
    payload: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Send requests one at a time and print each response
    Request {
        #[command(flatten)]
        payload: PayloadArgs,

        /// Number of requests to send
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u32,

        /// Milliseconds to wait between requests
        #[arg(short, long, default_value_t = 0)]
        delay: u64,
    },

    /// Send a single notification
    Notify {
        #[command(flatten)]
        payload: PayloadArgs,
    },

    /// Print every incoming message until the server closes
    Listen,
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

    // Reject a bad payload before touching the network
    let payload = match command_payload(&cli.command) {
        Ok(bytes) => bytes,
        Err(msg) => fail("InvalidPayload", &msg),
    };

    let mut session = match Session::from_config(&config) {
        Ok(s) => s,
        Err(e) => fail(e.kind(), &e),
    };

    let result = match cli.command {
        Commands::Request { payload: ref args, count, delay } => run_requests(
            &mut session,
            args.service,
            &payload,
            count,
            Duration::from_millis(delay),
        ),
        Commands::Notify { payload: ref args } => run_notify(&mut session, args.service, &payload),
        Commands::Listen => run_listen(&mut session),
    };
    session.close();

    if let Err(e) = result {
        fail(e.kind(), &e);
    }
}

fn apply_overrides(mut config: Config, cli: &Cli) -> Config {
    if let Some(ref path) = cli.unix {
        config.endpoint = Endpoint::Unix(path.clone());
    } else if cli.host.is_some() || cli.port.is_some() {
        let (host, port) = match config.endpoint {
            Endpoint::Tcp { host, port } => (host, port),
            Endpoint::Unix(_) => (qrtr::DEFAULT_SERVER_ADDR.to_string(), qrtr::DEFAULT_SERVER_PORT),
        };
        config.endpoint = Endpoint::Tcp {
            host: cli.host.clone().unwrap_or(host),
            port: cli.port.unwrap_or(port),
        };
    }
    if let Some(id) = cli.client_id {
        config.client_id = id;
    }
    config
}

fn command_payload(command: &Commands) -> Result<Vec<u8>, String> {
    match command {
        Commands::Request { payload, .. } | Commands::Notify { payload } => {
            parse_payload(&payload.payload, payload.hex)
        }
        Commands::Listen => Ok(Vec::new()),
    }
}

fn run_requests<T: Transport>(
    session: &mut Session<T>,
    service: u32,
    payload: &[u8],
    count: u32,
    delay: Duration,
) -> Result<(), SessionError> {
    for n in 0..count {
        let response = session.call(service, payload)?;
        println!("{}", format_message_text(&response));
        if delay > Duration::ZERO && n + 1 < count {
            thread::sleep(delay);
        }
    }
    Ok(())
}

fn run_notify<T: Transport>(
    session: &mut Session<T>,
    service: u32,
    payload: &[u8],
) -> Result<(), SessionError> {
    session.send_notification(service, payload)?;
    println!("Notification sent: service={} len={}", service, payload.len());
    Ok(())
}

fn run_listen<T: Transport>(session: &mut Session<T>) -> Result<(), SessionError> {
    loop {
        match session.await_message() {
            Ok(msg) => println!("{}", format_message_text(&msg)),
            Err(e) if e.is_clean_close() => {
                println!("Connection closed");
                return Ok(());
            }
            // A bad frame does not desynchronise the stream
            Err(SessionError::Decode(e)) => eprintln!("warning: DecodeError: {}", e),
            Err(e) => return Err(e),
        }
    }
}

fn fail(kind: &str, message: &dyn fmt::Display) -> ! {
    eprintln!("error: {}: {}", kind, message);
    process::exit(1);
}
