use tracing::Level;

/// Install the fmt subscriber for binaries. A second call is a no-op.
pub fn init_logging(level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_names(true)
        .try_init();
}
