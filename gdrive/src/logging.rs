use tracing_subscriber::EnvFilter;

/// Install the global subscriber: human readable events on stderr, filtered by
/// `RUST_LOG` (default `info`). Stdout is reserved for listings.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}
