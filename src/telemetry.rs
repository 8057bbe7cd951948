use tracing_subscriber::EnvFilter;

/// Installs the global subscriber: `RUST_LOG` or `info`, compact lines on
/// stderr so stdout stays free for CSV output.
pub fn setup_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
