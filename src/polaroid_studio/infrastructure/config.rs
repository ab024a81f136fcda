use tracing_subscriber::EnvFilter;

/// Installs the fmt subscriber. `RUST_LOG` wins over `debug` when set.
pub fn setup_logging(debug: bool) {
    let default_directive = if debug {
        "debug"
    } else {
        "info,hyper=warn,reqwest=warn,rustls=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    if let Err(err) = tracing_subscriber::fmt().with_env_filter(filter).try_init() {
        eprintln!("Failed to initialize logger: {}", err);
    }
}
