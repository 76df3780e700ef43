use std::io::IsTerminal;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

/// `RUST_LOG` when set, `info` otherwise.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Formatted log output to `writer`. Records never go through here.
pub fn subscriber<W>(filter: EnvFilter, writer: W, ansi: bool) -> impl Subscriber + Send + Sync
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .finish()
}

/// Installs the process-wide subscriber on stderr, leaving stdout to the
/// json and csv record streams.
pub fn init() {
    let ansi = std::io::stderr().is_terminal();
    tracing::subscriber::set_global_default(subscriber(env_filter(), std::io::stderr, ansi))
        .unwrap_or_else(|e| eprintln!("Logging already initialised: {e}"));
}
