use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber: stderr output filtered by `RUST_LOG`
/// (default `warn`), plus an ANSI-free copy in `<data_dir>/logs/redeem.log`
/// when the data directory exists and the file can be opened.
pub fn init(data_dir: &Path) {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let log_file = data_dir
        .is_dir()
        .then(|| {
            let dir = data_dir.join("logs");
            std::fs::create_dir_all(&dir)?;
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("redeem.log"))
        })
        .and_then(|opened| opened.ok());

    let stderr = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter());
    let file = log_file.map(|f| {
        tracing_subscriber::fmt::layer()
            .with_writer(Arc::new(f))
            .with_ansi(false)
            .with_filter(filter())
    });

    // A second init (e.g. in tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry().with(stderr).with(file).try_init();
}
