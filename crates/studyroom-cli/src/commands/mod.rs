pub mod config;
pub mod goal;
pub mod session;
pub mod stats;
pub mod task;
pub mod timer;

use serde::Serialize;
use studyroom_core::storage::StoreBackend;
use studyroom_core::{Config, CoreError};
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Log to stderr so stdout stays machine-readable.
///
/// STUDYROOM_LOG takes precedence over `log.filter` in the config file.
pub fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_env("STUDYROOM_LOG")
        .or_else(|_| EnvFilter::try_new(&config.log.filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn open_store(config: &Config) -> Result<StoreBackend, CoreError> {
    StoreBackend::from_config(&config.store)
}

/// Commands run one at a time on a single thread.
pub fn runtime() -> std::io::Result<Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
