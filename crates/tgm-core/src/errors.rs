/// Core error type for the monitor.
///
/// Adapter crates map their specific errors (Telegram requests, SQLite) into this
/// type so the pipeline can tell transport faults from registry faults when it
/// decides whether a failure is isolated or propagated.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("registry error: {0}")]
    Registry(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
