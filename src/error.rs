//! Error types for the chronos engine.

/// Top-level error type for the alarm and reminder engine.
#[derive(Debug, thiserror::Error)]
pub enum ChronosError {
    /// Durable store read/write error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Audio device, stream, or player error.
    #[error("audio error: {0}")]
    Audio(String),

    /// Desktop notification error.
    #[error("notification error: {0}")]
    Notify(String),

    /// Sound catalog error (custom sound registry, sound files).
    #[error("sound catalog error: {0}")]
    Catalog(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Scheduler lifecycle error.
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ChronosError>;
