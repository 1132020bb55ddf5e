#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Could not obtain an authorization URL, or configuration is invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Callback `state` does not match the pending login. Possible CSRF.
    #[error("OAuth state mismatch")]
    StateMismatch,

    #[error("Missing callback parameter: {0}")]
    MissingParameter(&'static str),

    /// The backend rejected or failed the code exchange.
    #[error(
        "Authentication failed{}: {detail}",
        .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
    )]
    Exchange { status: Option<u16>, detail: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Failures of the durable client-side storage.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
