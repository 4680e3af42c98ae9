use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("State file {path} is unreadable: {message}")]
    StateCorrupt { path: String, message: String },

    #[error("Fetch error for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Classification error for {url}: {message}")]
    Classify { url: String, message: String },

    #[error("Notification error: {0}")]
    Notify(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Fatal errors abort the whole run; the rest are scoped to a single target.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            AppError::Fetch { .. } | AppError::Classify { .. } | AppError::Notify(_)
        )
    }

    /// Process exit code reported when this error ends a run.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Settings(_) | AppError::Config(_) => 2,
            AppError::StateCorrupt { .. } => 3,
            _ => 1,
        }
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
