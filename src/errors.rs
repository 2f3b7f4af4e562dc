/// Ripple Error Types
#[derive(Debug, thiserror::Error)]
pub enum RippleError {
    /// A requested stack or block does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The jj subprocess failed or was unreachable
    #[error("jj failed ({context}): {stderr}")]
    ExternalTool { context: String, stderr: String },

    /// The embedded database rejected a read or write
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Stored state contradicts the stack invariants (duplicate or missing index)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RippleError {
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        RippleError::NotFound(msg.into())
    }

    pub fn external_tool<S: Into<String>>(context: S, stderr: S) -> Self {
        RippleError::ExternalTool {
            context: context.into(),
            stderr: stderr.into(),
        }
    }

    pub fn invariant<S: Into<String>>(msg: S) -> Self {
        RippleError::InvariantViolation(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        RippleError::Config(msg.into())
    }

    pub fn not_initialized<S: Into<String>>(msg: S) -> Self {
        RippleError::config(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, RippleError>;
