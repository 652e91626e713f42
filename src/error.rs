//! Error handling for the vnstat HTTP exporter.

/// A specialized `Result` type for exporter operations.
pub type Result<T> = std::result::Result<T, ExporterError>;

/// The main error type for exporter operations.
#[derive(Debug, thiserror::Error)]
pub enum ExporterError {
    /// The accounting tool is missing or could not be spawned
    #[error("vnstat is not installed or not in PATH: {0}")]
    SourceUnavailable(String),

    /// The accounting tool ran but reported failure
    #[error("vnstat execution failed: {stderr}, exit status: {status}")]
    SourceExecutionFailed { status: String, stderr: String },

    /// The accounting tool produced output that is not valid JSON
    #[error("vnstat returned invalid JSON data: {0}")]
    MalformedOutput(String),

    /// Serializing or compressing a remote-write batch failed
    #[error("Failed to encode remote-write batch: {0}")]
    Encoding(String),

    /// The push request never produced a response
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote endpoint answered with a non-success status
    #[error("Push rejected (status: {status}, response: {body})")]
    PushRejected { status: u16, body: String },

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExporterError {
    /// Create a new source-unavailable error
    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    /// Create a new execution-failed error
    pub fn execution_failed(status: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::SourceExecutionFailed {
            status: status.into(),
            stderr: stderr.into(),
        }
    }

    /// Create a new malformed-output error
    pub fn malformed_output(msg: impl Into<String>) -> Self {
        Self::MalformedOutput(msg.into())
    }

    /// Create a new encoding error
    pub fn encoding_error(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Create a new transport error
    pub fn transport_error(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error came from the snapshot source rather than the push path.
    pub fn is_source_failure(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable(_) | Self::SourceExecutionFailed { .. } | Self::MalformedOutput(_)
        )
    }

    /// Whether this error is a push delivery failure.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::PushRejected { .. })
    }
}

impl From<reqwest::Error> for ExporterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transport(format!("request timed out: {}", err))
        } else if err.is_connect() {
            Self::Transport(format!("connection failed: {}", err))
        } else {
            Self::Transport(err.to_string())
        }
    }
}
