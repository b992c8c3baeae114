use thiserror::Error;

/// Main error type for stream selection and caption synthesis
#[derive(Error, Debug)]
pub enum SelectError {
    /// The probe result is missing its stream list or a stream is unusable
    #[error("Malformed probe data: {0}")]
    MalformedProbeData(String),

    /// A rule entry could not be turned into a selection rule
    #[error("Invalid {kind} rule configuration: {value}")]
    InvalidRuleConfiguration { kind: String, value: String },

    /// A subtitle transcript could not be extracted
    #[error("Transcript extraction failed for stream {stream_index}: {reason}")]
    ExtractionFailure { stream_index: usize, reason: String },

    /// An OCR frame marker was not followed by its text line
    #[error("Malformed OCR frame at line {line}: {reason}")]
    MalformedOcrFrame { line: usize, reason: String },

    /// An external program exited unsuccessfully
    #[error("{program} failed ({status}): {stderr}")]
    ProcessFailed {
        program: String,
        status: String,
        stderr: String,
    },

    /// An external program produced more output than allowed
    #[error("{program} output exceeded {limit} bytes")]
    OutputLimitExceeded { program: String, limit: usize },

    /// An external program did not finish within its wait cap
    #[error("{program} did not finish within {secs}s")]
    ProcessTimeout { program: String, secs: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SelectError {
    /// Build an `InvalidRuleConfiguration` error
    pub fn invalid_rule(kind: impl Into<String>, value: impl Into<String>) -> Self {
        SelectError::InvalidRuleConfiguration {
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// Whether a failed external invocation is worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SelectError::ProcessFailed { .. } | SelectError::ProcessTimeout { .. } | SelectError::Io(_)
        )
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, SelectError>;
