use thiserror::Error;

#[derive(Debug, Error)]
pub enum StewardError {
    // --- configuration / validation: never retried ---
    #[error("missing assert name")]
    MissingAssertName,

    #[error("assert '{0}': missing target state")]
    MissingTargetState(String),

    #[error("assert '{0}': more than one check kind set")]
    AmbiguousAssert(String),

    #[error("assert '{0}': {1}")]
    InvalidAssert(String, String),

    #[error("label operation: missing apply labels")]
    MissingApplyLabels,

    #[error("step '{0}': no action set")]
    EmptyStep(String),

    #[error("step '{0}': more than one action set")]
    AmbiguousStep(String),

    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    // --- store errors: the variant carries the retryability class ---
    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    // --- retry exhaustion ---
    #[error("timed out waiting for {label}")]
    Timeout { label: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl StewardError {
    /// Whether an attempt that hit this error may be re-run under the owning
    /// retry policy. Permanent-vs-transient classification is the store's
    /// responsibility, expressed through the variant it returns.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StewardError::Conflict(_) | StewardError::Unavailable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StewardError>;
