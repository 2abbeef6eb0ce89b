use serde::Serialize;

/// Failures a caller of the core has to distinguish.
///
/// Validation problems are data: they carry every itemized message so the caller can show
/// them verbatim. The other variants wrap lower-level failures that are not user-correctable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViewError {
    #[error("failed to load default dataset: {0}")]
    Load(String),

    #[error("{}", .0.join(" "))]
    Validation(Vec<String>),

    #[error("invalid JSON: {0}")]
    Parse(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl ViewError {
    pub fn code(&self) -> &'static str {
        match self {
            ViewError::Load(_) => "LOAD",
            ViewError::Validation(_) => "VALIDATION",
            ViewError::Parse(_) => "PARSE",
            ViewError::Storage(_) => "STORAGE",
        }
    }

    /// Itemized messages for validation failures, a single message otherwise.
    pub fn messages(&self) -> Vec<String> {
        match self {
            ViewError::Validation(errors) => errors.clone(),
            other => vec![other.to_string()],
        }
    }
}

/// Serializable error body for HTTP and CLI output.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub errors: Vec<String>,
}

impl From<&ViewError> for ErrorResponse {
    fn from(err: &ViewError) -> Self {
        ErrorResponse {
            code: err.code().to_string(),
            message: err.to_string(),
            errors: err.messages(),
        }
    }
}
