use thiserror::Error;

/// Failures surfaced by the pipeline stages. None of them is fatal to a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DashboardError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("nothing to aggregate: the filtered dataset has no records")]
    EmptyAggregation,

    #[error("render failed: {0}")]
    Render(String),

    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("failed to send email: {0}")]
    Dispatch(String),
}

impl DashboardError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Stable identifier for the error class, used in API notices.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedInput(_) => "malformed_input",
            Self::EmptyAggregation => "empty_aggregation",
            Self::Render(_) => "render",
            Self::Validation { .. } => "validation",
            Self::Dispatch(_) => "dispatch",
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
