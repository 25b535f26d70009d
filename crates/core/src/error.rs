/// Domain errors surfaced by the script execution core.
///
/// Every variant is reported to the caller verbatim; none of them is retried
/// and none of them poisons the shared engine.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Script not found: {reference}")]
    NotFound { reference: String },

    #[error("Script store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Compile error: {0}")]
    Compile(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Invalid environment value: {0}")]
    InvalidEnvironmentValue(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Stable machine-readable tag for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Compile(_) => "COMPILE_ERROR",
            Self::Runtime(_) => "RUNTIME_ERROR",
            Self::InvalidEnvironmentValue(_) => "INVALID_ENVIRONMENT_VALUE",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
