use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use scriptbox_core::error::CoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `scriptbox_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The request body or query string could not be extracted.
    ///
    /// Keeps the status axum chose (400, 413, 415 or 422).
    #[error("Bad request: {message}")]
    BadRequest { status: StatusCode, message: String },
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// HTTP status, machine-readable code and client-facing message.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Core(core) => {
                let status = match core {
                    CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                    CoreError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                    CoreError::Compile(_)
                    | CoreError::Runtime(_)
                    | CoreError::Serialization(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    CoreError::InvalidEnvironmentValue(_) | CoreError::Validation(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    CoreError::Internal(msg) => {
                        tracing::error!(error = %msg, "Internal core error");
                        return (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            "INTERNAL_ERROR",
                            "An internal error occurred".to_string(),
                        );
                    }
                };
                (status, core.code(), core.to_string())
            }
            AppError::BadRequest { status, message } => {
                let code = match *status {
                    StatusCode::PAYLOAD_TOO_LARGE => "PAYLOAD_TOO_LARGE",
                    StatusCode::UNSUPPORTED_MEDIA_TYPE => "UNSUPPORTED_MEDIA_TYPE",
                    _ => "BAD_REQUEST",
                };
                (*status, code, message.clone())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_failures_are_unprocessable() {
        for err in [
            CoreError::Compile("SyntaxError".into()),
            CoreError::Runtime("Error: boom".into()),
            CoreError::Serialization("function".into()),
        ] {
            let (status, _, message) = AppError::from(err).parts();
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
            assert!(!message.is_empty());
        }
    }

    #[test]
    fn not_found_keeps_the_reference() {
        let err = AppError::from(CoreError::NotFound {
            reference: "id 'abc'".into(),
        });
        let (status, code, message) = err.parts();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, "NOT_FOUND");
        assert!(message.contains("id 'abc'"));
    }

    #[test]
    fn store_outage_is_service_unavailable() {
        let (status, code, _) = AppError::from(CoreError::StoreUnavailable("down".into())).parts();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(code, "STORE_UNAVAILABLE");
    }

    #[test]
    fn internal_messages_are_sanitized() {
        let (status, code, message) =
            AppError::from(CoreError::Internal("worker thread gone".into())).parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "INTERNAL_ERROR");
        assert!(!message.contains("worker"));
    }

    #[test]
    fn rejections_keep_their_status() {
        let err = AppError::BadRequest {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: "length limit exceeded".into(),
        };
        let (status, code, message) = err.parts();
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(code, "PAYLOAD_TOO_LARGE");
        assert_eq!(message, "length limit exceeded");

        let err = AppError::BadRequest {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "missing field `script`".into(),
        };
        assert_eq!(err.parts().1, "BAD_REQUEST");
    }
}
