use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Common application error variants shared by extractors and fallbacks.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NotFound => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Build the JSON error envelope every DigiInsta endpoint answers with.
pub fn error_body(kind: &str, message: &str) -> serde_json::Value {
    serde_json::json!({
        "success": false,
        "kind": kind,
        "error": message,
    })
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // TraceLayer already records status for every request; only 500s need the cause.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = ?e, kind = "INTERNAL", "internal error");
        }
        let body = error_body(self.kind(), &self.to_string());
        (self.status(), axum::Json(body)).into_response()
    }
}

/// Router fallback for unknown paths.
pub async fn not_found() -> AppError {
    AppError::NotFound
}
