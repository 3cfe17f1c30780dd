use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use verso_history::HistoryError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("store error: {0}")]
    Store(#[from] verso_store::StoreError),

    #[error("ledger error: {0}")]
    Ledger(#[from] verso_ledger::LedgerError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl ServerError {
    fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            Self::History(e) => match e {
                HistoryError::Authorization(_) => (StatusCode::FORBIDDEN, "forbidden"),
                HistoryError::VersionNotFound(_) | HistoryError::SiteNotFound(_) => {
                    (StatusCode::NOT_FOUND, "not_found")
                }
                HistoryError::SiteExists(_) | HistoryError::CurrentVersionProtected(_) => {
                    (StatusCode::CONFLICT, "conflict")
                }
                HistoryError::Storage(_) => (StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable"),
                HistoryError::DuplicateVersion(_) | HistoryError::Journal(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
                }
            },
            Self::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            Self::Store(_) => (StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable"),
            Self::Ledger(_) | Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::History(e) => e.is_retryable(),
            Self::Store(_) => true,
            _ => false,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error) = self.classify();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "an unexpected error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error,
            message,
            retryable: self.is_retryable(),
        };
        (status, Json(body)).into_response()
    }
}
