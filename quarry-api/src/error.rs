use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    Unauthorized,
    /// Error key echoed on the wire, e.g. "unknown_offer"
    NotFound(&'static str),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_key) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::NotFound(key) => (StatusCode::NOT_FOUND, key),
            AppError::Anyhow(err) => {
                let correlation_id = uuid::Uuid::new_v4();
                tracing::error!("internal error [{}]: {:#}", correlation_id, err);
                (StatusCode::INTERNAL_SERVER_ERROR, "server_error")
            }
        };

        let body = Json(json!({ "error": error_key }));
        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Anyhow(err.into())
    }
}
