use axum::response::{IntoResponse, Response};
use http::StatusCode;

#[derive(Debug)]
pub enum AppError {
    /// Status endpoint unreachable or malformed; retried next cycle.
    FetchFailed(String),
    /// Capture produced no usable output; the session is abandoned.
    CaptureFailed(String),
    /// Upload failed; the local file is kept.
    TransferFailed(String),
    ResourceNotFound(String),
    ResourceAlreadyExists(String),
    DatabaseError(String),
    InternalServerError(anyhow::Error),
}

impl AppError {
    pub fn fetch_failed<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::FetchFailed(t.to_string())
    }

    pub fn capture_failed<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::CaptureFailed(t.to_string())
    }

    pub fn transfer_failed<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::TransferFailed(t.to_string())
    }

    pub fn not_found<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::ResourceNotFound(t.to_string())
    }

    pub fn already_exists<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::ResourceAlreadyExists(t.to_string())
    }

    pub fn database<T>(t: T) -> Self
    where
        T: ToString,
    {
        AppError::DatabaseError(t.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::FetchFailed(err) => (StatusCode::BAD_GATEWAY, err).into_response(),
            AppError::CaptureFailed(err) => {
                (StatusCode::INTERNAL_SERVER_ERROR, err).into_response()
            }
            AppError::TransferFailed(err) => (StatusCode::BAD_GATEWAY, err).into_response(),
            AppError::ResourceNotFound(err) => (StatusCode::NOT_FOUND, err).into_response(),
            AppError::ResourceAlreadyExists(err) => (StatusCode::CONFLICT, err).into_response(),
            AppError::DatabaseError(err) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("database error: {err}"))
                    .into_response()
            }
            AppError::InternalServerError(err) => {
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
            }
        }
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        AppError::InternalServerError(err.into())
    }
}
