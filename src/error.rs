// HTTP error surface: component errors map to a status code here and
// nowhere else. 4xx responses never carry internal detail; 5xx detail is
// confined to the log sink.
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use crate::db::MapperError;
use crate::files::FileError;
use crate::sandbox::PathError;
use crate::session::AuthError;

#[derive(Debug)]
pub enum ApiError {
    // 400: malformed query/body fields, sandbox violations
    BadRequest(String),

    // 401: missing, malformed, forged, wrong-algorithm or expired token
    Unauthorized(String),

    // 403: authenticated but insufficient privilege
    Forbidden(String),

    // 404: zero or unexpected-cardinality result
    NotFound(String),

    // 409: move/rename destination already occupied
    Conflict(String),

    // 500: storage or internal failure, detail logged only
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Internal(msg) => msg,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "error": true,
            "message": self.message(),
        })
    }
}

impl From<MapperError> for ApiError {
    fn from(err: MapperError) -> Self {
        match err {
            MapperError::NotFound(msg) => ApiError::NotFound(msg),
            other => {
                tracing::error!("database access failed: {}", other);
                ApiError::Internal("an error occurred while processing your request".to_string())
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingKey | AuthError::Signing(_) | AuthError::Hashing(_) => {
                tracing::error!("session service failure: {}", err);
                ApiError::Internal("an error occurred while processing your request".to_string())
            }
            AuthError::BadCredentials => ApiError::Unauthorized(err.to_string()),
            AuthError::Invalid | AuthError::Expired | AuthError::WrongAlgorithm => {
                ApiError::Unauthorized("invalid or expired session".to_string())
            }
        }
    }
}

impl From<PathError> for ApiError {
    fn from(err: PathError) -> Self {
        tracing::warn!("sandbox violation: {}", err);
        ApiError::BadRequest("invalid path".to_string())
    }
}

impl From<FileError> for ApiError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::Path(path_err) => path_err.into(),
            FileError::Io(io_err) if io_err.kind() == std::io::ErrorKind::AlreadyExists => {
                ApiError::Conflict("destination already exists".to_string())
            }
            FileError::Io(io_err) => {
                tracing::warn!("file operation failed: {}", io_err);
                ApiError::BadRequest("file operation failed".to_string())
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_are_unauthorized_without_detail() {
        let err: ApiError = AuthError::WrongAlgorithm.into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert!(!err.message().contains("algorithm"));
    }

    #[test]
    fn sandbox_violations_are_client_faults() {
        let err: ApiError = PathError::NoHome.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn database_failures_leak_nothing() {
        let err: ApiError = MapperError::InvalidColumn("uid; DROP TABLE users".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message().contains("DROP"));
    }

    #[test]
    fn occupied_move_destinations_are_conflicts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AlreadyExists, "occupied");
        let err: ApiError = FileError::Io(io_err).into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let other = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ApiError = FileError::Io(other).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn cardinality_misses_are_not_found() {
        let err: ApiError = MapperError::NotFound("no such post".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
