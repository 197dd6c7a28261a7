use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use crate::{auth::jwt::AuthError, db::DbError, response::Envelope};

pub type ApiResult<T> = Result<T, ApiError>;

/// Errors a handler can answer with. Each maps to one status code and is
/// rendered as the failure envelope.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    Conflict(String),

    /// Retryable: the pool had no free connection in time.
    #[error("{0}")]
    ServiceUnavailable(String),

    /// Message is what the client sees; details are logged where the error is built.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(Envelope::error(self.to_string()))).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("not found".into()),
            sqlx::Error::PoolTimedOut => {
                warn!("database pool exhausted");
                ApiError::ServiceUnavailable("database busy, retry later".into())
            }
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                ApiError::Conflict("already exists".into())
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                ApiError::BadRequest("referenced record does not exist".into())
            }
            other => {
                error!(error = %other, "database error");
                ApiError::Internal("db error".into())
            }
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Database(e) => e.into(),
            DbError::Configuration(_) | DbError::Schema(_) => {
                error!(error = %err, "database unavailable");
                ApiError::Internal("db error".into())
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredential => ApiError::Unauthorized(err.to_string()),
            AuthError::InvalidToken(_) => ApiError::Unauthorized("invalid or expired token".into()),
            AuthError::Configuration(_) | AuthError::Signing(_) => {
                error!(error = %err, "token service unavailable");
                ApiError::Internal("token error".into())
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        error!(error = %err, "internal error");
        ApiError::Internal("internal error".into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("invalid json: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound("no such endpoint".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    async fn body_json(err: ApiError) -> (StatusCode, Value) {
        let res = err.into_response();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn renders_failure_envelope() {
        let (status, body) = body_json(ApiError::Conflict("email already registered".into())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["ok"], false);
        assert_eq!(body["error"], "email already registered");
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn auth_errors_map_to_401_or_500() {
        let (status, _) = body_json(AuthError::MissingCredential.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = body_json(AuthError::Configuration("JWT_SECRET is not set").into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "token error");
    }

    #[tokio::test]
    async fn db_errors_map_by_kind() {
        assert_eq!(ApiError::from(sqlx::Error::RowNotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(sqlx::Error::PoolTimedOut).status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            ApiError::from(DbError::Configuration("no url".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let (_, body) = body_json(DbError::Schema("pooled: x; direct: y".into()).into()).await;
        assert_eq!(body["error"], "db error");
    }
}
