use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::DomainError;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("{0}")]
    BadRequest(String),

    #[error("mail worker unavailable")]
    MailUnavailable,

    #[error("internal error: {0:#}")]
    Internal(anyhow::Error),
}

// 仓储层的领域错误包在 anyhow 里，这里还原
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<DomainError>() {
            Ok(domain) => AppError::Domain(domain),
            Err(other) => AppError::Internal(other),
        }
    }
}

impl AppError {
    fn status_and_msg(&self) -> (StatusCode, Value) {
        match self {
            AppError::Domain(DomainError::NotFound(what)) => {
                (StatusCode::NOT_FOUND, json!(format!("{} not found", what)))
            }
            AppError::Domain(DomainError::Validation { field, message }) => {
                let mut errors = serde_json::Map::new();
                errors.insert(field.to_string(), json!([message]));
                (StatusCode::BAD_REQUEST, Value::Object(errors))
            }
            AppError::Domain(DomainError::Unauthenticated) => {
                (StatusCode::UNAUTHORIZED, json!("login required"))
            }
            AppError::Domain(DomainError::Forbidden(reason)) => {
                (StatusCode::FORBIDDEN, json!(reason))
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!(msg)),
            AppError::MailUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, json!("mail delivery failed"))
            }
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!("internal server error"),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(e) = &self {
            error!("Request failed: {:?}", e);
        }
        let (status, msg) = self.status_and_msg();
        (status, Json(json!({ "code": status.as_u16(), "msg": msg }))).into_response()
    }
}

/// `{"code":200,"msg":...}` 成功响应
pub fn ok_msg(msg: &str) -> Json<Value> {
    Json(json!({ "code": 200, "msg": msg }))
}

pub fn ok_data<T: serde::Serialize>(msg: &str, data: T) -> Json<Value> {
    Json(json!({ "code": 200, "msg": msg, "data": data }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_survives_anyhow() {
        let wrapped: anyhow::Error = DomainError::NotFound("parent comment").into();
        let app: AppError = wrapped.into();
        assert!(matches!(
            app,
            AppError::Domain(DomainError::NotFound("parent comment"))
        ));

        let other: AppError = anyhow::anyhow!("disk on fire").into();
        assert!(matches!(other, AppError::Internal(_)));
    }

    #[test]
    fn test_validation_shape() {
        let err = AppError::from(DomainError::validation("title", "title is required"));
        let (status, msg) = err.status_and_msg();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(msg, json!({ "title": ["title is required"] }));
    }
}
