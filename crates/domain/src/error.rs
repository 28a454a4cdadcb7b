use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// 资源不存在，或不满足可见性/归属条件 (已删除、未发布、非作者)
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("login required")]
    Unauthenticated,

    #[error("permission denied: {0}")]
    Forbidden(&'static str),
}

impl DomainError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        DomainError::Validation {
            field,
            message: message.into(),
        }
    }
}
