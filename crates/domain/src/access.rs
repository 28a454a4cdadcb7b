use serde::Serialize;

use crate::error::DomainError;

/// 当前登录用户 (来自会话)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub is_superuser: bool,
}

/// 发起请求的访问者
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewer {
    pub user: Option<AuthUser>,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self { user: None }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|u| u.id)
    }
}

pub fn require_login(viewer: &Viewer) -> Result<&AuthUser, DomainError> {
    viewer.user.as_ref().ok_or(DomainError::Unauthenticated)
}

/// 内容管理权限：目前仅超级管理员
pub fn require_site_owner(viewer: &Viewer) -> Result<&AuthUser, DomainError> {
    let user = require_login(viewer)?;
    if user.is_superuser {
        Ok(user)
    } else {
        Err(DomainError::Forbidden("site owner only"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer(is_superuser: bool) -> Viewer {
        Viewer {
            user: Some(AuthUser {
                id: 1,
                username: "ferris".into(),
                is_superuser,
            }),
        }
    }

    #[test]
    fn test_anonymous_is_rejected() {
        assert_eq!(
            require_login(&Viewer::anonymous()).unwrap_err(),
            DomainError::Unauthenticated
        );
        assert_eq!(
            require_site_owner(&Viewer::anonymous()).unwrap_err(),
            DomainError::Unauthenticated
        );
    }

    #[test]
    fn test_owner_check() {
        assert_eq!(require_site_owner(&viewer(true)).unwrap().id, 1);
        assert!(matches!(
            require_site_owner(&viewer(false)),
            Err(DomainError::Forbidden(_))
        ));
        assert!(require_login(&viewer(false)).is_ok());
    }
}
