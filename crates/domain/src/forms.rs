use serde::Deserialize;

use crate::error::DomainError;

pub const GUEST_NAME_MAX_CHARS: usize = 20;
pub const AVATAR_MAX_BYTES: usize = 5 * 1024 * 1024;
pub const ARTICLE_IMAGE_MAX_BYTES: usize = 10 * 1024 * 1024;
const IMAGE_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".png", ".gif", ".webp"];

fn check_len(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), DomainError> {
    let len = value.chars().count();
    if len == 0 {
        return Err(DomainError::validation(field, "this field is required"));
    }
    if len < min {
        return Err(DomainError::validation(
            field,
            format!("must be at least {} characters", min),
        ));
    }
    if len > max {
        return Err(DomainError::validation(
            field,
            format!("must be at most {} characters", max),
        ));
    }
    Ok(())
}

pub fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub captcha: String,
    pub password: String,
    pub re_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub captcha: String,
    pub password: String,
}

impl RegisterForm {
    /// 只做格式校验；用户名/邮箱唯一性和验证码匹配需要查库
    pub fn validate(&self) -> Result<Registration, DomainError> {
        let username = self.username.trim();
        check_len("username", username, 2, 20)?;

        let email = self.email.trim();
        if email.is_empty() {
            return Err(DomainError::validation("email", "this field is required"));
        }
        if !is_valid_email(email) {
            return Err(DomainError::validation("email", "enter a valid email address"));
        }

        let captcha = self.captcha.trim();
        check_len("captcha", captcha, 4, 4)?;

        let password = self.password.trim();
        check_len("password", password, 6, 20)?;
        let re_password = self.re_password.trim();
        check_len("re_password", re_password, 6, 20)?;
        if password != re_password {
            return Err(DomainError::validation("re_password", "passwords do not match"));
        }

        Ok(Registration {
            username: username.to_string(),
            email: email.to_string(),
            captcha: captcha.to_string(),
            password: password.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username_or_email: String,
    pub password: String,
    pub remember: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username_or_email: String,
    pub password: String,
    pub remember: bool,
}

impl LoginForm {
    pub fn validate(&self) -> Result<Credentials, DomainError> {
        let username_or_email = self.username_or_email.trim();
        check_len("username_or_email", username_or_email, 2, 254)?;
        let password = self.password.trim();
        check_len("password", password, 6, 20)?;

        Ok(Credentials {
            username_or_email: username_or_email.to_string(),
            password: password.to_string(),
            remember: self
                .remember
                .as_deref()
                .is_some_and(|v| !v.is_empty() && v != "false" && v != "0"),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArticleForm {
    pub title: String,
    pub content: String,
    pub tags: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleDraft {
    pub title: String,
    pub content: String,
    pub tag_ids: Vec<i64>,
}

impl ArticleForm {
    /// 标签是否存在由存储层确认
    pub fn validate(&self) -> Result<ArticleDraft, DomainError> {
        let title = self.title.trim();
        check_len("title", title, 1, 32)?;
        let content = self.content.trim();
        check_len("content", content, 1, 1024)?;

        let mut tag_ids = self.tags.clone();
        tag_ids.sort_unstable();
        tag_ids.dedup();
        if tag_ids.is_empty() {
            return Err(DomainError::validation("tags", "select at least one tag"));
        }

        Ok(ArticleDraft {
            title: title.to_string(),
            content: content.to_string(),
            tag_ids,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub content: String,
    pub parent_id: Option<String>,
    pub guest_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentDraft {
    pub content: String,
    pub parent_id: Option<i64>,
    /// 匿名调用时必有值
    pub guest_name: Option<String>,
}

impl CommentForm {
    pub fn validate(&self, authenticated: bool) -> Result<CommentDraft, DomainError> {
        let content = self.content.trim();
        if content.is_empty() {
            return Err(DomainError::validation("content", "comment cannot be empty"));
        }

        let guest_name = if authenticated {
            None
        } else {
            let name = self.guest_name.as_deref().unwrap_or("").trim();
            if name.is_empty() {
                return Err(DomainError::validation(
                    "guest_name",
                    "guests must provide a nickname",
                ));
            }
            if name.chars().count() > GUEST_NAME_MAX_CHARS {
                return Err(DomainError::validation(
                    "guest_name",
                    format!("nickname cannot exceed {} characters", GUEST_NAME_MAX_CHARS),
                ));
            }
            Some(name.to_string())
        };

        let parent_id = match self.parent_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<i64>()
                    .map_err(|_| DomainError::NotFound("parent comment"))?,
            ),
        };

        Ok(CommentDraft {
            content: content.to_string(),
            parent_id,
            guest_name,
        })
    }
}

/// 返回小写扩展名 (含点)
pub fn validate_image_upload(
    field: &'static str,
    file_name: &str,
    size: usize,
    max_bytes: usize,
) -> Result<String, DomainError> {
    let ext = file_name
        .rfind('.')
        .map(|i| file_name[i..].to_lowercase())
        .unwrap_or_default();
    if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(DomainError::validation(
            field,
            "only jpg/jpeg/png/gif/webp images are allowed",
        ));
    }
    if size > max_bytes {
        return Err(DomainError::validation(
            field,
            format!("image cannot exceed {} MB", max_bytes / (1024 * 1024)),
        ));
    }
    Ok(ext)
}
