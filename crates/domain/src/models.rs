use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

pub const TAG_NAME_MAX_CHARS: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagName(String);

impl TagName {
    pub fn new(s: impl Into<String>) -> Result<Self, DomainError> {
        let s = s.into().trim().to_string();
        if s.is_empty() {
            return Err(DomainError::validation("name", "tag name cannot be empty"));
        }
        if s.chars().count() > TAG_NAME_MAX_CHARS {
            return Err(DomainError::validation(
                "name",
                format!("tag name cannot exceed {} characters", TAG_NAME_MAX_CHARS),
            ));
        }
        Ok(Self(s))
    }

    pub fn new_unchecked(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Draft,
    Published,
}

impl ArticleStatus {
    pub fn from_code(code: i64) -> Self {
        if code == 1 {
            ArticleStatus::Published
        } else {
            ArticleStatus::Draft
        }
    }

    pub fn code(self) -> i64 {
        match self {
            ArticleStatus::Draft => 0,
            ArticleStatus::Published => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: TagName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagWithCount {
    pub id: i64,
    pub name: TagName,
    pub article_total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub avatar: String,
    pub is_guest: bool,
    pub is_superuser: bool,
    pub date_joined: NaiveDateTime,
}

impl User {
    pub fn display_name(&self) -> &str {
        match self.first_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.username,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub status: ArticleStatus,
    pub is_delete: bool,
    pub is_top: bool,
    pub read_count: i64,
    pub comment_count: i64,
    pub user_id: i64,
    pub author_name: String,
    pub tags: Vec<Tag>,
    pub create_time: NaiveDateTime,
    pub update_time: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub article_id: i64,
    pub user_id: i64,
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub is_guest: bool,
    pub content: String,
    pub parent_id: Option<i64>,
    pub root_id: Option<i64>,
    pub depth: u32,
    // 被回复者的显示名 (仅回复有值)
    pub reply_to_name: Option<String>,
    pub create_time: NaiveDateTime,
}

impl Comment {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none() && self.depth == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ArticleComment,
    CommentReply,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub article_id: i64,
    pub article_title: String,
    pub comment: Comment,
}

