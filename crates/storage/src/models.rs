use chrono::NaiveDateTime;
use domain::{access::AuthUser, Article, ArticleStatus, Comment, Tag, TagName, TagWithCount, User};
use sqlx::FromRow;

#[derive(FromRow)]
pub struct SqlComment {
    pub id: i64,
    pub article_id: i64,
    pub user_id: i64,
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub author_is_guest: bool,
    pub content: String,
    pub parent_id: Option<i64>,
    pub root_id: Option<i64>,
    pub depth: i64,
    // Join 字段 (被回复评论的作者)
    pub reply_to_name: Option<String>,
    pub create_time: NaiveDateTime,
}

impl From<SqlComment> for Comment {
    fn from(sql: SqlComment) -> Self {
        Comment {
            id: sql.id,
            article_id: sql.article_id,
            user_id: sql.user_id,
            author_name: sql.author_name,
            author_avatar: sql.author_avatar,
            is_guest: sql.author_is_guest,
            content: sql.content,
            parent_id: sql.parent_id,
            root_id: sql.root_id,
            depth: u32::try_from(sql.depth).unwrap_or(0),
            reply_to_name: sql.reply_to_name,
            create_time: sql.create_time,
        }
    }
}

#[derive(FromRow)]
pub struct SqlArticle {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub status: i64,
    pub is_delete: bool,
    pub is_top: bool,
    pub read_count: i64,
    pub comment_count: i64,
    pub user_id: i64,
    pub author_name: String,
    pub create_time: NaiveDateTime,
    pub update_time: NaiveDateTime,
}

impl SqlArticle {
    pub fn into_article(self, tags: Vec<Tag>) -> Article {
        Article {
            id: self.id,
            title: self.title,
            content: self.content,
            status: ArticleStatus::from_code(self.status),
            is_delete: self.is_delete,
            is_top: self.is_top,
            read_count: self.read_count,
            comment_count: self.comment_count,
            user_id: self.user_id,
            author_name: self.author_name,
            tags,
            create_time: self.create_time,
            update_time: self.update_time,
        }
    }
}

#[derive(FromRow)]
pub struct SqlTag {
    pub id: i64,
    pub name: String,
}

impl From<SqlTag> for Tag {
    fn from(sql: SqlTag) -> Self {
        Tag {
            id: sql.id,
            name: TagName::new_unchecked(sql.name),
        }
    }
}

#[derive(FromRow)]
pub struct SqlArticleTag {
    pub article_id: i64,
    pub id: i64,
    pub name: String,
}

#[derive(FromRow)]
pub struct SqlTagWithCount {
    pub id: i64,
    pub name: String,
    pub article_total: i64,
}

impl From<SqlTagWithCount> for TagWithCount {
    fn from(sql: SqlTagWithCount) -> Self {
        TagWithCount {
            id: sql.id,
            name: TagName::new_unchecked(sql.name),
            article_total: sql.article_total,
        }
    }
}

#[derive(FromRow)]
pub struct SqlUser {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub avatar: String,
    pub is_guest: bool,
    pub is_superuser: bool,
    pub date_joined: NaiveDateTime,
}

impl From<SqlUser> for User {
    fn from(sql: SqlUser) -> Self {
        User {
            id: sql.id,
            username: sql.username,
            email: sql.email,
            first_name: sql.first_name,
            avatar: sql.avatar,
            is_guest: sql.is_guest,
            is_superuser: sql.is_superuser,
            date_joined: sql.date_joined,
        }
    }
}

#[derive(FromRow)]
pub struct SqlSession {
    pub id: String,
    pub data: String,
    pub expires_at: NaiveDateTime,
    // Join 字段 (来自 users 表，匿名会话为 NULL)
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub is_superuser: Option<bool>,
}

impl SqlSession {
    pub fn auth_user(&self) -> Option<AuthUser> {
        match (self.user_id, &self.username) {
            (Some(id), Some(username)) => Some(AuthUser {
                id,
                username: username.clone(),
                is_superuser: self.is_superuser.unwrap_or(false),
            }),
            _ => None,
        }
    }
}

#[derive(FromRow)]
pub struct SqlNotification {
    #[sqlx(flatten)]
    pub comment: SqlComment,
    pub article_title: String,
    pub article_owner_id: i64,
}
