pub mod access;
mod commands;
pub mod counter;
mod error;
pub mod forms;
pub mod identity;
mod models;
pub mod page;
pub mod stats;
pub mod threading;
pub mod tree;

pub use commands::AppCommand;
pub use error::DomainError;
pub use models::{
    Article, ArticleStatus, Comment, Notification, NotificationKind, Tag, TagName,
    TagWithCount, User,
};
pub use tree::{build_comment_tree, RootCommentGroup};
