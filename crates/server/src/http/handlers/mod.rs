pub mod accounts;
pub mod articles;
pub mod comments;
pub mod dashboard;
pub mod index;
pub mod media;
pub mod profile;
pub mod tags;
