pub(crate) mod articles;
mod captchas;
mod comments;
pub(crate) mod sessions;
mod tags;
mod users;
mod visits;
