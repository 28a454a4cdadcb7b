mod compose;
mod gateway;
mod logger;

pub use compose::compose;
pub use gateway::{HttpMailConfig, HttpMailDriver};
pub use logger::LogMailDriver;
