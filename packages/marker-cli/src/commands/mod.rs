pub mod discover;
pub mod info;
pub mod watch;
