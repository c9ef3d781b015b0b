//! Forum backends.

pub mod reddit;

pub use reddit::RedditForum;
