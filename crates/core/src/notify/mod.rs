pub mod entity;
pub mod error;
pub mod format;
pub mod port;
