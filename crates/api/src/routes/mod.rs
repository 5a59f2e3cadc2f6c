pub mod signal;
pub mod system;
pub mod webhook;
