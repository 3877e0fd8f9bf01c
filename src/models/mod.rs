pub mod common;
pub mod session;
pub mod slot;
