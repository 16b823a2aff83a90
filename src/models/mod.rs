pub mod credential;
pub mod entry;
pub mod session;
pub mod status;
