pub mod add;
pub mod backup;
pub mod config;
pub mod db;
pub mod del;
pub mod init;
pub mod list;
pub mod reset;
pub mod revert;
pub mod submit;
