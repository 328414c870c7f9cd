pub mod common;
pub mod config;
pub mod delete;
pub mod export;
pub mod import;
pub mod list;
pub mod scan;
pub mod search;
pub mod verify;
