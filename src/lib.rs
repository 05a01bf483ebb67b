pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod fs_util;
pub mod loader;
pub mod matcher;
pub mod output;
pub mod report;
pub mod store;
pub mod table;
pub mod wait;
