pub mod client;
pub mod config;
pub mod crawl;
pub mod error;
pub mod extract;
pub mod output;
