//! watch-duty-crawler - a polite single-site crawler with text search
//!
//! This crate provides:
//! - A depth-first crawler that honors robots.txt, nofollow and noindex
//! - Reader-mode text extraction from rendered pages
//! - SQLite storage for registered sites and crawled pages
//! - CLI commands for registering, crawling and searching sites

pub mod commands;
pub mod config;
pub mod crawl;
pub mod error;
pub mod meta;
pub mod models;
pub mod parse;

pub use config::Config;
pub use error::{Error, Result};
