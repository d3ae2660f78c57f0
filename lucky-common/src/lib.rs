//! # Lucky Common Library
//!
//! Shared code for the lucky-number services including:
//! - Common error type
//! - Bootstrap configuration loading and root folder resolution
//! - SQLite pool initialization
//! - Timestamp utilities

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
