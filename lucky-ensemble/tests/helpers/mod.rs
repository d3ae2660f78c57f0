//! Test Helper Utilities
//!
//! Shared utilities for testing lucky-ensemble

#![allow(dead_code)]

pub mod db_utils;
pub mod fixtures;

pub use db_utils::{create_test_manager, create_test_store};
pub use fixtures::{draw_date, seed_draws, seed_records, BrokenAdapter};
