//! Common test utilities
//!
//! This module is shared across all integration tests

pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::{TestEnvironment, ADMIN, REFERRER, SHEET_LINK, USER_WALLET};
