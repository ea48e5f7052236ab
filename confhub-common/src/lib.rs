//! # confhub common library
//!
//! Shared code for the confhub services:
//! - Error taxonomy used from the store up to the HTTP layer
//! - Entity schemas (users, conferences, papers)
//! - Reviewer decision model
//! - Configuration resolution
//! - Document store adapter over SQLite

pub mod config;
pub mod db;
pub mod decision;
pub mod error;
pub mod models;
pub mod time;

pub use decision::{Decision, StatusTally};
pub use error::{Error, Result};
pub use models::{Conference, Paper, Role, User};
