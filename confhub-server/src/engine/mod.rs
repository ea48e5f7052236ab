//! Engines behind the HTTP handlers
//!
//! Handlers authenticate and parse; everything that reads or writes the
//! store goes through these modules.

pub mod assignment;
pub mod conferences;
pub mod dashboard;
pub mod papers;
pub mod profiles;
