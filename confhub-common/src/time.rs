//! Timestamp and id utilities
//!
//! Document timestamps are fixed-width RFC 3339 strings so that plain string
//! comparison orders them.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Render a timestamp in the stored document format
/// (`2026-10-16T09:30:00.000Z`)
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time in the stored document format
pub fn now_timestamp() -> String {
    format_timestamp(now())
}

/// Generate a new document id (UUIDv4)
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
