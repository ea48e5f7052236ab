//! Reviewer decision model
//!
//! Single source of truth for the three-state reviewer decision and for
//! reading decisions out of untrusted JSON. Everything here is pure.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A reviewer's verdict on a paper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    #[default]
    Pending,
    Accepted,
    Declined,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Pending => "pending",
            Decision::Accepted => "accepted",
            Decision::Declined => "declined",
        }
    }

    /// Strict parse, for request bodies where garbage must be rejected
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Decision::Pending),
            "accepted" => Some(Decision::Accepted),
            "declined" => Some(Decision::Declined),
            _ => None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read a decision out of an arbitrary JSON value, falling back to pending.
pub fn normalize_decision(value: &Value) -> Decision {
    value
        .as_str()
        .and_then(Decision::parse)
        .unwrap_or_default()
}

/// Copy a reviewer-status object, normalizing every value.
///
/// Non-object input yields an empty map.
pub fn extract_statuses(raw: &Value) -> BTreeMap<String, Decision> {
    match raw {
        Value::Object(map) => map
            .iter()
            .map(|(reviewer, value)| (reviewer.clone(), normalize_decision(value)))
            .collect(),
        _ => BTreeMap::new(),
    }
}

/// Fold a set of reviewer decisions into one paper-level decision.
///
/// Only unanimous agreement reads as final; empty input, any pending entry
/// or a mix of accepted and declined all fold to pending.
pub fn summarize<I>(statuses: I) -> Decision
where
    I: IntoIterator<Item = Decision>,
{
    let mut seen_accepted = false;
    let mut seen_declined = false;

    for status in statuses {
        match status {
            Decision::Pending => return Decision::Pending,
            Decision::Accepted => seen_accepted = true,
            Decision::Declined => seen_declined = true,
        }
    }

    match (seen_accepted, seen_declined) {
        (true, false) => Decision::Accepted,
        (false, true) => Decision::Declined,
        _ => Decision::Pending,
    }
}

/// Running count of decisions by kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusTally {
    pub pending: u64,
    pub accepted: u64,
    pub declined: u64,
}

impl StatusTally {
    pub fn record(&mut self, decision: Decision) {
        match decision {
            Decision::Pending => self.pending += 1,
            Decision::Accepted => self.accepted += 1,
            Decision::Declined => self.declined += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.pending + self.accepted + self.declined
    }

    pub fn completed(&self) -> u64 {
        self.accepted + self.declined
    }
}

impl FromIterator<Decision> for StatusTally {
    fn from_iter<I: IntoIterator<Item = Decision>>(iter: I) -> Self {
        let mut tally = StatusTally::default();
        for decision in iter {
            tally.record(decision);
        }
        tally
    }
}
