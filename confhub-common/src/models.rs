//! Entity schemas
//!
//! Documents are parsed into these records once, at the store boundary.
//! Field names on the wire are camelCase.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::decision::{summarize, Decision};

/// Caller role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Organizer,
    Author,
    Reviewer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Organizer, Role::Author, Role::Reviewer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Organizer => "organizer",
            Role::Author => "author",
            Role::Reviewer => "reviewer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "organizer" => Some(Role::Organizer),
            "author" => Some(Role::Author),
            "reviewer" => Some(Role::Reviewer),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User profile document (`users` collection)
///
/// `role` is kept as the raw stored string; profiles written by older
/// clients may carry values outside [`Role`], which the gate rejects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    /// Papers this user reviews (back-reference, reviewers only)
    #[serde(default)]
    pub assigned_papers: Vec<String>,
    pub created_at: String,
}

impl User {
    pub fn known_role(&self) -> Option<Role> {
        Role::parse(&self.role)
    }
}

/// Conference document (`conferences` collection)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conference {
    pub id: String,
    pub name: String,
    pub description: String,
    pub location: String,
    pub start_date: String,
    pub end_date: String,
    /// Owning organizer, fixed at creation
    pub organizer_id: String,
    /// Papers submitted to this conference (back-reference, union-only)
    #[serde(default)]
    pub paper_ids: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Paper document (`papers` collection)
///
/// `reviewer_ids` and the keys of `reviewer_statuses` always hold the same
/// set of ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paper {
    pub id: String,
    pub title: String,
    pub author_id: String,
    pub conference_id: String,
    pub reviewer_ids: Vec<String>,
    pub reviewer_statuses: BTreeMap<String, Decision>,
    pub created_at: String,
    pub updated_at: String,
}

impl Paper {
    pub fn has_reviewer(&self, user_id: &str) -> bool {
        self.reviewer_ids.iter().any(|id| id == user_id)
    }

    /// Decision of one reviewer; missing entries read as pending
    pub fn status_of(&self, reviewer_id: &str) -> Decision {
        self.reviewer_statuses
            .get(reviewer_id)
            .copied()
            .unwrap_or_default()
    }

    /// Paper-level decision folded from every reviewer's status
    pub fn overall_status(&self) -> Decision {
        summarize(self.reviewer_statuses.values().copied())
    }

    /// Lockstep check between `reviewer_ids` and `reviewer_statuses`
    pub fn reviewers_consistent(&self) -> bool {
        self.reviewer_ids.len() == self.reviewer_statuses.len()
            && self
                .reviewer_ids
                .iter()
                .all(|id| self.reviewer_statuses.contains_key(id))
    }
}
