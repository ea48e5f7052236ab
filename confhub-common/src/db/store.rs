//! Document store adapter interface
//!
//! The engines only see collections of typed documents (`users`,
//! `conferences`, `papers`) plus an atomic write batch. Back-reference arrays
//! are never overwritten wholesale: they change through [`WriteOp::ArrayUnion`]
//! and [`WriteOp::ArrayRemove`] so concurrent writers do not clobber each
//! other.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::decision::Decision;
use crate::models::{Conference, Paper, Role, User};
use crate::Result;

/// Largest id list a single `IN` query accepts
pub const MAX_IDS_PER_QUERY: usize = 10;

/// Platform-wide document counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionCounts {
    pub conferences: u64,
    pub papers: u64,
    pub organizers: u64,
    pub authors: u64,
    pub reviewers: u64,
}

/// Array-valued field on a specific document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayField {
    /// `conferences/{conference_id}.paperIds`
    ConferencePaperIds { conference_id: String },
    /// `users/{user_id}.assignedPapers`
    UserAssignedPapers { user_id: String },
}

/// One write inside an atomic batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Replace a paper's reviewer set and statuses together
    SetPaperReviewers {
        paper_id: String,
        reviewer_ids: Vec<String>,
        reviewer_statuses: BTreeMap<String, Decision>,
        updated_at: String,
    },
    /// Append `value` unless already present
    ArrayUnion { field: ArrayField, value: String },
    /// Remove every occurrence of `value`; a missing document is skipped
    ArrayRemove { field: ArrayField, value: String },
}

/// Writes applied all-or-nothing by [`DocumentStore::commit`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn array_union(&mut self, field: ArrayField, value: impl Into<String>) -> &mut Self {
        self.push(WriteOp::ArrayUnion {
            field,
            value: value.into(),
        })
    }

    pub fn array_remove(&mut self, field: ArrayField, value: impl Into<String>) -> &mut Self {
        self.push(WriteOp::ArrayRemove {
            field,
            value: value.into(),
        })
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Access to the `users`, `conferences` and `papers` collections
///
/// Multi-id lookups accept at most [`MAX_IDS_PER_QUERY`] ids; use the
/// `*_chunked` helpers in this module for longer lists.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_user(&self, id: &str) -> Result<Option<User>>;
    async fn get_users(&self, ids: &[String]) -> Result<Vec<User>>;
    async fn list_users_by_role(&self, role: Role) -> Result<Vec<User>>;
    /// Fails with `Conflict` when the id is taken
    async fn insert_user(&self, user: &User) -> Result<()>;
    /// Updates name, email and role; back-references are left alone
    async fn update_user_profile(&self, user: &User) -> Result<()>;

    async fn get_conference(&self, id: &str) -> Result<Option<Conference>>;
    async fn get_conferences(&self, ids: &[String]) -> Result<Vec<Conference>>;
    async fn list_conferences(&self) -> Result<Vec<Conference>>;
    async fn conferences_by_organizer(&self, organizer_id: &str) -> Result<Vec<Conference>>;
    async fn insert_conference(&self, conference: &Conference) -> Result<()>;
    /// Updates the descriptive fields; `organizerId` and `paperIds` are never
    /// written here
    async fn update_conference_details(&self, conference: &Conference) -> Result<()>;

    async fn get_paper(&self, id: &str) -> Result<Option<Paper>>;
    async fn papers_by_author(&self, author_id: &str) -> Result<Vec<Paper>>;
    async fn papers_by_reviewer(&self, reviewer_id: &str) -> Result<Vec<Paper>>;
    async fn papers_in_conferences(&self, conference_ids: &[String]) -> Result<Vec<Paper>>;
    async fn insert_paper(&self, paper: &Paper) -> Result<()>;
    /// Returns whether a document was removed; deleting a missing paper is
    /// not an error
    async fn delete_paper(&self, id: &str) -> Result<bool>;
    /// Field-level write of one reviewer's decision
    ///
    /// Fails with `NotFound` if the paper is gone and `Conflict` if the
    /// reviewer is no longer in `reviewerIds`.
    async fn set_reviewer_status(
        &self,
        paper_id: &str,
        reviewer_id: &str,
        decision: Decision,
        updated_at: &str,
    ) -> Result<()>;

    async fn collection_counts(&self) -> Result<CollectionCounts>;

    /// Apply every op in the batch or none of them
    ///
    /// A `SetPaperReviewers` or `ArrayUnion` whose document is missing aborts
    /// the batch with `Internal`.
    async fn commit(&self, batch: WriteBatch) -> Result<()>;
}

/// Papers across any number of conferences, fetched in id chunks
pub async fn papers_in_conferences_chunked(
    store: &dyn DocumentStore,
    conference_ids: &[String],
) -> Result<Vec<Paper>> {
    let mut papers = Vec::new();
    for chunk in conference_ids.chunks(MAX_IDS_PER_QUERY) {
        papers.extend(store.papers_in_conferences(chunk).await?);
    }
    Ok(papers)
}

/// Users for any number of ids, fetched in id chunks
pub async fn get_users_chunked(store: &dyn DocumentStore, ids: &[String]) -> Result<Vec<User>> {
    let mut users = Vec::new();
    for chunk in ids.chunks(MAX_IDS_PER_QUERY) {
        users.extend(store.get_users(chunk).await?);
    }
    Ok(users)
}

/// Conferences for any number of ids, fetched in id chunks
pub async fn get_conferences_chunked(
    store: &dyn DocumentStore,
    ids: &[String],
) -> Result<Vec<Conference>> {
    let mut conferences = Vec::new();
    for chunk in ids.chunks(MAX_IDS_PER_QUERY) {
        conferences.extend(store.get_conferences(chunk).await?);
    }
    Ok(conferences)
}
