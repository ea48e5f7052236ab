//! Paper submission and reviewer assignment
//!
//! Three mutations touch a paper's reviewer set:
//! - [`create_paper`]: author submits, two reviewers are drawn at random
//! - [`update_status`]: an assigned reviewer records their own decision
//! - [`reassign`]: the conference's organizer replaces the reviewer set
//!
//! Back-references (`conferences.paperIds`, `users.assignedPapers`) are only
//! ever changed through array-union / array-remove inside an atomic batch.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use tracing::{error, info, warn};

use confhub_common::db::{get_users_chunked, ArrayField, DocumentStore, WriteBatch, WriteOp};
use confhub_common::time::{generate_id, now_timestamp};
use confhub_common::{Decision, Error, Paper, Result, Role, User};

use crate::auth::Caller;

/// Reviewers drawn for every new paper
pub const REQUIRED_REVIEWERS: usize = 2;

pub const NOT_ENOUGH_REVIEWERS: &str =
    "Not enough reviewers are available for this conference. Please contact an organizer.";

const COMPENSATION_ATTEMPTS: u32 = 3;
const COMPENSATION_BACKOFF: Duration = Duration::from_millis(50);

/// Body of `POST /papers`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPaper {
    pub title: String,
    pub conference_id: String,
}

/// Uniform sample of `count` reviewers from `pool`
///
/// Shuffles the whole pool (Fisher-Yates) and keeps the first `count`.
pub fn select_reviewers<R: Rng + ?Sized>(
    mut pool: Vec<User>,
    count: usize,
    rng: &mut R,
) -> Result<Vec<User>> {
    if pool.len() < count {
        return Err(Error::ServiceUnavailable(NOT_ENOUGH_REVIEWERS.to_string()));
    }
    pool.shuffle(rng);
    pool.truncate(count);
    Ok(pool)
}

/// Submit a paper and assign two random reviewers
pub async fn create_paper<R: Rng + ?Sized>(
    store: &dyn DocumentStore,
    rng: &mut R,
    caller: &Caller,
    new_paper: NewPaper,
) -> Result<Paper> {
    caller.require(&[Role::Author])?;

    let title = new_paper.title.trim();
    if title.is_empty() {
        return Err(Error::InvalidArgument("title is required".to_string()));
    }

    let conference = store
        .get_conference(&new_paper.conference_id)
        .await?
        .ok_or_else(|| {
            Error::NotFound(format!("conference {} not found", new_paper.conference_id))
        })?;

    // An author holding a reviewer profile never reviews their own paper
    let pool: Vec<User> = store
        .list_users_by_role(Role::Reviewer)
        .await?
        .into_iter()
        .filter(|u| u.id != caller.uid)
        .collect();
    let pool_size = pool.len();
    let reviewers = select_reviewers(pool, REQUIRED_REVIEWERS, rng).map_err(|e| {
        warn!(
            "Rejected submission to {}: {} eligible reviewers, need {}",
            conference.id, pool_size, REQUIRED_REVIEWERS
        );
        e
    })?;

    let now = now_timestamp();
    let reviewer_ids: Vec<String> = reviewers.into_iter().map(|u| u.id).collect();
    let paper = Paper {
        id: generate_id(),
        title: title.to_string(),
        author_id: caller.uid.clone(),
        conference_id: conference.id.clone(),
        reviewer_statuses: reviewer_ids
            .iter()
            .map(|id| (id.clone(), Decision::Pending))
            .collect(),
        reviewer_ids,
        created_at: now.clone(),
        updated_at: now,
    };

    store.insert_paper(&paper).await?;

    let mut batch = WriteBatch::new();
    batch.array_union(
        ArrayField::ConferencePaperIds {
            conference_id: conference.id.clone(),
        },
        paper.id.clone(),
    );
    for reviewer_id in &paper.reviewer_ids {
        batch.array_union(
            ArrayField::UserAssignedPapers {
                user_id: reviewer_id.clone(),
            },
            paper.id.clone(),
        );
    }

    if let Err(e) = store.commit(batch).await {
        warn!(
            "Back-reference update failed for paper {}: {}; rolling back",
            paper.id, e
        );
        compensate_create(store, &paper.id).await;
        return Err(e);
    }

    info!(
        "Paper {} submitted to {} by {}, reviewers {:?}",
        paper.id, paper.conference_id, paper.author_id, paper.reviewer_ids
    );
    Ok(paper)
}

/// Delete a paper whose back-references could not be written
///
/// Deleting an already-missing paper counts as success, so retries are safe.
async fn compensate_create(store: &dyn DocumentStore, paper_id: &str) {
    for attempt in 1..=COMPENSATION_ATTEMPTS {
        match store.delete_paper(paper_id).await {
            Ok(_) => {
                info!("Rolled back paper {}", paper_id);
                return;
            }
            Err(e) => {
                error!(
                    "Rollback of paper {} failed (attempt {}/{}): {}",
                    paper_id, attempt, COMPENSATION_ATTEMPTS, e
                );
                if attempt < COMPENSATION_ATTEMPTS {
                    tokio::time::sleep(COMPENSATION_BACKOFF * attempt).await;
                }
            }
        }
    }
    error!("Paper {} left orphaned after failed submission", paper_id);
}

/// Record the calling reviewer's own decision on a paper
pub async fn update_status(
    store: &dyn DocumentStore,
    caller: &Caller,
    paper_id: &str,
    status: &str,
) -> Result<Paper> {
    caller.require(&[Role::Reviewer])?;

    let mut paper = store
        .get_paper(paper_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("paper {} not found", paper_id)))?;

    if !paper.has_reviewer(&caller.uid) {
        return Err(Error::Forbidden(format!(
            "user {} is not a reviewer of paper {}",
            caller.uid, paper_id
        )));
    }

    let decision = Decision::parse(status).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "status must be one of pending, accepted, declined (got {:?})",
            status
        ))
    })?;

    let now = now_timestamp();
    store
        .set_reviewer_status(paper_id, &caller.uid, decision, &now)
        .await?;

    paper.reviewer_statuses.insert(caller.uid.clone(), decision);
    paper.updated_at = now;

    info!("Reviewer {} set paper {} to {}", caller.uid, paper_id, decision);
    Ok(paper)
}

/// Requested reviewer ids in order, first occurrence wins
pub fn dedup_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter().filter(|id| seen.insert(*id)).cloned().collect()
}

/// Diff between a paper's current reviewers and a requested set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReassignmentPlan {
    pub reviewer_ids: Vec<String>,
    pub reviewer_statuses: BTreeMap<String, Decision>,
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

/// Compute the new reviewer set without touching the store
///
/// Retained reviewers keep their decision, new ones start pending.
pub fn plan_reassignment(paper: &Paper, requested: &[String]) -> ReassignmentPlan {
    let reviewer_ids = dedup_ids(requested);

    let reviewer_statuses = reviewer_ids
        .iter()
        .map(|id| (id.clone(), paper.status_of(id)))
        .collect();
    let added = reviewer_ids
        .iter()
        .filter(|id| !paper.has_reviewer(id))
        .cloned()
        .collect();
    let removed = paper
        .reviewer_ids
        .iter()
        .filter(|id| !reviewer_ids.contains(id))
        .cloned()
        .collect();

    ReassignmentPlan {
        reviewer_ids,
        reviewer_statuses,
        added,
        removed,
    }
}

/// Replace a paper's reviewer set (organizer of the paper's conference only)
pub async fn reassign(
    store: &dyn DocumentStore,
    caller: &Caller,
    paper_id: &str,
    requested: &[String],
) -> Result<Paper> {
    caller.require(&[Role::Organizer])?;

    let wanted = dedup_ids(requested);
    if wanted.is_empty() {
        return Err(Error::InvalidArgument(
            "at least one reviewer is required".to_string(),
        ));
    }

    let mut paper = store
        .get_paper(paper_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("paper {} not found", paper_id)))?;

    let owns_conference = store
        .get_conference(&paper.conference_id)
        .await?
        .is_some_and(|c| c.organizer_id == caller.uid);
    if !owns_conference {
        return Err(Error::Forbidden(format!(
            "user {} does not organize conference {}",
            caller.uid, paper.conference_id
        )));
    }

    validate_reviewers(store, &paper, &wanted).await?;

    let plan = plan_reassignment(&paper, &wanted);
    let now = now_timestamp();

    let mut batch = WriteBatch::new();
    batch.push(WriteOp::SetPaperReviewers {
        paper_id: paper.id.clone(),
        reviewer_ids: plan.reviewer_ids.clone(),
        reviewer_statuses: plan.reviewer_statuses.clone(),
        updated_at: now.clone(),
    });
    for user_id in &plan.added {
        batch.array_union(
            ArrayField::UserAssignedPapers {
                user_id: user_id.clone(),
            },
            paper.id.clone(),
        );
    }
    for user_id in &plan.removed {
        batch.array_remove(
            ArrayField::UserAssignedPapers {
                user_id: user_id.clone(),
            },
            paper.id.clone(),
        );
    }
    store.commit(batch).await?;

    info!(
        "Paper {} reassigned by {}: +{:?} -{:?}",
        paper.id, caller.uid, plan.added, plan.removed
    );

    paper.reviewer_ids = plan.reviewer_ids;
    paper.reviewer_statuses = plan.reviewer_statuses;
    paper.updated_at = now;
    Ok(paper)
}

/// Every id must be an existing reviewer other than the paper's author
async fn validate_reviewers(
    store: &dyn DocumentStore,
    paper: &Paper,
    ids: &[String],
) -> Result<()> {
    if ids.iter().any(|id| *id == paper.author_id) {
        return Err(Error::InvalidArgument(
            "the paper's author cannot review it".to_string(),
        ));
    }

    let users: HashMap<String, User> = get_users_chunked(store, ids)
        .await?
        .into_iter()
        .map(|u| (u.id.clone(), u))
        .collect();

    let invalid: Vec<&str> = ids
        .iter()
        .filter(|id| {
            users
                .get(id.as_str())
                .and_then(User::known_role)
                .map_or(true, |role| role != Role::Reviewer)
        })
        .map(String::as_str)
        .collect();

    if !invalid.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "not reviewers: {}",
            invalid.join(", ")
        )));
    }
    Ok(())
}
