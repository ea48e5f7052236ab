//! Dashboard aggregation
//!
//! Read-only statistics computed on every request. Nothing here is
//! persisted or cached.

use std::collections::HashSet;

use serde::Serialize;

use confhub_common::db::{papers_in_conferences_chunked, CollectionCounts, DocumentStore};
use confhub_common::{Conference, Paper, Result, Role, StatusTally};

use crate::auth::Caller;

/// Platform-wide totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralStats {
    pub total_conferences: u64,
    pub total_papers: u64,
    pub total_organizers: u64,
    pub total_authors: u64,
    pub total_reviewers: u64,
    pub total_users: u64,
}

impl From<CollectionCounts> for GeneralStats {
    fn from(counts: CollectionCounts) -> Self {
        Self {
            total_conferences: counts.conferences,
            total_papers: counts.papers,
            total_organizers: counts.organizers,
            total_authors: counts.authors,
            total_reviewers: counts.reviewers,
            total_users: counts.organizers + counts.authors + counts.reviewers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestConference {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

impl From<&Conference> for LatestConference {
    fn from(c: &Conference) -> Self {
        Self {
            id: c.id.clone(),
            name: c.name.clone(),
            created_at: c.created_at.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestPaper {
    pub id: String,
    pub title: String,
    pub conference_id: String,
    pub created_at: String,
}

impl From<&Paper> for LatestPaper {
    fn from(p: &Paper) -> Self {
        Self {
            id: p.id.clone(),
            title: p.title.clone(),
            conference_id: p.conference_id.clone(),
            created_at: p.created_at.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizerStats {
    pub total_conferences: u64,
    pub total_papers: u64,
    pub total_reviewer_assignments: u64,
    pub pending_reviews: u64,
    pub accepted_reviews: u64,
    pub declined_reviews: u64,
    pub unique_reviewers: u64,
    pub unique_authors: u64,
    pub latest_conference: Option<LatestConference>,
    pub latest_paper: Option<LatestPaper>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorStats {
    pub total_papers: u64,
    pub total_reviewer_assignments: u64,
    pub pending_reviews: u64,
    pub accepted_reviews: u64,
    pub declined_reviews: u64,
    pub unique_reviewers: u64,
    pub unique_conferences: u64,
    pub latest_paper: Option<LatestPaper>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerStats {
    pub assigned_papers: u64,
    pub pending_reviews: u64,
    pub accepted_reviews: u64,
    pub declined_reviews: u64,
    pub completed_reviews: u64,
    pub unique_conferences: u64,
    pub unique_authors: u64,
    pub latest_paper: Option<LatestPaper>,
}

/// Statistics for the caller's role, tagged by `type`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RoleStats {
    Organizer(OrganizerStats),
    Author(AuthorStats),
    Reviewer(ReviewerStats),
}

/// `GET /dashboard` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub general: GeneralStats,
    pub role: RoleStats,
}

/// Item with the greatest `createdAt`; ties keep the earlier item
///
/// Plain string comparison, valid for fixed-width RFC 3339 timestamps.
pub fn latest<'a, T, F>(items: impl IntoIterator<Item = &'a T>, created_at: F) -> Option<&'a T>
where
    T: 'a,
    F: Fn(&T) -> &str,
{
    let mut best: Option<&'a T> = None;
    for item in items {
        match best {
            Some(current) if created_at(item) > created_at(current) => best = Some(item),
            None => best = Some(item),
            _ => {}
        }
    }
    best
}

/// Tally of every reviewer decision across `papers`
fn tally_all<'a>(papers: impl IntoIterator<Item = &'a Paper>) -> StatusTally {
    papers
        .into_iter()
        .flat_map(|p| p.reviewer_ids.iter().map(move |id| p.status_of(id)))
        .collect()
}

fn distinct<'a>(ids: impl IntoIterator<Item = &'a String>) -> u64 {
    ids.into_iter().collect::<HashSet<_>>().len() as u64
}

pub fn organizer_stats_from(conferences: &[Conference], papers: &[Paper]) -> OrganizerStats {
    let tally = tally_all(papers);
    OrganizerStats {
        total_conferences: conferences.len() as u64,
        total_papers: papers.len() as u64,
        total_reviewer_assignments: tally.total(),
        pending_reviews: tally.pending,
        accepted_reviews: tally.accepted,
        declined_reviews: tally.declined,
        unique_reviewers: distinct(papers.iter().flat_map(|p| &p.reviewer_ids)),
        unique_authors: distinct(papers.iter().map(|p| &p.author_id)),
        latest_conference: latest(conferences, |c| c.created_at.as_str())
            .map(LatestConference::from),
        latest_paper: latest(papers, |p| p.created_at.as_str()).map(LatestPaper::from),
    }
}

pub fn author_stats_from(papers: &[Paper]) -> AuthorStats {
    let tally = tally_all(papers);
    AuthorStats {
        total_papers: papers.len() as u64,
        total_reviewer_assignments: tally.total(),
        pending_reviews: tally.pending,
        accepted_reviews: tally.accepted,
        declined_reviews: tally.declined,
        unique_reviewers: distinct(papers.iter().flat_map(|p| &p.reviewer_ids)),
        unique_conferences: distinct(papers.iter().map(|p| &p.conference_id)),
        latest_paper: latest(papers, |p| p.created_at.as_str()).map(LatestPaper::from),
    }
}

pub fn reviewer_stats_from(reviewer_id: &str, papers: &[Paper]) -> ReviewerStats {
    let tally: StatusTally = papers.iter().map(|p| p.status_of(reviewer_id)).collect();
    ReviewerStats {
        assigned_papers: papers.len() as u64,
        pending_reviews: tally.pending,
        accepted_reviews: tally.accepted,
        declined_reviews: tally.declined,
        completed_reviews: tally.completed(),
        unique_conferences: distinct(papers.iter().map(|p| &p.conference_id)),
        unique_authors: distinct(papers.iter().map(|p| &p.author_id)),
        latest_paper: latest(papers, |p| p.created_at.as_str()).map(LatestPaper::from),
    }
}

pub async fn general_stats(store: &dyn DocumentStore) -> Result<GeneralStats> {
    Ok(store.collection_counts().await?.into())
}

pub async fn organizer_stats(
    store: &dyn DocumentStore,
    organizer_id: &str,
) -> Result<OrganizerStats> {
    let conferences = store.conferences_by_organizer(organizer_id).await?;
    let ids: Vec<String> = conferences.iter().map(|c| c.id.clone()).collect();
    let papers = papers_in_conferences_chunked(store, &ids).await?;
    Ok(organizer_stats_from(&conferences, &papers))
}

pub async fn author_stats(store: &dyn DocumentStore, author_id: &str) -> Result<AuthorStats> {
    let papers = store.papers_by_author(author_id).await?;
    Ok(author_stats_from(&papers))
}

pub async fn reviewer_stats(
    store: &dyn DocumentStore,
    reviewer_id: &str,
) -> Result<ReviewerStats> {
    let papers = store.papers_by_reviewer(reviewer_id).await?;
    Ok(reviewer_stats_from(reviewer_id, &papers))
}

/// General totals plus the caller's role-specific view
pub async fn dashboard(store: &dyn DocumentStore, caller: &Caller) -> Result<DashboardSummary> {
    let general = general_stats(store).await?;
    let role = match caller.role {
        Role::Organizer => RoleStats::Organizer(organizer_stats(store, &caller.uid).await?),
        Role::Author => RoleStats::Author(author_stats(store, &caller.uid).await?),
        Role::Reviewer => RoleStats::Reviewer(reviewer_stats(store, &caller.uid).await?),
    };
    Ok(DashboardSummary { general, role })
}
