//! Paper listings with joined conference and user names

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use confhub_common::db::{
    get_conferences_chunked, get_users_chunked, papers_in_conferences_chunked, DocumentStore,
};
use confhub_common::{Decision, Error, Paper, Result, Role};

use crate::auth::Caller;

const UNKNOWN_NAME: &str = "Unknown";

/// Which papers a listing covers; must match the caller's role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperScope {
    /// Papers the caller wrote
    Author,
    /// Papers assigned to the caller
    Reviewer,
    /// Papers in conferences the caller organizes
    Organizer,
}

impl PaperScope {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "author" => Some(PaperScope::Author),
            "reviewer" => Some(PaperScope::Reviewer),
            "organizer" => Some(PaperScope::Organizer),
            _ => None,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            PaperScope::Author => Role::Author,
            PaperScope::Reviewer => Role::Reviewer,
            PaperScope::Organizer => Role::Organizer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewerEntry {
    pub id: String,
    pub name: String,
    pub status: Decision,
}

/// One row of `GET /papers`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperRow {
    pub id: String,
    pub title: String,
    pub conference_id: String,
    pub conference_name: String,
    pub author_id: String,
    pub author_name: String,
    pub reviewers: Vec<ReviewerEntry>,
    /// Paper-level decision over all reviewers
    pub status: Decision,
    /// The calling reviewer's own decision (reviewer scope only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_status: Option<Decision>,
    pub created_at: String,
    pub updated_at: String,
}

pub async fn list_papers(
    store: &dyn DocumentStore,
    caller: &Caller,
    scope: Option<&str>,
) -> Result<Vec<PaperRow>> {
    let scope = scope.and_then(PaperScope::parse).ok_or_else(|| {
        Error::InvalidArgument("scope must be one of author, reviewer, organizer".to_string())
    })?;
    caller.require(&[scope.role()])?;

    let papers = match scope {
        PaperScope::Author => store.papers_by_author(&caller.uid).await?,
        PaperScope::Reviewer => store.papers_by_reviewer(&caller.uid).await?,
        PaperScope::Organizer => {
            let conference_ids: Vec<String> = store
                .conferences_by_organizer(&caller.uid)
                .await?
                .into_iter()
                .map(|c| c.id)
                .collect();
            papers_in_conferences_chunked(store, &conference_ids).await?
        }
    };

    let my_id = (scope == PaperScope::Reviewer).then_some(caller.uid.as_str());
    join_names(store, papers, my_id).await
}

fn unique_ids<'a>(ids: impl IntoIterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).cloned().collect()
}

/// Resolve conference, author and reviewer names; newest paper first
async fn join_names(
    store: &dyn DocumentStore,
    papers: Vec<Paper>,
    my_id: Option<&str>,
) -> Result<Vec<PaperRow>> {
    let conference_ids = unique_ids(papers.iter().map(|p| &p.conference_id));
    let user_ids = unique_ids(
        papers
            .iter()
            .flat_map(|p| std::iter::once(&p.author_id).chain(&p.reviewer_ids)),
    );

    let conference_names: HashMap<String, String> =
        get_conferences_chunked(store, &conference_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();
    let user_names: HashMap<String, String> = get_users_chunked(store, &user_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect();

    let name_of = |names: &HashMap<String, String>, id: &str| {
        names
            .get(id)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_NAME.to_string())
    };

    let mut rows: Vec<PaperRow> = papers
        .into_iter()
        .map(|paper| PaperRow {
            conference_name: name_of(&conference_names, &paper.conference_id),
            author_name: name_of(&user_names, &paper.author_id),
            reviewers: paper
                .reviewer_ids
                .iter()
                .map(|id| ReviewerEntry {
                    id: id.clone(),
                    name: name_of(&user_names, id),
                    status: paper.status_of(id),
                })
                .collect(),
            status: paper.overall_status(),
            my_status: my_id.map(|me| paper.status_of(me)),
            id: paper.id,
            title: paper.title,
            conference_id: paper.conference_id,
            author_id: paper.author_id,
            created_at: paper.created_at,
            updated_at: paper.updated_at,
        })
        .collect();

    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(rows)
}
