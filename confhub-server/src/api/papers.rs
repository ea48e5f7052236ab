//! Paper endpoints
//!
//! - `POST /papers`: author submits a paper
//! - `PATCH /papers`: reviewer decision or organizer reassignment, picked by
//!   body shape
//! - `GET /papers?scope=...`: listing for the caller's role

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;

use confhub_common::Paper;

use crate::auth::Caller;
use crate::engine::assignment::{self, NewPaper};
use crate::engine::papers::{self, PaperRow};
use crate::{ApiResult, AppState};

/// Body of `PATCH /papers`
///
/// A body with both `status` and `reviewerIds` is treated as a status update.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PaperPatch {
    Status {
        #[serde(rename = "paperId")]
        paper_id: String,
        status: String,
    },
    Reassign {
        #[serde(rename = "paperId")]
        paper_id: String,
        #[serde(rename = "reviewerIds")]
        reviewer_ids: Vec<String>,
    },
}

#[derive(Debug, Deserialize)]
pub struct PaperQuery {
    pub scope: Option<String>,
}

/// POST /papers
pub async fn submit_paper(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<NewPaper>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Paper>)> {
    let Json(new_paper) = payload?;
    let mut rng = StdRng::from_entropy();
    let paper =
        assignment::create_paper(state.store.as_ref(), &mut rng, &caller, new_paper).await?;
    Ok((StatusCode::CREATED, Json(paper)))
}

/// PATCH /papers
pub async fn patch_paper(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<PaperPatch>, JsonRejection>,
) -> ApiResult<Json<Paper>> {
    let paper = match payload? {
        Json(PaperPatch::Status { paper_id, status }) => {
            assignment::update_status(state.store.as_ref(), &caller, &paper_id, &status).await?
        }
        Json(PaperPatch::Reassign {
            paper_id,
            reviewer_ids,
        }) => {
            assignment::reassign(state.store.as_ref(), &caller, &paper_id, &reviewer_ids).await?
        }
    };
    Ok(Json(paper))
}

/// GET /papers?scope=author|reviewer|organizer
pub async fn list_papers(
    State(state): State<AppState>,
    caller: Caller,
    query: Result<Query<PaperQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<PaperRow>>> {
    let Query(query) = query?;
    let rows = papers::list_papers(state.store.as_ref(), &caller, query.scope.as_deref()).await?;
    Ok(Json(rows))
}

pub fn paper_routes() -> Router<AppState> {
    Router::new().route(
        "/papers",
        get(list_papers).post(submit_paper).patch(patch_paper),
    )
}
