//! Reviewer pool endpoint

use axum::{extract::State, routing::get, Json, Router};

use crate::auth::Caller;
use crate::engine::profiles::{self, ReviewerSummary};
use crate::{ApiResult, AppState};

/// GET /reviewers (organizers)
pub async fn list_reviewers(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<Vec<ReviewerSummary>>> {
    Ok(Json(profiles::reviewer_pool(state.store.as_ref(), &caller).await?))
}

pub fn reviewer_routes() -> Router<AppState> {
    Router::new().route("/reviewers", get(list_reviewers))
}
