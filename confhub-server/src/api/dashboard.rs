//! Dashboard endpoint

use axum::{extract::State, routing::get, Json, Router};

use crate::auth::Caller;
use crate::engine::dashboard::{self, DashboardSummary};
use crate::{ApiResult, AppState};

/// GET /dashboard
///
/// Platform totals plus statistics for the caller's role.
pub async fn get_dashboard(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<DashboardSummary>> {
    Ok(Json(dashboard::dashboard(state.store.as_ref(), &caller).await?))
}

pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(get_dashboard))
}
