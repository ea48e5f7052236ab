//! Conference endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use confhub_common::{Conference, Error};

use crate::auth::Caller;
use crate::engine::conferences::{self, ConferenceUpdate, NewConference};
use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ConferenceQuery {
    /// `mine` restricts an organizer's listing to their own conferences
    pub scope: Option<String>,
}

/// GET /conferences[?scope=mine]
pub async fn list_conferences(
    State(state): State<AppState>,
    caller: Caller,
    query: Result<Query<ConferenceQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Conference>>> {
    let Query(query) = query?;
    let mine = match query.scope.as_deref() {
        None | Some("all") => false,
        Some("mine") => true,
        Some(other) => {
            return Err(Error::InvalidArgument(format!("unknown scope {:?}", other)).into())
        }
    };
    let list = conferences::list_conferences(state.store.as_ref(), &caller, mine).await?;
    Ok(Json(list))
}

/// GET /conferences/:id
pub async fn get_conference(
    State(state): State<AppState>,
    _caller: Caller,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Conference>> {
    let Path(id) = id?;
    Ok(Json(conferences::get_conference(state.store.as_ref(), &id).await?))
}

/// POST /conferences
pub async fn create_conference(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<NewConference>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Conference>)> {
    let Json(new_conference) = payload?;
    let conference =
        conferences::create_conference(state.store.as_ref(), &caller, new_conference).await?;
    Ok((StatusCode::CREATED, Json(conference)))
}

/// PATCH /conferences/:id
pub async fn update_conference(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<Path<String>, PathRejection>,
    payload: Result<Json<ConferenceUpdate>, JsonRejection>,
) -> ApiResult<Json<Conference>> {
    let Path(id) = id?;
    let Json(update) = payload?;
    let conference =
        conferences::update_conference(state.store.as_ref(), &caller, &id, update).await?;
    Ok(Json(conference))
}

pub fn conference_routes() -> Router<AppState> {
    Router::new()
        .route("/conferences", get(list_conferences).post(create_conference))
        .route(
            "/conferences/:id",
            get(get_conference).patch(update_conference),
        )
}
