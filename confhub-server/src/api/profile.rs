//! Profile endpoints
//!
//! `POST /profile` only needs a verified session: it is how a new identity
//! gets its profile. The other methods go through the full gate.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use confhub_common::User;

use crate::auth::{Caller, VerifiedIdentity};
use crate::engine::profiles::{self, NewProfile, ProfileUpdate};
use crate::{ApiResult, AppState};

/// GET /profile
pub async fn get_profile(caller: Caller) -> Json<User> {
    Json(caller.profile)
}

/// POST /profile
pub async fn create_profile(
    State(state): State<AppState>,
    identity: VerifiedIdentity,
    payload: Result<Json<NewProfile>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let Json(new_profile) = payload?;
    let user = profiles::create_profile(state.store.as_ref(), &identity.uid, new_profile).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// PATCH /profile
pub async fn update_profile(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let Json(update) = payload?;
    Ok(Json(
        profiles::update_profile(state.store.as_ref(), &caller, update).await?,
    ))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new().route(
        "/profile",
        get(get_profile).post(create_profile).patch(update_profile),
    )
}
