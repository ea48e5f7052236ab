//! Authorization gate
//!
//! Resolves the request's session credential to a verified uid, loads the
//! caller's profile and checks the role. Runs once per request through the
//! [`Caller`] extractor; nothing is cached between requests.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use cookie::Cookie;
use tracing::debug;

use confhub_common::db::DocumentStore;
use confhub_common::{Error, Result, Role, User};

use super::session::IdentityVerifier;
use crate::{ApiError, AppState};

/// Name of the session cookie set by the identity provider
pub const SESSION_COOKIE: &str = "session";

/// Authenticated caller with a known role
#[derive(Debug, Clone)]
pub struct Caller {
    pub uid: String,
    pub role: Role,
    pub profile: User,
}

impl Caller {
    /// Fail with `Forbidden` unless the caller holds one of `allowed`
    pub fn require(&self, allowed: &[Role]) -> Result<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(Error::Forbidden(format!(
                "user {} has role {}, requires one of {:?}",
                self.uid, self.role, allowed
            )))
        }
    }
}

/// Session credential from the `session` cookie, or a bearer token
pub fn session_credential(headers: &HeaderMap) -> Option<String> {
    for value in headers.get_all(header::COOKIE) {
        let Ok(raw) = value.to_str() else { continue };
        let found = Cookie::split_parse(raw)
            .filter_map(|c| c.ok())
            .find(|c| c.name() == SESSION_COOKIE && !c.value().is_empty());
        if let Some(cookie) = found {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Verify the request's session and return the uid
pub async fn verify_identity(
    verifier: &dyn IdentityVerifier,
    headers: &HeaderMap,
) -> Result<String> {
    let credential = session_credential(headers)
        .ok_or_else(|| Error::Unauthenticated("no session credential".to_string()))?;
    verifier.verify(&credential).await
}

/// Full gate: identity, profile, role
///
/// `allowed` of `None` accepts any of the three known roles.
pub async fn authenticate(
    store: &dyn DocumentStore,
    verifier: &dyn IdentityVerifier,
    headers: &HeaderMap,
    allowed: Option<&[Role]>,
) -> Result<Caller> {
    let uid = verify_identity(verifier, headers).await?;

    let profile = store
        .get_user(&uid)
        .await?
        .ok_or_else(|| Error::ProfileNotFound(uid.clone()))?;

    let role = profile.known_role().ok_or_else(|| {
        Error::RoleNotSupported(format!("user {} has role {:?}", uid, profile.role))
    })?;

    let caller = Caller { uid, role, profile };
    if let Some(allowed) = allowed {
        caller.require(allowed)?;
    }

    debug!("Authenticated {} as {}", caller.uid, caller.role);
    Ok(caller)
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        Ok(authenticate(
            state.store.as_ref(),
            state.verifier.as_ref(),
            &parts.headers,
            None,
        )
        .await?)
    }
}

/// Verified uid for requests that may not have a profile yet
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub uid: String,
}

#[async_trait]
impl FromRequestParts<AppState> for VerifiedIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let uid = verify_identity(state.verifier.as_ref(), &parts.headers).await?;
        Ok(VerifiedIdentity { uid })
    }
}
