//! Shared fixtures for confhub-server integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{body::Body, http::Request, Router};
use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;

use confhub_common::db::{
    create_schema, ArrayField, CollectionCounts, DocumentStore, SqliteStore, WriteBatch,
};
use confhub_common::{Conference, Decision, Error, Paper, Result, Role, User};
use confhub_server::auth::{sign_session, Caller, SignedSessionVerifier, SESSION_COOKIE};
use confhub_server::{build_router, AppState};

pub const SECRET: &str = "integration-test-secret";

/// Fresh in-memory store with the schema applied
pub async fn memory_store() -> SqliteStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Should open in-memory database");
    create_schema(&pool).await.expect("Should create schema");
    SqliteStore::new(pool)
}

pub fn timestamp(day: u32) -> String {
    format!("2024-01-{:02}T00:00:00.000Z", day)
}

pub async fn seed_user(store: &dyn DocumentStore, id: &str, role: &str) -> User {
    let user = User {
        id: id.to_string(),
        name: format!("Name of {}", id),
        email: format!("{}@example.org", id),
        role: role.to_string(),
        assigned_papers: vec![],
        created_at: timestamp(1),
    };
    store.insert_user(&user).await.expect("Should insert user");
    user
}

pub async fn seed_reviewers(store: &dyn DocumentStore, ids: &[&str]) {
    for id in ids {
        seed_user(store, id, "reviewer").await;
    }
}

pub async fn seed_conference(
    store: &dyn DocumentStore,
    id: &str,
    organizer_id: &str,
) -> Conference {
    let conference = Conference {
        id: id.to_string(),
        name: format!("Conference {}", id),
        description: "Systems research".to_string(),
        location: "Lisbon".to_string(),
        start_date: "2025-09-01".to_string(),
        end_date: "2025-09-03".to_string(),
        organizer_id: organizer_id.to_string(),
        paper_ids: vec![],
        created_at: timestamp(2),
        updated_at: timestamp(2),
    };
    store
        .insert_conference(&conference)
        .await
        .expect("Should insert conference");
    conference
}

/// Paper with the given reviewer decisions, back-references included
pub async fn seed_paper(
    store: &dyn DocumentStore,
    id: &str,
    conference_id: &str,
    author_id: &str,
    statuses: &[(&str, Decision)],
) -> Paper {
    let paper = Paper {
        id: id.to_string(),
        title: format!("Paper {}", id),
        author_id: author_id.to_string(),
        conference_id: conference_id.to_string(),
        reviewer_ids: statuses.iter().map(|(r, _)| r.to_string()).collect(),
        reviewer_statuses: statuses.iter().map(|(r, d)| (r.to_string(), *d)).collect(),
        created_at: timestamp(3),
        updated_at: timestamp(3),
    };
    store.insert_paper(&paper).await.expect("Should insert paper");

    let mut batch = WriteBatch::new();
    batch.array_union(
        ArrayField::ConferencePaperIds {
            conference_id: conference_id.to_string(),
        },
        id,
    );
    for (reviewer_id, _) in statuses {
        batch.array_union(
            ArrayField::UserAssignedPapers {
                user_id: reviewer_id.to_string(),
            },
            id,
        );
    }
    store.commit(batch).await.expect("Should write back-references");
    paper
}

pub fn caller_for(user: &User) -> Caller {
    Caller {
        uid: user.id.clone(),
        role: user.known_role().expect("Test user should have a known role"),
        profile: user.clone(),
    }
}

/// Caller claiming `role` regardless of the stored profile
pub fn caller_as(user: &User, role: Role) -> Caller {
    Caller {
        uid: user.id.clone(),
        role,
        profile: user.clone(),
    }
}

/// Session token valid for one hour
pub fn token(uid: &str) -> String {
    let expires = Utc::now().timestamp_millis() + 3_600_000;
    sign_session(uid, expires, SECRET)
}

pub fn test_app(store: Arc<dyn DocumentStore>) -> Router {
    let state = AppState::new(store, Arc::new(SignedSessionVerifier::new(SECRET)));
    build_router(state)
}

/// Request carrying a session cookie for `uid` (if any) and a JSON body
pub fn request(method: &str, uri: &str, uid: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(uid) = uid {
        builder = builder.header("cookie", format!("{}={}", SESSION_COOKIE, token(uid)));
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Extract JSON body from response
pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

/// Store whose batch commits always fail, with optional failing deletes
///
/// Everything else is delegated to a real [`SqliteStore`].
pub struct FailingBatchStore {
    pub inner: SqliteStore,
    pub delete_failures: AtomicU32,
    pub delete_attempts: AtomicU32,
}

impl FailingBatchStore {
    pub fn new(inner: SqliteStore, delete_failures: u32) -> Self {
        Self {
            inner,
            delete_failures: AtomicU32::new(delete_failures),
            delete_attempts: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl DocumentStore for FailingBatchStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.inner.get_user(id).await
    }
    async fn get_users(&self, ids: &[String]) -> Result<Vec<User>> {
        self.inner.get_users(ids).await
    }
    async fn list_users_by_role(&self, role: Role) -> Result<Vec<User>> {
        self.inner.list_users_by_role(role).await
    }
    async fn insert_user(&self, user: &User) -> Result<()> {
        self.inner.insert_user(user).await
    }
    async fn update_user_profile(&self, user: &User) -> Result<()> {
        self.inner.update_user_profile(user).await
    }
    async fn get_conference(&self, id: &str) -> Result<Option<Conference>> {
        self.inner.get_conference(id).await
    }
    async fn get_conferences(&self, ids: &[String]) -> Result<Vec<Conference>> {
        self.inner.get_conferences(ids).await
    }
    async fn list_conferences(&self) -> Result<Vec<Conference>> {
        self.inner.list_conferences().await
    }
    async fn conferences_by_organizer(&self, organizer_id: &str) -> Result<Vec<Conference>> {
        self.inner.conferences_by_organizer(organizer_id).await
    }
    async fn insert_conference(&self, conference: &Conference) -> Result<()> {
        self.inner.insert_conference(conference).await
    }
    async fn update_conference_details(&self, conference: &Conference) -> Result<()> {
        self.inner.update_conference_details(conference).await
    }
    async fn get_paper(&self, id: &str) -> Result<Option<Paper>> {
        self.inner.get_paper(id).await
    }
    async fn papers_by_author(&self, author_id: &str) -> Result<Vec<Paper>> {
        self.inner.papers_by_author(author_id).await
    }
    async fn papers_by_reviewer(&self, reviewer_id: &str) -> Result<Vec<Paper>> {
        self.inner.papers_by_reviewer(reviewer_id).await
    }
    async fn papers_in_conferences(&self, conference_ids: &[String]) -> Result<Vec<Paper>> {
        self.inner.papers_in_conferences(conference_ids).await
    }
    async fn insert_paper(&self, paper: &Paper) -> Result<()> {
        self.inner.insert_paper(paper).await
    }
    async fn delete_paper(&self, id: &str) -> Result<bool> {
        self.delete_attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.delete_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.delete_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::Internal("injected delete failure".to_string()));
        }
        self.inner.delete_paper(id).await
    }
    async fn set_reviewer_status(
        &self,
        paper_id: &str,
        reviewer_id: &str,
        decision: Decision,
        updated_at: &str,
    ) -> Result<()> {
        self.inner
            .set_reviewer_status(paper_id, reviewer_id, decision, updated_at)
            .await
    }
    async fn collection_counts(&self) -> Result<CollectionCounts> {
        self.inner.collection_counts().await
    }
    async fn commit(&self, _batch: WriteBatch) -> Result<()> {
        Err(Error::Internal("injected batch failure".to_string()))
    }
}
