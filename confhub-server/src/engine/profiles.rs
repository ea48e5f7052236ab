//! User profiles and the reviewer pool

use serde::{Deserialize, Serialize};
use tracing::info;

use confhub_common::db::DocumentStore;
use confhub_common::time::now_timestamp;
use confhub_common::{Error, Result, Role, User};

use crate::auth::Caller;

/// Body of `POST /profile`
#[derive(Debug, Clone, Deserialize)]
pub struct NewProfile {
    pub name: String,
    pub email: String,
    pub role: String,
}

/// Body of `PATCH /profile`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

/// Reviewer as shown on reassignment screens
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub assigned_paper_count: usize,
}

fn clean_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidArgument("name is required".to_string()));
    }
    Ok(name.to_string())
}

fn clean_email(email: &str) -> Result<String> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email.to_string()),
        _ => Err(Error::InvalidArgument(format!(
            "{:?} is not an email address",
            email
        ))),
    }
}

fn parse_role(role: &str) -> Result<Role> {
    Role::parse(role.trim()).ok_or_else(|| {
        Error::InvalidArgument("role must be one of organizer, author, reviewer".to_string())
    })
}

/// Create the profile for a freshly signed-up identity
pub async fn create_profile(
    store: &dyn DocumentStore,
    uid: &str,
    new_profile: NewProfile,
) -> Result<User> {
    let user = User {
        id: uid.to_string(),
        name: clean_name(&new_profile.name)?,
        email: clean_email(&new_profile.email)?,
        role: parse_role(&new_profile.role)?.as_str().to_string(),
        assigned_papers: Vec::new(),
        created_at: now_timestamp(),
    };
    store.insert_user(&user).await?;

    info!("Profile created for {} as {}", user.id, user.role);
    Ok(user)
}

/// Edit the caller's own name, email or role
pub async fn update_profile(
    store: &dyn DocumentStore,
    caller: &Caller,
    update: ProfileUpdate,
) -> Result<User> {
    let mut user = caller.profile.clone();
    if let Some(name) = update.name {
        user.name = clean_name(&name)?;
    }
    if let Some(email) = update.email {
        user.email = clean_email(&email)?;
    }
    if let Some(role) = update.role {
        user.role = parse_role(&role)?.as_str().to_string();
    }
    store.update_user_profile(&user).await?;

    info!("Profile updated for {}", user.id);
    Ok(user)
}

/// Every reviewer with their current load (organizers only)
pub async fn reviewer_pool(
    store: &dyn DocumentStore,
    caller: &Caller,
) -> Result<Vec<ReviewerSummary>> {
    caller.require(&[Role::Organizer])?;

    Ok(store
        .list_users_by_role(Role::Reviewer)
        .await?
        .into_iter()
        .map(|u| ReviewerSummary {
            assigned_paper_count: u.assigned_papers.len(),
            id: u.id,
            name: u.name,
            email: u.email,
        })
        .collect())
}
