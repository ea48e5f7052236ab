//! Conference management
//!
//! Organizers create and edit their own conferences. `organizerId` is fixed
//! at creation and `paperIds` only grows through paper submission, so
//! neither is writable here.

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use confhub_common::db::DocumentStore;
use confhub_common::time::{generate_id, now_timestamp};
use confhub_common::{Conference, Error, Result, Role};

use crate::auth::Caller;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Body of `POST /conferences`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConference {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub start_date: String,
    pub end_date: String,
}

/// Body of `PATCH /conferences/:id`; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        Error::InvalidArgument(format!("{} must be a YYYY-MM-DD date (got {:?})", field, value))
    })
}

/// Both dates well-formed and `end >= start`
pub fn validate_dates(start_date: &str, end_date: &str) -> Result<()> {
    let start = parse_date("startDate", start_date)?;
    let end = parse_date("endDate", end_date)?;
    if end < start {
        return Err(Error::InvalidArgument(
            "endDate must not be before startDate".to_string(),
        ));
    }
    Ok(())
}

fn required_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidArgument("name is required".to_string()));
    }
    Ok(name.to_string())
}

pub async fn create_conference(
    store: &dyn DocumentStore,
    caller: &Caller,
    new_conference: NewConference,
) -> Result<Conference> {
    caller.require(&[Role::Organizer])?;

    let name = required_name(&new_conference.name)?;
    validate_dates(&new_conference.start_date, &new_conference.end_date)?;

    let now = now_timestamp();
    let conference = Conference {
        id: generate_id(),
        name,
        description: new_conference.description.trim().to_string(),
        location: new_conference.location.trim().to_string(),
        start_date: new_conference.start_date.trim().to_string(),
        end_date: new_conference.end_date.trim().to_string(),
        organizer_id: caller.uid.clone(),
        paper_ids: Vec::new(),
        created_at: now.clone(),
        updated_at: now,
    };
    store.insert_conference(&conference).await?;

    info!("Conference {} created by {}", conference.id, caller.uid);
    Ok(conference)
}

pub async fn update_conference(
    store: &dyn DocumentStore,
    caller: &Caller,
    conference_id: &str,
    update: ConferenceUpdate,
) -> Result<Conference> {
    caller.require(&[Role::Organizer])?;

    let mut conference = get_conference(store, conference_id).await?;
    if conference.organizer_id != caller.uid {
        return Err(Error::Forbidden(format!(
            "user {} does not organize conference {}",
            caller.uid, conference_id
        )));
    }

    if let Some(name) = update.name {
        conference.name = required_name(&name)?;
    }
    if let Some(description) = update.description {
        conference.description = description.trim().to_string();
    }
    if let Some(location) = update.location {
        conference.location = location.trim().to_string();
    }
    if let Some(start_date) = update.start_date {
        conference.start_date = start_date.trim().to_string();
    }
    if let Some(end_date) = update.end_date {
        conference.end_date = end_date.trim().to_string();
    }
    validate_dates(&conference.start_date, &conference.end_date)?;

    conference.updated_at = now_timestamp();
    store.update_conference_details(&conference).await?;

    info!("Conference {} updated by {}", conference.id, caller.uid);
    Ok(conference)
}

pub async fn get_conference(store: &dyn DocumentStore, conference_id: &str) -> Result<Conference> {
    store
        .get_conference(conference_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("conference {} not found", conference_id)))
}

/// All conferences, or only the caller's own when `mine` is set
///
/// `mine` is meaningful for organizers only.
pub async fn list_conferences(
    store: &dyn DocumentStore,
    caller: &Caller,
    mine: bool,
) -> Result<Vec<Conference>> {
    if mine {
        caller.require(&[Role::Organizer])?;
        store.conferences_by_organizer(&caller.uid).await
    } else {
        store.list_conferences().await
    }
}
