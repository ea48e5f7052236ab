//! SQLite-backed document store
//!
//! Each collection is one table. Array and map fields live in JSON text
//! columns and are parsed into typed records here, so nothing above this
//! layer handles raw documents.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use super::store::{
    ArrayField, CollectionCounts, DocumentStore, WriteBatch, WriteOp, MAX_IDS_PER_QUERY,
};
use crate::decision::{extract_statuses, Decision};
use crate::models::{Conference, Paper, Role, User};
use crate::{Error, Result};

const USER_COLUMNS: &str = "id, name, email, role, assigned_papers, created_at";
const CONFERENCE_COLUMNS: &str = "id, name, description, location, start_date, end_date, \
     organizer_id, paper_ids, created_at, updated_at";
const PAPER_COLUMNS: &str = "id, title, author_id, conference_id, reviewer_ids, \
     reviewer_statuses, created_at, updated_at";

/// Document store over a SQLite pool
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Parse a stored id array, skipping anything that is not a string
fn parse_id_array(raw: &str) -> Result<Vec<String>> {
    let value: Value = serde_json::from_str(raw)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let assigned: String = row.try_get("assigned_papers")?;
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        role: row.try_get("role")?,
        assigned_papers: parse_id_array(&assigned)?,
        created_at: row.try_get("created_at")?,
    })
}

fn conference_from_row(row: &SqliteRow) -> Result<Conference> {
    let paper_ids: String = row.try_get("paper_ids")?;
    Ok(Conference {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        location: row.try_get("location")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        organizer_id: row.try_get("organizer_id")?,
        paper_ids: parse_id_array(&paper_ids)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn paper_from_row(row: &SqliteRow) -> Result<Paper> {
    let reviewer_ids: String = row.try_get("reviewer_ids")?;
    let statuses: String = row.try_get("reviewer_statuses")?;
    let statuses: Value = serde_json::from_str(&statuses)?;

    Ok(Paper {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        author_id: row.try_get("author_id")?,
        conference_id: row.try_get("conference_id")?,
        reviewer_ids: parse_id_array(&reviewer_ids)?,
        reviewer_statuses: extract_statuses(&statuses),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn check_id_count(ids: &[String]) -> Result<()> {
    if ids.len() > MAX_IDS_PER_QUERY {
        return Err(Error::InvalidArgument(format!(
            "at most {} ids per query, got {}",
            MAX_IDS_PER_QUERY,
            ids.len()
        )));
    }
    Ok(())
}

/// (table, column) for an array field
fn array_target(field: &ArrayField) -> (&'static str, &'static str, &str) {
    match field {
        ArrayField::ConferencePaperIds { conference_id } => {
            ("conferences", "paper_ids", conference_id.as_str())
        }
        ArrayField::UserAssignedPapers { user_id } => {
            ("users", "assigned_papers", user_id.as_str())
        }
    }
}

fn map_insert_error(err: sqlx::Error, what: &str) -> Error {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            Error::Conflict(format!("{} already exists", what))
        }
        _ => Error::Database(err),
    }
}

async fn apply_op(conn: &mut SqliteConnection, op: &WriteOp) -> Result<()> {
    let (affected, target) = match op {
        WriteOp::SetPaperReviewers {
            paper_id,
            reviewer_ids,
            reviewer_statuses,
            updated_at,
        } => {
            let result = sqlx::query(
                "UPDATE papers SET reviewer_ids = ?, reviewer_statuses = ?, updated_at = ? \
                 WHERE id = ?",
            )
            .bind(serde_json::to_string(reviewer_ids)?)
            .bind(serde_json::to_string(reviewer_statuses)?)
            .bind(updated_at)
            .bind(paper_id)
            .execute(&mut *conn)
            .await?;
            (result.rows_affected(), format!("paper {}", paper_id))
        }
        WriteOp::ArrayUnion { field, value } => {
            let (table, column, id) = array_target(field);
            // Single statement, so concurrent unions on one document serialize
            let sql = format!(
                "UPDATE {table} SET {column} = CASE \
                     WHEN EXISTS (SELECT 1 FROM json_each({table}.{column}) WHERE value = ?1) \
                     THEN {column} \
                     ELSE json_insert({column}, '$[#]', ?1) \
                 END \
                 WHERE id = ?2"
            );
            let result = sqlx::query(&sql)
                .bind(value)
                .bind(id)
                .execute(&mut *conn)
                .await?;
            (result.rows_affected(), format!("{} {}", table, id))
        }
        WriteOp::ArrayRemove { field, value } => {
            let (table, column, id) = array_target(field);
            let sql = format!(
                "UPDATE {table} SET {column} = ( \
                     SELECT json_group_array(value) FROM json_each({table}.{column}) \
                     WHERE value != ?1 \
                 ) \
                 WHERE id = ?2"
            );
            sqlx::query(&sql)
                .bind(value)
                .bind(id)
                .execute(&mut *conn)
                .await?;
            // A missing document already holds no reference to `value`
            return Ok(());
        }
    };

    if affected == 0 {
        return Err(Error::Internal(format!("batch target {} does not exist", target)));
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_users(&self, ids: &[String]) -> Result<Vec<User>> {
        check_id_count(ids)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id IN ("
        ));
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn list_users_by_role(&self, role: Role) -> Result<Vec<User>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = ? ORDER BY created_at ASC, id ASC"
        ))
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, name, email, role, assigned_papers, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.role)
        .bind(serde_json::to_string(&user.assigned_papers)?)
        .bind(&user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, &format!("user {}", user.id)))?;
        Ok(())
    }

    async fn update_user_profile(&self, user: &User) -> Result<()> {
        let result = sqlx::query("UPDATE users SET name = ?, email = ?, role = ? WHERE id = ?")
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.role)
            .bind(&user.id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("user {}", user.id)));
        }
        Ok(())
    }

    async fn get_conference(&self, id: &str) -> Result<Option<Conference>> {
        let row = sqlx::query(&format!(
            "SELECT {CONFERENCE_COLUMNS} FROM conferences WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(conference_from_row).transpose()
    }

    async fn get_conferences(&self, ids: &[String]) -> Result<Vec<Conference>> {
        check_id_count(ids)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {CONFERENCE_COLUMNS} FROM conferences WHERE id IN ("
        ));
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(conference_from_row).collect()
    }

    async fn list_conferences(&self) -> Result<Vec<Conference>> {
        let rows = sqlx::query(&format!(
            "SELECT {CONFERENCE_COLUMNS} FROM conferences ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(conference_from_row).collect()
    }

    async fn conferences_by_organizer(&self, organizer_id: &str) -> Result<Vec<Conference>> {
        let rows = sqlx::query(&format!(
            "SELECT {CONFERENCE_COLUMNS} FROM conferences WHERE organizer_id = ? \
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(organizer_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(conference_from_row).collect()
    }

    async fn insert_conference(&self, conference: &Conference) -> Result<()> {
        sqlx::query(
            "INSERT INTO conferences (id, name, description, location, start_date, end_date, \
             organizer_id, paper_ids, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&conference.id)
        .bind(&conference.name)
        .bind(&conference.description)
        .bind(&conference.location)
        .bind(&conference.start_date)
        .bind(&conference.end_date)
        .bind(&conference.organizer_id)
        .bind(serde_json::to_string(&conference.paper_ids)?)
        .bind(&conference.created_at)
        .bind(&conference.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, &format!("conference {}", conference.id)))?;
        Ok(())
    }

    async fn update_conference_details(&self, conference: &Conference) -> Result<()> {
        let result = sqlx::query(
            "UPDATE conferences SET name = ?, description = ?, location = ?, \
             start_date = ?, end_date = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&conference.name)
        .bind(&conference.description)
        .bind(&conference.location)
        .bind(&conference.start_date)
        .bind(&conference.end_date)
        .bind(&conference.updated_at)
        .bind(&conference.id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("conference {}", conference.id)));
        }
        Ok(())
    }

    async fn get_paper(&self, id: &str) -> Result<Option<Paper>> {
        let row = sqlx::query(&format!("SELECT {PAPER_COLUMNS} FROM papers WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(paper_from_row).transpose()
    }

    async fn papers_by_author(&self, author_id: &str) -> Result<Vec<Paper>> {
        let rows = sqlx::query(&format!(
            "SELECT {PAPER_COLUMNS} FROM papers WHERE author_id = ? \
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(paper_from_row).collect()
    }

    async fn papers_by_reviewer(&self, reviewer_id: &str) -> Result<Vec<Paper>> {
        let rows = sqlx::query(&format!(
            "SELECT {PAPER_COLUMNS} FROM papers \
             WHERE EXISTS (SELECT 1 FROM json_each(papers.reviewer_ids) WHERE value = ?) \
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(reviewer_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(paper_from_row).collect()
    }

    async fn papers_in_conferences(&self, conference_ids: &[String]) -> Result<Vec<Paper>> {
        check_id_count(conference_ids)?;
        if conference_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {PAPER_COLUMNS} FROM papers WHERE conference_id IN ("
        ));
        let mut separated = qb.separated(", ");
        for id in conference_ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(") ORDER BY created_at ASC, id ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(paper_from_row).collect()
    }

    async fn insert_paper(&self, paper: &Paper) -> Result<()> {
        sqlx::query(
            "INSERT INTO papers (id, title, author_id, conference_id, reviewer_ids, \
             reviewer_statuses, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&paper.id)
        .bind(&paper.title)
        .bind(&paper.author_id)
        .bind(&paper.conference_id)
        .bind(serde_json::to_string(&paper.reviewer_ids)?)
        .bind(serde_json::to_string(&paper.reviewer_statuses)?)
        .bind(&paper.created_at)
        .bind(&paper.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, &format!("paper {}", paper.id)))?;
        Ok(())
    }

    async fn delete_paper(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM papers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_reviewer_status(
        &self,
        paper_id: &str,
        reviewer_id: &str,
        decision: Decision,
        updated_at: &str,
    ) -> Result<()> {
        // The uid is bound as an object key, never spliced into a JSON path
        let result = sqlx::query(
            "UPDATE papers \
             SET reviewer_statuses = json_patch(reviewer_statuses, json_object(?1, ?2)), \
                 updated_at = ?3 \
             WHERE id = ?4 \
               AND EXISTS (SELECT 1 FROM json_each(papers.reviewer_ids) WHERE value = ?1)",
        )
        .bind(reviewer_id)
        .bind(decision.as_str())
        .bind(updated_at)
        .bind(paper_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_paper(paper_id).await? {
                None => Err(Error::NotFound(format!("paper {}", paper_id))),
                Some(_) => Err(Error::Conflict(format!(
                    "reviewer {} is no longer assigned to paper {}",
                    reviewer_id, paper_id
                ))),
            };
        }
        Ok(())
    }

    async fn collection_counts(&self) -> Result<CollectionCounts> {
        let (conferences, papers, organizers, authors, reviewers): (i64, i64, i64, i64, i64) =
            sqlx::query_as(
                "SELECT \
                    (SELECT COUNT(*) FROM conferences), \
                    (SELECT COUNT(*) FROM papers), \
                    (SELECT COUNT(*) FROM users WHERE role = 'organizer'), \
                    (SELECT COUNT(*) FROM users WHERE role = 'author'), \
                    (SELECT COUNT(*) FROM users WHERE role = 'reviewer')",
            )
            .fetch_one(&self.pool)
            .await?;

        Ok(CollectionCounts {
            conferences: conferences as u64,
            papers: papers as u64,
            organizers: organizers as u64,
            authors: authors as u64,
            reviewers: reviewers as u64,
        })
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for op in batch.ops() {
            // Dropping `tx` on error rolls back everything applied so far
            apply_op(&mut tx, op).await?;
        }
        tx.commit().await?;

        debug!("Committed write batch ({} ops)", batch.len());
        Ok(())
    }
}
