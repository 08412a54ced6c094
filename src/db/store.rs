use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::models::{
    Comment, CommentStatus, CommentType, PolicyVersion, PolicyVersionSummary,
};

/// Storage-level error. `Conflict` marks a unique-index collision on
/// `(document_id, version_number)` so the version service can retry.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violation")]
    Conflict,
    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() {
                return StoreError::Conflict;
            }
        }
        StoreError::Database(e.to_string())
    }
}

/// CRUD boundary for persisted comments. Append/soft-delete only: rows are
/// never removed, deletion sets `deleted_at`.
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn insert_comment(&self, comment: &Comment) -> Result<(), StoreError>;
    async fn get_comment(&self, comment_id: Uuid) -> Result<Option<Comment>, StoreError>;
    /// Persists the mutable columns (body, status, pinned, deleted_at).
    async fn update_comment(&self, comment: &Comment) -> Result<(), StoreError>;
    /// Non-deleted comments for a document, oldest first.
    async fn list_comments(&self, document_id: Uuid) -> Result<Vec<Comment>, StoreError>;
}

/// CRUD boundary for the append-only version log.
#[async_trait]
pub trait VersionStore: Send + Sync {
    async fn insert_version(&self, version: &PolicyVersion) -> Result<(), StoreError>;
    async fn get_version(&self, version_id: Uuid) -> Result<Option<PolicyVersion>, StoreError>;
    async fn max_version_number(&self, document_id: Uuid) -> Result<i32, StoreError>;
    /// Newest-first page of version summaries plus the total count.
    async fn list_versions(
        &self,
        document_id: Uuid,
        offset: u32,
        limit: u32,
    ) -> Result<(Vec<PolicyVersionSummary>, u64), StoreError>;
    /// Whether the document exists in the external document store.
    async fn document_exists(&self, document_id: Uuid) -> Result<bool, StoreError>;
}

pub trait CollabStore: CommentStore + VersionStore {}
impl<T: CommentStore + VersionStore> CollabStore for T {}

/// Postgres-backed store
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new database connection pool
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        Ok(Self { pool })
    }
}

fn comment_from_row(row: &sqlx::postgres::PgRow) -> Result<Comment, StoreError> {
    let comment_type_str: String = row.try_get("comment_type")?;
    let status_str: String = row.try_get("status")?;
    let mentioned: serde_json::Value = row.try_get("mentioned_user_ids")?;
    let mentioned_user_ids: Vec<String> =
        serde_json::from_value(mentioned).unwrap_or_default();

    Ok(Comment {
        comment_id: row.try_get("id")?,
        document_id: row.try_get("document_id")?,
        org_id: row.try_get("org")?,
        parent_comment_id: row.try_get("parent_comment_id")?,
        author_id: row.try_get("author_id")?,
        body: row.try_get("body")?,
        mentioned_user_ids,
        comment_type: CommentType::from_str(&comment_type_str)
            .ok_or_else(|| StoreError::Database(format!("bad comment_type '{}'", comment_type_str)))?,
        position_selector: row.try_get("position_selector")?,
        status: CommentStatus::from_str(&status_str)
            .ok_or_else(|| StoreError::Database(format!("bad status '{}'", status_str)))?,
        pinned: row.try_get("pinned")?,
        created_at: row.try_get("created_at")?,
        editable_until: row.try_get("editable_until")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

#[async_trait]
impl CommentStore for PgStore {
    async fn insert_comment(&self, comment: &Comment) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO collaboration_comments
                (id, document_id, org, parent_comment_id, author_id, body,
                 mentioned_user_ids, comment_type, position_selector, status,
                 pinned, created_at, editable_until, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(comment.comment_id)
        .bind(comment.document_id)
        .bind(&comment.org_id)
        .bind(comment.parent_comment_id)
        .bind(&comment.author_id)
        .bind(&comment.body)
        .bind(serde_json::to_value(&comment.mentioned_user_ids).unwrap_or_default())
        .bind(comment.comment_type.as_str())
        .bind(&comment.position_selector)
        .bind(comment.status.as_str())
        .bind(comment.pinned)
        .bind(comment.created_at)
        .bind(comment.editable_until)
        .bind(comment.deleted_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_comment(&self, comment_id: Uuid) -> Result<Option<Comment>, StoreError> {
        let row = sqlx::query("SELECT * FROM collaboration_comments WHERE id = $1")
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(comment_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn update_comment(&self, comment: &Comment) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE collaboration_comments
            SET body = $2, status = $3, pinned = $4, deleted_at = $5
            WHERE id = $1
            "#,
        )
        .bind(comment.comment_id)
        .bind(&comment.body)
        .bind(comment.status.as_str())
        .bind(comment.pinned)
        .bind(comment.deleted_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_comments(&self, document_id: Uuid) -> Result<Vec<Comment>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM collaboration_comments
            WHERE document_id = $1 AND deleted_at IS NULL
            ORDER BY created_at ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        let mut comments = Vec::with_capacity(rows.len());
        for row in &rows {
            comments.push(comment_from_row(row)?);
        }
        Ok(comments)
    }
}

fn version_from_row(row: &sqlx::postgres::PgRow) -> Result<PolicyVersion, StoreError> {
    Ok(PolicyVersion {
        version_id: row.try_get("id")?,
        document_id: row.try_get("document_id")?,
        org_id: row.try_get("org")?,
        version_number: row.try_get("version_number")?,
        content: row.try_get("content")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
        change_summary: row.try_get("change_summary")?,
        is_rollback: row.try_get("is_rollback")?,
        rollback_source_version_id: row.try_get("rollback_source_version_id")?,
    })
}

#[async_trait]
impl VersionStore for PgStore {
    async fn insert_version(&self, version: &PolicyVersion) -> Result<(), StoreError> {
        // Relies on the unique index on (document_id, version_number) to
        // surface concurrent number assignment as StoreError::Conflict.
        sqlx::query(
            r#"
            INSERT INTO policy_versions
                (id, document_id, org, version_number, content, created_by,
                 created_at, change_summary, is_rollback, rollback_source_version_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(version.version_id)
        .bind(version.document_id)
        .bind(&version.org_id)
        .bind(version.version_number)
        .bind(&version.content)
        .bind(&version.created_by)
        .bind(version.created_at)
        .bind(&version.change_summary)
        .bind(version.is_rollback)
        .bind(version.rollback_source_version_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_version(&self, version_id: Uuid) -> Result<Option<PolicyVersion>, StoreError> {
        let row = sqlx::query("SELECT * FROM policy_versions WHERE id = $1")
            .bind(version_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(version_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn max_version_number(&self, document_id: Uuid) -> Result<i32, StoreError> {
        let row = sqlx::query(
            "SELECT COALESCE(MAX(version_number), 0) AS max_version FROM policy_versions WHERE document_id = $1",
        )
        .bind(document_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("max_version")?)
    }

    async fn list_versions(
        &self,
        document_id: Uuid,
        offset: u32,
        limit: u32,
    ) -> Result<(Vec<PolicyVersionSummary>, u64), StoreError> {
        let total_row = sqlx::query(
            "SELECT COUNT(*) AS total FROM policy_versions WHERE document_id = $1",
        )
        .bind(document_id)
        .fetch_one(&self.pool)
        .await?;
        let total: i64 = total_row.try_get("total")?;

        let rows = sqlx::query(
            r#"
            SELECT * FROM policy_versions
            WHERE document_id = $1
            ORDER BY version_number DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(document_id)
        .bind(i64::from(offset))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        let mut versions = Vec::with_capacity(rows.len());
        for row in &rows {
            let v = version_from_row(row)?;
            versions.push(PolicyVersionSummary::from(&v));
        }
        Ok((versions, total as u64))
    }

    async fn document_exists(&self, document_id: Uuid) -> Result<bool, StoreError> {
        // The documents table is owned by the external document store; this
        // core only reads existence.
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM policy_documents WHERE id = $1 AND deleted_at IS NULL) AS found",
        )
        .bind(document_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("found")?)
    }
}
