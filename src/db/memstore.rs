use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::store::{CommentStore, StoreError, VersionStore};
use crate::models::{Comment, PolicyVersion, PolicyVersionSummary};

/// In-memory store, used by the test suite and the no-database dev mode.
///
/// Documents must be registered before joins or snapshots touch them, the
/// same way rows would exist in the external document table.
#[derive(Default)]
pub struct MemStore {
    comments: Mutex<Vec<Comment>>,
    versions: Mutex<Vec<PolicyVersion>>,
    documents: Mutex<HashSet<Uuid>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register_document(&self, document_id: Uuid) {
        self.documents.lock().await.insert(document_id);
    }
}

#[async_trait]
impl CommentStore for MemStore {
    async fn insert_comment(&self, comment: &Comment) -> Result<(), StoreError> {
        self.comments.lock().await.push(comment.clone());
        Ok(())
    }

    async fn get_comment(&self, comment_id: Uuid) -> Result<Option<Comment>, StoreError> {
        Ok(self
            .comments
            .lock()
            .await
            .iter()
            .find(|c| c.comment_id == comment_id)
            .cloned())
    }

    async fn update_comment(&self, comment: &Comment) -> Result<(), StoreError> {
        let mut comments = self.comments.lock().await;
        match comments
            .iter_mut()
            .find(|c| c.comment_id == comment.comment_id)
        {
            Some(existing) => {
                existing.body = comment.body.clone();
                existing.status = comment.status;
                existing.pinned = comment.pinned;
                existing.deleted_at = comment.deleted_at;
                Ok(())
            }
            None => Err(StoreError::Database(format!(
                "comment {} not found",
                comment.comment_id
            ))),
        }
    }

    async fn list_comments(&self, document_id: Uuid) -> Result<Vec<Comment>, StoreError> {
        let mut out: Vec<Comment> = self
            .comments
            .lock()
            .await
            .iter()
            .filter(|c| c.document_id == document_id && c.deleted_at.is_none())
            .cloned()
            .collect();
        out.sort_by_key(|c| c.created_at);
        Ok(out)
    }
}

#[async_trait]
impl VersionStore for MemStore {
    async fn insert_version(&self, version: &PolicyVersion) -> Result<(), StoreError> {
        let mut versions = self.versions.lock().await;
        // Mirror the unique index on (document_id, version_number)
        if versions.iter().any(|v| {
            v.document_id == version.document_id && v.version_number == version.version_number
        }) {
            return Err(StoreError::Conflict);
        }
        versions.push(version.clone());
        Ok(())
    }

    async fn get_version(&self, version_id: Uuid) -> Result<Option<PolicyVersion>, StoreError> {
        Ok(self
            .versions
            .lock()
            .await
            .iter()
            .find(|v| v.version_id == version_id)
            .cloned())
    }

    async fn max_version_number(&self, document_id: Uuid) -> Result<i32, StoreError> {
        Ok(self
            .versions
            .lock()
            .await
            .iter()
            .filter(|v| v.document_id == document_id)
            .map(|v| v.version_number)
            .max()
            .unwrap_or(0))
    }

    async fn list_versions(
        &self,
        document_id: Uuid,
        offset: u32,
        limit: u32,
    ) -> Result<(Vec<PolicyVersionSummary>, u64), StoreError> {
        let versions = self.versions.lock().await;
        let mut matching: Vec<&PolicyVersion> = versions
            .iter()
            .filter(|v| v.document_id == document_id)
            .collect();
        matching.sort_by(|a, b| b.version_number.cmp(&a.version_number));
        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(PolicyVersionSummary::from)
            .collect();
        Ok((page, total))
    }

    async fn document_exists(&self, document_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.documents.lock().await.contains(&document_id))
    }
}
