use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::store::{CollabStore, StoreError};
use crate::models::{
    CollabError, DiffLineType, DiffRecord, PolicyVersion, PolicyVersionSummary,
};

/// Attempts at version-number assignment before giving up. Collisions can
/// only come from another process writing the same document; the in-process
/// per-document lock already serializes local callers.
const SNAPSHOT_RETRY_ATTEMPTS: u32 = 3;

/// Creates immutable version records, computes diffs between versions and
/// performs rollback-as-new-version. The version log is append-only: no
/// record is ever mutated or deleted.
pub struct VersionService {
    store: Arc<dyn CollabStore>,
    doc_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl VersionService {
    pub fn new(store: Arc<dyn CollabStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            doc_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Per-document critical section for version number assignment.
    /// Snapshots for different documents never block each other.
    async fn doc_lock(&self, document_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.doc_locks.lock().await;
        locks
            .entry(document_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Append a new snapshot with the next version number for the document.
    pub async fn create_snapshot(
        &self,
        document_id: Uuid,
        org_id: &str,
        content: String,
        created_by: &str,
        change_summary: Option<String>,
    ) -> Result<PolicyVersion, CollabError> {
        self.snapshot_inner(
            document_id,
            org_id,
            content,
            created_by,
            change_summary,
            false,
            None,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn snapshot_inner(
        &self,
        document_id: Uuid,
        org_id: &str,
        content: String,
        created_by: &str,
        change_summary: Option<String>,
        is_rollback: bool,
        rollback_source_version_id: Option<Uuid>,
    ) -> Result<PolicyVersion, CollabError> {
        let exists = self
            .store
            .document_exists(document_id)
            .await
            .map_err(|e| CollabError::Storage(e.to_string()))?;
        if !exists {
            return Err(CollabError::DocumentNotFound(document_id.to_string()));
        }

        let lock = self.doc_lock(document_id).await;
        for attempt in 1..=SNAPSHOT_RETRY_ATTEMPTS {
            let _guard = lock.lock().await;

            let next_number = self
                .store
                .max_version_number(document_id)
                .await
                .map_err(|e| CollabError::Storage(e.to_string()))?
                + 1;

            let version = PolicyVersion {
                version_id: Uuid::new_v4(),
                document_id,
                org_id: org_id.to_string(),
                version_number: next_number,
                content: content.clone(),
                created_by: created_by.to_string(),
                created_at: Utc::now(),
                change_summary: change_summary.clone(),
                is_rollback,
                rollback_source_version_id,
            };

            match self.store.insert_version(&version).await {
                Ok(()) => {
                    info!(
                        "Created version {} (v{}) for document {}",
                        version.version_id, version.version_number, document_id
                    );
                    return Ok(version);
                }
                // Concurrent number assignment from another writer: re-read
                // the max under the lock and try again. Never surfaced.
                Err(StoreError::Conflict) => {
                    warn!(
                        "Snapshot conflict for document {} (attempt {}), retrying",
                        document_id, attempt
                    );
                    continue;
                }
                Err(e) => return Err(CollabError::Storage(e.to_string())),
            }
        }
        Err(CollabError::SnapshotConflict(document_id.to_string()))
    }

    /// Line-based LCS diff between two historical versions of a document.
    pub async fn diff(
        &self,
        document_id: Uuid,
        from_version_id: Uuid,
        to_version_id: Uuid,
    ) -> Result<Vec<DiffRecord>, CollabError> {
        let from = self.get_version_checked(document_id, from_version_id).await?;
        let to = self.get_version_checked(document_id, to_version_id).await?;
        Ok(diff_lines(&from.content, &to.content))
    }

    /// Roll a document back by appending a new version whose content equals
    /// the target's. History is never rewritten; the caller broadcasts
    /// `document_updated` to the live session afterwards.
    pub async fn rollback(
        &self,
        document_id: Uuid,
        target_version_id: Uuid,
        actor_id: &str,
    ) -> Result<PolicyVersion, CollabError> {
        let target = self
            .get_version_checked(document_id, target_version_id)
            .await?;
        self.snapshot_inner(
            document_id,
            &target.org_id,
            target.content.clone(),
            actor_id,
            Some(format!("Rollback to version {}", target.version_number)),
            true,
            Some(target.version_id),
        )
        .await
    }

    /// Newest-first page of version summaries
    pub async fn list(
        &self,
        document_id: Uuid,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<PolicyVersionSummary>, u64), CollabError> {
        let exists = self
            .store
            .document_exists(document_id)
            .await
            .map_err(|e| CollabError::Storage(e.to_string()))?;
        if !exists {
            return Err(CollabError::DocumentNotFound(document_id.to_string()));
        }
        let offset = page.saturating_sub(1).saturating_mul(per_page);
        self.store
            .list_versions(document_id, offset, per_page)
            .await
            .map_err(|e| CollabError::Storage(e.to_string()))
    }

    /// Fetch a version and verify it belongs to the document
    async fn get_version_checked(
        &self,
        document_id: Uuid,
        version_id: Uuid,
    ) -> Result<PolicyVersion, CollabError> {
        let version = self
            .store
            .get_version(version_id)
            .await
            .map_err(|e| CollabError::Storage(e.to_string()))?
            .ok_or_else(|| CollabError::VersionNotFound(version_id.to_string()))?;
        if version.document_id != document_id {
            return Err(CollabError::VersionNotFound(version_id.to_string()));
        }
        Ok(version)
    }
}

/// Line-based longest-common-subsequence diff.
///
/// Removed lines carry their 1-based index in `from`, added lines their
/// index in `to`, unchanged lines their index in `from`. Swapping the inputs
/// yields the structurally inverse diff (added and removed swapped,
/// unchanged lines identical).
pub fn diff_lines(from: &str, to: &str) -> Vec<DiffRecord> {
    let a: Vec<&str> = from.lines().collect();
    let b: Vec<&str> = to.lines().collect();
    let n = a.len();
    let m = b.len();

    // lcs[i][j] = length of the LCS of a[i..] and b[j..]
    let mut lcs = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut records = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);
    while i < n && j < m {
        if a[i] == b[j] {
            records.push(DiffRecord {
                line_type: DiffLineType::Unchanged,
                line_number: (i + 1) as u32,
                text: a[i].to_string(),
            });
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] > lcs[i][j + 1]
            // Equal-length branches mean more than one LCS exists. Breaking
            // the tie on line content keeps the walk symmetric under input
            // swap, so diff(A, B) stays the structural inverse of diff(B, A).
            || (lcs[i + 1][j] == lcs[i][j + 1] && a[i] < b[j])
        {
            records.push(DiffRecord {
                line_type: DiffLineType::Removed,
                line_number: (i + 1) as u32,
                text: a[i].to_string(),
            });
            i += 1;
        } else {
            records.push(DiffRecord {
                line_type: DiffLineType::Added,
                line_number: (j + 1) as u32,
                text: b[j].to_string(),
            });
            j += 1;
        }
    }
    while i < n {
        records.push(DiffRecord {
            line_type: DiffLineType::Removed,
            line_number: (i + 1) as u32,
            text: a[i].to_string(),
        });
        i += 1;
    }
    while j < m {
        records.push(DiffRecord {
            line_type: DiffLineType::Added,
            line_number: (j + 1) as u32,
            text: b[j].to_string(),
        });
        j += 1;
    }
    records
}
