use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::auth::auth::{can, Actor, Capability};
use crate::clients::app_client;
use crate::db::store::CollabStore;
use crate::models::{
    extract_mentions, CollabError, Comment, CommentStatus, CommentThread, CommentType,
};

/// CRUD, threading and mention extraction for inline comments.
///
/// Comments are append/soft-delete only. This service decides who gets a
/// mention notification; delivery belongs to the application backend.
pub struct CommentService {
    store: Arc<dyn CollabStore>,
}

impl CommentService {
    pub fn new(store: Arc<dyn CollabStore>) -> Arc<Self> {
        Arc::new(Self { store })
    }

    pub async fn add_comment(
        &self,
        actor: &Actor,
        document_id: Uuid,
        body: String,
        parent_comment_id: Option<Uuid>,
        position_selector: serde_json::Value,
        comment_type: CommentType,
    ) -> Result<Comment, CollabError> {
        let exists = self
            .store
            .document_exists(document_id)
            .await
            .map_err(|e| CollabError::Storage(e.to_string()))?;
        if !exists {
            return Err(CollabError::DocumentNotFound(document_id.to_string()));
        }

        // A reply must reference a live comment in the same document
        if let Some(parent_id) = parent_comment_id {
            let parent = self
                .store
                .get_comment(parent_id)
                .await
                .map_err(|e| CollabError::Storage(e.to_string()))?
                .ok_or_else(|| CollabError::CommentNotFound(parent_id.to_string()))?;
            if parent.document_id != document_id || parent.is_deleted() {
                return Err(CollabError::CommentNotFound(parent_id.to_string()));
            }
        }

        let mentioned_user_ids = extract_mentions(&body);
        let created_at = Utc::now();
        let comment = Comment {
            comment_id: Uuid::new_v4(),
            document_id,
            org_id: actor.org_id.clone(),
            parent_comment_id,
            author_id: actor.user_id.clone(),
            body,
            mentioned_user_ids,
            comment_type,
            position_selector,
            status: CommentStatus::Open,
            pinned: false,
            created_at,
            editable_until: Comment::editable_until_from(created_at),
            deleted_at: None,
        };

        self.store
            .insert_comment(&comment)
            .await
            .map_err(|e| CollabError::Storage(e.to_string()))?;
        info!(
            "Comment {} added to document {} by {}",
            comment.comment_id, document_id, actor.user_id
        );

        self.notify_mentions(&comment);
        Ok(comment)
    }

    /// Edits are permitted only by the author and only inside the edit
    /// window. The mention list is derived at creation time and is not
    /// recomputed here.
    pub async fn edit_comment(
        &self,
        actor: &Actor,
        comment_id: Uuid,
        new_body: String,
    ) -> Result<Comment, CollabError> {
        let mut comment = self.get_live_comment(comment_id).await?;
        if !can(actor, Capability::EditComment, Some(&comment.author_id)) {
            return Err(CollabError::NotAuthor);
        }
        if !comment.edit_window_open(Utc::now()) {
            return Err(CollabError::EditWindowExpired);
        }
        comment.body = new_body;
        self.store
            .update_comment(&comment)
            .await
            .map_err(|e| CollabError::Storage(e.to_string()))?;
        Ok(comment)
    }

    /// Any participant may resolve; resolution is a collaborative signal.
    /// Resolving a parent does not cascade to its replies.
    pub async fn resolve(&self, actor: &Actor, comment_id: Uuid) -> Result<Comment, CollabError> {
        self.set_status(actor, comment_id, CommentStatus::Resolved)
            .await
    }

    pub async fn reopen(&self, actor: &Actor, comment_id: Uuid) -> Result<Comment, CollabError> {
        self.set_status(actor, comment_id, CommentStatus::Open).await
    }

    async fn set_status(
        &self,
        actor: &Actor,
        comment_id: Uuid,
        status: CommentStatus,
    ) -> Result<Comment, CollabError> {
        let mut comment = self.get_live_comment(comment_id).await?;
        if !can(actor, Capability::ResolveComment, Some(&comment.author_id)) {
            return Err(CollabError::InsufficientRole);
        }
        comment.status = status;
        self.store
            .update_comment(&comment)
            .await
            .map_err(|e| CollabError::Storage(e.to_string()))?;
        Ok(comment)
    }

    /// UI emphasis only, no business-rule side effects
    pub async fn pin(&self, actor: &Actor, comment_id: Uuid) -> Result<Comment, CollabError> {
        let mut comment = self.get_live_comment(comment_id).await?;
        if !can(actor, Capability::PinComment, Some(&comment.author_id)) {
            return Err(CollabError::InsufficientRole);
        }
        comment.pinned = !comment.pinned;
        self.store
            .update_comment(&comment)
            .await
            .map_err(|e| CollabError::Storage(e.to_string()))?;
        Ok(comment)
    }

    /// Soft delete, permitted for the author or an administrator
    pub async fn delete(&self, actor: &Actor, comment_id: Uuid) -> Result<Comment, CollabError> {
        let mut comment = self.get_live_comment(comment_id).await?;
        if !can(actor, Capability::DeleteComment, Some(&comment.author_id)) {
            return Err(CollabError::InsufficientRole);
        }
        comment.deleted_at = Some(Utc::now());
        self.store
            .update_comment(&comment)
            .await
            .map_err(|e| CollabError::Storage(e.to_string()))?;
        info!("Comment {} deleted by {}", comment_id, actor.user_id);
        Ok(comment)
    }

    /// Comment threads for a document: top-level comments pinned-first then
    /// oldest-first, each with its replies oldest-first.
    pub async fn list_threads(&self, document_id: Uuid) -> Result<Vec<CommentThread>, CollabError> {
        let exists = self
            .store
            .document_exists(document_id)
            .await
            .map_err(|e| CollabError::Storage(e.to_string()))?;
        if !exists {
            return Err(CollabError::DocumentNotFound(document_id.to_string()));
        }

        let comments = self
            .store
            .list_comments(document_id)
            .await
            .map_err(|e| CollabError::Storage(e.to_string()))?;

        let mut top_level: Vec<Comment> = Vec::new();
        let mut replies: Vec<Comment> = Vec::new();
        for comment in comments {
            if comment.parent_comment_id.is_none() {
                top_level.push(comment);
            } else {
                replies.push(comment);
            }
        }
        top_level.sort_by(|a, b| {
            b.pinned
                .cmp(&a.pinned)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });

        let threads = top_level
            .into_iter()
            .map(|comment| {
                let children: Vec<Comment> = replies
                    .iter()
                    .filter(|r| r.parent_comment_id == Some(comment.comment_id))
                    .cloned()
                    .collect();
                CommentThread {
                    comment,
                    replies: children,
                }
            })
            .collect();
        Ok(threads)
    }

    async fn get_live_comment(&self, comment_id: Uuid) -> Result<Comment, CollabError> {
        let comment = self
            .store
            .get_comment(comment_id)
            .await
            .map_err(|e| CollabError::Storage(e.to_string()))?
            .ok_or_else(|| CollabError::CommentNotFound(comment_id.to_string()))?;
        if comment.is_deleted() {
            return Err(CollabError::CommentNotFound(comment_id.to_string()));
        }
        Ok(comment)
    }

    /// Fire-and-forget mention notification via the application backend
    fn notify_mentions(&self, comment: &Comment) {
        let to_notify: Vec<String> = comment
            .mentioned_user_ids
            .iter()
            .filter(|uid| **uid != comment.author_id)
            .cloned()
            .collect();
        if to_notify.is_empty() {
            return;
        }
        let Some(client) = app_client::get_app_client() else {
            return;
        };
        let document_id = comment.document_id;
        let comment_id = comment.comment_id;
        let author_id = comment.author_id.clone();
        tokio::spawn(async move {
            if let Err(e) = client
                .notify_mentions(document_id, comment_id, &author_id, &to_notify)
                .await
            {
                error!(
                    "Failed to deliver mention notifications for comment {}: {}",
                    comment_id, e
                );
            }
        });
    }
}
