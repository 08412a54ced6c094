use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// How long after creation a comment body may still be edited by its author.
pub const COMMENT_EDIT_WINDOW_MINUTES: i64 = 15;

/// Category of an inline comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CommentType {
    General,
    Suggestion,
    Question,
    Approval,
    Rejection,
    Annotation,
}

impl CommentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentType::General => "general",
            CommentType::Suggestion => "suggestion",
            CommentType::Question => "question",
            CommentType::Approval => "approval",
            CommentType::Rejection => "rejection",
            CommentType::Annotation => "annotation",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "general" => Some(CommentType::General),
            "suggestion" => Some(CommentType::Suggestion),
            "question" => Some(CommentType::Question),
            "approval" => Some(CommentType::Approval),
            "rejection" => Some(CommentType::Rejection),
            "annotation" => Some(CommentType::Annotation),
            _ => None,
        }
    }
}

/// Resolution state of a comment thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Open,
    Resolved,
}

impl CommentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentStatus::Open => "open",
            CommentStatus::Resolved => "resolved",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "open" => Some(CommentStatus::Open),
            "resolved" => Some(CommentStatus::Resolved),
            _ => None,
        }
    }
}

/// A threaded annotation on a position within a policy document
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub comment_id: Uuid,
    pub document_id: Uuid,
    pub org_id: String,
    /// Null for top-level comments
    pub parent_comment_id: Option<Uuid>,
    pub author_id: String,
    pub body: String,
    /// Derived from the body at creation time, never recomputed on edit
    pub mentioned_user_ids: Vec<String>,
    pub comment_type: CommentType,
    /// Opaque locator into the document, never interpreted by this core
    pub position_selector: serde_json::Value,
    pub status: CommentStatus,
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
    pub editable_until: DateTime<Utc>,
    /// Soft delete marker
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn edit_window_open(&self, now: DateTime<Utc>) -> bool {
        now <= self.editable_until
    }

    pub fn editable_until_from(created_at: DateTime<Utc>) -> DateTime<Utc> {
        created_at + Duration::minutes(COMMENT_EDIT_WINDOW_MINUTES)
    }
}

/// A top-level comment with its replies, as returned by the list endpoint
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommentThread {
    pub comment: Comment,
    pub replies: Vec<Comment>,
}

/// Extract mentioned user ids from a comment body.
///
/// Mentions use the fixed format `@[displayName](userId)`. The scan is pure
/// and deterministic: the result is the set of user ids syntactically present
/// in the body, deduplicated, in first-occurrence order.
pub fn extract_mentions(body: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let bytes = body.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'@' && i + 1 < bytes.len() && bytes[i + 1] == b'[' {
            // Find the closing "](" and then the closing ")"
            if let Some(name_end) = body[i + 2..].find("](") {
                let id_start = i + 2 + name_end + 2;
                if let Some(id_len) = body[id_start..].find(')') {
                    let user_id = &body[id_start..id_start + id_len];
                    if !user_id.is_empty() && !out.iter().any(|u| u == user_id) {
                        out.push(user_id.to_string());
                    }
                    i = id_start + id_len + 1;
                    continue;
                }
            }
        }
        // Advance by one UTF-8 code point
        i += 1;
        while i < bytes.len() && (bytes[i] & 0b1100_0000) == 0b1000_0000 {
            i += 1;
        }
    }
    out
}
