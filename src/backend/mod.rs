//! The four operations the comment session consumes.
//!
//! Records cross this boundary as raw [`serde_json::Value`]s. Nothing here is
//! normalized; that is [`crate::session::normalize`]'s job.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub mod github;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Octocrab(#[from] octocrab::Error),
    #[error("invalid post id {0:?}")]
    InvalidPostId(String),
    #[error("invalid comment id {0:?}")]
    InvalidCommentId(String),
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait CommentBackend: Send + Sync {
    /// All comments attached to `post_id`. Expected to be an array; anything else is
    /// read as an empty list.
    async fn fetch_comments(&self, post_id: &str) -> Result<Value, BackendError>;

    /// Posts a comment, returning the stored record if the backend echoes one.
    async fn create_comment(
        &self,
        post_id: &str,
        text: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<Value>, BackendError>;

    async fn toggle_like(&self, comment_id: &str) -> Result<(), BackendError>;

    /// Users whose handle matches `query`, as `{ id, name, .. }` records.
    async fn search_mentions(&self, query: &str) -> Result<Value, BackendError>;
}
