//! Optimistic like toggling.
//!
//! The local flip is final: the backend call is fired and forgotten, and a failure
//! only shows up in the log. Local state may drift from the server until the next
//! fetch. Upstream toggles for one comment run one after another, since a backend
//! may read the current reaction before writing the flipped one.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{backend::CommentBackend, session::normalize::LikeState};

/// Flips `state` in place and returns the new `is_liked`.
pub fn toggle(state: &mut LikeState) -> bool {
    if state.is_liked {
        state.count = state.count.saturating_sub(1);
    } else {
        state.count += 1;
    }
    state.is_liked = !state.is_liked;
    state.is_liked
}

/// One lane per comment id. Toggles in the same lane never overlap upstream.
#[derive(Debug, Default)]
pub struct ReactionQueue {
    lanes: HashMap<String, Arc<Mutex<()>>>,
}

impl ReactionQueue {
    /// Sends the toggle upstream without waiting for it.
    pub fn dispatch(&mut self, backend: Arc<dyn CommentBackend>, comment_id: String) {
        let lane = self.lanes.entry(comment_id.clone()).or_default().clone();
        tokio::spawn(async move {
            let _turn = lane.lock().await;
            match backend.toggle_like(&comment_id).await {
                Ok(()) => debug!(%comment_id, "Like toggled upstream"),
                Err(err) => warn!(%comment_id, %err, "Like toggle failed, local state kept"),
            }
        });
    }
}
