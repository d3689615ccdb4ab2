//! The comment session controller.
//!
//! [`CommentSession`] owns the comment list, the compose box and the mention panel for
//! one open post. I/O never touches this state directly: operations spawn tasks that
//! report back as [`SessionEvent`]s on the channel handed to [`CommentSession::new`],
//! and whoever owns the session feeds them to [`CommentSession::handle_event`].
//!
//! Fetch and send completions carry the generation they were issued under. Opening a
//! different post or closing the session bumps the generation, so late results land
//! nowhere.

use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc::Sender;
use tracing::{debug, info, instrument, warn};

use crate::backend::CommentBackend;

pub mod mention;
pub mod normalize;
pub mod reaction;

use mention::{MentionSearch, splice_mention};
use reaction::ReactionQueue;
use normalize::{
    Comment, LOCAL_ID_PREFIX, LikeState, MentionCandidate, normalize, normalize_all,
};

#[derive(Debug, Clone)]
pub enum SessionEvent {
    CommentsLoaded {
        generation: u64,
        comments: Vec<Comment>,
    },
    CommentsFailed {
        generation: u64,
        message: String,
    },
    CommentPosted {
        generation: u64,
        comment: Option<Comment>,
    },
    CommentPostFailed {
        generation: u64,
        message: String,
    },
    MentionDebounceElapsed {
        seq: u64,
    },
    MentionResults {
        seq: u64,
        result: Result<Vec<MentionCandidate>, String>,
    },
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub mention_debounce: Duration,
    pub mention_min_chars: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mention_debounce: Duration::from_millis(500),
            mention_min_chars: 2,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Closed,
    Loading,
    Loaded,
}

#[derive(Debug, Default, Clone)]
pub struct ComposeState {
    pub draft: String,
    pub reply_target: Option<Comment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Dispatched,
    /// A send is already outstanding.
    Busy,
    /// Draft was empty or whitespace only; nothing was sent.
    EmptyDraft,
    NotLoaded,
}

pub struct CommentSession {
    backend: Arc<dyn CommentBackend>,
    events: Sender<SessionEvent>,
    state: SessionState,
    post_id: Option<String>,
    generation: u64,
    comments: Vec<Comment>,
    compose: ComposeState,
    sending: bool,
    mentions: MentionSearch,
    reactions: ReactionQueue,
    alert: Option<String>,
}

impl CommentSession {
    pub fn new(
        backend: Arc<dyn CommentBackend>,
        events: Sender<SessionEvent>,
        config: SessionConfig,
    ) -> Self {
        let mentions = MentionSearch::new(
            backend.clone(),
            events.clone(),
            config.mention_debounce,
            config.mention_min_chars,
        );
        Self {
            backend,
            events,
            state: SessionState::Closed,
            post_id: None,
            generation: 0,
            comments: Vec::new(),
            compose: ComposeState::default(),
            sending: false,
            mentions,
            reactions: ReactionQueue::default(),
            alert: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn post_id(&self) -> Option<&str> {
        self.post_id.as_deref()
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn compose(&self) -> &ComposeState {
        &self.compose
    }

    pub fn draft(&self) -> &str {
        &self.compose.draft
    }

    pub fn reply_target(&self) -> Option<&Comment> {
        self.compose.reply_target.as_ref()
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    pub fn mentions(&self) -> &MentionSearch {
        &self.mentions
    }

    pub fn mentions_mut(&mut self) -> &mut MentionSearch {
        &mut self.mentions
    }

    /// The pending user-facing error, if any.
    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn take_alert(&mut self) -> Option<String> {
        self.alert.take()
    }

    /// Opens the session on `post_id` and starts the fetch. Re-opening the post that
    /// is already open does nothing.
    #[instrument(skip_all)]
    pub fn open(&mut self, post_id: impl Into<String>) {
        let post_id = post_id.into();
        if self.state != SessionState::Closed && self.post_id.as_deref() == Some(post_id.as_str())
        {
            debug!("Session already open");
            return;
        }
        self.reset();
        self.post_id = Some(post_id.clone());
        self.state = SessionState::Loading;
        info!(%post_id, generation = self.generation, "Opening comment session");

        let backend = self.backend.clone();
        let events = self.events.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let event = match backend.fetch_comments(&post_id).await {
                Ok(raw) => SessionEvent::CommentsLoaded {
                    generation,
                    comments: normalize_all(&raw),
                },
                Err(err) => SessionEvent::CommentsFailed {
                    generation,
                    message: err.to_string().replace('\n', " "),
                },
            };
            let _ = events.send(event).await;
        });
    }

    /// Drops the list and compose state. Outstanding operations are abandoned.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        info!(post_id = ?self.post_id, "Closing comment session");
        self.reset();
    }

    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::CommentsLoaded {
                generation,
                comments,
            } => {
                if self.is_stale(generation) {
                    return;
                }
                info!("Loaded {} comments", comments.len());
                self.comments = comments;
                self.state = SessionState::Loaded;
            }
            SessionEvent::CommentsFailed {
                generation,
                message,
            } => {
                if self.is_stale(generation) {
                    return;
                }
                warn!(post_id = ?self.post_id, %message, "Failed to load comments");
                self.comments.clear();
                self.state = SessionState::Loaded;
            }
            SessionEvent::CommentPosted {
                generation,
                comment,
            } => {
                if self.is_stale(generation) {
                    return;
                }
                self.sending = false;
                if let Some(mut comment) = comment {
                    comment.id = self.unclaimed_id(comment.id);
                    info!(id = %comment.id, "Comment posted");
                    self.comments.push(comment);
                }
                self.compose = ComposeState::default();
                self.mentions.dismiss();
            }
            SessionEvent::CommentPostFailed {
                generation,
                message,
            } => {
                if self.is_stale(generation) {
                    return;
                }
                self.sending = false;
                warn!(%message, "Failed to post comment");
                self.alert = Some(format!("Could not send comment: {message}"));
            }
            SessionEvent::MentionDebounceElapsed { seq } => self.mentions.on_timer_elapsed(seq),
            SessionEvent::MentionResults { seq, result } => self.mentions.on_results(seq, result),
        }
    }

    /// Replaces the draft, as on every keystroke.
    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.compose.draft = text.into();
        self.mentions.on_draft_changed(&self.compose.draft);
    }

    /// Targets `comment_id` for the next send and seeds the draft with `@author `.
    pub fn reply_to(&mut self, comment_id: &str) -> bool {
        let Some(target) = self.comments.iter().find(|c| c.id == comment_id).cloned() else {
            return false;
        };
        let seed = format!("@{} ", target.author.name);
        self.compose.reply_target = Some(target);
        self.set_draft(seed);
        true
    }

    /// Clears the reply target; the draft is left as typed.
    pub fn cancel_reply(&mut self) {
        self.compose.reply_target = None;
    }

    /// Flips the like on `comment_id` locally and tells the backend in the background.
    pub fn toggle_like(&mut self, comment_id: &str) -> Option<LikeState> {
        let comment = self.comments.iter_mut().find(|c| c.id == comment_id)?;
        reaction::toggle(&mut comment.like_state);
        let state = comment.like_state;
        self.reactions.dispatch(self.backend.clone(), comment.id.clone());
        Some(state)
    }

    /// Splices the candidate at `index` into the draft and closes the panel.
    pub fn select_mention(&mut self, index: usize) -> bool {
        let Some(candidate) = self.mentions.candidates().get(index).cloned() else {
            return false;
        };
        self.compose.draft = splice_mention(&self.compose.draft, &candidate.name);
        self.mentions.dismiss();
        true
    }

    pub fn select_highlighted_mention(&mut self) -> bool {
        self.select_mention(self.mentions.highlighted())
    }

    #[instrument(skip(self))]
    pub fn send(&mut self) -> SendOutcome {
        if self.state != SessionState::Loaded {
            return SendOutcome::NotLoaded;
        }
        if self.sending {
            return SendOutcome::Busy;
        }
        let text = self.compose.draft.trim();
        if text.is_empty() {
            return SendOutcome::EmptyDraft;
        }
        let Some(post_id) = self.post_id.clone() else {
            return SendOutcome::NotLoaded;
        };
        let text = text.to_string();
        let parent_id = self.compose.reply_target.as_ref().map(|c| c.id.clone());
        self.sending = true;
        self.alert = None;
        debug!(?parent_id, "Sending comment");

        let backend = self.backend.clone();
        let events = self.events.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let event = match backend
                .create_comment(&post_id, &text, parent_id.as_deref())
                .await
            {
                Ok(raw) => SessionEvent::CommentPosted {
                    generation,
                    comment: raw.as_ref().map(normalize),
                },
                Err(err) => SessionEvent::CommentPostFailed {
                    generation,
                    message: err.to_string().replace('\n', " "),
                },
            };
            let _ = events.send(event).await;
        });
        SendOutcome::Dispatched
    }

    fn reset(&mut self) {
        self.generation += 1;
        self.state = SessionState::Closed;
        self.post_id = None;
        self.comments.clear();
        self.compose = ComposeState::default();
        self.sending = false;
        self.alert = None;
        self.mentions.dismiss();
    }

    /// Placeholder ids are only unique within one fetch; suffix one that is already taken.
    fn unclaimed_id(&self, id: String) -> String {
        let taken = |candidate: &str| self.comments.iter().any(|c| c.id == candidate);
        if !id.starts_with(LOCAL_ID_PREFIX) || !taken(&id) {
            return id;
        }
        let mut n = self.comments.len();
        loop {
            let candidate = format!("{id}-{n}");
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn is_stale(&self, generation: u64) -> bool {
        let stale = generation != self.generation;
        if stale {
            debug!(
                generation,
                current = self.generation,
                "Dropping result from a superseded session"
            );
        }
        stale
    }
}
