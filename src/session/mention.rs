//! Debounced `@mention` lookups for the compose box.
//!
//! Every draft change re-evaluates the trailing token. Only a token of at least
//! `min_chars` characters after the `@` arms the debounce timer; when it fires the
//! panel opens and one lookup goes out. Each arm or reset bumps `seq`, and results
//! tagged with an older `seq` are dropped.

use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc::Sender;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, trace};

use crate::{
    backend::CommentBackend,
    session::{
        SessionEvent,
        normalize::{MentionCandidate, mention_candidates},
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MentionPhase {
    #[default]
    Idle,
    /// `@` plus fewer than `min_chars` characters. Suggestions are hidden.
    Pending,
    /// Waiting for the debounce timer.
    Armed { query: String },
    /// Panel shown, lookup in flight.
    Searching { query: String },
    Resolved,
}

/// Single-slot debounce timer. Dropping it cancels the unfired timer.
struct DebounceTimer {
    _guard: DropGuard,
}

impl DebounceTimer {
    fn start(delay: Duration, seq: u64, events: Sender<SessionEvent>) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = events.send(SessionEvent::MentionDebounceElapsed { seq }).await;
                }
            }
        });
        Self {
            _guard: cancel.drop_guard(),
        }
    }
}

pub struct MentionSearch {
    backend: Arc<dyn CommentBackend>,
    events: Sender<SessionEvent>,
    debounce: Duration,
    min_chars: usize,
    phase: MentionPhase,
    timer: Option<DebounceTimer>,
    seq: u64,
    panel_visible: bool,
    candidates: Vec<MentionCandidate>,
    highlighted: usize,
}

impl MentionSearch {
    pub fn new(
        backend: Arc<dyn CommentBackend>,
        events: Sender<SessionEvent>,
        debounce: Duration,
        min_chars: usize,
    ) -> Self {
        Self {
            backend,
            events,
            debounce,
            min_chars: min_chars.max(1),
            phase: MentionPhase::default(),
            timer: None,
            seq: 0,
            panel_visible: false,
            candidates: Vec::new(),
            highlighted: 0,
        }
    }

    pub fn phase(&self) -> &MentionPhase {
        &self.phase
    }

    pub fn is_panel_visible(&self) -> bool {
        self.panel_visible
    }

    pub fn candidates(&self) -> &[MentionCandidate] {
        &self.candidates
    }

    pub fn highlighted(&self) -> usize {
        self.highlighted
    }

    pub fn highlighted_candidate(&self) -> Option<&MentionCandidate> {
        self.candidates.get(self.highlighted)
    }

    pub fn highlight_next(&mut self) {
        if !self.candidates.is_empty() {
            self.highlighted = (self.highlighted + 1) % self.candidates.len();
        }
    }

    pub fn highlight_prev(&mut self) {
        if !self.candidates.is_empty() {
            self.highlighted = self
                .highlighted
                .checked_sub(1)
                .unwrap_or(self.candidates.len() - 1);
        }
    }

    pub fn on_draft_changed(&mut self, draft: &str) {
        match trailing_mention(draft) {
            Some(query) if query.chars().count() >= self.min_chars => self.arm(query.to_string()),
            Some(query) if !query.is_empty() => self.reset(MentionPhase::Pending),
            _ => self.reset(MentionPhase::Idle),
        }
    }

    /// Hides the panel and forgets any armed or in-flight lookup.
    pub fn dismiss(&mut self) {
        self.reset(MentionPhase::Idle);
    }

    pub(crate) fn on_timer_elapsed(&mut self, seq: u64) {
        if seq != self.seq {
            trace!(seq, current = self.seq, "Ignoring superseded mention timer");
            return;
        }
        let MentionPhase::Armed { query } = std::mem::take(&mut self.phase) else {
            return;
        };
        self.timer = None;
        self.panel_visible = true;
        self.phase = MentionPhase::Searching {
            query: query.clone(),
        };
        debug!(seq, %query, "Issuing mention lookup");

        let backend = self.backend.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = backend
                .search_mentions(&query)
                .await
                .map(|raw| mention_candidates(&raw))
                .map_err(|err| err.to_string().replace('\n', " "));
            let _ = events
                .send(SessionEvent::MentionResults { seq, result })
                .await;
        });
    }

    pub(crate) fn on_results(&mut self, seq: u64, result: Result<Vec<MentionCandidate>, String>) {
        if seq != self.seq {
            trace!(seq, current = self.seq, "Dropping stale mention results");
            return;
        }
        match result {
            Ok(candidates) => {
                debug!(seq, found = candidates.len(), "Mention lookup resolved");
                self.candidates = candidates;
                self.highlighted = 0;
                self.phase = MentionPhase::Resolved;
            }
            Err(message) => {
                debug!(seq, %message, "Mention lookup failed");
                self.reset(MentionPhase::Idle);
            }
        }
    }

    fn arm(&mut self, query: String) {
        self.seq += 1;
        // replacing the slot drops and cancels the previous timer
        self.timer = Some(DebounceTimer::start(
            self.debounce,
            self.seq,
            self.events.clone(),
        ));
        self.phase = MentionPhase::Armed { query };
    }

    fn reset(&mut self, phase: MentionPhase) {
        self.seq += 1;
        self.timer = None;
        self.panel_visible = false;
        self.candidates.clear();
        self.highlighted = 0;
        self.phase = phase;
    }
}

/// The text after `@` in the last space-delimited token, if that token is a mention.
pub fn trailing_mention(draft: &str) -> Option<&str> {
    draft.split(' ').next_back()?.strip_prefix('@')
}

/// Replaces the last space-delimited token with `@name ` regardless of cursor position.
pub fn splice_mention(draft: &str, name: &str) -> String {
    let mut tokens: Vec<&str> = draft.split(' ').collect();
    tokens.pop();
    let mention = format!("@{name}");
    tokens.push(&mention);
    let mut spliced = tokens.join(" ");
    spliced.push(' ');
    spliced
}
