//! End-to-end runs of the comment session against an in-memory backend.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chorus::{
    backend::{BackendError, CommentBackend},
    session::{CommentSession, SendOutcome, SessionConfig, SessionEvent, SessionState},
};
use serde_json::{Value, json};
use tokio::sync::mpsc::{self, Receiver};

#[derive(Debug, Clone, PartialEq)]
struct Created {
    post_id: String,
    text: String,
    parent_id: Option<String>,
}

#[derive(Default)]
struct MemoryBackend {
    created: Mutex<Vec<Created>>,
    likes: Mutex<Vec<String>>,
}

#[async_trait]
impl CommentBackend for MemoryBackend {
    async fn fetch_comments(&self, post_id: &str) -> Result<Value, BackendError> {
        match post_id {
            "p1" => {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok(json!([{ "id": "c1", "user": { "name": "Bob" }, "text": "hi" }]))
            }
            "twins" => Ok(json!([
                { "user": { "name": "Ann" }, "text": "+1" },
                { "user": { "name": "Ann" }, "text": "+1" },
            ])),
            "p2" => Ok(json!([{ "_id": "c9", "user": { "username": "cy" }, "text": "yo" }])),
            "odd" => Ok(json!({ "comments": [] })),
            _ => Err(BackendError::Other("no such post".into())),
        }
    }

    async fn create_comment(
        &self,
        post_id: &str,
        text: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<Value>, BackendError> {
        self.created.lock().unwrap().push(Created {
            post_id: post_id.to_string(),
            text: text.to_string(),
            parent_id: parent_id.map(str::to_string),
        });
        if text == "boom" {
            return Err(BackendError::Other("server exploded".into()));
        }
        if post_id == "twins" {
            return Ok(Some(json!({ "user": { "name": "Ann" }, "text": text })));
        }
        Ok(Some(json!({
            "id": "c2",
            "user": { "id": "me", "name": "Me" },
            "text": text,
            "parentId": parent_id,
        })))
    }

    async fn toggle_like(&self, comment_id: &str) -> Result<(), BackendError> {
        self.likes.lock().unwrap().push(comment_id.to_string());
        Ok(())
    }

    async fn search_mentions(&self, _query: &str) -> Result<Value, BackendError> {
        Ok(json!([
            { "id": "u7", "name": "Ana" },
            { "id": "u8", "username": "andy" },
            { "id": "u9" },
        ]))
    }
}

fn session(backend: Arc<MemoryBackend>) -> (CommentSession, Receiver<SessionEvent>) {
    let (tx, rx) = mpsc::channel(32);
    (
        CommentSession::new(backend, tx, SessionConfig::default()),
        rx,
    )
}

async fn pump(session: &mut CommentSession, rx: &mut Receiver<SessionEvent>) {
    let event = rx.recv().await.expect("session event");
    session.handle_event(event);
}

#[tokio::test(start_paused = true)]
async fn reply_and_send_appends_to_the_list() {
    let backend = Arc::new(MemoryBackend::default());
    let (mut session, mut rx) = session(backend.clone());

    session.open("p1");
    assert_eq!(session.state(), SessionState::Loading);
    pump(&mut session, &mut rx).await;
    assert_eq!(session.state(), SessionState::Loaded);
    assert_eq!(session.comments().len(), 1);
    assert_eq!(session.comments()[0].author.name, "Bob");
    assert_eq!(session.comments()[0].text, "hi");

    assert!(session.reply_to("c1"));
    assert_eq!(session.draft(), "@Bob ");
    session.set_draft("@Bob thanks");

    assert_eq!(session.send(), SendOutcome::Dispatched);
    assert!(session.is_sending());
    assert_eq!(session.send(), SendOutcome::Busy);
    pump(&mut session, &mut rx).await;

    assert!(!session.is_sending());
    assert_eq!(
        *backend.created.lock().unwrap(),
        vec![Created {
            post_id: "p1".into(),
            text: "@Bob thanks".into(),
            parent_id: Some("c1".into()),
        }]
    );
    let ids: Vec<_> = session.comments().iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["c1", "c2"]);
    assert_eq!(session.comments()[1].parent_id.as_deref(), Some("c1"));
    assert_eq!(session.draft(), "");
    assert!(session.reply_target().is_none());
}

#[tokio::test(start_paused = true)]
async fn whitespace_draft_never_reaches_the_backend() {
    let backend = Arc::new(MemoryBackend::default());
    let (mut session, mut rx) = session(backend.clone());
    session.open("p2");
    pump(&mut session, &mut rx).await;

    session.set_draft("   \t ");
    assert_eq!(session.send(), SendOutcome::EmptyDraft);
    assert!(!session.is_sending());
    assert!(backend.created.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn late_fetch_for_previous_post_is_dropped() {
    let backend = Arc::new(MemoryBackend::default());
    let (mut session, mut rx) = session(backend);

    // p1 answers after a second, p2 right away
    session.open("p1");
    session.open("p2");
    pump(&mut session, &mut rx).await;
    assert_eq!(session.post_id(), Some("p2"));
    assert_eq!(session.comments()[0].id, "c9");
    assert_eq!(session.comments()[0].author.name, "cy");

    pump(&mut session, &mut rx).await;
    assert_eq!(session.comments().len(), 1);
    assert_eq!(session.comments()[0].id, "c9");
}

#[tokio::test(start_paused = true)]
async fn result_after_close_is_ignored() {
    let backend = Arc::new(MemoryBackend::default());
    let (mut session, mut rx) = session(backend);
    session.open("p1");
    session.close();
    assert_eq!(session.state(), SessionState::Closed);

    pump(&mut session, &mut rx).await;
    assert_eq!(session.state(), SessionState::Closed);
    assert!(session.comments().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_or_malformed_fetch_loads_empty() {
    let backend = Arc::new(MemoryBackend::default());
    let (mut session, mut rx) = session(backend);

    session.open("missing");
    pump(&mut session, &mut rx).await;
    assert_eq!(session.state(), SessionState::Loaded);
    assert!(session.comments().is_empty());
    assert!(session.alert().is_none());

    session.open("odd");
    pump(&mut session, &mut rx).await;
    assert_eq!(session.state(), SessionState::Loaded);
    assert!(session.comments().is_empty());
}

#[tokio::test(start_paused = true)]
async fn picking_a_mention_splices_the_draft() {
    let backend = Arc::new(MemoryBackend::default());
    let (mut session, mut rx) = session(backend);
    session.open("p2");
    pump(&mut session, &mut rx).await;

    session.set_draft("hey @an");
    assert!(!session.mentions().is_panel_visible());

    // debounce fires, then the lookup resolves
    pump(&mut session, &mut rx).await;
    assert!(session.mentions().is_panel_visible());
    pump(&mut session, &mut rx).await;
    let names: Vec<_> = session
        .mentions()
        .candidates()
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, ["Ana", "andy"]);

    assert!(session.select_mention(0));
    assert_eq!(session.draft(), "hey @Ana ");
    assert!(!session.mentions().is_panel_visible());
}

#[tokio::test(start_paused = true)]
async fn double_like_restores_the_count() {
    let backend = Arc::new(MemoryBackend::default());
    let (mut session, mut rx) = session(backend.clone());
    session.open("p1");
    pump(&mut session, &mut rx).await;

    let liked = session.toggle_like("c1").expect("comment exists");
    assert!(liked.is_liked);
    assert_eq!(liked.count, 1);
    let unliked = session.toggle_like("c1").expect("comment exists");
    assert!(!unliked.is_liked);
    assert_eq!(unliked.count, 0);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(*backend.likes.lock().unwrap(), ["c1", "c1"]);
    assert!(session.toggle_like("nope").is_none());
}

#[tokio::test(start_paused = true)]
async fn identical_records_without_ids_are_told_apart() {
    let backend = Arc::new(MemoryBackend::default());
    let (mut session, mut rx) = session(backend.clone());
    session.open("twins");
    pump(&mut session, &mut rx).await;

    let ids: Vec<String> = session.comments().iter().map(|c| c.id.clone()).collect();
    assert_ne!(ids[0], ids[1]);
    session.toggle_like(&ids[1]).expect("second comment");
    let liked: Vec<bool> = session
        .comments()
        .iter()
        .map(|c| c.like_state.is_liked)
        .collect();
    assert_eq!(liked, [false, true]);

    // the backend echoes id-less records for this post too
    for _ in 0..2 {
        session.set_draft("+1");
        assert_eq!(session.send(), SendOutcome::Dispatched);
        pump(&mut session, &mut rx).await;
    }
    let mut ids: Vec<&str> = session.comments().iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids.len(), 4);
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn send_result_after_close_is_ignored() {
    let backend = Arc::new(MemoryBackend::default());
    let (mut session, mut rx) = session(backend.clone());
    session.open("p2");
    pump(&mut session, &mut rx).await;

    session.set_draft("boom");
    assert_eq!(session.send(), SendOutcome::Dispatched);
    session.close();
    session.set_draft("keep me");

    pump(&mut session, &mut rx).await;
    assert_eq!(backend.created.lock().unwrap().len(), 1);
    assert_eq!(session.state(), SessionState::Closed);
    assert!(session.comments().is_empty());
    assert_eq!(session.draft(), "keep me");
    assert!(!session.is_sending());
    assert!(session.alert().is_none());
}

#[tokio::test(start_paused = true)]
async fn send_result_after_switching_posts_is_ignored() {
    let backend = Arc::new(MemoryBackend::default());
    let (mut session, mut rx) = session(backend.clone());
    session.open("p2");
    pump(&mut session, &mut rx).await;

    assert!(session.reply_to("c9"));
    session.set_draft("@cy hello");
    assert_eq!(session.send(), SendOutcome::Dispatched);
    session.open("odd");
    session.set_draft("keep me");

    // the new fetch and the old post's echo both arrive
    pump(&mut session, &mut rx).await;
    pump(&mut session, &mut rx).await;
    assert_eq!(backend.created.lock().unwrap().len(), 1);
    assert_eq!(session.post_id(), Some("odd"));
    assert_eq!(session.state(), SessionState::Loaded);
    assert!(session.comments().is_empty());
    assert_eq!(session.draft(), "keep me");
    assert!(session.reply_target().is_none());
    assert!(!session.is_sending());
    assert!(session.alert().is_none());
}
