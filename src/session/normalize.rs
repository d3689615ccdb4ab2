//! Canonical comment records.
//!
//! Comments arrive in two shapes: community records (`author`, `content`) and
//! social-feed records (`user`, `text`). [`normalize`] folds both into [`Comment`]
//! without ever failing; every field has a fallback.

use std::hash::{DefaultHasher, Hash, Hasher};

use chrono::{DateTime, Utc};
use serde_json::Value;

pub const UNKNOWN_AUTHOR: &str = "Unknown";
pub const LOCAL_ID_PREFIX: &str = "local-";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorDisplay {
    pub id: String,
    pub name: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LikeState {
    pub is_liked: bool,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    pub author: AuthorDisplay,
    pub text: String,
    /// `None` renders as "now".
    pub created_at: Option<DateTime<Utc>>,
    pub parent_id: Option<String>,
    pub like_state: LikeState,
}

impl Comment {
    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionCandidate {
    pub id: String,
    pub name: String,
}

pub fn normalize(raw: &Value) -> Comment {
    normalize_in_slot(raw, None)
}

/// Normalizes a fetch response. Anything that is not an array is an empty list.
///
/// Records without an id get a placeholder that includes their position, so identical
/// records in one response still have distinct ids.
pub fn normalize_all(raw: &Value) -> Vec<Comment> {
    raw.as_array()
        .map(|records| {
            records
                .iter()
                .enumerate()
                .map(|(index, record)| normalize_in_slot(record, Some(index)))
                .collect()
        })
        .unwrap_or_default()
}

fn normalize_in_slot(raw: &Value, slot: Option<usize>) -> Comment {
    Comment {
        id: id_field(raw, &["id", "_id"]).unwrap_or_else(|| placeholder_id(raw, slot)),
        author: author_display(raw),
        text: str_field(raw, &["content", "text"]).unwrap_or_default(),
        created_at: created_at(raw),
        parent_id: id_field(raw, &["parentId", "parent_id", "replyTo"]),
        like_state: LikeState {
            is_liked: ["isLiked", "liked"]
                .iter()
                .find_map(|key| raw.get(key).and_then(Value::as_bool))
                .unwrap_or(false),
            count: like_count(raw),
        },
    }
}

/// Reads a mention lookup response, dropping records without a usable name.
pub fn mention_candidates(raw: &Value) -> Vec<MentionCandidate> {
    let Some(records) = raw.as_array() else {
        return Vec::new();
    };
    records
        .iter()
        .filter_map(|record| {
            Some(MentionCandidate {
                id: id_field(record, &["id", "_id"]).unwrap_or_default(),
                name: display_name(record)?,
            })
        })
        .collect()
}

fn author_display(raw: &Value) -> AuthorDisplay {
    let identity = ["author", "user"]
        .iter()
        .find_map(|key| raw.get(key).filter(|v| v.is_object()));
    let Some(identity) = identity else {
        return AuthorDisplay {
            name: UNKNOWN_AUTHOR.to_string(),
            ..Default::default()
        };
    };
    AuthorDisplay {
        id: id_field(identity, &["id", "_id"]).unwrap_or_default(),
        name: display_name(identity).unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
        image_url: str_field(identity, &["imageUrl", "image", "avatar", "avatarUrl"]),
    }
}

fn display_name(identity: &Value) -> Option<String> {
    str_field(identity, &["name", "username", "login"]).filter(|name| !name.trim().is_empty())
}

fn str_field(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| raw.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Like [`str_field`], but numeric ids are accepted and rendered as strings.
fn id_field(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match raw.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn created_at(raw: &Value) -> Option<DateTime<Utc>> {
    ["createdAt", "created_at"]
        .iter()
        .find_map(|key| match raw.get(key)? {
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
            _ => None,
        })
}

fn like_count(raw: &Value) -> u64 {
    ["likesCount", "likeCount", "reactionsCount", "likes"]
        .iter()
        .find_map(|key| match raw.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::Array(likes) => Some(likes.len() as u64),
            _ => None,
        })
        .unwrap_or(0)
}

fn placeholder_id(raw: &Value, slot: Option<usize>) -> String {
    let mut hasher = DefaultHasher::new();
    raw.to_string().hash(&mut hasher);
    match slot {
        Some(index) => format!("{LOCAL_ID_PREFIX}{:016x}-{index}", hasher.finish()),
        None => format!("{LOCAL_ID_PREFIX}{:016x}", hasher.finish()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn author_wins_over_user() {
        let comment = normalize(&json!({
            "id": "c1",
            "author": { "id": "a1", "name": "Ana" },
            "user": { "id": "u1", "name": "Bob" },
        }));
        assert_eq!(comment.author.id, "a1");
        assert_eq!(comment.author.name, "Ana");

        let only_user = normalize(&json!({ "user": { "id": 7, "name": "Bob" } }));
        assert_eq!(only_user.author.id, "7");
        assert_eq!(only_user.author.name, "Bob");
    }

    #[test]
    fn content_wins_over_text() {
        let both = normalize(&json!({ "content": "from content", "text": "from text" }));
        assert_eq!(both.text, "from content");
        let text = normalize(&json!({ "text": "hi" }));
        assert_eq!(text.text, "hi");
        let neither = normalize(&json!({ "id": "c3" }));
        assert_eq!(neither.text, "");
    }

    #[test]
    fn missing_fields_fall_back() {
        let comment = normalize(&json!({}));
        assert!(comment.id.starts_with("local-"));
        assert_eq!(comment.author.name, UNKNOWN_AUTHOR);
        assert_eq!(comment.author.image_url, None);
        assert_eq!(comment.created_at, None);
        assert_eq!(comment.parent_id, None);
        assert_eq!(comment.like_state, LikeState::default());
    }

    #[test]
    fn placeholder_ids_are_deterministic() {
        let raw = json!({ "text": "no id here" });
        assert_eq!(normalize(&raw).id, normalize(&raw).id);
        assert_ne!(normalize(&raw).id, normalize(&json!({ "text": "other" })).id);
    }

    #[test]
    fn identical_records_without_ids_stay_distinct() {
        let comments = normalize_all(&json!([
            { "user": { "name": "Ann" }, "text": "+1" },
            { "user": { "name": "Ann" }, "text": "+1" },
        ]));
        assert_eq!(comments.len(), 2);
        assert!(comments.iter().all(|c| c.id.starts_with("local-")));
        assert_ne!(comments[0].id, comments[1].id);
    }

    #[test]
    fn non_object_identity_is_ignored() {
        let comment = normalize(&json!({ "author": "ana", "user": { "username": "bob" } }));
        assert_eq!(comment.author.name, "bob");
    }

    #[test]
    fn reads_like_state_and_metadata() {
        let comment = normalize(&json!({
            "_id": 99,
            "user": { "name": "Bob", "avatar": "https://img/bob.png" },
            "createdAt": "2024-05-01T10:00:00Z",
            "parentId": "c1",
            "likesCount": 3,
            "isLiked": true,
        }));
        assert_eq!(comment.id, "99");
        assert_eq!(comment.author.image_url.as_deref(), Some("https://img/bob.png"));
        assert_eq!(
            comment.created_at.map(|dt| dt.to_rfc3339()),
            Some("2024-05-01T10:00:00+00:00".to_string())
        );
        assert!(comment.is_reply());
        assert_eq!(comment.like_state, LikeState { is_liked: true, count: 3 });
    }

    #[test]
    fn negative_counts_are_not_trusted() {
        let comment = normalize(&json!({ "likesCount": -4, "likes": ["a", "b"] }));
        assert_eq!(comment.like_state.count, 2);
    }

    #[test]
    fn non_array_responses_are_empty() {
        assert!(normalize_all(&json!({ "error": "nope" })).is_empty());
        assert!(normalize_all(&Value::Null).is_empty());
        assert_eq!(normalize_all(&json!([{ "id": "a" }, { "id": "b" }])).len(), 2);
    }

    #[test]
    fn mention_records_need_a_name() {
        let candidates = mention_candidates(&json!([
            { "id": 1, "name": "Ana" },
            { "id": 2 },
            { "id": "3", "login": "anakin" },
        ]));
        assert_eq!(
            candidates,
            vec![
                MentionCandidate { id: "1".into(), name: "Ana".into() },
                MentionCandidate { id: "3".into(), name: "anakin".into() },
            ]
        );
    }
}
