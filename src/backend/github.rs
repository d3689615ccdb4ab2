use async_trait::async_trait;
use futures::{StreamExt, stream};
use octocrab::{
    Octocrab,
    models::{
        issues::Comment as ApiComment,
        reactions::{Reaction, ReactionContent},
    },
};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use crate::backend::{BackendError, CommentBackend};

const REPLY_MARKER_PREFIX: &str = "<!-- chorus:reply-to=";
const REPLY_MARKER_SUFFIX: &str = " -->";
const REACTION_FETCH_CONCURRENCY: usize = 8;
const REACTIONS_PER_PAGE: u8 = 100;
const MENTION_RESULTS: u8 = 10;

/// Comments on a GitHub issue. The post id is the issue number; likes are `+1`
/// reactions from the signed-in user.
pub struct GithubBackend {
    client: Octocrab,
    owner: String,
    repo: String,
    current_user: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedRecord {
    id: String,
    user: FeedUser,
    text: String,
    created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<String>,
    likes_count: u64,
    is_liked: bool,
}

#[derive(Debug, Serialize)]
struct FeedUser {
    id: String,
    name: String,
    avatar: String,
}

impl FeedRecord {
    fn from_api(comment: ApiComment, likes_count: u64, is_liked: bool) -> Self {
        let body = comment.body.unwrap_or_default();
        let (parent_id, text) = split_reply_marker(&body);
        Self {
            id: comment.id.0.to_string(),
            user: FeedUser {
                id: comment.user.id.0.to_string(),
                name: comment.user.login.clone(),
                avatar: comment.user.avatar_url.to_string(),
            },
            text: text.to_string(),
            created_at: comment.created_at.to_rfc3339(),
            parent_id: parent_id.map(str::to_string),
            likes_count,
            is_liked,
        }
    }
}

impl GithubBackend {
    pub fn new(client: Octocrab, owner: String, repo: String, current_user: String) -> Self {
        Self {
            client,
            owner,
            repo,
            current_user,
        }
    }

    /// Builds a client from a personal token and resolves the signed-in user.
    pub async fn connect(token: String, owner: String, repo: String) -> Result<Self, BackendError> {
        let client = Octocrab::builder().personal_token(token).build()?;
        let current_user = client.current().user().await?.login;
        info!(%current_user, %owner, %repo, "Connected to GitHub");
        Ok(Self::new(client, owner, repo, current_user))
    }

    pub fn current_user(&self) -> &str {
        &self.current_user
    }

    fn issues(&self) -> octocrab::issues::IssueHandler<'_> {
        self.client.issues(self.owner.clone(), self.repo.clone())
    }
}

#[async_trait]
impl CommentBackend for GithubBackend {
    #[instrument(skip(self))]
    async fn fetch_comments(&self, post_id: &str) -> Result<Value, BackendError> {
        let number = parse_issue_number(post_id)?;
        let handler = self.issues();
        let mut page = handler
            .list_comments(number)
            .per_page(100u8)
            .page(1u32)
            .send()
            .await?;
        let comments = std::mem::take(&mut page.items);
        info!("Loaded {} comments for issue {}", comments.len(), number);

        let refer = &handler;
        let current_user = self.current_user.as_str();
        let records = stream::iter(comments)
            .map(|comment| async move {
                let (likes, mine) = match refer
                    .list_comment_reactions(comment.id.0)
                    .per_page(REACTIONS_PER_PAGE)
                    .send()
                    .await
                {
                    Ok(mut page) => like_snapshot(std::mem::take(&mut page.items), current_user),
                    Err(err) => {
                        debug!(comment = comment.id.0, %err, "Reactions unavailable");
                        (0, false)
                    }
                };
                serde_json::to_value(FeedRecord::from_api(comment, likes, mine))
            })
            .buffered(REACTION_FETCH_CONCURRENCY)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Array(records))
    }

    #[instrument(skip(self, text))]
    async fn create_comment(
        &self,
        post_id: &str,
        text: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<Value>, BackendError> {
        let number = parse_issue_number(post_id)?;
        let comment = self
            .issues()
            .create_comment(number, reply_body(text, parent_id))
            .await?;
        Ok(Some(serde_json::to_value(FeedRecord::from_api(
            comment, 0, false,
        ))?))
    }

    #[instrument(skip(self))]
    async fn toggle_like(&self, comment_id: &str) -> Result<(), BackendError> {
        let id: u64 = comment_id
            .parse()
            .map_err(|_| BackendError::InvalidCommentId(comment_id.to_string()))?;
        let handler = self.issues();
        let page = handler
            .list_comment_reactions(id)
            .per_page(REACTIONS_PER_PAGE)
            .send()
            .await?;
        let mine = page
            .items
            .iter()
            .find(|reaction| {
                reaction.content == ReactionContent::PlusOne
                    && reaction.user.login.eq_ignore_ascii_case(&self.current_user)
            })
            .map(|reaction| reaction.id);
        match mine {
            Some(reaction_id) => {
                handler.delete_comment_reaction(id, reaction_id).await?;
            }
            None => {
                handler
                    .create_comment_reaction(id, ReactionContent::PlusOne)
                    .await?;
            }
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn search_mentions(&self, query: &str) -> Result<Value, BackendError> {
        let q = format!("{query} in:login");
        let page = self
            .client
            .search()
            .users(&q)
            .per_page(MENTION_RESULTS)
            .send()
            .await?;
        let users = page
            .items
            .into_iter()
            .map(|user| json!({ "id": user.id.0.to_string(), "name": user.login }))
            .collect();
        Ok(Value::Array(users))
    }
}

fn parse_issue_number(post_id: &str) -> Result<u64, BackendError> {
    post_id
        .trim()
        .trim_start_matches('#')
        .parse()
        .map_err(|_| BackendError::InvalidPostId(post_id.to_string()))
}

fn like_snapshot<I>(reactions: I, current_user: &str) -> (u64, bool)
where
    I: IntoIterator<Item = Reaction>,
{
    reactions
        .into_iter()
        .filter(|reaction| reaction.content == ReactionContent::PlusOne)
        .fold((0, false), |(count, mine), reaction| {
            (
                count + 1,
                mine || reaction.user.login.eq_ignore_ascii_case(current_user),
            )
        })
}

fn reply_body(text: &str, parent_id: Option<&str>) -> String {
    match parent_id {
        Some(parent) => format!("{REPLY_MARKER_PREFIX}{parent}{REPLY_MARKER_SUFFIX}\n{text}"),
        None => text.to_string(),
    }
}

/// Splits a leading reply marker off a comment body.
fn split_reply_marker(body: &str) -> (Option<&str>, &str) {
    let Some(rest) = body.strip_prefix(REPLY_MARKER_PREFIX) else {
        return (None, body);
    };
    let Some((parent, text)) = rest.split_once(REPLY_MARKER_SUFFIX) else {
        return (None, body);
    };
    (Some(parent), text.strip_prefix('\n').unwrap_or(text))
}
