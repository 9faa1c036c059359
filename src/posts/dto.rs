use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::posts::repo::PostWithAuthor;

/// Compose/edit form body.
#[derive(Debug, Deserialize)]
pub struct PostForm {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchForm {
    pub q: String,
}

/// Post as rendered in every listing.
#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: Uuid,
    pub author: String,
    pub body: String,
    pub created_at: OffsetDateTime,
}

impl From<PostWithAuthor> for PostView {
    fn from(post: PostWithAuthor) -> Self {
        Self {
            id: post.id,
            author: post.author,
            body: post.body,
            created_at: post.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FeedPage {
    pub title: &'static str,
    pub posts: Vec<PostView>,
    pub messages: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PostPage {
    pub post: PostView,
    pub messages: Vec<String>,
}

/// Pre-filled edit form context.
#[derive(Debug, Serialize)]
pub struct EditPostPage {
    pub post_id: Uuid,
    pub body: String,
    pub messages: Vec<String>,
}

/// Search results echo the sanitized query text.
#[derive(Debug, Serialize)]
pub struct SearchPage {
    pub searched: String,
    pub posts: Vec<PostView>,
    pub messages: Vec<String>,
}
