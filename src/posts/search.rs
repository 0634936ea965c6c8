use serde::Serialize;

use crate::db::models::Post;

#[derive(Debug, Clone, Serialize)]
pub struct AuthorName {
    pub username: String,
}

/// The projected view of a post returned by search.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: String,
    pub author: AuthorName,
}

impl From<Post> for SearchHit {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            tags: post.tags,
            created_at: post.created_at,
            author: AuthorName {
                username: post.author.username,
            },
        }
    }
}

/// Case-insensitive substring match against title, content, any tag or the
/// author's username. `needle` must already be lowercased.
fn matches(post: &Post, needle: &str) -> bool {
    post.title.to_lowercase().contains(needle)
        || post.content.to_lowercase().contains(needle)
        || post.tags.iter().any(|t| t.to_lowercase().contains(needle))
        || post.author.username.to_lowercase().contains(needle)
}

/// Filter posts by a free-text query, keeping their input order.
pub fn search(posts: Vec<Post>, query: &str) -> Vec<SearchHit> {
    let needle = query.trim().to_lowercase();
    posts
        .into_iter()
        .filter(|post| matches(post, &needle))
        .map(SearchHit::from)
        .collect()
}
