use std::cmp::Ordering;

use serde::Serialize;

use crate::db::models::Post;
use crate::posts::repository::PostStats;

pub const TRENDING_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedPost {
    #[serde(flatten)]
    pub post: Post,
    pub comment_count: i64,
    pub reaction_count: i64,
    pub relevance: i64,
}

impl From<PostStats> for RankedPost {
    fn from(stats: PostStats) -> Self {
        Self {
            relevance: relevance_score(stats.comment_count, stats.reaction_count),
            post: stats.post,
            comment_count: stats.comment_count,
            reaction_count: stats.reaction_count,
        }
    }
}

/// Comments weigh twice as much as reactions.
pub fn relevance_score(comment_count: i64, reaction_count: i64) -> i64 {
    2 * comment_count + reaction_count
}

/// Newer first, then the larger id first.
fn newest_first(a: &Post, b: &Post) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// All posts by descending relevance.
pub fn rank_relevant(stats: Vec<PostStats>) -> Vec<RankedPost> {
    let mut ranked: Vec<RankedPost> = stats.into_iter().map(RankedPost::from).collect();
    ranked.sort_by(|a, b| {
        b.relevance
            .cmp(&a.relevance)
            .then_with(|| newest_first(&a.post, &b.post))
    });
    ranked
}

/// The most commented posts, capped at [`TRENDING_LIMIT`].
pub fn rank_trending(stats: Vec<PostStats>) -> Vec<RankedPost> {
    let mut ranked: Vec<RankedPost> = stats.into_iter().map(RankedPost::from).collect();
    ranked.sort_by(|a, b| {
        b.comment_count
            .cmp(&a.comment_count)
            .then_with(|| newest_first(&a.post, &b.post))
    });
    ranked.truncate(TRENDING_LIMIT);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Author;

    fn stats(id: &str, created_at: &str, comments: i64, reactions: i64) -> PostStats {
        PostStats {
            post: Post {
                id: id.to_string(),
                title: id.to_string(),
                content: String::new(),
                author: Author {
                    id: "u1".into(),
                    username: "ana".into(),
                },
                tags: vec![],
                image: None,
                created_at: created_at.to_string(),
            },
            comment_count: comments,
            reaction_count: reactions,
        }
    }

    fn ids(ranked: &[RankedPost]) -> Vec<&str> {
        ranked.iter().map(|r| r.post.id.as_str()).collect()
    }

    #[test]
    fn three_comments_and_two_reactions_score_eight() {
        assert_eq!(relevance_score(3, 2), 8);
        let ranked = rank_relevant(vec![stats("p", "2024-01-01T00:00:00.000Z", 3, 2)]);
        assert_eq!(ranked[0].relevance, 8);
    }

    #[test]
    fn relevant_sorts_by_score_descending() {
        let ranked = rank_relevant(vec![
            stats("a", "2024-01-01T00:00:00.000Z", 0, 5),
            stats("b", "2024-01-01T00:00:00.000Z", 3, 0),
            stats("c", "2024-01-01T00:00:00.000Z", 1, 0),
        ]);
        assert_eq!(ids(&ranked), vec!["b", "a", "c"]);
    }

    #[test]
    fn relevant_ties_are_deterministic() {
        let input = || {
            vec![
                stats("a", "2024-01-01T00:00:00.000Z", 1, 0),
                stats("c", "2024-01-01T00:00:00.000Z", 0, 2),
                stats("b", "2024-03-01T00:00:00.000Z", 2, 0),
            ]
        };
        // b: 4; a and c tie at 2 with equal timestamps, larger id first
        assert_eq!(ids(&rank_relevant(input())), vec!["b", "c", "a"]);
        let mut reversed = input();
        reversed.reverse();
        assert_eq!(ids(&rank_relevant(reversed)), vec!["b", "c", "a"]);
    }

    #[test]
    fn trending_orders_by_comments_then_recency() {
        let ranked = rank_trending(vec![
            stats("old", "2024-01-01T00:00:00.000Z", 2, 50),
            stats("new", "2024-05-01T00:00:00.000Z", 2, 0),
            stats("top", "2023-01-01T00:00:00.000Z", 9, 0),
        ]);
        assert_eq!(ids(&ranked), vec!["top", "new", "old"]);
    }

    #[test]
    fn trending_is_capped_at_ten() {
        let input = (0..15)
            .map(|i| stats(&format!("p{:02}", i), "2024-01-01T00:00:00.000Z", i, 0))
            .collect();
        let ranked = rank_trending(input);
        assert_eq!(ranked.len(), TRENDING_LIMIT);
        assert_eq!(ranked[0].post.id, "p14");
        assert_eq!(ranked[9].post.id, "p05");
    }

    #[test]
    fn ranked_post_serializes_flat_with_counts() {
        let ranked = RankedPost::from(stats("p", "2024-01-01T00:00:00.000Z", 1, 1));
        let json = serde_json::to_value(&ranked).unwrap();
        assert_eq!(json["id"], "p");
        assert_eq!(json["commentCount"], 1);
        assert_eq!(json["reactionCount"], 1);
        assert_eq!(json["relevance"], 3);
        assert_eq!(json["author"]["username"], "ana");
    }
}
