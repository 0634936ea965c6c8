use std::collections::HashMap;

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::db;
use crate::db::models::{Author, Post};
use crate::posts::tags::{normalize_tag, normalize_tags};

const SELECT_POSTS: &str = "SELECT p.id, p.title, p.content, p.author_id, u.username, p.image_path, p.created_at \
     FROM posts p JOIN users u ON u.id = p.author_id";

/// A post waiting to be persisted. Tags are normalized on insert.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub image: Option<String>,
}

/// A post together with the counts the rankings are computed from.
#[derive(Debug, Clone)]
pub struct PostStats {
    pub post: Post,
    pub comment_count: i64,
    pub reaction_count: i64,
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        author: Author {
            id: row.get(3)?,
            username: row.get(4)?,
        },
        tags: Vec::new(),
        image: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn load_tags(conn: &Connection, post_id: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt =
        conn.prepare_cached("SELECT tag FROM post_tags WHERE post_id = ?1 ORDER BY position")?;
    let tags = stmt
        .query_map(params![post_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(tags)
}

/// Bound parameters per tag lookup, well under SQLite's variable limit.
const TAG_BATCH: usize = 500;

/// Fill in tags for a batch of posts with one query per `TAG_BATCH` posts.
fn with_tags(conn: &Connection, mut posts: Vec<Post>) -> rusqlite::Result<Vec<Post>> {
    let mut tags: HashMap<String, Vec<String>> = HashMap::new();
    for chunk in posts.chunks(TAG_BATCH) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
            "SELECT post_id, tag FROM post_tags WHERE post_id IN ({}) ORDER BY post_id, position",
            placeholders
        ))?;
        let rows = stmt.query_map(params_from_iter(chunk.iter().map(|p| &p.id)), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (post_id, tag) = row?;
            tags.entry(post_id).or_default().push(tag);
        }
    }

    for post in &mut posts {
        post.tags = tags.remove(&post.id).unwrap_or_default();
    }
    Ok(posts)
}

/// Persist a post and its normalized tag set in one transaction.
pub fn insert(conn: &Connection, author: &Author, new_post: NewPost) -> rusqlite::Result<Post> {
    let post = Post {
        id: db::new_id(),
        title: new_post.title,
        content: new_post.content,
        author: author.clone(),
        tags: normalize_tags(&new_post.tags),
        image: new_post.image,
        created_at: db::now(),
    };

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO posts (id, author_id, title, content, image_path, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            post.id,
            post.author.id,
            post.title,
            post.content,
            post.image,
            post.created_at
        ],
    )?;
    for (position, tag) in post.tags.iter().enumerate() {
        tx.execute(
            "INSERT INTO post_tags (post_id, tag, position) VALUES (?1, ?2, ?3)",
            params![post.id, tag, position as i64],
        )?;
    }
    tx.commit()?;

    Ok(post)
}

pub fn exists(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM posts WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
}

pub fn find_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<Post>> {
    let post = conn
        .query_row(
            &format!("{} WHERE p.id = ?1", SELECT_POSTS),
            params![id],
            post_from_row,
        )
        .optional()?;

    match post {
        Some(mut post) => {
            post.tags = load_tags(conn, &post.id)?;
            Ok(Some(post))
        }
        None => Ok(None),
    }
}

/// Every post, newest first.
pub fn list_latest(conn: &Connection) -> rusqlite::Result<Vec<Post>> {
    let mut stmt = conn.prepare(&format!(
        "{} ORDER BY p.created_at DESC, p.id DESC",
        SELECT_POSTS
    ))?;
    let posts = stmt
        .query_map([], post_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    with_tags(conn, posts)
}

/// Posts carrying the given tag, newest first. The lookup tag is normalized
/// the same way stored tags are.
pub fn list_by_tag(conn: &Connection, tag: &str) -> rusqlite::Result<Vec<Post>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE EXISTS (SELECT 1 FROM post_tags t WHERE t.post_id = p.id AND t.tag = ?1) \
         ORDER BY p.created_at DESC, p.id DESC",
        SELECT_POSTS
    ))?;
    let posts = stmt
        .query_map(params![normalize_tag(tag)], post_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    with_tags(conn, posts)
}

/// The distinct union of tags across all posts, alphabetically.
pub fn all_tags(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT DISTINCT tag FROM post_tags ORDER BY tag")?;
    let tags = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(tags)
}

/// Every post with its comment and reaction counts, in no particular order.
pub fn list_with_stats(conn: &Connection) -> rusqlite::Result<Vec<PostStats>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.title, p.content, p.author_id, u.username, p.image_path, p.created_at, \
                (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id), \
                (SELECT COUNT(*) FROM reactions r WHERE r.post_id = p.id) \
         FROM posts p JOIN users u ON u.id = p.author_id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(PostStats {
                post: post_from_row(row)?,
                comment_count: row.get(7)?,
                reaction_count: row.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let (posts, counts): (Vec<Post>, Vec<(i64, i64)>) = rows
        .into_iter()
        .map(|stats| (stats.post, (stats.comment_count, stats.reaction_count)))
        .unzip();
    let posts = with_tags(conn, posts)?;

    Ok(posts
        .into_iter()
        .zip(counts)
        .map(|(post, (comment_count, reaction_count))| PostStats {
            post,
            comment_count,
            reaction_count,
        })
        .collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::users;

    pub(crate) fn seed_author(conn: &Connection, username: &str) -> Author {
        let user = users::insert(conn, username, &format!("{}@example.com", username), "hash")
            .unwrap();
        Author {
            id: user.id,
            username: user.username,
        }
    }

    pub(crate) fn seed_post(conn: &Connection, author: &Author, title: &str, tags: &[&str]) -> Post {
        insert(
            conn,
            author,
            NewPost {
                title: title.to_string(),
                content: format!("{} body", title),
                tags: tags.iter().map(|t| t.to_string()).collect(),
                image: None,
            },
        )
        .unwrap()
    }

    pub(crate) fn set_created_at(conn: &Connection, post_id: &str, created_at: &str) {
        conn.execute(
            "UPDATE posts SET created_at = ?1 WHERE id = ?2",
            params![created_at, post_id],
        )
        .unwrap();
    }

    #[test]
    fn insert_normalizes_tags_before_write() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        let author = seed_author(&conn, "ana");
        let post = seed_post(&conn, &author, "Hello", &["Node", "node ", "", "Rust"]);
        assert_eq!(post.tags, vec!["node", "rust"]);

        let stored = find_by_id(&conn, &post.id).unwrap().unwrap();
        assert_eq!(stored.tags, vec!["node", "rust"]);
        assert_eq!(stored.author, author);
        assert_eq!(stored.created_at, post.created_at);
    }

    #[test]
    fn find_by_id_returns_none_for_unknown_post() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        assert!(find_by_id(&conn, "missing").unwrap().is_none());
        assert!(!exists(&conn, "missing").unwrap());
    }

    #[test]
    fn latest_is_newest_first() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        let author = seed_author(&conn, "ana");
        let old = seed_post(&conn, &author, "old", &[]);
        let new = seed_post(&conn, &author, "new", &[]);
        set_created_at(&conn, &old.id, "2024-01-01T00:00:00.000Z");
        set_created_at(&conn, &new.id, "2024-06-01T00:00:00.000Z");

        let titles: Vec<String> = list_latest(&conn)
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["new", "old"]);
    }

    #[test]
    fn by_tag_matches_normalized_tag_exactly() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        let author = seed_author(&conn, "ana");
        seed_post(&conn, &author, "rusty", &["Rust"]);
        seed_post(&conn, &author, "rustacean", &["rustacean"]);

        let found = list_by_tag(&conn, "RUST").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "rusty");
        assert!(list_by_tag(&conn, "rus").unwrap().is_empty());
    }

    #[test]
    fn listings_attach_each_posts_own_tags_in_order() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        let author = seed_author(&conn, "ana");
        let first = seed_post(&conn, &author, "first", &["zeta", "alpha"]);
        let second = seed_post(&conn, &author, "second", &["beta"]);
        let bare = seed_post(&conn, &author, "bare", &[]);
        set_created_at(&conn, &first.id, "2024-01-01T00:00:00.000Z");
        set_created_at(&conn, &second.id, "2024-02-01T00:00:00.000Z");
        set_created_at(&conn, &bare.id, "2024-03-01T00:00:00.000Z");

        let tags: Vec<(String, Vec<String>)> = list_latest(&conn)
            .unwrap()
            .into_iter()
            .map(|p| (p.title, p.tags))
            .collect();
        assert_eq!(
            tags,
            vec![
                ("bare".to_string(), vec![]),
                ("second".to_string(), vec!["beta".to_string()]),
                ("first".to_string(), vec!["zeta".to_string(), "alpha".to_string()]),
            ]
        );

        let stats = list_with_stats(&conn).unwrap();
        let first_stats = stats.iter().find(|s| s.post.id == first.id).unwrap();
        assert_eq!(first_stats.post.tags, vec!["zeta", "alpha"]);
        assert_eq!(first_stats.comment_count, 0);
    }

    #[test]
    fn all_tags_is_the_distinct_union() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        let author = seed_author(&conn, "ana");
        seed_post(&conn, &author, "one", &["web", "rust"]);
        seed_post(&conn, &author, "two", &["Rust", "cli"]);
        assert_eq!(all_tags(&conn).unwrap(), vec!["cli", "rust", "web"]);
    }

    #[test]
    fn stats_count_comments_and_reactions() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        let author = seed_author(&conn, "ana");
        let post = seed_post(&conn, &author, "counted", &["x"]);
        conn.execute(
            "INSERT INTO comments (id, post_id, author_id, content, created_at) VALUES ('c1', ?1, ?2, 'hi', ?3)",
            params![post.id, author.id, db::now()],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO reactions (id, post_id, user_id, kind) VALUES ('r1', ?1, ?2, 'fire')",
            params![post.id, author.id],
        )
        .unwrap();

        let stats = list_with_stats(&conn).unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].comment_count, 1);
        assert_eq!(stats[0].reaction_count, 1);
        assert_eq!(stats[0].post.tags, vec!["x"]);
    }
}
