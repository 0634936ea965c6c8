use rusqlite::{params, Connection};

use crate::db;
use crate::db::models::{Author, Comment};

pub fn insert(
    conn: &Connection,
    post_id: &str,
    author: &Author,
    content: &str,
) -> rusqlite::Result<Comment> {
    let comment = Comment {
        id: db::new_id(),
        post: post_id.to_string(),
        author: author.clone(),
        content: content.to_string(),
        created_at: db::now(),
    };

    conn.execute(
        "INSERT INTO comments (id, post_id, author_id, content, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            comment.id,
            comment.post,
            comment.author.id,
            comment.content,
            comment.created_at
        ],
    )?;

    Ok(comment)
}

/// Comments on a post, newest first, optionally capped at `limit`.
pub fn list_for_post(
    conn: &Connection,
    post_id: &str,
    limit: Option<u32>,
) -> rusqlite::Result<Vec<Comment>> {
    // SQLite treats a negative LIMIT as "no limit".
    let limit = limit.map(i64::from).unwrap_or(-1);

    let mut stmt = conn.prepare(
        "SELECT c.id, c.post_id, c.author_id, u.username, c.content, c.created_at \
         FROM comments c JOIN users u ON u.id = c.author_id \
         WHERE c.post_id = ?1 \
         ORDER BY c.created_at DESC, c.id DESC \
         LIMIT ?2",
    )?;
    let comments = stmt
        .query_map(params![post_id, limit], |row| {
            Ok(Comment {
                id: row.get(0)?,
                post: row.get(1)?,
                author: Author {
                    id: row.get(2)?,
                    username: row.get(3)?,
                },
                content: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}
