use rusqlite::{params, Connection, OptionalExtension};

use crate::db;
use crate::db::models::User;

pub fn find_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        "SELECT id, username, email, password_hash, created_at FROM users WHERE email = ?1",
        params![email],
        |row| {
            Ok(User {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password_hash: row.get(3)?,
                created_at: row.get(4)?,
            })
        },
    )
    .optional()
}

pub fn insert(
    conn: &Connection,
    username: &str,
    email: &str,
    password_hash: &str,
) -> rusqlite::Result<User> {
    let user = User {
        id: db::new_id(),
        username: username.to_string(),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        created_at: db::now(),
    };

    conn.execute(
        "INSERT INTO users (id, username, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user.id,
            user.username,
            user.email,
            user.password_hash,
            user.created_at
        ],
    )?;

    Ok(user)
}

/// Emails are compared case-insensitively and without surrounding whitespace.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_find_by_email() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        let user = insert(&conn, "ana", "ana@example.com", "hash").unwrap();

        let found = find_by_email(&conn, "ana@example.com").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.username, "ana");
        assert!(find_by_email(&conn, "bob@example.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_rejected_by_the_store() {
        let pool = db::test_pool();
        let conn = pool.get().unwrap();
        insert(&conn, "ana", "ana@example.com", "hash").unwrap();
        let err = insert(&conn, "ana2", "ana@example.com", "hash").unwrap_err();
        assert!(db::is_unique_violation(&err));
    }

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
    }
}
