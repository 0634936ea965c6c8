// Repository pattern - the reaction ledger's storage side
use async_trait::async_trait;
use rusqlite::{params, TransactionBehavior};
use serde::Serialize;
use thiserror::Error;

use crate::db;
use crate::reactions::kind::ReactionKind;
use crate::state::DbPool;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Reaction already recorded")]
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleAction {
    Added,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    pub action: ToggleAction,
    /// Reactions of the toggled kind on the post after the toggle.
    pub total: i64,
}

/// Repository trait - all reaction ledger operations
#[async_trait]
pub trait ReactionRepository: Send + Sync {
    /// Remove the (post, user, kind) tuple if present, insert it otherwise.
    async fn toggle(
        &self,
        post_id: &str,
        user_id: &str,
        kind: ReactionKind,
    ) -> Result<ToggleOutcome, RepositoryError>;

    /// Count per kind for kinds present on the post, in enumeration order.
    async fn counts(&self, post_id: &str) -> Result<Vec<(ReactionKind, i64)>, RepositoryError>;

    /// Kinds the user has applied to the post, in enumeration order.
    async fn kinds_by_user(
        &self,
        post_id: &str,
        user_id: &str,
    ) -> Result<Vec<ReactionKind>, RepositoryError>;
}

/// SQLite implementation
pub struct SqliteReactionRepository {
    pool: DbPool,
}

impl SqliteReactionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReactionRepository for SqliteReactionRepository {
    async fn toggle(
        &self,
        post_id: &str,
        user_id: &str,
        kind: ReactionKind,
    ) -> Result<ToggleOutcome, RepositoryError> {
        let mut conn = self.pool.get()?;

        // IMMEDIATE takes the write lock up front so the delete-or-insert and
        // the count observe one consistent ledger. The unique index on
        // (post_id, user_id, kind) still rejects any duplicate that slips by.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let removed = tx.execute(
            "DELETE FROM reactions WHERE post_id = ?1 AND user_id = ?2 AND kind = ?3",
            params![post_id, user_id, kind],
        )?;

        let action = if removed > 0 {
            ToggleAction::Removed
        } else {
            tx.execute(
                "INSERT INTO reactions (id, post_id, user_id, kind, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![db::new_id(), post_id, user_id, kind, db::now()],
            )
            .map_err(|e| {
                if db::is_unique_violation(&e) {
                    RepositoryError::Duplicate
                } else {
                    RepositoryError::Sql(e)
                }
            })?;
            ToggleAction::Added
        };

        let total: i64 = tx.query_row(
            "SELECT COUNT(*) FROM reactions WHERE post_id = ?1 AND kind = ?2",
            params![post_id, kind],
            |row| row.get(0),
        )?;

        tx.commit()?;

        Ok(ToggleOutcome { action, total })
    }

    async fn counts(&self, post_id: &str) -> Result<Vec<(ReactionKind, i64)>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT kind, COUNT(*) FROM reactions WHERE post_id = ?1 GROUP BY kind",
        )?;
        let mut counts = stmt
            .query_map(params![post_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<(ReactionKind, i64)>, _>>()?;
        counts.sort_by_key(|(kind, _)| *kind);
        Ok(counts)
    }

    async fn kinds_by_user(
        &self,
        post_id: &str,
        user_id: &str,
    ) -> Result<Vec<ReactionKind>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt =
            conn.prepare("SELECT kind FROM reactions WHERE post_id = ?1 AND user_id = ?2")?;
        let mut kinds = stmt
            .query_map(params![post_id, user_id], |row| row.get(0))?
            .collect::<Result<Vec<ReactionKind>, _>>()?;
        kinds.sort();
        Ok(kinds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posts::repository::tests::{seed_author, seed_post};

    fn setup() -> (SqliteReactionRepository, String, String, String) {
        let pool = db::test_pool();
        let (post_id, ana_id, bob_id) = {
            let conn = pool.get().unwrap();
            let ana = seed_author(&conn, "ana");
            let bob = seed_author(&conn, "bob");
            let post = seed_post(&conn, &ana, "p", &[]);
            (post.id, ana.id, bob.id)
        };
        (SqliteReactionRepository::new(pool), post_id, ana_id, bob_id)
    }

    #[tokio::test]
    async fn toggle_adds_then_removes() {
        let (repo, post, ana, _) = setup();

        let added = repo.toggle(&post, &ana, ReactionKind::Heart).await.unwrap();
        assert_eq!(
            added,
            ToggleOutcome {
                action: ToggleAction::Added,
                total: 1
            }
        );

        let removed = repo.toggle(&post, &ana, ReactionKind::Heart).await.unwrap();
        assert_eq!(
            removed,
            ToggleOutcome {
                action: ToggleAction::Removed,
                total: 0
            }
        );
        assert!(repo.counts(&post).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn toggle_twice_restores_other_users_totals() {
        let (repo, post, ana, bob) = setup();
        repo.toggle(&post, &bob, ReactionKind::Fire).await.unwrap();

        let before = repo.counts(&post).await.unwrap();
        let first = repo.toggle(&post, &ana, ReactionKind::Fire).await.unwrap();
        assert_eq!(first.total, 2);
        let second = repo.toggle(&post, &ana, ReactionKind::Fire).await.unwrap();
        assert_eq!(second.total, 1);
        assert_eq!(repo.counts(&post).await.unwrap(), before);
    }

    #[tokio::test]
    async fn kinds_are_independent_per_user() {
        let (repo, post, ana, bob) = setup();
        repo.toggle(&post, &ana, ReactionKind::Fire).await.unwrap();
        repo.toggle(&post, &ana, ReactionKind::Heart).await.unwrap();
        repo.toggle(&post, &bob, ReactionKind::Heart).await.unwrap();

        assert_eq!(
            repo.counts(&post).await.unwrap(),
            vec![(ReactionKind::Heart, 2), (ReactionKind::Fire, 1)]
        );
        assert_eq!(
            repo.kinds_by_user(&post, &ana).await.unwrap(),
            vec![ReactionKind::Heart, ReactionKind::Fire]
        );
        assert_eq!(
            repo.kinds_by_user(&post, &bob).await.unwrap(),
            vec![ReactionKind::Heart]
        );
    }
}
