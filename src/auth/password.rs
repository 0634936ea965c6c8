use crate::error::{AppError, AppResult};

/// Hash a password with bcrypt on the blocking pool.
pub async fn hash(password: String, cost: u32) -> AppResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("hash task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("bcrypt: {}", e)))
}

/// Check a password against a stored hash. A malformed hash counts as a mismatch.
pub async fn verify(password: String, hash: String) -> AppResult<bool> {
    let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("verify task failed: {}", e)))?;
    Ok(matches.unwrap_or(false))
}
