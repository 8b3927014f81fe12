use crate::error::{AppError, Result};

/// Hash on the blocking pool; bcrypt is CPU bound.
pub async fn hash(password: &str, cost: u32) -> Result<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::internal(format!("Hash task failed: {e}")))?
        .map_err(AppError::from)
}

pub async fn verify(password: &str, password_hash: &str) -> Result<bool> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &password_hash))
        .await
        .map_err(|e| AppError::internal(format!("Verify task failed: {e}")))?
        .map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_never_contains_plaintext() {
        let hashed = hash("hunter22", 4).await.unwrap();
        assert!(!hashed.contains("hunter22"));
        assert!(verify("hunter22", &hashed).await.unwrap());
        assert!(!verify("hunter23", &hashed).await.unwrap());
    }
}
