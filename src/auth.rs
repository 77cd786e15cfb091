use std::fmt::Write;

use anyhow::Result;
use tracing::info;

use crate::crud::{DB, User};

const TOKEN_BYTES: usize = 32;

/// Tokens are stored as blake3 digests; the raw value only exists in the
/// caller's hands.
pub fn hash_token(token: &str) -> String {
    blake3::hash(token.trim().as_bytes()).to_hex().to_string()
}

fn generate_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::random();
    bytes.iter().fold(String::with_capacity(TOKEN_BYTES * 2), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}

/// Creates the user if needed and replaces their token with a fresh one.
pub async fn issue_token(db: &DB, email: &str) -> Result<(User, String)> {
    let user = db.upsert_user(email).await?;
    let token = generate_token();
    db.set_token_hash(user.id, &hash_token(&token)).await?;
    info!(user_id = user.id, "issued api token");
    Ok((user, token))
}

/// Accepts a raw token or a `Bearer <token>` header value.
pub async fn authenticate(db: &DB, header_value: &str) -> Result<Option<User>> {
    let header_value = header_value.trim();
    let token = header_value
        .strip_prefix("Bearer ")
        .or_else(|| header_value.strip_prefix("bearer "))
        .unwrap_or(header_value)
        .trim();
    if token.is_empty() {
        return Ok(None);
    }
    db.user_for_token_hash(&hash_token(token)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_random_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn hash_is_stable_and_not_the_token() {
        assert_eq!(hash_token("abc"), hash_token(" abc\n"));
        assert_ne!(hash_token("abc"), "abc");
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }

    #[tokio::test]
    async fn issued_token_authenticates() {
        let db = DB::new_in_memory().await.unwrap();
        let (user, token) = issue_token(&db, "ada@example.com").await.unwrap();

        let raw = authenticate(&db, &token).await.unwrap();
        assert_eq!(raw.map(|u| u.id), Some(user.id));

        let bearer = authenticate(&db, &format!("Bearer {token}")).await.unwrap();
        assert_eq!(bearer.map(|u| u.id), Some(user.id));

        assert!(authenticate(&db, "nope").await.unwrap().is_none());
        assert!(authenticate(&db, "Bearer ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reissuing_revokes_previous_token() {
        let db = DB::new_in_memory().await.unwrap();
        let (_, old) = issue_token(&db, "ada@example.com").await.unwrap();
        let (_, new) = issue_token(&db, "ada@example.com").await.unwrap();

        assert!(authenticate(&db, &old).await.unwrap().is_none());
        assert!(authenticate(&db, &new).await.unwrap().is_some());
    }
}
