use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Why a request failed authentication. Every variant surfaces as 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    #[error("Authorization token missing")]
    MissingHeader,

    #[error("Authorization header malformed")]
    MalformedHeader,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: &str, username: &str, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            username: username.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

/// Signs and verifies HS256 credentials with a single shared secret.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        let mut validation = Validation::default();
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Issue a credential for a user, valid for the configured lifetime.
    pub fn issue(&self, user_id: &str, username: &str) -> Result<String, jsonwebtoken::errors::Error> {
        self.sign(&Claims::new(user_id, username, self.ttl))
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&Header::default(), claims, &self.encoding_key)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthFailure> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthFailure::Expired,
                _ => AuthFailure::InvalidToken,
            })
    }

    /// Verify the value of an `Authorization` header.
    pub fn verify_header(&self, header: Option<&str>) -> Result<Claims, AuthFailure> {
        let header = header.ok_or(AuthFailure::MissingHeader)?;
        let token = bearer_token(header).ok_or(AuthFailure::MalformedHeader)?;
        self.verify(token)
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() || token.contains(' ') {
        None
    } else {
        Some(token)
    }
}

/// Generate a random 64-character hex secret for when none is configured.
pub fn generate_secret() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret", 60)
    }

    #[test]
    fn issued_token_round_trips_identity() {
        let issuer = issuer();
        let token = issuer.issue("user-1", "ana").unwrap();
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.username, "ana");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let token = TokenIssuer::new("other", 60).issue("user-1", "ana").unwrap();
        assert_eq!(issuer().verify(&token), Err(AuthFailure::InvalidToken));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let issuer = issuer();
        let claims = Claims::new("user-1", "ana", Duration::minutes(-5));
        let token = issuer.sign(&claims).unwrap();
        assert_eq!(issuer.verify(&token), Err(AuthFailure::Expired));
    }

    #[test]
    fn garbage_token_is_invalid() {
        assert_eq!(issuer().verify("not.a.jwt"), Err(AuthFailure::InvalidToken));
    }

    #[test]
    fn header_failures_are_distinguished() {
        let issuer = issuer();
        assert_eq!(issuer.verify_header(None), Err(AuthFailure::MissingHeader));
        assert_eq!(
            issuer.verify_header(Some("Token abc")),
            Err(AuthFailure::MalformedHeader)
        );
        assert_eq!(
            issuer.verify_header(Some("Bearer ")),
            Err(AuthFailure::MalformedHeader)
        );
        assert_eq!(
            issuer.verify_header(Some("Bearer abc")),
            Err(AuthFailure::InvalidToken)
        );

        let token = issuer.issue("user-1", "ana").unwrap();
        let header = format!("Bearer {}", token);
        assert_eq!(issuer.verify_header(Some(&header)).unwrap().sub, "user-1");
    }

    #[test]
    fn generated_secret_is_64_hex_chars() {
        let secret = generate_secret();
        assert_eq!(secret.len(), 64);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(secret, generate_secret());
    }
}
