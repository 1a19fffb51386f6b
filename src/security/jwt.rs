use anyhow::{anyhow, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub access_token_expiry_minutes: i64,
    pub leeway_seconds: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            issuer: "callserver".into(),
            audience: "callserver-api".into(),
            access_token_expiry_minutes: 24 * 60,
            leeway_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    pub nbf: i64,
    pub jti: String,
    pub email: String,
    #[serde(default)]
    pub is_staff: bool,
}

impl Claims {
    pub fn user_id(&self) -> Result<i32> {
        self.sub
            .parse()
            .map_err(|e| anyhow!("Invalid subject in token: {e}"))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    pub fn new(config: JwtConfig, secret: &str) -> Result<Self> {
        if secret.len() < 16 {
            return Err(anyhow!("JWT secret must be at least 16 bytes"));
        }
        Ok(Self {
            config,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    pub fn generate_access_token(
        &self,
        user_id: i32,
        email: &str,
        is_staff: bool,
    ) -> Result<AccessToken> {
        let now = Utc::now();
        let expiry = now + Duration::minutes(self.config.access_token_expiry_minutes);
        let claims = Claims {
            sub: user_id.to_string(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            exp: expiry.timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            email: email.to_string(),
            is_staff,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow!("Failed to encode token: {e}"))?;
        debug!("Issued access token for user {}", user_id);

        Ok(AccessToken {
            access_token: token,
            token_type: "Bearer".into(),
            expires_in: self.config.access_token_expiry_minutes * 60,
        })
    }

    pub fn validate_access_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation.leeway = self.config.leeway_seconds;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| anyhow!("Token validation failed: {e}"))
    }
}

pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> JwtManager {
        JwtManager::new(JwtConfig::default(), "test-secret-with-enough-length").unwrap()
    }

    #[test]
    fn test_token_round_trip() {
        let manager = manager();
        let token = manager
            .generate_access_token(42, "agent@example.com", true)
            .unwrap();
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, 24 * 60 * 60);

        let claims = manager.validate_access_token(&token.access_token).unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.email, "agent@example.com");
        assert!(claims.is_staff);
    }

    #[test]
    fn test_rejects_foreign_signature() {
        let other = JwtManager::new(JwtConfig::default(), "another-secret-of-some-length").unwrap();
        let token = other.generate_access_token(1, "a@b.com", false).unwrap();
        assert!(manager().validate_access_token(&token.access_token).is_err());
    }

    #[test]
    fn test_rejects_expired_token() {
        let config = JwtConfig {
            access_token_expiry_minutes: -10,
            leeway_seconds: 0,
            ..JwtConfig::default()
        };
        let manager = JwtManager::new(config, "test-secret-with-enough-length").unwrap();
        let token = manager.generate_access_token(1, "a@b.com", false).unwrap();
        assert!(manager.validate_access_token(&token.access_token).is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(JwtManager::new(JwtConfig::default(), "short").is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }
}
