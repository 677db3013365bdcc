//! JWT identity tokens
//!
//! The identity provider signs a token carrying the user id and role; the relay
//! only validates it. `issue` exists for tooling and tests that need to mint
//! tokens with the shared secret.

use chrono::{Duration, Utc};
use formwatch_core::{Identity, Role, UserId};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;
use crate::error::AppError;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Application role of the account
    #[serde(rename = "user_role")]
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Audience, when the provider sets one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

impl Claims {
    /// Get the user ID
    ///
    /// # Errors
    /// Returns an error if the subject is not a valid user id
    pub fn user_id(&self) -> Result<UserId, AppError> {
        self.sub.parse().map_err(|_| AppError::InvalidToken)
    }

    /// Build the connection identity from these claims
    pub fn identity(&self) -> Result<Identity, AppError> {
        Ok(Identity::new(self.user_id()?, self.role))
    }

    /// Check if the token is expired
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// JWT service for validating (and minting) identity tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry: i64,
    audience: Option<String>,
}

impl JwtService {
    /// Create a new JWT service with the given secret and token lifetime in seconds
    #[must_use]
    pub fn new(secret: &str, token_expiry: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_expiry,
            audience: None,
        }
    }

    /// Create a JWT service from configuration
    #[must_use]
    pub fn from_config(config: &JwtConfig) -> Self {
        let service = Self::new(&config.secret, config.token_expiry);
        match &config.audience {
            Some(audience) => service.with_audience(audience.clone()),
            None => service,
        }
    }

    /// Require (and stamp) the given audience
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Issue a token for an identity
    ///
    /// # Errors
    /// Returns an error if token encoding fails
    pub fn issue(&self, identity: Identity) -> Result<String, AppError> {
        let now = Utc::now();

        let claims = Claims {
            sub: identity.user_id.to_string(),
            role: identity.role,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.token_expiry)).timestamp(),
            aud: self.audience.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Failed to encode JWT")))
    }

    /// Decode and validate a JWT token
    ///
    /// # Errors
    /// Returns an error if the token is invalid or expired
    pub fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        match &self.audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => AppError::InvalidToken,
            }
        })?;

        Ok(token_data.claims)
    }

    /// Validate a token and return the identity it carries
    pub fn validate_identity(&self, token: &str) -> Result<Identity, AppError> {
        let token = token.strip_prefix("Bearer ").unwrap_or(token);
        self.decode_token(token)?.identity()
    }
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("token_expiry", &self.token_expiry)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> JwtService {
        JwtService::new("test-secret-key-that-is-long-enough", 900)
    }

    #[test]
    fn test_issue_and_validate() {
        let service = create_test_service();
        let identity = Identity::admin(UserId::generate());

        let token = service.issue(identity).unwrap();
        assert!(!token.is_empty());

        let validated = service.validate_identity(&token).unwrap();
        assert_eq!(validated, identity);
    }

    #[test]
    fn test_from_config_applies_audience() {
        let config = JwtConfig {
            secret: "test-secret-key-that-is-long-enough".to_string(),
            token_expiry: 60,
            audience: Some("formwatch".to_string()),
        };
        let service = JwtService::from_config(&config);
        let identity = Identity::user(UserId::generate());

        let token = service.issue(identity).unwrap();
        assert_eq!(service.decode_token(&token).unwrap().aud.as_deref(), Some("formwatch"));

        let other = JwtService::new("test-secret-key-that-is-long-enough", 60)
            .with_audience("elsewhere");
        assert!(other.validate_identity(&token).is_err());
    }

    #[test]
    fn test_bearer_prefix_accepted() {
        let service = create_test_service();
        let identity = Identity::user(UserId::generate());

        let token = service.issue(identity).unwrap();
        let validated = service.validate_identity(&format!("Bearer {token}")).unwrap();
        assert_eq!(validated.user_id, identity.user_id);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtService::new("another-secret-entirely-different", 900);
        let token = issuer.issue(Identity::user(UserId::generate())).unwrap();

        let result = create_test_service().validate_identity(&token);
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_expired_token() {
        let service = JwtService::new("test-secret-key-that-is-long-enough", -3600);
        let token = service.issue(Identity::user(UserId::generate())).unwrap();

        let result = service.validate_identity(&token);
        assert!(matches!(result, Err(AppError::TokenExpired)));
    }

    #[test]
    fn test_audience_enforced() {
        let service = create_test_service().with_audience("formwatch");
        let token = service.issue(Identity::user(UserId::generate())).unwrap();
        assert!(service.validate_identity(&token).is_ok());

        let other = create_test_service().with_audience("somewhere-else");
        assert!(other.validate_identity(&token).is_err());
    }

    #[test]
    fn test_invalid_token() {
        let service = create_test_service();

        let result = service.decode_token("invalid.token.here");
        assert!(matches!(result, Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_claims_bad_subject() {
        let claims = Claims {
            sub: "12345".to_string(),
            role: Role::User,
            iat: 0,
            exp: i64::MAX,
            aud: None,
        };

        assert!(matches!(claims.identity(), Err(AppError::InvalidToken)));
        assert!(!claims.is_expired());
    }
}
