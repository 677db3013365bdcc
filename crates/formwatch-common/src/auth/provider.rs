//! Identity provider seam
//!
//! The relay never verifies role claims itself; it asks an identity provider
//! once per connection and attaches the result to the connection.

use async_trait::async_trait;
use formwatch_core::Identity;

use super::JwtService;
use crate::error::AppError;

/// Turns a connection-time token into an authenticated identity
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<Identity, AppError>;
}

#[async_trait]
impl IdentityProvider for JwtService {
    async fn authenticate(&self, token: &str) -> Result<Identity, AppError> {
        self.validate_identity(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formwatch_core::UserId;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_jwt_provider_as_trait_object() {
        let jwt = JwtService::new("provider-test-secret-long-enough", 60);
        let identity = Identity::user(UserId::generate());
        let token = jwt.issue(identity).unwrap();

        let provider: Arc<dyn IdentityProvider> = Arc::new(jwt);
        assert_eq!(provider.authenticate(&token).await.unwrap(), identity);
        assert!(provider.authenticate("garbage").await.is_err());
    }
}
