//! Event handlers reacting to user events.
//!
//! These run detached from the request that caused the event. Anything that
//! goes wrong is logged and the event is dropped.

use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::bus::{Context, Event, EventHandler};

use super::event::{AccessTokenWasRequested, WasRegisteredWithEmail};

pub type TokenError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

/// Exchanges resource-owner credentials for an access token with an
/// identity provider.
#[async_trait]
pub trait TokenIssuer: Send + Sync + 'static {
    async fn password_credentials_token(
        &self,
        ctx: &Context,
        username: &str,
        password: &str,
    ) -> Result<AccessToken, TokenError>;
}

/// Issues an access token for `user.access-token-requested`.
pub struct WhenAccessTokenWasRequested {
    issuer: Arc<dyn TokenIssuer>,
    secret: String,
}

impl WhenAccessTokenWasRequested {
    pub fn new(issuer: Arc<dyn TokenIssuer>, secret: impl Into<String>) -> Self {
        Self {
            issuer,
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl EventHandler for WhenAccessTokenWasRequested {
    async fn handle(&self, ctx: Context, event: Event) {
        tracing::info!(payload = ?event.payload_str(), "access token requested");

        let requested: AccessTokenWasRequested = match event.decode() {
            Ok(requested) => requested,
            Err(err) => {
                tracing::error!(error = %err, "undecodable access token request");
                return;
            }
        };

        let token = match self
            .issuer
            .password_credentials_token(&ctx, &requested.email, &self.secret)
            .await
        {
            Ok(token) => token,
            Err(err) => {
                tracing::error!(user_id = %requested.id, error = %err, "token issuance failed");
                return;
            }
        };

        // TODO: deliver the token to the user as an e-mailed magic link.
        tracing::info!(
            user_id = %requested.id,
            token_type = %token.token_type,
            expires_in = ?token.expires_in,
            "access token issued"
        );
    }
}

/// Logs `user.registered`.
pub async fn when_registered_with_email(_ctx: Context, event: Event) {
    match event.decode::<WasRegisteredWithEmail>() {
        Ok(registered) => tracing::info!(
            user_id = %registered.id,
            correlation_id = ?event.metadata("correlation-id"),
            "welcome, new user"
        ),
        Err(err) => tracing::error!(error = %err, "undecodable registration event"),
    }
}
