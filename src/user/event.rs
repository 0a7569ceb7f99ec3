//! Facts published by the user command handlers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const WAS_REGISTERED_WITH_EMAIL: &str = "user.registered";
pub const EMAIL_ADDRESS_WAS_CHANGED: &str = "user.email-changed";
pub const ACCESS_TOKEN_WAS_REQUESTED: &str = "user.access-token-requested";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WasRegisteredWithEmail {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddressWasChanged {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenWasRequested {
    pub id: Uuid,
    pub email: String,
}
