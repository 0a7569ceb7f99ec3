//! User commands and their payloads.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bus::{Command, HandlerError};

pub const REGISTER_WITH_EMAIL: &str = "user.register";
pub const CHANGE_EMAIL_ADDRESS: &str = "user.change-email";
pub const REQUEST_ACCESS_TOKEN: &str = "user.request-access-token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterWithEmail {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEmailAddress {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestAccessToken {
    pub id: Uuid,
}

/// Build a command from its name and a raw JSON body.
///
/// The body is decoded into the command's payload type up front, so
/// unknown names, malformed JSON, and invalid e-mail addresses are refused
/// before anything reaches the bus.
pub fn command_from_payload(name: &str, body: &[u8]) -> Result<Command, HandlerError> {
    match name {
        REGISTER_WITH_EMAIL => {
            let mut input: RegisterWithEmail = parse(body)?;
            input.email = validate_email(&input.email)?;
            Command::encode(name, &input)
        }
        CHANGE_EMAIL_ADDRESS => {
            let mut input: ChangeEmailAddress = parse(body)?;
            input.email = validate_email(&input.email)?;
            Command::encode(name, &input)
        }
        REQUEST_ACCESS_TOKEN => Command::encode(name, &parse::<RequestAccessToken>(body)?),
        _ => Err(HandlerError::Rejected(format!("unknown command: {}", name))),
    }
}

fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T, HandlerError> {
    if body.is_empty() {
        return Err(HandlerError::DecodeFailed("empty request body".into()));
    }
    Ok(serde_json::from_slice(body)?)
}

/// Trim and sanity-check an e-mail address.
pub fn validate_email(email: &str) -> Result<String, HandlerError> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if valid {
        Ok(email.to_string())
    } else {
        Err(HandlerError::Rejected(format!("invalid email address: {:?}", email)))
    }
}
