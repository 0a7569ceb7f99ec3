//! Command handlers for the user aggregate.
//!
//! Each handler decodes its payload, checks that the caller is still
//! waiting, writes through the repository, and announces what happened on
//! the event bus. Once a write has started it is carried through even if the
//! caller's deadline passes meanwhile.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::bus::{Command, CommandHandler, Context, Event, EventBus, HandlerError};

use super::command::{validate_email, ChangeEmailAddress, RegisterWithEmail, RequestAccessToken};
use super::event::{
    AccessTokenWasRequested, EmailAddressWasChanged, WasRegisteredWithEmail,
    ACCESS_TOKEN_WAS_REQUESTED, EMAIL_ADDRESS_WAS_CHANGED, WAS_REGISTERED_WITH_EMAIL,
};
use super::repository::{User, UserRepository};

fn ensure_live(ctx: &Context) -> Result<(), HandlerError> {
    match ctx.err() {
        Some(reason) => Err(HandlerError::Aborted(reason)),
        None => Ok(()),
    }
}

fn load(repo: &dyn UserRepository, id: Uuid) -> Result<User, HandlerError> {
    repo.get(id)?
        .ok_or_else(|| HandlerError::NotFound(format!("user {}", id)))
}

/// Handles `user.register`: creates the user and publishes `user.registered`.
pub struct OnRegisterWithEmail {
    repo: Arc<dyn UserRepository>,
    events: EventBus,
}

impl OnRegisterWithEmail {
    pub fn new(repo: Arc<dyn UserRepository>, events: EventBus) -> Self {
        Self { repo, events }
    }
}

#[async_trait]
impl CommandHandler for OnRegisterWithEmail {
    async fn handle(&self, ctx: Context, command: Command) -> Result<(), HandlerError> {
        let input: RegisterWithEmail = command.decode()?;
        let email = validate_email(&input.email)?;
        ensure_live(&ctx)?;

        let user = User::new(Uuid::new_v4(), email);
        self.repo.add(user.clone())?;
        tracing::info!(user_id = %user.id, "user registered");

        let event = Event::encode(
            WAS_REGISTERED_WITH_EMAIL,
            &WasRegisteredWithEmail {
                id: user.id,
                email: user.email,
            },
        )?
        .caused_by(&command);
        self.events.publish(&ctx, event);
        Ok(())
    }
}

/// Handles `user.change-email`: updates the address and publishes
/// `user.email-changed`.
pub struct OnChangeEmailAddress {
    repo: Arc<dyn UserRepository>,
    events: EventBus,
}

impl OnChangeEmailAddress {
    pub fn new(repo: Arc<dyn UserRepository>, events: EventBus) -> Self {
        Self { repo, events }
    }
}

#[async_trait]
impl CommandHandler for OnChangeEmailAddress {
    async fn handle(&self, ctx: Context, command: Command) -> Result<(), HandlerError> {
        let input: ChangeEmailAddress = command.decode()?;
        let email = validate_email(&input.email)?;
        ensure_live(&ctx)?;

        let mut user = load(self.repo.as_ref(), input.id)?;
        user.email = email;
        self.repo.save(user.clone())?;

        let event = Event::encode(
            EMAIL_ADDRESS_WAS_CHANGED,
            &EmailAddressWasChanged {
                id: user.id,
                email: user.email,
            },
        )?
        .caused_by(&command);
        self.events.publish(&ctx, event);
        Ok(())
    }
}

/// Handles `user.request-access-token`: publishes
/// `user.access-token-requested` for an existing user. Issuing the token is
/// left to event subscribers.
pub struct OnRequestAccessToken {
    repo: Arc<dyn UserRepository>,
    events: EventBus,
}

impl OnRequestAccessToken {
    pub fn new(repo: Arc<dyn UserRepository>, events: EventBus) -> Self {
        Self { repo, events }
    }
}

#[async_trait]
impl CommandHandler for OnRequestAccessToken {
    async fn handle(&self, ctx: Context, command: Command) -> Result<(), HandlerError> {
        let input: RequestAccessToken = command.decode()?;
        ensure_live(&ctx)?;

        let user = load(self.repo.as_ref(), input.id)?;
        let event = Event::encode(
            ACCESS_TOKEN_WAS_REQUESTED,
            &AccessTokenWasRequested {
                id: user.id,
                email: user.email,
            },
        )?
        .caused_by(&command);
        self.events.publish(&ctx, event);
        Ok(())
    }
}
