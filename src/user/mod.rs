//! User aggregate wired through the command and event buses.
//!
//! ## Wiring
//!
//! Event handlers are registered first so the command handlers can be handed
//! the finished `EventBus`:
//!
//! ```ignore
//! let repo: Arc<dyn UserRepository> = Arc::new(InMemoryUserRepository::new());
//! let (commands, events) = user::wire(repo, issuer, "secret", DispatchConfig::default())?;
//!
//! let command = user::command_from_payload("user.register", body)?;
//! commands.dispatch(&ctx, command).await?;
//! ```

mod command;
mod event;
mod handler;
mod query;
mod repository;
mod subscriber;

use std::sync::Arc;

use crate::bus::{CommandBus, CommandRegistry, DispatchError, EventBus, EventRegistry};
use crate::config::DispatchConfig;

pub use command::{
    command_from_payload, validate_email, ChangeEmailAddress, RegisterWithEmail,
    RequestAccessToken, CHANGE_EMAIL_ADDRESS, REGISTER_WITH_EMAIL, REQUEST_ACCESS_TOKEN,
};
pub use event::{
    AccessTokenWasRequested, EmailAddressWasChanged, WasRegisteredWithEmail,
    ACCESS_TOKEN_WAS_REQUESTED, EMAIL_ADDRESS_WAS_CHANGED, WAS_REGISTERED_WITH_EMAIL,
};
pub use handler::{OnChangeEmailAddress, OnRegisterWithEmail, OnRequestAccessToken};
pub use query::{get_user, list_users, me, UserPage, MIN_PAGE_LIMIT};
pub use repository::{InMemoryUserRepository, User, UserRepository};
pub use subscriber::{
    when_registered_with_email, AccessToken, TokenError, TokenIssuer, WhenAccessTokenWasRequested,
};

/// Register the user event handlers.
pub fn subscribe_events(
    registry: &mut EventRegistry,
    issuer: Arc<dyn TokenIssuer>,
    secret: impl Into<String>,
) -> Result<(), DispatchError> {
    registry.subscribe(WAS_REGISTERED_WITH_EMAIL, when_registered_with_email)?;
    registry.subscribe(
        ACCESS_TOKEN_WAS_REQUESTED,
        WhenAccessTokenWasRequested::new(issuer, secret),
    )?;
    Ok(())
}

/// Register the user command handlers.
pub fn subscribe_commands(
    registry: &mut CommandRegistry,
    repo: Arc<dyn UserRepository>,
    events: &EventBus,
) -> Result<(), DispatchError> {
    registry.subscribe(
        REGISTER_WITH_EMAIL,
        OnRegisterWithEmail::new(Arc::clone(&repo), events.clone()),
    )?;
    registry.subscribe(
        CHANGE_EMAIL_ADDRESS,
        OnChangeEmailAddress::new(Arc::clone(&repo), events.clone()),
    )?;
    registry.subscribe(
        REQUEST_ACCESS_TOKEN,
        OnRequestAccessToken::new(repo, events.clone()),
    )?;
    Ok(())
}

/// Build both buses with every user handler registered.
pub fn wire(
    repo: Arc<dyn UserRepository>,
    issuer: Arc<dyn TokenIssuer>,
    secret: impl Into<String>,
    config: DispatchConfig,
) -> Result<(CommandBus, EventBus), DispatchError> {
    let mut event_registry = EventRegistry::new();
    subscribe_events(&mut event_registry, issuer, secret)?;
    let events = EventBus::new(event_registry);

    let mut command_registry = CommandRegistry::new();
    subscribe_commands(&mut command_registry, repo, &events)?;
    let commands = CommandBus::with_config(command_registry, config);

    Ok((commands, events))
}
