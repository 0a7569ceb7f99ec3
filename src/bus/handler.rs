//! Handler traits for commands and events.
//!
//! Handlers can be structs implementing the traits or plain async closures:
//!
//! ```ignore
//! registry.subscribe("user.register", |ctx: Context, command: Command| async move {
//!     let input = command.decode::<RegisterWithEmail>()?;
//!     // ...
//!     Ok(())
//! })?;
//! ```

use std::future::Future;

use async_trait::async_trait;

use super::context::Context;
use super::error::HandlerError;
use super::message::{Command, Event};

/// Processes one command and reports whether it worked.
#[async_trait]
pub trait CommandHandler: Send + Sync + 'static {
    async fn handle(&self, ctx: Context, command: Command) -> Result<(), HandlerError>;
}

/// Reacts to one event. Failures are the handler's own business: nothing is
/// returned to the publisher.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle(&self, ctx: Context, event: Event);
}

#[async_trait]
impl<F, Fut> CommandHandler for F
where
    F: Fn(Context, Command) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, ctx: Context, command: Command) -> Result<(), HandlerError> {
        (self)(ctx, command).await
    }
}

#[async_trait]
impl<F, Fut> EventHandler for F
where
    F: Fn(Context, Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, ctx: Context, event: Event) {
        (self)(ctx, event).await
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
