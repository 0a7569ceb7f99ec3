//! Command bus: routes each command to its single handler and reports the
//! outcome back to the originator exactly once.
//!
//! ## Flow
//!
//! ```text
//! dispatch(ctx, cmd)
//!   │  oneshot::channel()
//!   ├─▶ publish(ctx, cmd, tx) ── no handler ──▶ tx.send(Err(NoHandler))
//!   │                          └─ handler ────▶ tokio::spawn(catch_unwind(handle)) ─▶ tx.send(result)
//!   └─▶ select! { rx => result, ctx.done() => Timeout | Cancelled }
//! ```
//!
//! A handler that outlives the caller's deadline keeps running to
//! completion; its late result is dropped.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::oneshot;
use tracing::Instrument;

use crate::config::DispatchConfig;

use super::context::{Context, ContextError};
use super::error::{DispatchError, HandlerError};
use super::handler::panic_message;
use super::message::Command;
use super::registry::CommandRegistry;

/// Single-use result slot for one published command.
pub type CommandResultSender = oneshot::Sender<Result<(), DispatchError>>;
pub type CommandResultReceiver = oneshot::Receiver<Result<(), DispatchError>>;

/// Routes commands to the handlers of a frozen `CommandRegistry`.
///
/// Cloning is cheap; clones share the registry.
///
/// ## Example
///
/// ```ignore
/// let mut registry = CommandRegistry::new();
/// registry.subscribe("user.register", on_register)?;
///
/// let bus = CommandBus::new(registry);
/// let ctx = Context::background().with_timeout(Duration::from_millis(50));
/// bus.dispatch(&ctx, Command::encode("user.register", &input)?).await?;
/// ```
#[derive(Clone)]
pub struct CommandBus {
    registry: Arc<CommandRegistry>,
    config: DispatchConfig,
}

impl CommandBus {
    /// Create a bus with the default configuration.
    pub fn new(registry: CommandRegistry) -> Self {
        Self::with_config(registry, DispatchConfig::default())
    }

    pub fn with_config(registry: CommandRegistry, config: DispatchConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            config,
        }
    }

    /// Hand a command to its handler; the outcome arrives on `out`.
    ///
    /// An unknown command is answered with `NoHandler` before this returns,
    /// without spawning anything. Otherwise the handler runs on its own task
    /// with `ctx`, and a panic inside it is reported as
    /// `HandlerError::Panicked`. Must be called within a Tokio runtime.
    pub fn publish(&self, ctx: &Context, command: Command, out: CommandResultSender) {
        let handler = match self.registry.handler_for(command.name()) {
            Ok(handler) => handler,
            Err(err) => {
                tracing::warn!(command = %command.name(), "no handler registered");
                let _ = out.send(Err(err));
                return;
            }
        };

        let span = tracing::info_span!("command", name = %command.name(), id = %command.id());
        let ctx = ctx.clone();

        tokio::spawn(
            async move {
                let outcome = AssertUnwindSafe(handler.handle(ctx, command))
                    .catch_unwind()
                    .await;

                let result = match outcome {
                    Ok(Ok(())) => {
                        tracing::debug!("command handled");
                        Ok(())
                    }
                    Ok(Err(err)) => {
                        tracing::info!(error = %err, "command handler failed");
                        Err(DispatchError::Handler(err))
                    }
                    Err(payload) => {
                        let message = panic_message(&*payload);
                        tracing::error!(panic = %message, "command handler panicked");
                        Err(DispatchError::Handler(HandlerError::Panicked(message)))
                    }
                };

                if out.send(result).is_err() {
                    tracing::debug!("originator stopped waiting; result dropped");
                }
            }
            .instrument(span),
        );
    }

    /// Publish a command and wait for its outcome.
    ///
    /// Races the handler's result against `ctx`: an expired deadline yields
    /// `Timeout`, an explicit cancellation `Cancelled`. When `ctx` has no
    /// deadline the configured `command_timeout` applies.
    pub async fn dispatch(&self, ctx: &Context, command: Command) -> Result<(), DispatchError> {
        let ctx = match ctx.deadline() {
            Some(_) => ctx.clone(),
            None => ctx.with_timeout(self.config.command_timeout),
        };

        let (tx, rx) = oneshot::channel();
        self.publish(&ctx, command, tx);

        tokio::select! {
            biased;
            result = rx => result.unwrap_or(Err(DispatchError::ChannelClosed)),
            reason = ctx.done() => Err(match reason {
                ContextError::DeadlineExceeded => DispatchError::Timeout,
                ContextError::Cancelled => DispatchError::Cancelled,
            }),
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }
}
