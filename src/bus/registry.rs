//! Handler registries: populated once at startup, then moved into a bus.
//!
//! Commands have exactly one responder: a second registration under the same
//! name is a configuration error. Events fan out: every registration is kept,
//! in registration order.

use std::collections::HashMap;
use std::sync::Arc;

use super::error::DispatchError;
use super::handler::{CommandHandler, EventHandler};

/// Command handlers keyed by command name.
#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the single handler for a command name.
    ///
    /// Returns `AlreadyRegistered` if the name is taken; the existing
    /// handler stays in place.
    pub fn subscribe<H: CommandHandler>(
        &mut self,
        name: impl Into<String>,
        handler: H,
    ) -> Result<(), DispatchError> {
        let name = name.into();
        if self.handlers.contains_key(&name) {
            return Err(DispatchError::AlreadyRegistered { name });
        }
        tracing::debug!(command = %name, "command handler registered");
        self.handlers.insert(name, Arc::new(handler));
        Ok(())
    }

    /// Look up the handler for a command name.
    pub fn handler_for(&self, name: &str) -> Result<Arc<dyn CommandHandler>, DispatchError> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| DispatchError::NoHandler {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Event handlers keyed by event name.
#[derive(Default)]
pub struct EventRegistry {
    handlers: HashMap<String, Vec<Arc<dyn EventHandler>>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler for an event name. Never fails; the `Result` keeps the
    /// signature in line with `CommandRegistry::subscribe`.
    pub fn subscribe<H: EventHandler>(
        &mut self,
        name: impl Into<String>,
        handler: H,
    ) -> Result<(), DispatchError> {
        let name = name.into();
        tracing::debug!(event = %name, "event handler registered");
        self.handlers
            .entry(name)
            .or_default()
            .push(Arc::new(handler));
        Ok(())
    }

    /// Handlers for an event name in registration order; empty if none.
    pub fn handlers_for(&self, name: &str) -> &[Arc<dyn EventHandler>] {
        self.handlers.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Registered event names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Total number of registrations across all event names.
    pub fn len(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
