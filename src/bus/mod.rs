//! Dispatch layer: command bus and event bus.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │        Registries (built once at startup, then frozen)      │
//! │  CommandRegistry: name → exactly one CommandHandler         │
//! │  EventRegistry:   name → zero or more EventHandlers         │
//! └─────────────────────────────────────────────────────────────┘
//!            │                                 │
//!            ▼                                 ▼
//! ┌─────────────────────────┐    ┌──────────────────────────────┐
//! │       CommandBus        │    │           EventBus           │
//! │ dispatch(ctx, command)  │    │ publish(ctx, event)          │
//! │ one task per command    │    │ one task per handler         │
//! │ result via oneshot      │    │ fire-and-forget              │
//! │ deadline → Timeout      │    │ panics logged, never raised  │
//! └─────────────────────────┘    └──────────────────────────────┘
//! ```
//!
//! Commands model "do this and tell me if it worked": one responder, a
//! bounded wait, failures propagated. Events model "this happened": any
//! number of listeners, nobody waits, failures stay with the listener.

mod command_bus;
mod context;
mod error;
mod event_bus;
mod handler;
mod message;
mod registry;

pub use command_bus::{CommandBus, CommandResultReceiver, CommandResultSender};
pub use context::{Context, ContextError, Identity};
pub use error::{DispatchError, HandlerError};
pub use event_bus::EventBus;
pub use handler::{CommandHandler, EventHandler};
pub use message::{Command, Event};
pub use registry::{CommandRegistry, EventRegistry};
