pub mod bus;
pub mod config;
mod error;
pub mod telemetry;
pub mod user;

pub use bus::{
    Command, CommandBus, CommandHandler, CommandRegistry, Context, ContextError, DispatchError,
    Event, EventBus, EventHandler, EventRegistry, HandlerError, Identity,
};
pub use config::{ConfigError, DispatchConfig};
pub use error::RepositoryError;
