//! Dispatch integration tests.

mod support;
mod command_bus;
mod event_bus;
