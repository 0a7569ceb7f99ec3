//! Event bus: fans each event out to every registered handler,
//! fire-and-forget.
//!
//! Each handler runs on its own task behind a panic boundary, so a failing
//! handler affects neither its siblings nor the publisher. Nothing is
//! acknowledged or retried; failures are only visible in the logs.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Notify;
use tracing::Instrument;

use super::context::Context;
use super::handler::panic_message;
use super::message::Event;
use super::registry::EventRegistry;

#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

/// Decrements the in-flight count when a handler task finishes, however it
/// finishes.
struct InFlightGuard(Arc<InFlight>);

impl InFlightGuard {
    fn enter(in_flight: &Arc<InFlight>) -> Self {
        in_flight.count.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(in_flight))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Publishes events to the handlers of a frozen `EventRegistry`.
///
/// Cloning is cheap; clones share the registry and the in-flight count.
///
/// ## Example
///
/// ```ignore
/// let mut registry = EventRegistry::new();
/// registry.subscribe("user.access-token-requested", issue_token)?;
///
/// let bus = EventBus::new(registry);
/// bus.publish(&ctx, Event::encode("user.access-token-requested", &payload)?);
/// ```
#[derive(Clone)]
pub struct EventBus {
    registry: Arc<EventRegistry>,
    in_flight: Arc<InFlight>,
}

impl EventBus {
    pub fn new(registry: EventRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            in_flight: Arc::new(InFlight::default()),
        }
    }

    /// Start every handler registered for the event and return immediately.
    ///
    /// Handlers receive a detached copy of `ctx`: identity and values carry
    /// over, the publisher's deadline and cancellation do not. Must be
    /// called within a Tokio runtime when any handler is registered.
    pub fn publish(&self, ctx: &Context, event: Event) {
        let handlers = self.registry.handlers_for(event.name());
        if handlers.is_empty() {
            tracing::trace!(event = %event.name(), "no subscribers");
            return;
        }

        let ctx = ctx.detached();
        for (index, handler) in handlers.iter().enumerate() {
            let handler = Arc::clone(handler);
            let ctx = ctx.clone();
            let event = event.clone();
            let guard = InFlightGuard::enter(&self.in_flight);
            let span = tracing::info_span!(
                "event",
                name = %event.name(),
                id = %event.id(),
                handler = index
            );

            tokio::spawn(
                async move {
                    let _guard = guard;
                    if let Err(payload) = AssertUnwindSafe(handler.handle(ctx, event))
                        .catch_unwind()
                        .await
                    {
                        tracing::error!(
                            panic = %panic_message(&*payload),
                            "event handler panicked; event dropped"
                        );
                    }
                }
                .instrument(span),
            );
        }
    }

    /// Number of handler invocations still running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::Acquire)
    }

    /// Resolves once no handler invocation is running.
    pub async fn drained(&self) {
        loop {
            let notified = self.in_flight.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }
}
