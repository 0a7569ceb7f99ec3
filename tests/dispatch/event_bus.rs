//! Event bus fan-out and fault isolation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sourced_dispatch::{Context, Event, EventBus, EventRegistry};
use tokio::sync::mpsc;

use crate::support::event;

async fn drained(bus: &EventBus) {
    tokio::time::timeout(Duration::from_secs(2), bus.drained())
        .await
        .expect("event handlers did not finish");
}

fn counting(
    counter: &Arc<AtomicUsize>,
) -> impl Fn(Context, Event) -> futures::future::Ready<()> + Send + Sync + 'static {
    let counter = Arc::clone(counter);
    move |_ctx: Context, _event: Event| {
        counter.fetch_add(1, Ordering::SeqCst);
        futures::future::ready(())
    }
}

#[tokio::test]
async fn no_subscribers_returns_immediately() {
    let bus = EventBus::new(EventRegistry::new());
    bus.publish(&Context::background(), event("user.registered"));
    assert_eq!(bus.in_flight(), 0);
    drained(&bus).await;
}

#[tokio::test]
async fn every_subscriber_receives_every_event() {
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let mut registry = EventRegistry::new();
    registry.subscribe("user.registered", counting(&first)).unwrap();
    registry.subscribe("user.registered", counting(&second)).unwrap();
    let bus = EventBus::new(registry);

    for _ in 0..5 {
        bus.publish(&Context::background(), event("user.registered"));
    }
    bus.publish(&Context::background(), event("user.email-changed"));
    drained(&bus).await;

    assert_eq!(first.load(Ordering::SeqCst), 5);
    assert_eq!(second.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn panicking_subscriber_is_isolated() {
    let completed = Arc::new(AtomicUsize::new(0));
    let mut registry = EventRegistry::new();
    registry.subscribe("user.registered", counting(&completed)).unwrap();
    registry
        .subscribe("user.registered", |_ctx: Context, _event: Event| async move {
            panic!("third-party outage");
        })
        .unwrap();
    registry.subscribe("user.registered", counting(&completed)).unwrap();
    registry
        .subscribe("user.registered", |_ctx: Context, _event: Event| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            panic!("late failure");
        })
        .unwrap();
    registry.subscribe("user.registered", counting(&completed)).unwrap();
    let bus = EventBus::new(registry);

    bus.publish(&Context::background(), event("user.registered"));
    drained(&bus).await;
    assert_eq!(completed.load(Ordering::SeqCst), 3);

    // Later publishes are unaffected.
    bus.publish(&Context::background(), event("user.registered"));
    drained(&bus).await;
    assert_eq!(completed.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn slow_subscriber_does_not_delay_siblings() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut registry = EventRegistry::new();
    {
        let tx = tx.clone();
        registry
            .subscribe("user.registered", move |_ctx: Context, _event: Event| {
                let tx = tx.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    let _ = tx.send("slow");
                }
            })
            .unwrap();
    }
    registry
        .subscribe("user.registered", move |_ctx: Context, _event: Event| {
            let tx = tx.clone();
            async move {
                let _ = tx.send("fast");
            }
        })
        .unwrap();
    let bus = EventBus::new(registry);

    bus.publish(&Context::background(), event("user.registered"));
    assert_eq!(rx.recv().await, Some("fast"));
    assert_eq!(rx.recv().await, Some("slow"));
}

#[tokio::test]
async fn subscribers_see_identity_and_payload() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut registry = EventRegistry::new();
    registry
        .subscribe("user.registered", move |ctx: Context, event: Event| {
            let tx = tx.clone();
            async move {
                let _ = tx.send((
                    ctx.value("request-id").map(str::to_string),
                    event.payload_str().map(str::to_string),
                ));
            }
        })
        .unwrap();
    let bus = EventBus::new(registry);

    let ctx = Context::background().with_value("request-id", "r-7");
    bus.publish(&ctx, Event::new("user.registered", br#"{"id":1}"#.to_vec()));

    let (request_id, payload) = rx.recv().await.unwrap();
    assert_eq!(request_id.as_deref(), Some("r-7"));
    assert_eq!(payload.as_deref(), Some(r#"{"id":1}"#));
}
