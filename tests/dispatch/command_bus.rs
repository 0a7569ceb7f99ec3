//! Command bus behaviour through the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use sourced_dispatch::bus::{CommandResultReceiver, CommandResultSender};
use sourced_dispatch::{
    Command, CommandBus, CommandRegistry, Context, DispatchError, HandlerError,
};
use tokio::sync::{mpsc, oneshot};

use crate::support::command;

#[tokio::test]
async fn unknown_command_is_no_handler() {
    let bus = CommandBus::new(CommandRegistry::new());
    let result = bus.dispatch(&Context::background(), command("user.register")).await;
    assert!(matches!(result, Err(DispatchError::NoHandler { ref name }) if name == "user.register"));
}

#[tokio::test]
async fn handler_runs_exactly_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = CommandRegistry::new();
    {
        let calls = Arc::clone(&calls);
        registry
            .subscribe("ping", move |_ctx: Context, _cmd: Command| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, HandlerError>(())
                }
            })
            .unwrap();
    }
    let bus = CommandBus::new(registry);

    let ctx = Context::background().with_timeout(Duration::from_secs(1));
    bus.dispatch(&ctx, command("ping")).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn low_level_publish_delivers_one_value() {
    let mut registry = CommandRegistry::new();
    registry
        .subscribe("ping", |_ctx: Context, _cmd: Command| async move {
            Ok::<_, HandlerError>(())
        })
        .unwrap();
    let bus = CommandBus::new(registry);

    let (tx, rx): (CommandResultSender, CommandResultReceiver) = oneshot::channel();
    bus.publish(&Context::background(), command("ping"), tx);
    assert!(rx.await.unwrap().is_ok());
}

#[tokio::test]
async fn handler_receives_caller_context() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let mut registry = CommandRegistry::new();
    registry
        .subscribe("whoami", move |ctx: Context, _cmd: Command| {
            let seen_tx = seen_tx.clone();
            async move {
                let _ = seen_tx.send(ctx.value("request-id").map(str::to_string));
                Ok::<_, HandlerError>(())
            }
        })
        .unwrap();
    let bus = CommandBus::new(registry);

    let ctx = Context::background().with_value("request-id", "r-42");
    bus.dispatch(&ctx, command("whoami")).await.unwrap();
    assert_eq!(seen_rx.recv().await, Some(Some("r-42".to_string())));
}

#[tokio::test]
async fn timeout_does_not_stop_the_handler() {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let mut registry = CommandRegistry::new();
    registry
        .subscribe("slow", move |_ctx: Context, _cmd: Command| {
            let done_tx = done_tx.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                let _ = done_tx.send(());
                Ok::<_, HandlerError>(())
            }
        })
        .unwrap();
    let bus = CommandBus::new(registry);

    let started = Instant::now();
    let ctx = Context::background().with_timeout(Duration::from_millis(20));
    let result = bus.dispatch(&ctx, command("slow")).await;
    let waited = started.elapsed();

    assert!(matches!(result, Err(DispatchError::Timeout)));
    assert!(waited >= Duration::from_millis(20));
    assert!(waited < Duration::from_millis(400));
    assert!(done_rx.try_recv().is_err());

    // The handler still finishes; its late result goes nowhere.
    tokio::time::timeout(Duration::from_secs(2), done_rx.recv())
        .await
        .unwrap();
}

#[tokio::test]
async fn handler_may_observe_its_deadline() {
    let mut registry = CommandRegistry::new();
    registry
        .subscribe("cooperative", |ctx: Context, _cmd: Command| async move {
            let reason = ctx.done().await;
            Err(HandlerError::Aborted(reason))
        })
        .unwrap();
    let bus = CommandBus::new(registry);

    let ctx = Context::background().with_timeout(Duration::from_millis(10));
    let result = bus.dispatch(&ctx, command("cooperative")).await;
    // Either the deadline or the handler's own abort may win the race.
    assert!(matches!(
        result,
        Err(DispatchError::Timeout) | Err(DispatchError::Handler(HandlerError::Aborted(_)))
    ));
}

#[tokio::test]
async fn panicking_handler_does_not_poison_the_bus() {
    let mut registry = CommandRegistry::new();
    registry
        .subscribe("boom", |_ctx: Context, _cmd: Command| async move {
            if true {
                panic!("bad handler");
            }
            Ok::<_, HandlerError>(())
        })
        .unwrap();
    registry
        .subscribe("ping", |_ctx: Context, _cmd: Command| async move {
            Ok::<_, HandlerError>(())
        })
        .unwrap();
    let bus = CommandBus::new(registry);

    for _ in 0..3 {
        let result = bus.dispatch(&Context::background(), command("boom")).await;
        assert!(matches!(
            result,
            Err(DispatchError::Handler(HandlerError::Panicked(ref msg))) if msg == "bad handler"
        ));
    }
    bus.dispatch(&Context::background(), command("ping")).await.unwrap();
}

#[tokio::test]
async fn concurrent_dispatches_are_independent() {
    let mut registry = CommandRegistry::new();
    registry
        .subscribe("echo", |_ctx: Context, cmd: Command| async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            match cmd.payload_str() {
                Some("fail") => Err(HandlerError::Rejected("asked to fail".into())),
                _ => Ok(()),
            }
        })
        .unwrap();
    let bus = CommandBus::new(registry);

    let mut handles = Vec::new();
    for i in 0..20 {
        let bus = bus.clone();
        handles.push(tokio::spawn(async move {
            let payload = if i % 2 == 0 { "ok" } else { "fail" };
            let cmd = Command::new("echo", payload.as_bytes().to_vec());
            (i, bus.dispatch(&Context::background(), cmd).await)
        }));
    }

    for handle in handles {
        let (i, result) = handle.await.unwrap();
        assert_eq!(result.is_ok(), i % 2 == 0, "dispatch {} had the wrong outcome", i);
    }
}
