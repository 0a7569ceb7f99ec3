//! Dispatch context: cancellation, deadlines, and request-scoped values.
//!
//! A `Context` is cheap to clone and is handed to every handler. Derived
//! contexts form a tree: cancelling a context is observed by all of its
//! descendants, and a child's deadline is never later than its parent's.
//!
//! ## Example
//!
//! ```ignore
//! let ctx = Context::background()
//!     .with_identity(Identity::new(user_id, "a@b.c"))
//!     .with_timeout(Duration::from_millis(50));
//!
//! bus.dispatch(&ctx, command).await?;
//! ```

use std::collections::HashMap;
use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use uuid::Uuid;

/// Why a context is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context cancelled")]
    Cancelled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// The authenticated caller a request runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
}

impl Identity {
    pub fn new(id: Uuid, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

struct Inner {
    cancel_tx: watch::Sender<bool>,
    parent: Option<Context>,
    deadline: Option<Instant>,
    identity: Option<Arc<Identity>>,
    values: Arc<HashMap<String, String>>,
}

#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("deadline", &self.inner.deadline)
            .field("identity", &self.inner.identity)
            .field("err", &self.err())
            .finish()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// A root context: never cancelled, no deadline, no values.
    pub fn background() -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                cancel_tx,
                parent: None,
                deadline: None,
                identity: None,
                values: Arc::new(HashMap::new()),
            }),
        }
    }

    fn derive(
        &self,
        deadline: Option<Instant>,
        identity: Option<Arc<Identity>>,
        values: Arc<HashMap<String, String>>,
    ) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                cancel_tx,
                parent: Some(self.clone()),
                deadline,
                identity,
                values,
            }),
        }
    }

    fn inherit(&self) -> (Option<Instant>, Option<Arc<Identity>>, Arc<HashMap<String, String>>) {
        (
            self.inner.deadline,
            self.inner.identity.clone(),
            Arc::clone(&self.inner.values),
        )
    }

    /// Derive a child that can be cancelled independently of its parent.
    pub fn with_cancel(&self) -> Self {
        let (deadline, identity, values) = self.inherit();
        self.derive(deadline, identity, values)
    }

    /// Derive a child that expires `timeout` from now (or at the parent's
    /// deadline, whichever is first). A timeout too large to represent as an
    /// instant adds no deadline of its own.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.with_cancel(),
        }
    }

    /// Derive a child that expires at `deadline` (or at the parent's
    /// deadline, whichever is first).
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let (parent_deadline, identity, values) = self.inherit();
        let deadline = match parent_deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        self.derive(Some(deadline), identity, values)
    }

    /// Derive a child carrying the caller's identity.
    pub fn with_identity(&self, identity: Identity) -> Self {
        let (deadline, _, values) = self.inherit();
        self.derive(deadline, Some(Arc::new(identity)), values)
    }

    /// Derive a child carrying an additional value.
    pub fn with_value(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let (deadline, identity, values) = self.inherit();
        let mut values = (*values).clone();
        values.insert(key.into(), value.into());
        self.derive(deadline, identity, Arc::new(values))
    }

    /// A root context keeping this context's values but none of its
    /// cancellation or deadline.
    pub fn detached(&self) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                cancel_tx,
                parent: None,
                deadline: None,
                identity: self.inner.identity.clone(),
                values: Arc::clone(&self.inner.values),
            }),
        }
    }

    /// Cancel this context and every context derived from it.
    pub fn cancel(&self) {
        self.inner.cancel_tx.send_replace(true);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left before the deadline, if there is one.
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.inner.identity.as_deref()
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.inner.values.get(key).map(|v| v.as_str())
    }

    pub fn is_cancelled(&self) -> bool {
        self.chain().any(|ctx| *ctx.inner.cancel_tx.borrow())
    }

    /// `None` while the context is live, otherwise why it is done.
    /// Cancellation wins over an expired deadline.
    pub fn err(&self) -> Option<ContextError> {
        if self.is_cancelled() {
            return Some(ContextError::Cancelled);
        }
        match self.inner.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once this context or an ancestor is cancelled.
    pub async fn cancelled(&self) {
        let waits = self
            .chain()
            .map(|ctx| Box::pin(wait_cancelled(ctx.inner.cancel_tx.subscribe())))
            .collect::<Vec<_>>();
        futures::future::select_all(waits).await;
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> ContextError {
        if let Some(err) = self.err() {
            return err;
        }
        let expired = async {
            match self.inner.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };
        tokio::select! {
            _ = self.cancelled() => ContextError::Cancelled,
            _ = expired => ContextError::DeadlineExceeded,
        }
    }

    fn chain<'a>(&'a self) -> impl Iterator<Item = &'a Context> + 'a {
        std::iter::successors(Some(self), |ctx: &&'a Context| {
            let ctx: &'a Context = ctx;
            ctx.inner.parent.as_ref()
        })
    }
}

async fn wait_cancelled(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender dropped without cancelling: this context can no longer be cancelled.
            pending::<()>().await;
        }
    }
}
