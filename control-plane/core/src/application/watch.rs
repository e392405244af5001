// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Watch Runtime
//!
//! Polling machinery behind every [`Resource::watch`]. A poller ticks at a
//! fixed interval (first tick one interval after subscribe, missed ticks
//! skipped), fetches a snapshot, asks a [`ChangeDetector`] which
//! [`ResourceOperation`] it represents and delivers a [`ResourceUpdate`].
//!
//! Two delivery shapes:
//!
//! - [`spawn_poller`]: one poller per subscription.
//! - [`SharedPoller`]: one poller fanned out through a [`WatcherList`] to
//!   every subscriber; started by the first subscribe, stopped after the
//!   last unsubscribe.
//!
//! Sends never block the ticker. A subscriber whose channel is full misses
//! that tick.

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::context::CallContext;
use crate::domain::errors::UnitResult;
use crate::domain::resource::{Resource, ResourceOperation, ResourceUpdate, Subscription};

pub const DEFAULT_WATCH_CAPACITY: usize = 10;

/// Snapshot source polled on every tick.
pub type Fetch = Arc<dyn Fn(CallContext) -> BoxFuture<'static, UnitResult<Value>> + Send + Sync>;

/// Poll a resource's own `get`.
pub fn fetch_from<R>(resource: Arc<R>) -> Fetch
where
    R: Resource + ?Sized + 'static,
{
    Arc::new(move |ctx: CallContext| {
        let resource = resource.clone();
        async move { resource.get(&ctx).await }.boxed()
    })
}

/// Decides which operation a fresh snapshot represents.
pub trait ChangeDetector: Send + Sync {
    fn classify(&self, snapshot: &Value) -> ResourceOperation;
}

/// Every snapshot reports the same operation.
#[derive(Debug, Clone, Copy)]
pub struct Constant(pub ResourceOperation);

impl ChangeDetector for Constant {
    fn classify(&self, _snapshot: &Value) -> ResourceOperation {
        self.0
    }
}

pub type TransitionHook = Box<dyn Fn(&Value, &Value) + Send + Sync>;

/// Compares one top-level field against the previous snapshot. The first
/// snapshot is a `refresh`; later ones report `on_change` when the field
/// differs.
pub struct FieldDiff {
    field: String,
    on_change: ResourceOperation,
    last: RwLock<Option<Value>>,
    on_transition: Option<TransitionHook>,
}

impl FieldDiff {
    pub fn new(field: impl Into<String>, on_change: ResourceOperation) -> Self {
        Self {
            field: field.into(),
            on_change,
            last: RwLock::new(None),
            on_transition: None,
        }
    }

    /// Called with `(previous, current)` whenever the field changes.
    pub fn on_transition<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value, &Value) + Send + Sync + 'static,
    {
        self.on_transition = Some(Box::new(hook));
        self
    }

    pub fn last(&self) -> Option<Value> {
        self.last.read().clone()
    }
}

impl ChangeDetector for FieldDiff {
    fn classify(&self, snapshot: &Value) -> ResourceOperation {
        let current = snapshot.get(&self.field).cloned().unwrap_or(Value::Null);
        let previous = self.last.read().clone();

        let operation = match previous {
            Some(previous) if previous != current => {
                if let Some(hook) = &self.on_transition {
                    hook(&previous, &current);
                }
                self.on_change
            }
            _ => ResourceOperation::Refresh,
        };

        *self.last.write() = Some(current);
        operation
    }
}

/// Compares the length of a list field against the previous snapshot.
pub struct CountDiff {
    field: String,
    on_change: ResourceOperation,
    last: RwLock<Option<usize>>,
}

impl CountDiff {
    pub fn new(field: impl Into<String>, on_change: ResourceOperation) -> Self {
        Self {
            field: field.into(),
            on_change,
            last: RwLock::new(None),
        }
    }
}

impl ChangeDetector for CountDiff {
    fn classify(&self, snapshot: &Value) -> ResourceOperation {
        let count = snapshot
            .get(&self.field)
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        let previous = self.last.write().replace(count);
        match previous {
            Some(previous) if previous != count => self.on_change,
            _ => ResourceOperation::Refresh,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PollSpec {
    pub uri: String,
    pub interval: Duration,
    pub capacity: usize,
}

impl PollSpec {
    pub fn new(uri: impl Into<String>, interval: Duration) -> Self {
        Self {
            uri: uri.into(),
            interval: interval.max(Duration::from_millis(1)),
            capacity: DEFAULT_WATCH_CAPACITY,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Sent,
    Closed,
}

/// Start a dedicated poller. The returned subscription's channel closes
/// once `ctx` is cancelled or the subscription is dropped.
pub fn spawn_poller(
    ctx: &CallContext,
    spec: PollSpec,
    detector: Arc<dyn ChangeDetector>,
    fetch: Fetch,
) -> Subscription {
    let (tx, rx) = mpsc::channel(spec.capacity);
    let watch_ctx = ctx.child();
    let token = watch_ctx.token().clone();
    let uri = spec.uri.clone();

    tokio::spawn(poll_loop(watch_ctx, spec, detector, fetch, move |update| {
        let uri = update.uri.clone();
        match tx.try_send(update) {
            Ok(()) => Delivery::Sent,
            Err(TrySendError::Full(_)) => {
                metrics::counter!("asms_watch_updates_dropped_total", "uri" => uri.clone()).increment(1);
                debug!(uri = %uri, "watch subscriber is full, tick dropped");
                Delivery::Sent
            }
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }));

    Subscription::new(uri, rx, token)
}

async fn poll_loop<D>(
    ctx: CallContext,
    spec: PollSpec,
    detector: Arc<dyn ChangeDetector>,
    fetch: Fetch,
    mut deliver: D,
) where
    D: FnMut(ResourceUpdate) -> Delivery + Send + 'static,
{
    let mut ticker = interval_at(Instant::now() + spec.interval, spec.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    debug!(uri = %spec.uri, interval_ms = spec.interval.as_millis() as u64, "watch poller started");

    loop {
        tokio::select! {
            biased;
            _ = ctx.done() => break,
            _ = ticker.tick() => {}
        }

        let update = match ctx.run(fetch(ctx.clone())).await {
            Ok(snapshot) => {
                let operation = detector.classify(&snapshot);
                ResourceUpdate::new(spec.uri.clone(), operation, snapshot)
            }
            Err(_) if ctx.is_done() => break,
            Err(err) => {
                warn!(uri = %spec.uri, error = %err, "watch snapshot failed");
                ResourceUpdate::failed(spec.uri.clone(), err)
            }
        };

        metrics::counter!(
            "asms_watch_updates_total",
            "uri" => spec.uri.clone(),
            "operation" => update.operation.as_str()
        )
        .increment(1);

        if deliver(update) == Delivery::Closed {
            break;
        }
    }

    debug!(uri = %spec.uri, "watch poller stopped");
}

/// Subscriber channels of a shared poller, guarded by a plain mutex. Every
/// mutation and every fan-out holds the lock.
#[derive(Debug, Default)]
pub struct WatcherList {
    inner: Mutex<Watchers>,
}

#[derive(Debug, Default)]
struct Watchers {
    next_id: u64,
    entries: Vec<(u64, mpsc::Sender<ResourceUpdate>)>,
}

impl WatcherList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, sender: mpsc::Sender<ResourceUpdate>) -> u64 {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.entries.push((id, sender));
        id
    }

    /// Returns whether the id was present.
    pub fn remove(&self, id: u64) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|(entry, _)| *entry != id);
        inner.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Offer the update to every subscriber. Full subscribers miss it;
    /// closed ones are pruned. Returns the number that accepted it.
    pub fn broadcast(&self, update: &ResourceUpdate) -> usize {
        let mut inner = self.inner.lock();
        let mut delivered = 0;
        inner.entries.retain(|(_, sender)| match sender.try_send(update.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                metrics::counter!("asms_watch_updates_dropped_total", "uri" => update.uri.clone())
                    .increment(1);
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
        delivered
    }
}

/// One poller serving many subscribers.
pub struct SharedPoller {
    spec: PollSpec,
    detector: Arc<dyn ChangeDetector>,
    fetch: Fetch,
    watchers: Arc<WatcherList>,
    running: Mutex<Option<CancellationToken>>,
}

impl SharedPoller {
    pub fn new(spec: PollSpec, detector: Arc<dyn ChangeDetector>, fetch: Fetch) -> Arc<Self> {
        Arc::new(Self {
            spec,
            detector,
            fetch,
            watchers: Arc::new(WatcherList::new()),
            running: Mutex::new(None),
        })
    }

    pub fn uri(&self) -> &str {
        &self.spec.uri
    }

    pub fn subscriber_count(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_polling(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Add a subscriber. It is removed when `ctx` is cancelled or the
    /// returned subscription is dropped.
    pub fn subscribe(self: &Arc<Self>, ctx: &CallContext) -> Subscription {
        let (tx, rx) = mpsc::channel(self.spec.capacity);
        let sub_ctx = ctx.child();

        let id = {
            let mut running = self.running.lock();
            let id = self.watchers.add(tx);
            if running.is_none() {
                *running = Some(self.start());
            }
            id
        };
        debug!(uri = %self.spec.uri, subscriber = id, "watch subscriber added");

        let this = Arc::clone(self);
        let waiter = sub_ctx.clone();
        tokio::spawn(async move {
            waiter.done().await;
            this.unsubscribe(id);
        });

        Subscription::new(self.spec.uri.clone(), rx, sub_ctx.token().clone())
    }

    fn start(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let poll_ctx = CallContext::from_token(token.clone());
        let watchers = self.watchers.clone();
        tokio::spawn(poll_loop(
            poll_ctx,
            self.spec.clone(),
            self.detector.clone(),
            self.fetch.clone(),
            move |update| {
                watchers.broadcast(&update);
                Delivery::Sent
            },
        ));
        token
    }

    fn unsubscribe(&self, id: u64) {
        let mut running = self.running.lock();
        self.watchers.remove(id);
        debug!(uri = %self.spec.uri, subscriber = id, "watch subscriber removed");
        if self.watchers.is_empty() {
            if let Some(token) = running.take() {
                token.cancel();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::UnitError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_fetch(calls: Arc<AtomicUsize>) -> Fetch {
        Arc::new(move |_ctx| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok(json!({ "n": n })) }.boxed()
        })
    }

    fn scripted_fetch(states: Vec<&'static str>) -> Fetch {
        let calls = Arc::new(AtomicUsize::new(0));
        Arc::new(move |_ctx| {
            let i = calls.fetch_add(1, Ordering::SeqCst);
            let status = states[i.min(states.len() - 1)];
            async move { Ok(json!({ "status": status })) }.boxed()
        })
    }

    #[test]
    fn test_field_diff_first_snapshot_is_refresh() {
        let transitions = Arc::new(Mutex::new(Vec::new()));
        let seen = transitions.clone();
        let detector = FieldDiff::new("status", ResourceOperation::HealthChanged)
            .on_transition(move |old, new| seen.lock().push((old.clone(), new.clone())));

        assert_eq!(detector.classify(&json!({"status": "healthy"})), ResourceOperation::Refresh);
        assert_eq!(detector.classify(&json!({"status": "healthy"})), ResourceOperation::Refresh);
        assert_eq!(
            detector.classify(&json!({"status": "critical"})),
            ResourceOperation::HealthChanged
        );
        assert_eq!(detector.last(), Some(json!("critical")));
        assert_eq!(*transitions.lock(), vec![(json!("healthy"), json!("critical"))]);
    }

    #[test]
    fn test_count_diff() {
        let detector = CountDiff::new("models", ResourceOperation::ModelsChanged);
        assert_eq!(detector.classify(&json!({"models": [1, 2]})), ResourceOperation::Refresh);
        assert_eq!(detector.classify(&json!({"models": [3, 4]})), ResourceOperation::Refresh);
        assert_eq!(detector.classify(&json!({"models": [1]})), ResourceOperation::ModelsChanged);
        assert_eq!(detector.classify(&json!({})), ResourceOperation::ModelsChanged);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_emits_after_first_interval() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ctx = CallContext::background();
        let spec = PollSpec::new("asms://alerts/active", Duration::from_secs(5));
        let started = Instant::now();
        let mut sub = spawn_poller(
            &ctx,
            spec,
            Arc::new(Constant(ResourceOperation::Update)),
            counting_fetch(calls.clone()),
        );

        let first = sub.recv().await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert_eq!(first.operation, ResourceOperation::Update);
        assert_eq!(first.data, Some(json!({"n": 1})));
        assert_eq!(sub.uri(), "asms://alerts/active");

        let second = sub.recv().await.unwrap();
        assert_eq!(second.data, Some(json!({"n": 2})));
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_transition_is_reported() {
        let ctx = CallContext::background();
        let mut sub = spawn_poller(
            &ctx,
            PollSpec::new("asms://service/svc-1", Duration::from_secs(30)),
            Arc::new(FieldDiff::new("status", ResourceOperation::StatusChanged)),
            scripted_fetch(vec!["pending", "running", "running"]),
        );

        let ops: Vec<_> = [
            sub.recv().await.unwrap(),
            sub.recv().await.unwrap(),
            sub.recv().await.unwrap(),
        ]
        .iter()
        .map(|u| u.operation)
        .collect();
        assert_eq!(
            ops,
            vec![
                ResourceOperation::Refresh,
                ResourceOperation::StatusChanged,
                ResourceOperation::Refresh
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_error_becomes_error_update() {
        let ctx = CallContext::background();
        let fetch: Fetch = Arc::new(|_ctx| async { Err(UnitError::internal("backend down")) }.boxed());
        let mut sub = spawn_poller(
            &ctx,
            PollSpec::new("asms://services", Duration::from_secs(60)),
            Arc::new(Constant(ResourceOperation::Refresh)),
            fetch,
        );

        let update = sub.recv().await.unwrap();
        assert_eq!(update.operation, ResourceOperation::Error);
        assert!(update.data.is_none());
        assert_eq!(update.error.unwrap().message(), "backend down");

        // polling continues after an error
        assert!(sub.recv().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelling_context_closes_channel() {
        let ctx = CallContext::background();
        let mut sub = spawn_poller(
            &ctx,
            PollSpec::new("asms://alerts/rules", Duration::from_secs(30)),
            Arc::new(Constant(ResourceOperation::Refresh)),
            counting_fetch(Arc::new(AtomicUsize::new(0))),
        );

        assert!(sub.recv().await.is_some());
        ctx.cancel();
        assert!(sub.recv().await.is_none());
        assert!(!sub.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_consumer_drops_ticks_without_blocking() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ctx = CallContext::background();
        let mut sub = spawn_poller(
            &ctx,
            PollSpec::new("asms://device/gpu-0/metrics", Duration::from_secs(1)).with_capacity(1),
            Arc::new(Constant(ResourceOperation::Update)),
            counting_fetch(calls.clone()),
        );

        tokio::time::sleep(Duration::from_millis(5500)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 5);

        let kept = sub.try_recv().unwrap();
        assert_eq!(kept.data, Some(json!({"n": 1})));
        assert!(sub.try_recv().is_none());

        let next = sub.recv().await.unwrap();
        assert_eq!(next.data, Some(json!({"n": 6})));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_poller_fans_out_and_stops_after_last_subscriber() {
        let calls = Arc::new(AtomicUsize::new(0));
        let poller = SharedPoller::new(
            PollSpec::new("asms://alerts/rules", Duration::from_secs(30)),
            Arc::new(Constant(ResourceOperation::Refresh)),
            counting_fetch(calls.clone()),
        );
        let ctx = CallContext::background();

        let mut a = poller.subscribe(&ctx);
        let mut b = poller.subscribe(&ctx);
        assert_eq!(poller.subscriber_count(), 2);
        assert!(poller.is_polling());

        let from_a = a.recv().await.unwrap();
        let from_b = b.recv().await.unwrap();
        assert_eq!(from_a.data, from_b.data);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        drop(a);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(poller.subscriber_count(), 1);
        assert!(poller.is_polling());

        b.unsubscribe();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(poller.subscriber_count(), 0);
        assert!(!poller.is_polling());

        let before = calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(calls.load(Ordering::SeqCst), before);
    }

    #[test]
    fn test_watcher_list_prunes_closed_receivers() {
        let list = WatcherList::new();
        let (tx_open, mut rx_open) = mpsc::channel(1);
        let (tx_closed, rx_closed) = mpsc::channel(1);
        list.add(tx_open);
        let closed_id = list.add(tx_closed);
        drop(rx_closed);

        let update = ResourceUpdate::new("asms://alerts/rules", ResourceOperation::Refresh, json!({}));
        assert_eq!(list.broadcast(&update), 1);
        assert_eq!(list.len(), 1);
        assert!(!list.remove(closed_id));
        assert!(rx_open.try_recv().is_ok());
    }
}
