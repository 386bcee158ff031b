//! Subscriber types for the reactive system.
//!
//! A subscriber is any computation that depends on reactive values: the
//! internal runner of a computed value, or an effect.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::trace;

use super::context::ReactiveContext;
use super::runtime::Runtime;

/// Unique identifier for a subscriber.
///
/// Each subscriber gets a unique ID when created. The dependency tracker uses
/// it to key subscriptions and to avoid duplicate registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A computation the runtime re-executes when one of its dependencies is
/// notified.
pub trait Subscriber: Send + Sync {
    /// The ID this subscriber is registered under.
    fn subscriber_id(&self) -> SubscriberId;

    /// Re-run the computation.
    fn execute(&self);
}

/// Run bookkeeping shared by computed values and effects.
///
/// Every run gets a fresh epoch. Dependencies read during the run are stamped
/// with it, and anything still carrying an older epoch once the run returns is
/// pruned from the tracker.
///
/// A notification that reaches a subscriber while its body is still on the
/// context stack does not re-enter it. It is folded into one more run after
/// the current one returns.
pub(crate) struct Activation {
    id: SubscriberId,
    epoch: AtomicU64,
    running: AtomicBool,
    rerun: AtomicBool,
    runs: AtomicU64,
}

impl Activation {
    pub(crate) fn new() -> Self {
        Self {
            id: SubscriberId::new(),
            epoch: AtomicU64::new(0),
            running: AtomicBool::new(false),
            rerun: AtomicBool::new(false),
            runs: AtomicU64::new(0),
        }
    }

    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    pub(crate) fn run_count(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    /// Run `body` once as the active subscriber and return its result.
    ///
    /// Used for the initial run, before the owner is reachable through the
    /// registry, so no re-entrant notification can arrive.
    pub(crate) fn first_run<R>(&self, body: impl FnOnce() -> R) -> R {
        let _running = RunningGuard::set(&self.running);
        let epoch = self.next_epoch();
        let result = {
            let _ctx = ReactiveContext::enter(self.id, epoch);
            body()
        };
        Runtime::prune(self.id, epoch);
        self.runs.fetch_add(1, Ordering::Relaxed);
        result
    }

    /// Run `body` as the active subscriber, repeating it once for every
    /// notification that arrived while it was running.
    ///
    /// A request is recorded before the running flag is tried, and the owner
    /// looks at the request flag again after releasing the running flag, so
    /// a request from another thread is either picked up by the current owner
    /// or by the caller itself.
    pub(crate) fn run(&self, mut body: impl FnMut()) {
        self.rerun.store(true, Ordering::SeqCst);
        loop {
            if self
                .running
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                trace!(subscriber = ?self.id, "notification deferred to the running owner");
                return;
            }
            {
                let _running = RunningGuard(&self.running);
                while self.rerun.swap(false, Ordering::SeqCst) {
                    self.run_once(&mut body);
                }
            }
            if !self.rerun.load(Ordering::SeqCst) {
                return;
            }
        }
    }

    fn run_once(&self, body: &mut impl FnMut()) {
        let epoch = self.next_epoch();
        {
            let _ctx = ReactiveContext::enter(self.id, epoch);
            body();
        }
        Runtime::prune(self.id, epoch);
        self.runs.fetch_add(1, Ordering::Relaxed);
    }

    fn next_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Drop for Activation {
    fn drop(&mut self) {
        Runtime::unregister(self.id);
    }
}

/// Clears the running flag even if the body panics.
struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
