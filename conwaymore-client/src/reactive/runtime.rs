//! Reactive Runtime
//!
//! The runtime is the process-wide dependency tracker. It maps a
//! `(container, property key)` pair to the subscribers currently depending on
//! it, and knows nothing about what signals, stores or effects mean.
//!
//! # How It Works
//!
//! 1. A read of a tracked value calls [`Runtime::track`]. If a subscriber is
//!    running, it is added to the key's subscriber set (once) and the link is
//!    stamped with the epoch of the current run.
//!
//! 2. A write calls [`Runtime::notify`]. The key's subscribers join the
//!    current thread's batch, and the outermost notify drains it
//!    synchronously with no lock held. Derived values run first, lowest
//!    height first, then effects in the order they were queued. A subscriber
//!    queued twice runs once, so an effect that reads a signal and a value
//!    derived from it runs once per write and never sees a stale derived
//!    value.
//!
//! 3. After each run, [`Runtime::prune`] drops the links the run did not
//!    touch again, so dependency sets follow the latest run.
//!
//! # Ownership
//!
//! The tracker never owns a container. Containers are referred to by
//! [`ContainerId`] and their subscriber sets are released when the last
//! handle drops its [`ContainerHandle`]. Subscribers are held as `Weak`
//! references in the registry, so a dropped effect simply stops running.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{OnceLock, Weak};

use dashmap::DashMap;
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::subscriber::{Subscriber, SubscriberId};

/// Name of a tracked property inside a container.
pub type PropertyKey = Cow<'static, str>;

/// Key used by single-value containers (signals and computed values).
pub const VALUE_KEY: &str = "value";

/// Identity of a reactive container in the tracker's side table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(u64);

impl ContainerId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ContainerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Owned container identity.
///
/// Dropping the handle releases every subscriber set recorded for the
/// container.
#[derive(Debug)]
pub struct ContainerHandle {
    id: ContainerId,
}

impl ContainerHandle {
    pub fn new() -> Self {
        Self {
            id: ContainerId::new(),
        }
    }

    pub fn id(&self) -> ContainerId {
        self.id
    }
}

impl Default for ContainerHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ContainerHandle {
    fn drop(&mut self) {
        Runtime::release(self.id);
    }
}

type Slot = (ContainerId, PropertyKey);

#[derive(Default)]
struct Tracker {
    /// container -> key -> subscribers, in registration order.
    slots: HashMap<ContainerId, HashMap<PropertyKey, IndexSet<SubscriberId>>>,
    /// subscriber -> slot -> epoch of the run that last touched it.
    links: HashMap<SubscriberId, IndexMap<Slot, u64>>,
    /// Derived subscribers -> longest chain of derived values below them.
    heights: HashMap<SubscriberId, u32>,
}

impl Tracker {
    fn detach(&mut self, subscriber: SubscriberId, (container, key): &Slot) {
        let Some(keys) = self.slots.get_mut(container) else {
            return;
        };
        if let Some(subscribers) = keys.get_mut(key) {
            subscribers.shift_remove(&subscriber);
            if subscribers.is_empty() {
                keys.remove(key);
            }
        }
        if keys.is_empty() {
            self.slots.remove(container);
        }
    }
}

static TRACKER: OnceLock<RwLock<Tracker>> = OnceLock::new();
static REGISTRY: OnceLock<DashMap<SubscriberId, Weak<dyn Subscriber>>> = OnceLock::new();

/// Subscribers notified on this thread and not yet run.
#[derive(Default)]
struct Batch {
    draining: bool,
    pending: IndexSet<SubscriberId>,
}

thread_local! {
    static BATCH: RefCell<Batch> = RefCell::new(Batch::default());
}

/// Ends the batch even if a subscriber panics.
struct DrainGuard;

impl Drop for DrainGuard {
    fn drop(&mut self) {
        BATCH.with(|batch| {
            let mut batch = batch.borrow_mut();
            batch.draining = false;
            batch.pending.clear();
        });
    }
}

fn tracker() -> &'static RwLock<Tracker> {
    TRACKER.get_or_init(|| RwLock::new(Tracker::default()))
}

fn registry() -> &'static DashMap<SubscriberId, Weak<dyn Subscriber>> {
    REGISTRY.get_or_init(DashMap::new)
}

/// The global dependency tracker.
pub struct Runtime;

impl Runtime {
    /// Make a subscriber reachable for notifications.
    pub fn register(id: SubscriberId, subscriber: Weak<dyn Subscriber>) {
        registry().insert(id, subscriber);
    }

    /// Register a derived value. Derived subscribers run before effects in
    /// a batch, ordered by height.
    pub fn register_derived(id: SubscriberId, subscriber: Weak<dyn Subscriber>) {
        tracker().write().heights.insert(id, 0);
        Self::register(id, subscriber);
    }

    /// Remove a subscriber from every key it was registered under.
    pub fn unregister(id: SubscriberId) {
        registry().remove(&id);

        let mut guard = tracker().write();
        let tracker = &mut *guard;
        tracker.heights.remove(&id);
        if let Some(links) = tracker.links.remove(&id) {
            for slot in links.keys() {
                tracker.detach(id, slot);
            }
        }
    }

    /// Whether the subscriber is still registered.
    pub fn is_registered(id: SubscriberId) -> bool {
        registry().contains_key(&id)
    }

    /// Register the active subscriber, if any, as dependent on
    /// `(container, key)`.
    pub fn track(container: ContainerId, key: impl Into<PropertyKey>) {
        Self::track_from(container, key.into(), None);
    }

    /// Like [`Runtime::track`], for a container owned by the derived
    /// subscriber `source`. A derived reader is raised above `source`.
    pub fn track_derived(
        container: ContainerId,
        key: impl Into<PropertyKey>,
        source: SubscriberId,
    ) {
        Self::track_from(container, key.into(), Some(source));
    }

    fn track_from(container: ContainerId, key: PropertyKey, source: Option<SubscriberId>) {
        let Some((subscriber, epoch)) = ReactiveContext::current() else {
            return;
        };
        // A subscriber disposed mid-run must not pick up new links.
        if !Self::is_registered(subscriber) {
            return;
        }

        let mut guard = tracker().write();
        let tracker = &mut *guard;
        tracker
            .slots
            .entry(container)
            .or_default()
            .entry(key.clone())
            .or_default()
            .insert(subscriber);
        tracker
            .links
            .entry(subscriber)
            .or_default()
            .insert((container, key), epoch);

        if let Some(source) = source {
            let below = tracker.heights.get(&source).copied().unwrap_or(0);
            if let Some(height) = tracker.heights.get_mut(&subscriber) {
                *height = (*height).max(below + 1);
            }
        }
    }

    /// Queue every subscriber of `(container, key)` and, unless a batch is
    /// already draining on this thread, run the batch to completion.
    pub fn notify(container: ContainerId, key: &str) {
        let subscribers: SmallVec<[SubscriberId; 8]> = {
            let tracker = tracker().read();
            match tracker.slots.get(&container).and_then(|keys| keys.get(key)) {
                Some(set) => set.iter().copied().collect(),
                None => return,
            }
        };

        let drain = BATCH.with(|batch| {
            let mut batch = batch.borrow_mut();
            batch.pending.extend(subscribers);
            !std::mem::replace(&mut batch.draining, true)
        });
        if !drain {
            return;
        }

        let _guard = DrainGuard;
        while let Some(id) = Self::next_pending() {
            // Clone the weak ref out so no registry shard stays locked while
            // the subscriber runs.
            let weak = registry().get(&id).map(|entry| entry.value().clone());
            if let Some(subscriber) = weak.and_then(|weak| weak.upgrade()) {
                subscriber.execute();
            }
        }
    }

    /// Take the lowest derived subscriber in the batch, or the oldest effect
    /// once no derived subscriber is left.
    fn next_pending() -> Option<SubscriberId> {
        BATCH.with(|batch| {
            let mut batch = batch.borrow_mut();
            let index = {
                let tracker = tracker().read();
                batch
                    .pending
                    .iter()
                    .enumerate()
                    .min_by_key(|(index, id)| {
                        (tracker.heights.get(*id).copied().unwrap_or(u32::MAX), *index)
                    })
                    .map(|(index, _)| index)?
            };
            batch.pending.shift_remove_index(index)
        })
    }

    /// Height of a derived subscriber, `None` for effects.
    pub fn height(subscriber: SubscriberId) -> Option<u32> {
        tracker().read().heights.get(&subscriber).copied()
    }

    /// Drop the links of `subscriber` that were not touched by the run
    /// tagged `epoch`.
    pub fn prune(subscriber: SubscriberId, epoch: u64) {
        let mut guard = tracker().write();
        let tracker = &mut *guard;
        let Some(links) = tracker.links.get_mut(&subscriber) else {
            return;
        };

        let mut stale: SmallVec<[Slot; 4]> = SmallVec::new();
        links.retain(|slot, touched| {
            if *touched < epoch {
                stale.push(slot.clone());
                false
            } else {
                true
            }
        });
        if links.is_empty() {
            tracker.links.remove(&subscriber);
        }
        for slot in &stale {
            tracker.detach(subscriber, slot);
        }
    }

    /// Forget every subscriber set recorded for `container`.
    pub fn release(container: ContainerId) {
        let mut guard = tracker().write();
        let tracker = &mut *guard;
        let Some(keys) = tracker.slots.remove(&container) else {
            return;
        };
        for (key, subscribers) in keys {
            let slot = (container, key);
            for subscriber in subscribers {
                if let Some(links) = tracker.links.get_mut(&subscriber) {
                    links.shift_remove(&slot);
                    if links.is_empty() {
                        tracker.links.remove(&subscriber);
                    }
                }
            }
        }
    }

    /// Number of subscribers currently registered on `(container, key)`.
    pub fn subscriber_count(container: ContainerId, key: &str) -> usize {
        tracker()
            .read()
            .slots
            .get(&container)
            .and_then(|keys| keys.get(key))
            .map_or(0, |set| set.len())
    }

    /// Number of `(container, key)` pairs `subscriber` depends on.
    pub fn dependency_count(subscriber: SubscriberId) -> usize {
        tracker()
            .read()
            .links
            .get(&subscriber)
            .map_or(0, |links| links.len())
    }

    /// Whether the tracker holds any subscriber set for `container`.
    pub fn has_container(container: ContainerId) -> bool {
        tracker().read().slots.contains_key(&container)
    }

    /// Get the current subscriber being tracked, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        ReactiveContext::current_subscriber()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct MockSubscriber {
        id: SubscriberId,
        log: Arc<Mutex<Vec<&'static str>>>,
        name: &'static str,
    }

    impl MockSubscriber {
        fn new(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Arc<Self> {
            let subscriber = Arc::new(Self {
                id: SubscriberId::new(),
                log: log.clone(),
                name,
            });
            let weak: Weak<dyn Subscriber> = Arc::downgrade(&subscriber) as Weak<dyn Subscriber>;
            Runtime::register(subscriber.id, weak);
            subscriber
        }

        fn track_in_run(&self, epoch: u64, container: ContainerId, key: &'static str) {
            let _ctx = ReactiveContext::enter(self.id, epoch);
            Runtime::track(container, key);
        }
    }

    impl Subscriber for MockSubscriber {
        fn subscriber_id(&self) -> SubscriberId {
            self.id
        }

        fn execute(&self) {
            self.log.lock().push(self.name);
        }
    }

    #[test]
    fn track_outside_a_subscriber_is_a_no_op() {
        let container = ContainerHandle::new();
        Runtime::track(container.id(), "a");
        assert_eq!(Runtime::subscriber_count(container.id(), "a"), 0);
    }

    #[test]
    fn track_is_idempotent_within_a_run() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sub = MockSubscriber::new("sub", &log);
        let container = ContainerHandle::new();

        {
            let _ctx = ReactiveContext::enter(sub.id, 1);
            Runtime::track(container.id(), "a");
            Runtime::track(container.id(), "a");
        }

        assert_eq!(Runtime::subscriber_count(container.id(), "a"), 1);
        assert_eq!(Runtime::dependency_count(sub.id), 1);
    }

    #[test]
    fn notify_runs_subscribers_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = MockSubscriber::new("first", &log);
        let second = MockSubscriber::new("second", &log);
        let container = ContainerHandle::new();

        second.track_in_run(1, container.id(), "a");
        first.track_in_run(1, container.id(), "a");

        Runtime::notify(container.id(), "a");
        assert_eq!(*log.lock(), vec!["second", "first"]);

        // Unknown keys are silently ignored.
        Runtime::notify(container.id(), "missing");
        assert_eq!(log.lock().len(), 2);
    }

    #[test]
    fn unregister_removes_every_subscription() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sub = MockSubscriber::new("sub", &log);
        let container = ContainerHandle::new();

        {
            let _ctx = ReactiveContext::enter(sub.id, 1);
            Runtime::track(container.id(), "a");
            Runtime::track(container.id(), "b");
        }
        Runtime::unregister(sub.id);

        assert_eq!(Runtime::subscriber_count(container.id(), "a"), 0);
        assert_eq!(Runtime::subscriber_count(container.id(), "b"), 0);
        assert!(!Runtime::is_registered(sub.id));

        Runtime::notify(container.id(), "a");
        assert!(log.lock().is_empty());
    }

    #[test]
    fn prune_drops_links_not_touched_by_the_latest_run() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sub = MockSubscriber::new("sub", &log);
        let container = ContainerHandle::new();

        {
            let _ctx = ReactiveContext::enter(sub.id, 1);
            Runtime::track(container.id(), "a");
            Runtime::track(container.id(), "b");
        }
        Runtime::prune(sub.id, 1);
        assert_eq!(Runtime::dependency_count(sub.id), 2);

        sub.track_in_run(2, container.id(), "b");
        Runtime::prune(sub.id, 2);

        assert_eq!(Runtime::subscriber_count(container.id(), "a"), 0);
        assert_eq!(Runtime::subscriber_count(container.id(), "b"), 1);
    }

    #[test]
    fn dropping_the_container_handle_releases_its_sets() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sub = MockSubscriber::new("sub", &log);
        let container = ContainerHandle::new();
        let id = container.id();

        sub.track_in_run(1, id, "a");
        assert!(Runtime::has_container(id));

        drop(container);
        assert!(!Runtime::has_container(id));
        assert_eq!(Runtime::dependency_count(sub.id), 0);
    }

    #[test]
    fn dropped_subscribers_are_skipped() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sub = MockSubscriber::new("sub", &log);
        let container = ContainerHandle::new();
        sub.track_in_run(1, container.id(), "a");

        drop(sub);
        Runtime::notify(container.id(), "a");
        assert!(log.lock().is_empty());
    }
}
