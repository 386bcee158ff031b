//! Computed Implementation
//!
//! A Computed is a cached derived value. It runs its computation once on
//! construction and again whenever one of the values it read is notified.
//!
//! # How Computed Values Work
//!
//! 1. `Computed::new` runs the computation immediately, with the computed
//!    value as the active subscriber, and caches the result.
//!
//! 2. When a dependency changes, the computation re-runs with fresh tracking;
//!    links the new run no longer touches are pruned.
//!
//! 3. If the new result differs from the cache, the cache is replaced and the
//!    computed value's own subscribers are notified. An unchanged result stops
//!    propagation here.
//!
//! A computed value is one level above the highest computed value it reads.
//! Within a batch the runtime refreshes lower levels first, and every
//! computed value before any effect.
//!
//! Reading a computed value never runs the computation; it returns the cache.

use std::fmt::Debug;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::runtime::{ContainerHandle, ContainerId, Runtime, VALUE_KEY};
use super::subscriber::{Activation, Subscriber, SubscriberId};

/// A memoized value derived from other reactive values.
pub struct Computed<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    inner: Arc<ComputedInner<T>>,
}

struct ComputedInner<T> {
    container: ContainerHandle,
    activation: Activation,
    compute: Box<dyn Fn() -> T + Send + Sync>,
    value: RwLock<T>,
}

impl<T> Computed<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a computed value and run `compute` once to fill the cache.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let activation = Activation::new();
        let inner = Arc::new_cyclic(|weak: &Weak<ComputedInner<T>>| {
            let weak: Weak<dyn Subscriber> = weak.clone();
            Runtime::register_derived(activation.id(), weak);

            let initial = activation.first_run(&compute);
            ComputedInner {
                container: ContainerHandle::new(),
                activation,
                compute: Box::new(compute),
                value: RwLock::new(initial),
            }
        });

        Self { inner }
    }

    /// The computed value's container identity in the dependency tracker.
    pub fn id(&self) -> ContainerId {
        self.inner.container.id()
    }

    /// The subscriber ID of the internal recomputation.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.activation.id()
    }

    /// Get the cached value, registering the running subscriber (if any).
    pub fn get(&self) -> T {
        Runtime::track_derived(self.id(), VALUE_KEY, self.subscriber_id());
        self.inner.value.read().clone()
    }

    /// Get the cached value without tracking.
    pub fn get_untracked(&self) -> T {
        self.inner.value.read().clone()
    }

    /// How many times the computation has run.
    pub fn compute_count(&self) -> u64 {
        self.inner.activation.run_count()
    }

    /// Number of subscribers depending on this computed value.
    pub fn subscriber_count(&self) -> usize {
        Runtime::subscriber_count(self.id(), VALUE_KEY)
    }

    /// Number of values this computation read during its latest run.
    pub fn dependency_count(&self) -> usize {
        Runtime::dependency_count(self.subscriber_id())
    }
}

impl<T> Subscriber for ComputedInner<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn subscriber_id(&self) -> SubscriberId {
        self.activation.id()
    }

    fn execute(&self) {
        let mut changed = false;
        self.activation.run(|| {
            let next = (self.compute)();
            let mut value = self.value.write();
            if *value != next {
                *value = next;
                changed = true;
            }
        });

        if changed {
            Runtime::notify(self.container.id(), VALUE_KEY);
        }
    }
}

impl<T> Clone for Computed<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Computed<T>
where
    T: Clone + PartialEq + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.id())
            .field("value", &self.get_untracked())
            .field("compute_count", &self.compute_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Signal;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn computes_on_construction() {
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let computed = Computed::new(move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
            42
        });

        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert_eq!(computed.get(), 42);
        assert_eq!(computed.get(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn recomputes_when_a_dependency_changes() {
        let signal = Signal::new(10);
        let doubled = {
            let signal = signal.clone();
            Computed::new(move || signal.get() * 2)
        };
        assert_eq!(doubled.get(), 20);

        signal.set(5);
        assert_eq!(doubled.get(), 10);
        assert_eq!(doubled.compute_count(), 2);
    }

    #[test]
    fn unchanged_result_does_not_propagate() {
        let signal = Signal::new(4);
        let half = {
            let signal = signal.clone();
            Computed::new(move || signal.get() / 2)
        };
        let outer_runs = Arc::new(AtomicI32::new(0));
        let outer = {
            let half = half.clone();
            let outer_runs = outer_runs.clone();
            Computed::new(move || {
                outer_runs.fetch_add(1, Ordering::SeqCst);
                half.get() + 1
            })
        };

        signal.set(5);
        assert_eq!(half.compute_count(), 2);
        assert_eq!(outer_runs.load(Ordering::SeqCst), 1);
        assert_eq!(outer.get(), 3);

        signal.set(6);
        assert_eq!(outer_runs.load(Ordering::SeqCst), 2);
        assert_eq!(outer.get(), 4);
    }

    #[test]
    fn dependencies_follow_the_latest_run() {
        let use_left = Signal::new(true);
        let left = Signal::new(1);
        let right = Signal::new(2);

        let picked = {
            let (use_left, left, right) = (use_left.clone(), left.clone(), right.clone());
            Computed::new(move || if use_left.get() { left.get() } else { right.get() })
        };
        assert_eq!(picked.dependency_count(), 2);
        assert_eq!(right.subscriber_count(), 0);

        use_left.set(false);
        assert_eq!(picked.get(), 2);
        assert_eq!(left.subscriber_count(), 0);
        assert_eq!(right.subscriber_count(), 1);

        left.set(100);
        assert_eq!(picked.compute_count(), 2);
    }

    #[test]
    fn dropping_the_last_handle_unregisters() {
        let signal = Signal::new(1);
        let computed = {
            let signal = signal.clone();
            Computed::new(move || signal.get())
        };
        let subscriber = computed.subscriber_id();
        assert!(Runtime::is_registered(subscriber));

        drop(computed);
        assert!(!Runtime::is_registered(subscriber));
        assert_eq!(signal.subscriber_count(), 0);
    }
}
