//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency is notified, the effect re-runs synchronously and in
//!    full. Dependencies are re-tracked on every run; values the latest run did
//!    not read stop triggering it.
//!
//! 3. `dispose` removes every subscription. After that the effect never runs
//!    again.
//!
//! # Teardown
//!
//! An effect created with [`Effect::with_teardown`] may return a teardown
//! callback from each run. Only the callback returned by the most recent run
//! is kept, and it is invoked exactly once, on disposal. Teardowns are not
//! invoked between re-executions; a callback replaced by a later run is
//! dropped without being called.
//!
//! Dropping the last handle to an effect disposes it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::runtime::Runtime;
use super::subscriber::{Activation, Subscriber, SubscriberId};

/// Callback run once when an effect is disposed.
pub type Teardown = Box<dyn FnOnce() + Send>;

type EffectFn = Box<dyn Fn() -> Option<Teardown> + Send + Sync>;

/// A side-effecting computation that runs when dependencies change.
///
/// # Example
///
/// ```rust
/// use conwaymore_client::reactive::{Effect, Signal};
///
/// let count = Signal::new(0);
/// let effect = {
///     let count = count.clone();
///     Effect::new(move || println!("count is {}", count.get()))
/// };
///
/// count.set(5); // prints "count is 5"
/// effect.dispose();
/// count.set(6); // prints nothing
/// ```
pub struct Effect {
    inner: Arc<EffectInner>,
}

struct EffectInner {
    activation: Activation,
    run: EffectFn,
    teardown: Mutex<Option<Teardown>>,
    disposed: AtomicBool,
}

impl Effect {
    /// Create an effect and run it immediately.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_teardown(move || {
            run();
            None::<fn()>
        })
    }

    /// Create an effect whose runs may return a teardown callback.
    pub fn with_teardown<F, D>(run: F) -> Self
    where
        F: Fn() -> Option<D> + Send + Sync + 'static,
        D: FnOnce() + Send + 'static,
    {
        let run: EffectFn = Box::new(move || run().map(|d| Box::new(d) as Teardown));
        let inner = Arc::new(EffectInner {
            activation: Activation::new(),
            run,
            teardown: Mutex::new(None),
            disposed: AtomicBool::new(false),
        });

        let weak: Weak<dyn Subscriber> = Arc::downgrade(&inner) as Weak<dyn Subscriber>;
        Runtime::register(inner.activation.id(), weak);
        inner.execute();

        Self { inner }
    }

    /// Get the subscriber ID for this effect.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.activation.id()
    }

    /// Dispose of the effect.
    ///
    /// Removes all subscriptions and runs the pending teardown, if any. Calling
    /// it again does nothing.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> u64 {
        self.inner.activation.run_count()
    }

    /// Get the number of values the latest run depends on.
    pub fn dependency_count(&self) -> usize {
        Runtime::dependency_count(self.subscriber_id())
    }
}

impl EffectInner {
    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        Runtime::unregister(self.activation.id());

        let teardown = self.teardown.lock().take();
        if let Some(teardown) = teardown {
            teardown();
        }
    }
}

impl Subscriber for EffectInner {
    fn subscriber_id(&self) -> SubscriberId {
        self.activation.id()
    }

    fn execute(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        self.activation.run(|| {
            if self.disposed.load(Ordering::SeqCst) {
                return;
            }
            let teardown = (self.run)();

            // The run disposed its own effect: nobody will collect this
            // teardown later.
            if self.disposed.load(Ordering::SeqCst) {
                if let Some(teardown) = teardown {
                    teardown();
                }
                return;
            }
            *self.teardown.lock() = teardown;
        });
    }
}

impl Drop for EffectInner {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("subscriber_id", &self.subscriber_id())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Computed, Signal};
    use std::sync::atomic::AtomicI32;

    #[test]
    fn effect_runs_on_creation() {
        let run_count = Arc::new(AtomicI32::new(0));
        let run_count_clone = run_count.clone();

        let effect = Effect::new(move || {
            run_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(run_count.load(Ordering::SeqCst), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn effect_reruns_on_dependency_change() {
        let signal = Signal::new(0);
        let seen = Arc::new(AtomicI32::new(-1));

        let _effect = {
            let signal = signal.clone();
            let seen = seen.clone();
            Effect::new(move || seen.store(signal.get(), Ordering::SeqCst))
        };
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        signal.set(42);
        assert_eq!(seen.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn effect_does_not_run_after_disposal() {
        let signal = Signal::new(0);
        let run_count = Arc::new(AtomicI32::new(0));

        let effect = {
            let signal = signal.clone();
            let run_count = run_count.clone();
            Effect::new(move || {
                signal.get();
                run_count.fetch_add(1, Ordering::SeqCst);
            })
        };

        effect.dispose();
        assert!(effect.is_disposed());
        assert_eq!(signal.subscriber_count(), 0);

        signal.set(1);
        signal.set(2);
        assert_eq!(run_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn teardown_runs_once_on_disposal_only() {
        let signal = Signal::new(0);
        let teardowns = Arc::new(AtomicI32::new(0));
        let last_torn_down = Arc::new(AtomicI32::new(-1));

        let effect = {
            let signal = signal.clone();
            let teardowns = teardowns.clone();
            let last_torn_down = last_torn_down.clone();
            Effect::with_teardown(move || {
                let value = signal.get();
                let teardowns = teardowns.clone();
                let last_torn_down = last_torn_down.clone();
                Some(move || {
                    teardowns.fetch_add(1, Ordering::SeqCst);
                    last_torn_down.store(value, Ordering::SeqCst);
                })
            })
        };

        signal.set(1);
        signal.set(2);
        assert_eq!(teardowns.load(Ordering::SeqCst), 0);

        effect.dispose();
        effect.dispose();
        assert_eq!(teardowns.load(Ordering::SeqCst), 1);
        assert_eq!(last_torn_down.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dropping_the_last_handle_disposes() {
        let torn_down = Arc::new(AtomicBool::new(false));
        let effect = {
            let torn_down = torn_down.clone();
            Effect::with_teardown(move || {
                let torn_down = torn_down.clone();
                Some(move || torn_down.store(true, Ordering::SeqCst))
            })
        };
        let clone = effect.clone();

        drop(effect);
        assert!(!torn_down.load(Ordering::SeqCst));

        drop(clone);
        assert!(torn_down.load(Ordering::SeqCst));
    }

    #[test]
    fn computed_read_inside_effect_subscribes_the_effect() {
        let signal = Signal::new(1);
        let doubled = {
            let signal = signal.clone();
            Computed::new(move || signal.get() * 2)
        };
        let seen = Arc::new(AtomicI32::new(0));

        let effect = {
            let doubled = doubled.clone();
            let seen = seen.clone();
            Effect::new(move || seen.store(doubled.get(), Ordering::SeqCst))
        };

        assert_eq!(doubled.subscriber_count(), 1);
        assert_eq!(signal.subscriber_count(), 1);
        assert_eq!(effect.dependency_count(), 1);

        signal.set(5);
        assert_eq!(seen.load(Ordering::SeqCst), 10);
        assert_eq!(effect.run_count(), 2);
    }

    #[test]
    fn self_triggering_write_is_folded_into_one_rerun() {
        let signal = Signal::new(0);
        let effect = {
            let signal = signal.clone();
            Effect::new(move || {
                let value = signal.get();
                if value < 3 {
                    signal.set(value + 1);
                }
            })
        };

        assert_eq!(signal.get_untracked(), 3);
        assert_eq!(effect.run_count(), 4);
    }
}
