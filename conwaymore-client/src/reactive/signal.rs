//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! notifies the computations that read it when the value changes.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a running computed value or effect, the
//!    runtime registers that subscriber against the signal's value key.
//!
//! 2. When a write produces a value that is not equal to the current one,
//!    the runtime re-executes the subscribers. Equal writes are dropped.
//!
//! # Thread Safety
//!
//! The value sits behind a `parking_lot::RwLock`. No lock is held while
//! subscribers run, so an effect may freely read the signal that triggered it.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use super::runtime::{ContainerHandle, ContainerId, Runtime, VALUE_KEY};

/// A reactive cell holding a value of type `T`.
///
/// # Example
///
/// ```rust
/// use conwaymore_client::reactive::Signal;
///
/// let count = Signal::new(0);
/// count.set(5);
/// count.update(|v| v + 1);
/// assert_eq!(count.get(), 6);
/// ```
pub struct Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    inner: Arc<SignalInner<T>>,
}

struct SignalInner<T> {
    container: ContainerHandle,
    value: RwLock<T>,
}

impl<T> Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                container: ContainerHandle::new(),
                value: RwLock::new(value),
            }),
        }
    }

    /// The signal's container identity in the dependency tracker.
    pub fn id(&self) -> ContainerId {
        self.inner.container.id()
    }

    /// Get the current value, registering the running subscriber (if any).
    pub fn get(&self) -> T {
        Runtime::track(self.id(), VALUE_KEY);
        self.inner.value.read().clone()
    }

    /// Get the current value without tracking a dependency.
    pub fn get_untracked(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Borrow a snapshot of the current value, registering the running
    /// subscriber (if any).
    ///
    /// `f` runs with no lock held, so it may write this signal.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.get())
    }

    /// Store a new value and notify subscribers if it differs from the
    /// current one.
    pub fn set(&self, value: T) {
        {
            let mut guard = self.inner.value.write();
            if *guard == value {
                return;
            }
            *guard = value;
        }
        Runtime::notify(self.id(), VALUE_KEY);
    }

    /// Update the value from the previous one.
    ///
    /// Same equality gate as [`Signal::set`].
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let current = self.get_untracked();
        self.set(f(&current));
    }

    /// Number of subscribers currently depending on this signal.
    pub fn subscriber_count(&self) -> usize {
        Runtime::subscriber_count(self.id(), VALUE_KEY)
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for Signal<T>
where
    T: Clone + PartialEq + Send + Sync + Default + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + PartialEq + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id())
            .field("value", &self.get_untracked())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
