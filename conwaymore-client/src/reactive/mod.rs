//! Reactive Primitives
//!
//! This module implements the reactive state-propagation engine: signals,
//! stores, computed values and effects. The viewer's UI state and the worker's
//! playback state are built on it.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A [`Signal`] is a container for one mutable value. Reading it inside a
//! running computed value or effect registers that subscriber as a dependent;
//! writing a different value re-runs the dependents.
//!
//! ## Stores
//!
//! A [`Store`] is a key → value record where every key is tracked on its own.
//!
//! ## Computed values
//!
//! A [`Computed`] value is derived from other reactive values and cached. It
//! recomputes when a dependency changes and only notifies its own dependents
//! when the result actually differs.
//!
//! ## Effects
//!
//! An [`Effect`] is a side-effecting computation that re-runs whenever its
//! dependencies change, until disposed.
//!
//! # Implementation Notes
//!
//! Dependency tracking goes through a process-wide [`Runtime`] keyed by
//! `(container, property key)`. The currently running subscriber lives on a
//! thread-local save/restore stack ([`ReactiveContext`]), so nested reads
//! (a computed value read from an effect, a computed value read from another
//! computed value) always register against the innermost subscriber.

mod computed;
mod context;
mod effect;
mod runtime;
mod signal;
mod store;
mod subscriber;

pub use computed::Computed;
pub use context::ReactiveContext;
pub use effect::{Effect, Teardown};
pub use runtime::{ContainerHandle, ContainerId, PropertyKey, Runtime, VALUE_KEY};
pub use signal::Signal;
pub use store::Store;
pub use subscriber::{Subscriber, SubscriberId};
