//! Conwaymore Client
//!
//! This crate provides the client runtime for the Conwaymore Game of Life
//! viewer. It implements:
//!
//! - Reactive primitives (signals, stores, computed values, effects)
//! - The binary wire protocol spoken with the simulation server
//! - A render worker that syncs snapshots into a cell buffer and draws them
//!   once per frame
//! - WebSocket transport and the UI application state
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Core reactive primitives and dependency tracking
//! - `protocol`: Snapshot and client frame codecs, built-in patterns
//! - `worker`: The render worker, its messages and its async driver
//! - `transport`: WebSocket and in-memory connections
//! - `app`: UI-side state, view model and user intents
//! - `config`: Environment-driven configuration
//!
//! # Example
//!
//! ```rust
//! use conwaymore_client::reactive::{Computed, Effect, Signal};
//!
//! // Create a signal
//! let count = Signal::new(0);
//!
//! // Create a derived value
//! let doubled = {
//!     let count = count.clone();
//!     Computed::new(move || count.get() * 2)
//! };
//!
//! // Create an effect
//! let _effect = {
//!     let (count, doubled) = (count.clone(), doubled.clone());
//!     Effect::new(move || {
//!         println!("Count: {}, Doubled: {}", count.get(), doubled.get());
//!     })
//! };
//!
//! // Update the signal
//! count.set(5);
//! // Effect automatically runs, prints: "Count: 5, Doubled: 10"
//! assert_eq!(doubled.get(), 10);
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod protocol;
pub mod reactive;
pub mod transport;
pub mod worker;

pub use app::App;
pub use config::ClientConfig;
pub use error::{ConfigError, ProtocolError, TransportError, WorkerError};
