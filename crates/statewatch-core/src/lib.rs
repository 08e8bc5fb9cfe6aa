//! # statewatch
//!
//! State-change watcher with push notifications.
//!
//! statewatch periodically probes external resources (web pages, APIs) for a
//! discrete state, detects transitions against persisted history, and emits
//! push alerts through an ntfy-compatible server.
//!
//! ## Architecture
//!
//! - **Probes**: pluggable checks that reduce a resource to an opaque state label
//! - **Store**: PostgreSQL-backed append-only check history and failure streaks
//! - **Watch**: the transition/streak engine driving one pass per scheduling tick
//! - **Notify**: push delivery with a primary and an optional debug topic
//!
//! ## Quick Start
//!
//! ```bash
//! # Run the watcher loop
//! statewatch serve
//!
//! # Run a single pass
//! statewatch check
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod probes;
pub mod store;
pub mod watch;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
    pub use crate::notify::{Dispatcher, NtfySender};
    pub use crate::probes::{Observation, Probe};
    pub use crate::store::{PgStateStore, StateStore};
    pub use crate::watch::Watcher;
}
