//! Metric names for weblib.
//!
//! The crates record through the `metrics` facade. Nothing is exported until
//! the host installs a recorder, so recording is free when metrics are unused.
//!
//! ```rust,ignore
//! use weblib_metrics::{auth, counter, labels};
//!
//! counter!(auth::LOGIN_ATTEMPTS_TOTAL, labels::PROMPT => "none").increment(1);
//! ```

mod definitions;

pub use definitions::*;

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};
