//! HTTP client for the weblib backend's session and item endpoints.

pub mod client;
pub mod session_store;

pub use {
    client::{DEFAULT_NUM_RESULTS, HttpBackend, SearchQuery},
    session_store::SessionStore,
};
