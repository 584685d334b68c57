//! Types and seams shared between the weblib client crates.

pub mod error;
pub mod session;
pub mod types;

pub use {
    error::BackendError,
    session::SessionApi,
    types::{
        Item, ItemList, ItemSource, LoginRequest, PLATFORM_MICROSOFT, PlatformId, SessionResult,
        StatusReply,
    },
};
