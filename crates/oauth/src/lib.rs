//! Pop-up OpenID Connect login for weblib.
//!
//! [`LoginFlow`] asks the identity provider for an `id_token` in a pop-up,
//! checks the returned claims against the pending request, and bootstraps a
//! backend session from them.

pub mod callback_server;
pub mod defaults;
pub mod error;
pub mod flow;
pub mod host;
pub mod id_token;
pub mod message;
pub mod request;
pub mod types;
pub mod validate;

pub use {
    callback_server::CallbackServer,
    defaults::{callback_addr, callback_path, oidc_config, start_callback_server},
    error::LoginError,
    flow::{Clock, FlowStep, LoginFlow, login_request},
    host::{BrowserContext, ItemRenderer, Popup},
    id_token::{IdToken, IdTokenClaims},
    message::ProviderMessage,
    types::{FlowState, OidcConfig, PendingAuthRequest, Prompt},
    validate::{ValidationFailure, is_valid, validate},
};
