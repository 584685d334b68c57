use weblib_common::BackendError;

use crate::validate::ValidationFailure;

/// Why a login attempt did not reach an authenticated session.
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("the login pop-up could not be opened")]
    PopupBlocked,

    #[error("identity provider error {code}: {description}")]
    Provider { code: String, description: String },

    /// Claim validation failed. `claims` is the decoded payload, kept for diagnostics.
    #[error("identity token rejected ({failure}). Content: {claims}")]
    TokenValidation {
        failure: ValidationFailure,
        claims: serde_json::Value,
    },

    #[error("malformed identity token: {0}")]
    MalformedToken(String),

    /// The payload is JSON but its claims do not have the expected shape.
    #[error("identity token claims unusable ({reason}). Content: {claims}")]
    InvalidClaims {
        reason: String,
        claims: serde_json::Value,
    },

    #[error("unrecognised provider message: {0}")]
    MalformedMessage(String),

    #[error("identity token has no {0} claim")]
    MissingClaim(&'static str),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("login attempt timed out")]
    TimedOut,

    #[error("login attempt was cancelled")]
    Cancelled,

    #[error("no login attempt is pending")]
    NoPendingAttempt,

    #[error("provider message channel closed")]
    ChannelClosed,

    #[error("invalid identity provider URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl LoginError {
    /// Alert text for errors the user should see; `None` for ones only logged.
    #[must_use]
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::PopupBlocked => Some("Please enable popups to login, then try again".into()),
            Self::Provider { code, description } => Some(format!(
                "An error has occurred during login. Code: {code}. Description: {description}"
            )),
            Self::Backend(err) => Some(err.user_message("login")),
            _ => None,
        }
    }

    /// Short label for metrics and logs.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::PopupBlocked => "popup_blocked",
            Self::Provider { .. } => "provider",
            Self::TokenValidation { .. } => "token_validation",
            Self::MalformedToken(_) => "malformed_token",
            Self::InvalidClaims { .. } => "invalid_claims",
            Self::MalformedMessage(_) => "malformed_message",
            Self::MissingClaim(_) => "missing_claim",
            Self::Backend(_) => "backend",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
            Self::NoPendingAttempt => "no_pending_attempt",
            Self::ChannelClosed => "channel_closed",
            Self::InvalidUrl(_) => "invalid_url",
        }
    }
}
