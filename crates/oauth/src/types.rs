use std::time::Duration;

/// OpenID Connect client configuration for the implicit `id_token` flow.
#[derive(Debug, Clone)]
pub struct OidcConfig {
    pub client_id: String,
    /// Authority base, e.g. `https://login.microsoftonline.com/common`.
    pub authority: String,
    /// Expected issuer is `issuer_base + tid + "/v2.0"`.
    pub issuer_base: String,
    pub redirect_uri: String,
    pub post_logout_redirect_uri: String,
    pub scopes: Vec<String>,
    /// How long an attempt may stay pending before it is expired.
    pub login_timeout: Duration,
}

/// `prompt` parameter sent to the authorization endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// Silent attempt: succeed only if the provider already has a session.
    None,
    /// Interactive attempt: let the user pick or sign in to an account.
    SelectAccount,
    Login,
    Consent,
}

impl Prompt {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::SelectAccount => "select_account",
            Self::Login => "login",
            Self::Consent => "consent",
        }
    }

    #[must_use]
    pub fn is_interactive(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// The single outstanding authorization request.
///
/// `state` and `nonce` must come back unchanged from the provider before any
/// token is trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAuthRequest {
    pub state: String,
    pub nonce: String,
    pub prompt: Prompt,
    /// Unix timestamp (seconds) when the attempt was started.
    pub created_at: i64,
}

/// Where the controller is in the login lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    PendingSilent,
    PendingInteractive,
    Authenticated,
    Failed,
}

impl FlowState {
    #[must_use]
    pub fn is_pending(self) -> bool {
        matches!(self, Self::PendingSilent | Self::PendingInteractive)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_none_is_silent() {
        assert!(!Prompt::None.is_interactive());
        assert!(Prompt::SelectAccount.is_interactive());
        assert!(Prompt::Login.is_interactive());
        assert_eq!(Prompt::SelectAccount.as_str(), "select_account");
    }

    #[test]
    fn flow_state_classes() {
        assert!(FlowState::PendingSilent.is_pending());
        assert!(FlowState::PendingInteractive.is_pending());
        assert!(!FlowState::Idle.is_pending());
        assert!(!FlowState::Failed.is_pending());
    }
}
