use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Client id registered for weblib with Microsoft Entra ID.
pub const DEFAULT_CLIENT_ID: &str = "21b089d7-aa3e-478f-a992-9aa757adc73f";
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com/common";
pub const DEFAULT_ISSUER_BASE: &str = "https://login.microsoftonline.com/";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";
pub const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 300;
/// File in the config dir holding the backend session cookie.
pub const SESSION_FILE_NAME: &str = "session.json";

/// Root configuration for the weblib client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeblibConfig {
    pub identity: IdentityConfig,
    pub backend: BackendConfig,
    pub callback: CallbackConfig,
}

/// Identity provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub client_id: String,
    /// Authority base; `/oauth2/v2.0/authorize` and `/oauth2/v2.0/logout` are appended.
    pub authority: String,
    /// Expected issuer is `issuer_base + tid + "/v2.0"`.
    pub issuer_base: String,
    /// Redirect target registered with the provider. Derived from the backend
    /// URL when unset.
    pub redirect_uri: Option<String>,
    /// Where the provider sends the browser after logout. Derived from the
    /// backend URL when unset.
    pub post_logout_redirect_uri: Option<String>,
    pub scopes: Vec<String>,
    /// How long a pending login attempt may stay unanswered.
    pub login_timeout_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.into(),
            authority: DEFAULT_AUTHORITY.into(),
            issuer_base: DEFAULT_ISSUER_BASE.into(),
            redirect_uri: None,
            post_logout_redirect_uri: None,
            scopes: vec!["openid".into(), "email".into(), "profile".into()],
            login_timeout_secs: DEFAULT_LOGIN_TIMEOUT_SECS,
        }
    }
}

/// Backend API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// CSRF token echoed in item request bodies, when the backend requires one.
    pub csrf_token: Option<String>,
    /// Where the session cookie from `login` is kept between runs.
    pub session_file: Option<PathBuf>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.into(),
            request_timeout_secs: 10,
            csrf_token: None,
            session_file: None,
        }
    }
}

impl BackendConfig {
    /// Session cookie file: the configured path, or `session.json` in the
    /// platform config dir.
    #[must_use]
    pub fn session_path(&self) -> Option<PathBuf> {
        self.session_file
            .clone()
            .or_else(|| crate::loader::config_dir().map(|dir| dir.join(SESSION_FILE_NAME)))
    }
}

/// Local listener that receives the provider's `form_post` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallbackConfig {
    /// Overrides the bind address derived from the redirect URI. Needed when
    /// the redirect URI names an address this machine cannot listen on, or
    /// one a local backend already uses.
    pub bind: Option<String>,
}

impl WeblibConfig {
    /// Redirect URI, falling back to the backend's `/api/oidc/redirect`.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        self.identity.redirect_uri.clone().unwrap_or_else(|| {
            format!(
                "{}/api/oidc/redirect",
                self.backend.base_url.trim_end_matches('/')
            )
        })
    }

    /// Post-logout landing page, falling back to the backend's `/browse`.
    #[must_use]
    pub fn post_logout_redirect_uri(&self) -> String {
        self.identity
            .post_logout_redirect_uri
            .clone()
            .unwrap_or_else(|| format!("{}/browse", self.backend.base_url.trim_end_matches('/')))
    }
}
