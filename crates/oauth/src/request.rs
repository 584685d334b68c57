use {
    rand::{Rng, distr::Alphanumeric},
    url::Url,
};

use crate::types::{OidcConfig, PendingAuthRequest, Prompt};

/// Length of the numeric `state` value.
pub const STATE_LEN: usize = 6;
/// Length of the alphanumeric `nonce` value.
pub const NONCE_LEN: usize = 32;

/// Random zero-padded 6-digit state.
#[must_use]
pub fn generate_state() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{n:06}")
}

/// Random nonce drawn uniformly from `[A-Za-z0-9]`.
#[must_use]
pub fn generate_nonce() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}

impl PendingAuthRequest {
    /// Fresh request with newly generated state and nonce.
    #[must_use]
    pub fn generate(prompt: Prompt, created_at: i64) -> Self {
        Self {
            state: generate_state(),
            nonce: generate_nonce(),
            prompt,
            created_at,
        }
    }
}

fn endpoint(config: &OidcConfig, suffix: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!(
        "{}/oauth2/v2.0/{suffix}",
        config.authority.trim_end_matches('/')
    ))
}

/// Authorization URL asking for an `id_token` delivered by `form_post`.
pub fn authorize_url(
    config: &OidcConfig,
    pending: &PendingAuthRequest,
) -> Result<Url, url::ParseError> {
    let mut url = endpoint(config, "authorize")?;
    url.query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("response_type", "id_token")
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("response_mode", "form_post")
        .append_pair("scope", &config.scopes.join(" "))
        .append_pair("state", &pending.state)
        .append_pair("prompt", pending.prompt.as_str())
        .append_pair("nonce", &pending.nonce);
    Ok(url)
}

/// Provider logout URL that lands back on `post_logout_redirect_uri`.
pub fn logout_url(config: &OidcConfig) -> Result<Url, url::ParseError> {
    let mut url = endpoint(config, "logout")?;
    url.query_pairs_mut()
        .append_pair("post_logout_redirect_uri", &config.post_logout_redirect_uri);
    Ok(url)
}
