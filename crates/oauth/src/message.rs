//! Classification of what the identity provider sends back to the opener.
//!
//! The redirect page relays the `form_post` body either as a list of
//! `key=value` segments or as already-split form fields. Both are parsed
//! into a [`ProviderMessage`] before the controller looks at them.

use std::collections::HashMap;

use secrecy::SecretString;

use crate::error::LoginError;

/// Provider error codes that mean "a silent attempt needs user interaction".
pub const INTERACTION_ERRORS: &[&str] = &["login_required", "interaction_required"];

#[derive(Debug, Clone)]
pub enum ProviderMessage {
    Success {
        id_token: SecretString,
        state: String,
    },
    Error {
        code: String,
        description: String,
    },
}

impl ProviderMessage {
    /// Classify decoded form fields. An `error` field wins over token fields.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, LoginError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields: HashMap<String, String> = HashMap::new();
        for (k, v) in pairs {
            fields.entry(k.into()).or_insert_with(|| v.into());
        }

        if let Some(code) = fields.remove("error") {
            let description = fields.remove("error_description").unwrap_or_default();
            return Ok(Self::Error { code, description });
        }

        match (fields.remove("id_token"), fields.remove("state")) {
            (Some(token), Some(state)) if !token.is_empty() => Ok(Self::Success {
                id_token: SecretString::new(token),
                state,
            }),
            (Some(_), Some(_)) => Err(LoginError::MalformedMessage("empty id_token".into())),
            (None, _) => Err(LoginError::MalformedMessage("missing id_token".into())),
            (_, None) => Err(LoginError::MalformedMessage("missing state".into())),
        }
    }

    /// Classify url-encoded `key=value` segments such as
    /// `["id_token=eyJ...", "state=004217"]`. A segment may also hold several
    /// `&`-joined pairs.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, LoginError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pairs: Vec<(String, String)> = segments
            .into_iter()
            .flat_map(|segment| {
                url::form_urlencoded::parse(segment.as_ref().as_bytes())
                    .into_owned()
                    .collect::<Vec<_>>()
            })
            .collect();
        Self::from_pairs(pairs)
    }

    /// True for errors a silent attempt should answer with an interactive retry.
    #[must_use]
    pub fn needs_interaction(&self) -> bool {
        matches!(self, Self::Error { code, .. } if INTERACTION_ERRORS.contains(&code.as_str()))
    }
}
