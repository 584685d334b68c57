use {
    base64::Engine,
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

use crate::error::LoginError;

/// Identity claims the login flow consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub aud: String,
    #[serde(default)]
    pub nonce: Option<String>,
    pub iss: String,
    pub tid: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub oid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A compact identity token split into its three parts.
///
/// The signature is carried but never checked here. Trust rests on the
/// redirect coming from the provider plus the claim checks in
/// [`crate::validate`]; the backend is expected to re-verify the token.
#[derive(Debug, Clone)]
pub struct IdToken {
    pub header: Value,
    /// Raw payload JSON, kept for diagnostics.
    pub payload: Value,
    pub claims: IdTokenClaims,
    pub signature: String,
}

impl IdToken {
    pub fn decode(compact: &str) -> Result<Self, LoginError> {
        let mut parts = compact.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(LoginError::MalformedToken(
                "expected three dot-separated segments".into(),
            ));
        };

        let header = decode_segment(header, "header")?;
        let payload = decode_segment(payload, "payload")?;
        let claims =
            serde_json::from_value(payload.clone()).map_err(|e| LoginError::InvalidClaims {
                reason: e.to_string(),
                claims: payload.clone(),
            })?;

        Ok(Self {
            header,
            payload,
            claims,
            signature: signature.to_string(),
        })
    }
}

/// Base64-decode one segment as JSON. Accepts the URL-safe and standard
/// alphabets, with or without padding.
fn decode_segment(segment: &str, what: &str) -> Result<Value, LoginError> {
    let normalized: String = segment
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            c => c,
        })
        .collect();
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(normalized)
        .map_err(|e| LoginError::MalformedToken(format!("{what} is not base64: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| LoginError::MalformedToken(format!("{what} is not JSON: {e}")))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};

    use super::*;

    fn claims_json() -> Value {
        serde_json::json!({
            "aud": "client-123",
            "nonce": "n0nce",
            "iss": "https://login.microsoftonline.com/tid-1/v2.0",
            "tid": "tid-1",
            "iat": 1_700_000_000,
            "nbf": 1_700_000_000,
            "exp": 1_700_003_600,
            "oid": "oid-1",
            "email": "ada@example.com",
            "name": "Ada Lovelace"
        })
    }

    #[test]
    fn decodes_url_safe_token() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims_json().to_string());
        let token = IdToken::decode(&format!("{header}.{payload}.sig")).unwrap();
        assert_eq!(token.header["alg"], "RS256");
        assert_eq!(token.claims.tid, "tid-1");
        assert_eq!(token.claims.email.as_deref(), Some("ada@example.com"));
        assert!(token.claims.preferred_username.is_none());
        assert_eq!(token.signature, "sig");
        assert_eq!(token.payload, claims_json());
    }

    #[test]
    fn decodes_padded_standard_alphabet() {
        let header = STANDARD.encode(br#"{"alg":"none"}"#);
        let payload = STANDARD.encode(claims_json().to_string());
        let token = IdToken::decode(&format!("{header}.{payload}.")).unwrap();
        assert_eq!(token.claims.name.as_deref(), Some("Ada Lovelace"));
        assert!(token.signature.is_empty());
    }

    #[test]
    fn rejects_wrong_segment_count() {
        assert!(matches!(
            IdToken::decode("only.two"),
            Err(LoginError::MalformedToken(_))
        ));
        assert!(IdToken::decode("a.b.c.d").is_err());
    }

    #[test]
    fn rejects_non_json_payload() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let payload = URL_SAFE_NO_PAD.encode(b"not json");
        let err = IdToken::decode(&format!("{header}.{payload}.sig")).unwrap_err();
        assert!(err.to_string().contains("payload is not JSON"));
    }

    fn encode_claims(claims: &Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.sig")
    }

    #[test]
    fn missing_required_claim_keeps_payload() {
        let mut claims = claims_json();
        claims.as_object_mut().unwrap().remove("exp");
        match IdToken::decode(&encode_claims(&claims)).unwrap_err() {
            LoginError::InvalidClaims { reason, claims: kept } => {
                assert!(reason.contains("exp"));
                assert_eq!(kept, claims);
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn mistyped_claim_keeps_payload() {
        let mut claims = claims_json();
        claims["aud"] = serde_json::json!(["client-123", "other"]);
        let err = IdToken::decode(&encode_claims(&claims)).unwrap_err();
        assert!(matches!(
            &err,
            LoginError::InvalidClaims { claims: kept, .. } if kept["aud"][1] == "other"
        ));
        assert!(err.to_string().contains("\"oid\":\"oid-1\""));
        assert!(err.user_message().is_none());
    }
}
