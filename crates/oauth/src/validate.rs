//! Claim checks applied to a returned identity token.
//!
//! No cryptographic signature check happens here, and no JWKS is fetched.
//! The claims are only compared against the pending request and the client
//! registration.

use crate::{
    id_token::IdTokenClaims,
    types::{OidcConfig, PendingAuthRequest},
};

/// The first claim check a token failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationFailure {
    #[error("returned state does not match the pending request")]
    StateMismatch,
    #[error("audience is not this client")]
    AudienceMismatch,
    #[error("nonce does not match the pending request")]
    NonceMismatch,
    #[error("issuer does not match the token's tenant")]
    IssuerMismatch,
    #[error("issued before its not-before time")]
    IssuedBeforeNotBefore,
    #[error("issued at or after its expiry")]
    IssuedAfterExpiry,
    #[error("issued in the future")]
    IssuedInFuture,
    #[error("expired")]
    Expired,
}

impl ValidationFailure {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StateMismatch => "state",
            Self::AudienceMismatch => "aud",
            Self::NonceMismatch => "nonce",
            Self::IssuerMismatch => "iss",
            Self::IssuedBeforeNotBefore => "nbf",
            Self::IssuedAfterExpiry => "iat",
            Self::IssuedInFuture => "iat_future",
            Self::Expired => "exp",
        }
    }
}

/// Issuer a token from tenant `tid` must carry.
#[must_use]
pub fn expected_issuer(config: &OidcConfig, tid: &str) -> String {
    format!("{}{tid}/v2.0", config.issuer_base)
}

/// Check a token's claims against the pending request. `now` is in Unix seconds.
pub fn validate(
    claims: &IdTokenClaims,
    returned_state: &str,
    pending: &PendingAuthRequest,
    config: &OidcConfig,
    now: i64,
) -> Result<(), ValidationFailure> {
    if returned_state != pending.state {
        return Err(ValidationFailure::StateMismatch);
    }
    if claims.aud != config.client_id {
        return Err(ValidationFailure::AudienceMismatch);
    }
    if claims.nonce.as_deref() != Some(pending.nonce.as_str()) {
        return Err(ValidationFailure::NonceMismatch);
    }
    if claims.iss != expected_issuer(config, &claims.tid) {
        return Err(ValidationFailure::IssuerMismatch);
    }
    if claims.iat < claims.nbf {
        return Err(ValidationFailure::IssuedBeforeNotBefore);
    }
    if claims.iat >= claims.exp {
        return Err(ValidationFailure::IssuedAfterExpiry);
    }
    if now <= claims.iat {
        return Err(ValidationFailure::IssuedInFuture);
    }
    if now >= claims.exp {
        return Err(ValidationFailure::Expired);
    }
    Ok(())
}

/// Predicate form of [`validate`].
#[must_use]
pub fn is_valid(
    claims: &IdTokenClaims,
    returned_state: &str,
    pending: &PendingAuthRequest,
    config: &OidcConfig,
    now: i64,
) -> bool {
    validate(claims, returned_state, pending, config, now).is_ok()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::types::Prompt;

    const NOW: i64 = 1_700_000_100;

    fn config() -> OidcConfig {
        OidcConfig {
            client_id: "client-123".into(),
            authority: "https://login.microsoftonline.com/common".into(),
            issuer_base: "https://login.microsoftonline.com/".into(),
            redirect_uri: "http://localhost:5000/api/oidc/redirect".into(),
            post_logout_redirect_uri: "http://localhost:5000/browse".into(),
            scopes: vec!["openid".into()],
            login_timeout: Duration::from_secs(300),
        }
    }

    fn pending() -> PendingAuthRequest {
        PendingAuthRequest {
            state: "004217".into(),
            nonce: "Zq8VbF3kP0aLmN7xY2cR5tW9hJ1dS4gE".into(),
            prompt: Prompt::None,
            created_at: NOW - 10,
        }
    }

    fn good_claims() -> IdTokenClaims {
        IdTokenClaims {
            aud: "client-123".into(),
            nonce: Some("Zq8VbF3kP0aLmN7xY2cR5tW9hJ1dS4gE".into()),
            iss: "https://login.microsoftonline.com/tid-1/v2.0".into(),
            tid: "tid-1".into(),
            iat: NOW - 5,
            nbf: NOW - 5,
            exp: NOW + 295,
            oid: "oid-1".into(),
            email: Some("ada@example.com".into()),
            preferred_username: None,
            name: None,
        }
    }

    fn check(claims: &IdTokenClaims, state: &str, now: i64) -> Result<(), ValidationFailure> {
        validate(claims, state, &pending(), &config(), now)
    }

    #[test]
    fn accepts_well_formed_token() {
        assert_eq!(check(&good_claims(), "004217", NOW), Ok(()));
        assert!(is_valid(&good_claims(), "004217", &pending(), &config(), NOW));
    }

    #[test]
    fn accepts_nbf_strictly_before_iat() {
        let mut claims = good_claims();
        claims.nbf = claims.iat - 60;
        assert_eq!(check(&claims, "004217", NOW), Ok(()));
    }

    #[test]
    fn rejects_state_mismatch_alone() {
        assert_eq!(
            check(&good_claims(), "004218", NOW),
            Err(ValidationFailure::StateMismatch)
        );
    }

    #[test]
    fn rejects_audience_mismatch() {
        let mut claims = good_claims();
        claims.aud = "someone-else".into();
        assert_eq!(
            check(&claims, "004217", NOW),
            Err(ValidationFailure::AudienceMismatch)
        );
    }

    #[test]
    fn rejects_missing_or_wrong_nonce() {
        let mut claims = good_claims();
        claims.nonce = None;
        assert_eq!(
            check(&claims, "004217", NOW),
            Err(ValidationFailure::NonceMismatch)
        );
        claims.nonce = Some("x".repeat(32));
        assert_eq!(
            check(&claims, "004217", NOW),
            Err(ValidationFailure::NonceMismatch)
        );
    }

    #[test]
    fn rejects_issuer_from_other_tenant() {
        let mut claims = good_claims();
        claims.iss = "https://login.microsoftonline.com/tid-2/v2.0".into();
        assert_eq!(
            check(&claims, "004217", NOW),
            Err(ValidationFailure::IssuerMismatch)
        );
        claims.iss = "https://login.microsoftonline.com/tid-1/v2.0/".into();
        assert_eq!(
            check(&claims, "004217", NOW),
            Err(ValidationFailure::IssuerMismatch)
        );
    }

    #[test]
    fn rejects_iat_before_nbf() {
        let mut claims = good_claims();
        claims.nbf = claims.iat + 1;
        assert_eq!(
            check(&claims, "004217", NOW),
            Err(ValidationFailure::IssuedBeforeNotBefore)
        );
    }

    #[test]
    fn rejects_iat_at_expiry() {
        let mut claims = good_claims();
        claims.exp = claims.iat;
        assert_eq!(
            check(&claims, "004217", NOW),
            Err(ValidationFailure::IssuedAfterExpiry)
        );
    }

    #[test]
    fn rejects_now_at_or_before_iat() {
        let claims = good_claims();
        assert_eq!(
            check(&claims, "004217", claims.iat),
            Err(ValidationFailure::IssuedInFuture)
        );
    }

    #[test]
    fn rejects_now_at_or_after_exp() {
        let claims = good_claims();
        assert_eq!(
            check(&claims, "004217", claims.exp),
            Err(ValidationFailure::Expired)
        );
        assert_eq!(
            check(&claims, "004217", claims.exp + 1),
            Err(ValidationFailure::Expired)
        );
        assert!(check(&claims, "004217", claims.exp - 1).is_ok());
    }
}
