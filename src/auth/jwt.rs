use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::auth::{claims::Claims, errors::AuthError};
use crate::config::JwtConfig;

#[derive(Clone)]
struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Signs and verifies HS256 bearer tokens.
///
/// Built without a secret it stays usable as a value but every call fails with
/// [`AuthError::Signing`], so a misconfigured deployment answers with errors
/// instead of going down. An out-of-range TTL is handled the same way.
#[derive(Clone)]
pub struct TokenIssuer {
    keys: Option<Keys>,
    issuer: String,
    audience: String,
    ttl: Option<TimeDuration>,
}

impl TokenIssuer {
    pub fn new(cfg: &JwtConfig) -> Self {
        let keys = cfg
            .secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|secret| Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            });
        let ttl = cfg.ttl_minutes.checked_mul(60).map(TimeDuration::seconds);
        if ttl.is_none() {
            warn!(ttl_minutes = cfg.ttl_minutes, "JWT_TTL_MINUTES out of range");
        }
        Self {
            keys,
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.keys.is_some()
    }

    fn keys(&self) -> Result<&Keys, AuthError> {
        self.keys
            .as_ref()
            .ok_or_else(|| AuthError::Signing("JWT secret is not configured".into()))
    }

    pub fn issue(&self, account_id: Uuid) -> Result<String, AuthError> {
        let keys = self.keys()?;
        let now = OffsetDateTime::now_utc();
        let exp = self
            .ttl
            .and_then(|ttl| now.checked_add(ttl))
            .ok_or_else(|| AuthError::Signing("JWT_TTL_MINUTES is out of range".into()))?;
        let claims = Claims {
            sub: account_id,
            iat: now.unix_timestamp().max(0) as usize,
            exp: exp.unix_timestamp().max(0) as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).map_err(|e| {
            error!(error = %e, "jwt encode failed");
            AuthError::Signing(e.to_string())
        })?;
        debug!(account_id = %account_id, "jwt signed");
        Ok(token)
    }

    /// Verifies signature, issuer, audience and expiry, returning the subject.
    pub fn parse(&self, token: &str) -> Result<Uuid, AuthError> {
        let keys = self.keys()?;
        let mut validation = Validation::default();
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &keys.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidKeyFormat | ErrorKind::InvalidRsaKey(_) => {
                    error!(error = %e, "jwt key unusable");
                    AuthError::Signing(e.to_string())
                }
                _ => {
                    debug!(error = %e, "jwt rejected");
                    AuthError::Token(e)
                }
            }
        })?;
        debug!(account_id = %data.claims.sub, "jwt verified");
        Ok(data.claims.sub)
    }
}

#[cfg(test)]
pub(crate) fn test_issuer() -> TokenIssuer {
    TokenIssuer::new(&jwt_config(Some("dev-secret"), "test-issuer", "test-aud", 5))
}

#[cfg(test)]
fn jwt_config(
    secret: Option<&str>,
    issuer: &str,
    audience: &str,
    ttl_minutes: i64,
) -> JwtConfig {
    JwtConfig {
        secret: secret.map(Into::into),
        issuer: issuer.into(),
        audience: audience.into(),
        ttl_minutes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_and_parse() {
        let keys = test_issuer();
        let account_id = Uuid::new_v4();
        let token = keys.issue(account_id).expect("issue");
        assert_eq!(keys.parse(&token).expect("parse"), account_id);
    }

    #[test]
    fn parse_rejects_expired_token() {
        let keys = TokenIssuer::new(&jwt_config(Some("dev-secret"), "iss", "aud", -1));
        let token = keys.issue(Uuid::new_v4()).expect("issue");
        let err = keys.parse(&token).unwrap_err();
        match err {
            AuthError::Token(e) => assert!(matches!(e.kind(), ErrorKind::ExpiredSignature)),
            other => panic!("expected token error, got {other:?}"),
        }
    }

    #[test]
    fn parse_rejects_tampered_signature() {
        let keys = test_issuer();
        let token = keys.issue(Uuid::new_v4()).expect("issue");
        let (head, sig) = token.rsplit_once('.').expect("three segments");
        let flipped = if sig.starts_with('A') { "B" } else { "A" };
        let tampered = format!("{head}.{flipped}{}", &sig[1..]);
        assert!(matches!(keys.parse(&tampered), Err(AuthError::Token(_))));
    }

    #[test]
    fn parse_rejects_other_secret() {
        let cfg = jwt_config(Some("other-secret"), "test-issuer", "test-aud", 5);
        let other = TokenIssuer::new(&cfg);
        let token = other.issue(Uuid::new_v4()).expect("issue");
        assert!(matches!(test_issuer().parse(&token), Err(AuthError::Token(_))));
    }

    #[test]
    fn parse_rejects_wrong_issuer_or_audience() {
        let good = TokenIssuer::new(&jwt_config(Some("same-secret"), "good-iss", "good-aud", 5));
        let bad = TokenIssuer::new(&jwt_config(Some("same-secret"), "bad-iss", "bad-aud", 5));
        let token = good.issue(Uuid::new_v4()).expect("issue");
        assert!(matches!(bad.parse(&token), Err(AuthError::Token(_))));
    }

    #[test]
    fn missing_secret_is_a_signing_error() {
        for secret in [None, Some("")] {
            let keys = TokenIssuer::new(&jwt_config(secret, "iss", "aud", 5));
            assert!(!keys.is_enabled());
            assert!(matches!(keys.issue(Uuid::new_v4()), Err(AuthError::Signing(_))));
            assert!(matches!(keys.parse("a.b.c"), Err(AuthError::Signing(_))));
        }
    }

    #[test]
    fn out_of_range_ttl_is_a_signing_error() {
        for ttl_minutes in [i64::MAX, i64::MIN, 1_000_000_000_000] {
            let cfg = jwt_config(Some("dev-secret"), "iss", "aud", ttl_minutes);
            let keys = TokenIssuer::new(&cfg);
            assert!(keys.is_enabled());
            assert!(matches!(keys.issue(Uuid::new_v4()), Err(AuthError::Signing(_))));
        }
    }

    #[test]
    fn garbage_is_a_token_error() {
        assert!(matches!(
            test_issuer().parse("not-a-jwt"),
            Err(AuthError::Token(_))
        ));
    }
}
