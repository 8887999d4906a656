use anyhow::Context;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::claims::Claims;
use crate::config::JwtConfig;

/// Token rejected for any reason. The cause is deliberately not carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid or expired token")]
pub struct AuthError;

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    ttl: Duration,
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            algorithm: cfg.algorithm,
            ttl: Duration::seconds(cfg.expiration_hours.saturating_mul(60 * 60)),
        }
    }

    pub fn issue_token(&self, email: &str) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now
            .checked_add(self.ttl)
            .context("token expiry out of range")?;
        let claims = Claims {
            sub: email.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)?;
        debug!(email = %email, "jwt signed");
        Ok(token)
    }

    /// Returns the subject email of a token whose signature, algorithm and
    /// expiry all check out.
    pub fn verify_token(&self, token: &str) -> Result<String, AuthError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            debug!(error = %e, "jwt rejected");
            AuthError
        })?;

        let email = data.claims.sub;
        if email.trim().is_empty() {
            debug!("jwt rejected: empty subject");
            return Err(AuthError);
        }
        debug!(email = %email, "jwt verified");
        Ok(email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_keys(secret: &str, algorithm: Algorithm) -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: secret.into(),
            algorithm,
            expiration_hours: 1,
        })
    }

    fn now() -> i64 {
        OffsetDateTime::now_utc().unix_timestamp()
    }

    fn sign_raw(payload: serde_json::Value, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("sign raw payload")
    }

    #[test]
    fn issue_and_verify_token() {
        let keys = make_keys("dev-secret", Algorithm::HS256);
        let token = keys.issue_token("ada@example.com").expect("issue token");
        assert_eq!(keys.verify_token(&token), Ok("ada@example.com".to_string()));
    }

    #[test]
    fn expiry_is_issue_time_plus_lifetime() {
        let keys = make_keys("dev-secret", Algorithm::HS256);
        let token = keys.issue_token("ada@example.com").unwrap();
        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"dev-secret"),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();
        assert_eq!(data.claims.exp - data.claims.iat, 3600);
    }

    #[test]
    fn out_of_range_lifetime_is_an_error() {
        let keys = JwtKeys::from_config(&JwtConfig {
            secret: "dev-secret".into(),
            algorithm: Algorithm::HS256,
            expiration_hours: i64::MAX,
        });
        assert!(keys.issue_token("ada@example.com").is_err());
    }

    #[test]
    fn rejects_expired_token_with_valid_signature() {
        let keys = make_keys("dev-secret", Algorithm::HS256);
        let token = sign_raw(
            json!({"sub": "ada@example.com", "iat": now() - 7200, "exp": now() - 10}),
            "dev-secret",
        );
        assert_eq!(keys.verify_token(&token), Err(AuthError));
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let issuer = make_keys("secret-1", Algorithm::HS256);
        let verifier = make_keys("secret-2", Algorithm::HS256);
        let token = issuer.issue_token("ada@example.com").unwrap();
        assert_eq!(verifier.verify_token(&token), Err(AuthError));
    }

    #[test]
    fn rejects_token_with_other_algorithm() {
        let issuer = make_keys("same-secret", Algorithm::HS512);
        let verifier = make_keys("same-secret", Algorithm::HS256);
        let token = issuer.issue_token("ada@example.com").unwrap();
        assert_eq!(verifier.verify_token(&token), Err(AuthError));
    }

    #[test]
    fn rejects_missing_or_empty_subject() {
        let keys = make_keys("dev-secret", Algorithm::HS256);
        let no_sub = sign_raw(json!({"exp": now() + 600}), "dev-secret");
        assert_eq!(keys.verify_token(&no_sub), Err(AuthError));
        let empty_sub = sign_raw(json!({"sub": "", "iat": now(), "exp": now() + 600}), "dev-secret");
        assert_eq!(keys.verify_token(&empty_sub), Err(AuthError));
    }

    #[test]
    fn rejects_garbage() {
        let keys = make_keys("dev-secret", Algorithm::HS256);
        assert_eq!(keys.verify_token("garbage"), Err(AuthError));
        assert_eq!(keys.verify_token(""), Err(AuthError));
    }
}
