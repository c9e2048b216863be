//! JWT Token handling

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::domain::{DomainError, DomainResult};

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Token expiration time in hours
    pub expiration_hours: i64,
    /// Issuer claim
    pub issuer: String,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("expiration_hours", &self.expiration_hours)
            .field("issuer", &self.issuer)
            .finish()
    }
}

/// JWT TokenClaims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Display name
    pub name: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
}

/// A freshly minted token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// Lifetime in seconds from issuance.
    pub expires_in: i64,
}

/// Identity a valid token is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub user_id: i64,
    pub name: String,
}

/// Mints and verifies session tokens.
///
/// Keys are derived once from the configuration and shared read-only between
/// requests.
pub struct JwtIssuer {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtIssuer {
    pub fn new(config: JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            config,
        }
    }

    /// Create a token bound to `user_id` and `name`.
    pub fn issue(&self, user_id: i64, name: &str) -> DomainResult<IssuedToken> {
        if self.config.secret.is_empty() {
            error!("Refusing to sign token: signing secret is not configured");
            return Err(DomainError::Signing("signing secret is not configured".into()));
        }

        let hours = self.config.expiration_hours;
        let now = Utc::now();
        let (expires_at, expires_in) = Duration::try_hours(hours)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .zip(hours.checked_mul(3600))
            .ok_or_else(|| {
                error!(expiration_hours = hours, "Token lifetime out of range");
                DomainError::Signing(format!("token lifetime of {}h is out of range", hours))
            })?;
        let claims = TokenClaims {
            sub: user_id.to_string(),
            name: name.to_string(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| {
                error!(error = %e, user_id, "Token encoding failed");
                DomainError::Signing(e.to_string())
            })?;

        Ok(IssuedToken {
            token,
            expires_at,
            expires_in,
        })
    }

    /// Verify signature, issuer and expiry; return the bound identity.
    pub fn verify(&self, token: &str) -> DomainResult<VerifiedIdentity> {
        if self.config.secret.is_empty() {
            return Err(DomainError::InvalidToken);
        }

        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => DomainError::ExpiredToken,
                _ => {
                    debug!(error = %e, "Token rejected");
                    DomainError::InvalidToken
                }
            },
        )?;

        let user_id = data
            .claims
            .sub
            .parse::<i64>()
            .map_err(|_| DomainError::InvalidToken)?;

        Ok(VerifiedIdentity {
            user_id,
            name: data.claims.name,
        })
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> JwtConfig {
    JwtConfig {
        secret: "test-secret-key-with-enough-entropy-1234".to_string(),
        expiration_hours: 24,
        issuer: "identity-service".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_returns_the_bound_identity() {
        let issuer = JwtIssuer::new(test_config());
        let issued = issuer.issue(42, "alice").unwrap();

        let identity = issuer.verify(&issued.token).unwrap();
        assert_eq!(
            identity,
            VerifiedIdentity {
                user_id: 42,
                name: "alice".to_string()
            }
        );
        assert_eq!(issued.expires_in, 24 * 3600);
        assert!(issued.expires_at > Utc::now());
    }

    #[test]
    fn garbage_is_invalid() {
        let issuer = JwtIssuer::new(test_config());
        assert_eq!(issuer.verify("invalid-token"), Err(DomainError::InvalidToken));
    }

    #[test]
    fn tampered_token_is_invalid() {
        let issuer = JwtIssuer::new(test_config());
        let victim = issuer.issue(1, "a").unwrap();
        let attacker = issuer.issue(2, "b").unwrap();

        // Victim's header and signature around the attacker's claims.
        let victim_parts: Vec<&str> = victim.token.split('.').collect();
        let attacker_parts: Vec<&str> = attacker.token.split('.').collect();
        let tampered = format!(
            "{}.{}.{}",
            victim_parts[0], attacker_parts[1], victim_parts[2]
        );

        assert_eq!(issuer.verify(&tampered), Err(DomainError::InvalidToken));
    }

    #[test]
    fn token_from_another_secret_is_invalid() {
        let ours = JwtIssuer::new(test_config());
        let theirs = JwtIssuer::new(JwtConfig {
            secret: "some-other-secret".to_string(),
            ..test_config()
        });

        let issued = theirs.issue(1, "a").unwrap();
        assert_eq!(ours.verify(&issued.token), Err(DomainError::InvalidToken));
    }

    #[test]
    fn token_from_another_issuer_is_invalid() {
        let ours = JwtIssuer::new(test_config());
        let theirs = JwtIssuer::new(JwtConfig {
            issuer: "someone-else".to_string(),
            ..test_config()
        });

        let issued = theirs.issue(1, "a").unwrap();
        assert_eq!(ours.verify(&issued.token), Err(DomainError::InvalidToken));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let expired = JwtIssuer::new(JwtConfig {
            expiration_hours: -2,
            ..test_config()
        });
        let issued = expired.issue(1, "a").unwrap();

        let issuer = JwtIssuer::new(test_config());
        assert_eq!(issuer.verify(&issued.token), Err(DomainError::ExpiredToken));
    }

    #[test]
    fn non_numeric_subject_is_invalid() {
        let config = test_config();
        let claims = TokenClaims {
            sub: "not-a-number".to_string(),
            name: "a".to_string(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
            iat: Utc::now().timestamp(),
            iss: config.issuer.clone(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();

        let issuer = JwtIssuer::new(config);
        assert_eq!(issuer.verify(&token), Err(DomainError::InvalidToken));
    }

    #[test]
    fn missing_secret_is_a_signing_fault() {
        let issuer = JwtIssuer::new(JwtConfig {
            secret: String::new(),
            ..test_config()
        });

        let err = issuer.issue(1, "a").unwrap_err();
        assert!(matches!(err, DomainError::Signing(_)));
    }

    #[test]
    fn out_of_range_lifetime_is_a_signing_fault() {
        for hours in [10_000_000_000, i64::MAX] {
            let issuer = JwtIssuer::new(JwtConfig {
                expiration_hours: hours,
                ..test_config()
            });

            let err = issuer.issue(1, "a").unwrap_err();
            assert!(matches!(err, DomainError::Signing(_)), "hours = {}", hours);
        }
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let rendered = format!("{:?}", test_config());
        assert!(!rendered.contains("entropy"));
    }
}
