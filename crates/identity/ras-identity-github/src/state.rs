//! Signed, stateless CSRF tokens carried through the OAuth `state` parameter.

use crate::provider::PROVIDER_NAME;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Header, Validation, decode, decode_header, encode};
use ras_identity_core::{IdentityError, IdentityResult, StateSigning};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

/// Subject every state token carries.
pub const STATE_SUBJECT: &str = "state";

/// Absent claims decode as defaults so validation reports them as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateClaims {
    pub sub: String,
    /// Name of the provider that minted the token.
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

pub struct StateToken;

impl StateToken {
    pub fn mint(signing: &StateSigning, ttl_seconds: u64) -> IdentityResult<String> {
        let iat = Utc::now().timestamp();
        let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
        let claims = StateClaims {
            sub: STATE_SUBJECT.to_string(),
            aud: PROVIDER_NAME.to_string(),
            iat,
            exp: iat.saturating_add(ttl),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::new(signing.algorithm()),
            &claims,
            &signing.encoding_key(),
        )
        .map_err(signing_failed)
    }

    /// Accepts only tokens signed with exactly the configured algorithm and
    /// secret, minted for this provider, carrying the `state` subject and not
    /// yet expired.
    pub fn verify(token: &str, signing: &StateSigning) -> IdentityResult<StateClaims> {
        let expected = signing.algorithm();
        let found = match decode_header(token) {
            Ok(header) => format!("{:?}", header.alg),
            Err(e) => match header_alg(token) {
                Some(alg) => alg,
                None => return Err(IdentityError::MalformedState(e)),
            },
        };
        if found != format!("{:?}", expected) {
            warn!(
                "Rejected state token signed with {}, expected {:?}",
                found, expected
            );
            return Err(IdentityError::UnexpectedSigningMethod { expected, found });
        }

        let mut validation = Validation::new(expected);
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);
        validation.sub = Some(STATE_SUBJECT.to_string());
        validation.set_audience(&[PROVIDER_NAME]);

        match decode::<StateClaims>(token, &signing.decoding_key(), &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidSubject
                | ErrorKind::InvalidAudience
                | ErrorKind::MissingRequiredClaim(_)
                | ErrorKind::ExpiredSignature
                | ErrorKind::ImmatureSignature => {
                    warn!("Rejected state token: {}", e);
                    Err(IdentityError::Unauthorized)
                }
                _ => Err(IdentityError::MalformedState(e)),
            },
        }
    }
}

fn signing_failed(e: jsonwebtoken::errors::Error) -> IdentityError {
    error!("Failed to sign state token: {}", e);
    IdentityError::SigningError(e)
}

/// Raw `alg` of a header the JWT library refused to parse.
fn header_alg(token: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct RawHeader {
        alg: String,
    }

    let segment = token.split('.').next()?;
    let bytes = URL_SAFE_NO_PAD.decode(segment).ok()?;
    serde_json::from_slice::<RawHeader>(&bytes)
        .ok()
        .map(|header| header.alg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{Algorithm, EncodingKey};

    fn signing(algorithm: Algorithm, secret: &str) -> StateSigning {
        StateSigning::new(algorithm, secret).unwrap()
    }

    fn encode_raw(claims: serde_json::Value, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn live_claims() -> serde_json::Value {
        serde_json::json!({
            "sub": STATE_SUBJECT,
            "aud": PROVIDER_NAME,
            "exp": Utc::now().timestamp() + 600
        })
    }

    #[test]
    fn test_mint_then_verify() {
        for algorithm in [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512] {
            let signing = signing(algorithm, "secret");
            let token = StateToken::mint(&signing, 600).unwrap();

            let claims = StateToken::verify(&token, &signing).unwrap();
            assert_eq!(claims.sub, STATE_SUBJECT);
            assert_eq!(claims.aud, PROVIDER_NAME);
            assert_eq!(claims.exp - claims.iat, 600);
        }
    }

    #[test]
    fn test_tokens_are_unique() {
        let signing = signing(Algorithm::HS256, "secret");
        let first = StateToken::mint(&signing, 600).unwrap();
        let second = StateToken::mint(&signing, 600).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_other_secret_is_unauthorized() {
        let token = StateToken::mint(&signing(Algorithm::HS256, "secret"), 600).unwrap();
        let result = StateToken::verify(&token, &signing(Algorithm::HS256, "other"));

        assert!(matches!(result, Err(IdentityError::Unauthorized)));
    }

    #[test]
    fn test_other_algorithm_is_unexpected() {
        let token = StateToken::mint(&signing(Algorithm::HS256, "secret"), 600).unwrap();
        let result = StateToken::verify(&token, &signing(Algorithm::HS512, "secret"));

        match result {
            Err(IdentityError::UnexpectedSigningMethod { expected, found }) => {
                assert_eq!(expected, Algorithm::HS512);
                assert_eq!(found, "HS256");
            }
            other => panic!("Expected UnexpectedSigningMethod, got: {:?}", other),
        }
    }

    #[test]
    fn test_unsigned_state_is_unexpected_signing_method() {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(live_claims().to_string());
        let token = format!("{}.{}.", header, payload);

        let result = StateToken::verify(&token, &signing(Algorithm::HS256, "secret"));

        match result {
            Err(IdentityError::UnexpectedSigningMethod { expected, found }) => {
                assert_eq!(expected, Algorithm::HS256);
                assert_eq!(found, "none");
            }
            other => panic!("Expected UnexpectedSigningMethod, got: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_subject_is_unauthorized() {
        let mut claims = live_claims();
        claims["sub"] = "session".into();
        let token = encode_raw(claims, "secret");

        let result = StateToken::verify(&token, &signing(Algorithm::HS256, "secret"));
        assert!(matches!(result, Err(IdentityError::Unauthorized)));
    }

    #[test]
    fn test_missing_subject_is_unauthorized() {
        let mut claims = live_claims();
        claims.as_object_mut().unwrap().remove("sub");
        let token = encode_raw(claims, "secret");

        let result = StateToken::verify(&token, &signing(Algorithm::HS256, "secret"));
        assert!(matches!(result, Err(IdentityError::Unauthorized)));
    }

    #[test]
    fn test_other_provider_state_is_unauthorized() {
        let mut claims = live_claims();
        claims["aud"] = "gitlab".into();
        let foreign = encode_raw(claims, "secret");

        let mut claims = live_claims();
        claims.as_object_mut().unwrap().remove("aud");
        let unbound = encode_raw(claims, "secret");

        let signing = signing(Algorithm::HS256, "secret");
        for token in [foreign, unbound] {
            let result = StateToken::verify(&token, &signing);
            assert!(matches!(result, Err(IdentityError::Unauthorized)));
        }
    }

    #[test]
    fn test_expired_token_is_unauthorized() {
        let now = Utc::now().timestamp();
        let token = encode_raw(
            serde_json::json!({
                "sub": STATE_SUBJECT,
                "aud": PROVIDER_NAME,
                "iat": now - 7200,
                "exp": now - 3600,
                "jti": "old"
            }),
            "secret",
        );

        let result = StateToken::verify(&token, &signing(Algorithm::HS256, "secret"));
        assert!(matches!(result, Err(IdentityError::Unauthorized)));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let signing = signing(Algorithm::HS256, "secret");

        for token in ["", "not-a-jwt", "a.b.c"] {
            let result = StateToken::verify(token, &signing);
            assert!(
                matches!(result, Err(IdentityError::MalformedState(_))),
                "token {:?} gave {:?}",
                token,
                result
            );
        }
    }

    #[test]
    fn test_signing_failure_is_signing_error() {
        let error = signing_failed(ErrorKind::InvalidKeyFormat.into());

        assert!(matches!(
            error,
            IdentityError::SigningError(ref source)
                if matches!(source.kind(), ErrorKind::InvalidKeyFormat)
        ));
    }
}
