//! Signed session tokens.
//!
//! Tokens are stateless HS256 JWTs binding a user identity; the server
//! never stores them. The token carries identity only, and authorization
//! is re-read from storage on every call via [`is_admin`], so privilege
//! changes take effect immediately. The flip side of statelessness is
//! documented in [`clear_session_cookie`]: there is no server-side
//! revocation, a stolen token stays valid until its natural expiry.

pub mod password;

use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::db::models::User;
use crate::db::{MapperError, Repository};

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("session signing key is not configured")]
    MissingKey,

    #[error("token generation failed: {0}")]
    Signing(String),

    #[error("invalid session token")]
    Invalid,

    #[error("session token expired")]
    Expired,

    #[error("unexpected token signing algorithm")]
    WrongAlgorithm,

    #[error("unknown user or wrong password")]
    BadCredentials,

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// The custom-claims object embedded in every session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub uid: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iat: i64,
    exp: i64,
    custom: SessionClaims,
}

/// Issues and verifies session tokens with one symmetric key and one
/// pinned MAC algorithm. Read-only after startup; shared across handlers.
pub struct SessionService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl SessionService {
    pub fn new(secret: &str, lifetime: Duration) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::MissingKey);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        })
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime.num_seconds()
    }

    /// Sign a token for the given claims, valid from now until now plus
    /// the configured session lifetime.
    pub fn issue(&self, claims: SessionClaims) -> Result<String, AuthError> {
        let now = Utc::now();
        let payload = Claims {
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
            custom: claims,
        };

        encode(&Header::new(Algorithm::HS256), &payload, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verify signature, algorithm and expiry, then extract the user id.
    ///
    /// A token signed with any algorithm other than HS256 is rejected
    /// before its payload is trusted, even if otherwise well-formed.
    pub fn verify(&self, token: &str) -> Result<i64, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Ok(data.claims.custom.uid),
            Err(err) => Err(match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidAlgorithm => AuthError::WrongAlgorithm,
                _ => AuthError::Invalid,
            }),
        }
    }
}

/// Current admin flag for `uid`, read fresh from storage.
///
/// Missing or ambiguous users are reported as non-admin rather than an
/// error; callers that also need existence (the welcome handler, which
/// clears the cookie for a vanished user) select the row themselves and
/// read the flag from it instead of calling this.
pub async fn is_admin(users: &Repository<User>, uid: i64) -> Result<bool, MapperError> {
    let rows = users.select("\"uid\" = $1 LIMIT 1", &[json!(uid)]).await?;
    Ok(rows.first().map(|u| u.admin).unwrap_or(false))
}

/// Session cookie carrying a freshly issued token.
pub fn session_cookie(token: String, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

/// Instruct the client to discard the session: same cookie name, epoch
/// expiry. This is the whole of logout; no server-side state changes.
pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .expires(time::OffsetDateTime::UNIX_EPOCH)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(lifetime: Duration) -> SessionService {
        SessionService::new("test-signature", lifetime).unwrap()
    }

    #[test]
    fn empty_secret_is_refused() {
        assert!(matches!(
            SessionService::new("", Duration::hours(1)),
            Err(AuthError::MissingKey)
        ));
    }

    #[test]
    fn issued_tokens_verify_to_the_same_uid() {
        let sessions = service(Duration::hours(24));
        for uid in [1, 42, i64::MAX] {
            let token = sessions.issue(SessionClaims { uid }).unwrap();
            assert_eq!(sessions.verify(&token).unwrap(), uid);
        }
    }

    #[test]
    fn expired_tokens_are_reported_as_expired() {
        let sessions = service(Duration::seconds(-60));
        let token = sessions.issue(SessionClaims { uid: 7 }).unwrap();
        assert!(matches!(sessions.verify(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn foreign_algorithm_is_rejected_even_with_the_right_key() {
        let sessions = service(Duration::hours(1));
        let payload = Claims {
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
            custom: SessionClaims { uid: 7 },
        };
        let forged = encode(
            &Header::new(Algorithm::HS384),
            &payload,
            &EncodingKey::from_secret(b"test-signature"),
        )
        .unwrap();
        assert!(matches!(
            sessions.verify(&forged),
            Err(AuthError::WrongAlgorithm)
        ));
    }

    #[test]
    fn tampered_tokens_are_invalid() {
        let sessions = service(Duration::hours(1));
        let mut token = sessions.issue(SessionClaims { uid: 7 }).unwrap();
        token.push('x');
        assert!(matches!(sessions.verify(&token), Err(AuthError::Invalid)));
        assert!(matches!(sessions.verify("not-a-jwt"), Err(AuthError::Invalid)));
    }

    #[test]
    fn tokens_signed_with_another_key_are_invalid() {
        let sessions = service(Duration::hours(1));
        let other = SessionService::new("other-signature", Duration::hours(1)).unwrap();
        let token = other.issue(SessionClaims { uid: 7 }).unwrap();
        assert!(matches!(sessions.verify(&token), Err(AuthError::Invalid)));
    }

    #[test]
    fn cookie_surface_matches_the_contract() {
        let cookie = session_cookie("tok".to_string(), 3600);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert!(cookie.http_only().unwrap_or(false));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(3600)));

        let cleared = clear_session_cookie();
        assert_eq!(cleared.name(), SESSION_COOKIE);
        assert_eq!(cleared.value(), "");
    }
}
