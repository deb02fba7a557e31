//! Hosted auth service (GoTrue-compatible).
//!
//! The site never stores passwords. Sign-in, refresh and account creation go
//! to the hosted service; what comes back is a [`Session`] that lives in the
//! `opal-auth-token` cookie.
//!
//! # Passive and active operations
//!
//! [`SessionStore::read_session`] is passive: it decodes the cookie and checks
//! the access token's signature and expiry locally, with no network call.
//! Every other method talks to the service. [`SessionStore::refresh_session`]
//! redeems a refresh token and must only be called through the
//! [`RefreshCoordinator`], which the edge interceptor owns.

pub mod cookie;
mod error;
pub mod refresh;

pub use cookie::{AUTH_COOKIE, decode_session, encode_session};
pub use error::AuthError;
pub use refresh::RefreshCoordinator;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, errors::ErrorKind};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use opal_core::{Email, UserId};

use crate::config::SupabaseConfig;
use crate::models::{AuthUser, Session};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Audience the auth service puts in user access tokens.
const TOKEN_AUDIENCE: &str = "authenticated";

/// Result of a passive session read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRead {
    /// The cookie holds a session whose access token verifies and has not expired.
    Valid(Session),
    /// The access token has expired; the refresh token may still be redeemable.
    Expired { refresh_token: String },
    /// No cookie, or one that does not decode or verify.
    Absent,
}

/// The hosted auth service.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Decode and verify a session cookie value without any network call.
    fn read_session(&self, cookie_value: &str) -> SessionRead;

    /// Validate an access token with the service and return its user.
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError>;

    /// Redeem a refresh token for a new session. The old token stops working.
    ///
    /// Only the [`RefreshCoordinator`] may call this.
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError>;

    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Session, AuthError>;

    /// Revoke the session's refresh tokens.
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    /// Create a confirmed account. Needs the service-role credential.
    async fn create_user(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthUser, AuthError>;
}

/// Validate a password before sending it anywhere.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is shorter than
/// [`MIN_PASSWORD_LENGTH`] characters.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

// =============================================================================
// Local token verification
// =============================================================================

#[derive(Debug, Deserialize)]
struct AccessClaims {
    sub: UserId,
    #[serde(default)]
    email: Option<String>,
    exp: i64,
}

/// Verifies access tokens against the project's JWT secret.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    #[must_use]
    pub fn new(jwt_secret: &SecretString) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[TOKEN_AUDIENCE]);
        validation.leeway = 0;

        Self {
            key: DecodingKey::from_secret(jwt_secret.expose_secret().as_bytes()),
            validation,
        }
    }

    /// Classify a decoded cookie session.
    ///
    /// The token's claims are authoritative: a cookie whose user does not
    /// match its token's subject is treated as absent.
    #[must_use]
    pub fn classify(&self, session: Session) -> SessionRead {
        match jsonwebtoken::decode::<AccessClaims>(&session.access_token, &self.key, &self.validation)
        {
            Ok(data) => {
                let claims = data.claims;
                if claims.sub != session.user.id {
                    tracing::warn!(user_id = %session.user.id, "Session cookie user does not match token");
                    return SessionRead::Absent;
                }
                let expires_at =
                    DateTime::from_timestamp(claims.exp, 0).unwrap_or(session.expires_at);
                SessionRead::Valid(Session {
                    expires_at,
                    user: AuthUser {
                        id: claims.sub,
                        email: claims.email.or(session.user.email),
                    },
                    ..session
                })
            }
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => SessionRead::Expired {
                refresh_token: session.refresh_token,
            },
            Err(e) => {
                tracing::debug!(error = %e, "Access token failed verification");
                SessionRead::Absent
            }
        }
    }
}

// =============================================================================
// GoTrue client
// =============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl From<TokenResponse> for Session {
    fn from(token: TokenResponse) -> Self {
        let expires_at = token
            .expires_at
            .and_then(|at| DateTime::from_timestamp(at, 0))
            .unwrap_or_else(|| Utc::now() + Duration::seconds(token.expires_in));

        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
            user: token.user,
        }
    }
}

/// Error body shapes the service uses across endpoints.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorBody {
    fn message(&self) -> String {
        self.msg
            .as_ref()
            .or(self.error_description.as_ref())
            .or(self.message.as_ref())
            .cloned()
            .unwrap_or_default()
    }

    fn is_refresh_token_reuse(&self) -> bool {
        self.error_code.as_deref() == Some("refresh_token_already_used")
            || self.message().contains("Already Used")
    }
}

/// Client for the hosted auth service's REST API.
#[derive(Clone)]
pub struct GoTrueClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
    service_role_key: Option<SecretString>,
    verifier: TokenVerifier,
}

impl GoTrueClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build or the anon key is not a valid header.
    pub fn new(config: &SupabaseConfig) -> Result<Self, AuthError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(config.anon_key.expose_secret())
                .map_err(|e| AuthError::InvalidSession(format!("invalid anon key: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: format!("{}/auth/v1", config.url.trim_end_matches('/')),
            anon_key: config.anon_key.clone(),
            service_role_key: config.service_role_key.clone(),
            verifier: TokenVerifier::new(&config.jwt_secret),
        })
    }

    fn token_url(&self, grant_type: &str) -> String {
        format!("{}/token?grant_type={grant_type}", self.base_url)
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<Session, AuthError> {
        let response = self
            .client
            .post(self.token_url(grant_type))
            .bearer_auth(self.anon_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            return Err(match grant_type {
                "refresh_token" if body.is_refresh_token_reuse() => {
                    AuthError::RefreshTokenAlreadyUsed
                }
                "password" if status == StatusCode::BAD_REQUEST => AuthError::InvalidCredentials,
                _ => AuthError::Api {
                    status: status.as_u16(),
                    message: body.message(),
                },
            });
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.into())
    }
}

#[async_trait]
impl SessionStore for GoTrueClient {
    fn read_session(&self, cookie_value: &str) -> SessionRead {
        match decode_session(cookie_value) {
            Ok(session) => self.verifier.classify(session),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring undecodable auth cookie");
                SessionRead::Absent
            }
        }
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let response = self
            .client
            .get(format!("{}/user", self.base_url))
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AuthError::Expired);
        }
        if !status.is_success() {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            return Err(AuthError::Api {
                status: status.as_u16(),
                message: body.message(),
            });
        }

        Ok(response.json().await?)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError> {
        self.token_grant(
            "refresh_token",
            serde_json::json!({ "refresh_token": refresh_token }),
        )
        .await
    }

    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Session, AuthError> {
        self.token_grant(
            "password",
            serde_json::json!({
                "email": email.as_str(),
                "password": password.expose_secret(),
            }),
        )
        .await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .client
            .post(format!("{}/logout", self.base_url))
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        // An already-expired token has nothing left to revoke.
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            return Ok(());
        }

        let body: ErrorBody = response.json().await.unwrap_or_default();
        Err(AuthError::Api {
            status: status.as_u16(),
            message: body.message(),
        })
    }

    async fn create_user(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthUser, AuthError> {
        let service_key = self
            .service_role_key
            .as_ref()
            .ok_or(AuthError::MissingServiceCredential)?;

        let response = self
            .client
            .post(format!("{}/admin/users", self.base_url))
            .header("apikey", service_key.expose_secret())
            .header(
                AUTHORIZATION,
                format!("Bearer {}", service_key.expose_secret()),
            )
            .json(&serde_json::json!({
                "email": email.as_str(),
                "password": password.expose_secret(),
                "email_confirm": true,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            if body.error_code.as_deref() == Some("email_exists") {
                return Err(AuthError::UserAlreadyExists);
            }
            return Err(AuthError::Api {
                status: status.as_u16(),
                message: body.message(),
            });
        }

        let user: AuthUser = response.json().await?;
        tracing::info!(user_id = %user.id, "Created auth account");
        Ok(user)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde::Serialize;

    use super::*;

    const SECRET: &str = "test-jwt-secret-with-enough-bytes-0123456789";

    #[derive(Serialize)]
    struct TestClaims<'a> {
        sub: UserId,
        email: &'a str,
        aud: &'a str,
        exp: i64,
    }

    fn token_for(user_id: UserId, exp: DateTime<Utc>, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &TestClaims {
                sub: user_id,
                email: "ada@opal.studio",
                aud: TOKEN_AUDIENCE,
                exp: exp.timestamp(),
            },
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn session_with(access_token: String, user_id: UserId) -> Session {
        Session {
            access_token,
            refresh_token: "refresh-1".to_string(),
            expires_at: Utc::now(),
            user: AuthUser {
                id: user_id,
                email: None,
            },
        }
    }

    #[test]
    fn test_token_url_carries_grant_type() {
        let client = GoTrueClient::new(&SupabaseConfig {
            url: "https://abc.supabase.co/".to_string(),
            anon_key: SecretString::from("anon"),
            service_role_key: None,
            jwt_secret: SecretString::from(SECRET),
        })
        .unwrap();
        assert_eq!(
            client.token_url("refresh_token"),
            "https://abc.supabase.co/auth/v1/token?grant_type=refresh_token"
        );
    }

    #[test]
    fn test_classify_valid_token() {
        let verifier = TokenVerifier::new(&SecretString::from(SECRET));
        let user_id = UserId::generate();
        let exp = Utc::now() + Duration::minutes(30);
        let session = session_with(token_for(user_id, exp, SECRET), user_id);

        let SessionRead::Valid(session) = verifier.classify(session) else {
            panic!("expected a valid session");
        };
        assert_eq!(session.user.email.as_deref(), Some("ada@opal.studio"));
        assert_eq!(session.expires_at.timestamp(), exp.timestamp());
    }

    #[test]
    fn test_classify_expired_token() {
        let verifier = TokenVerifier::new(&SecretString::from(SECRET));
        let user_id = UserId::generate();
        let session = session_with(
            token_for(user_id, Utc::now() - Duration::minutes(5), SECRET),
            user_id,
        );

        assert_eq!(
            verifier.classify(session),
            SessionRead::Expired {
                refresh_token: "refresh-1".to_string()
            }
        );
    }

    #[test]
    fn test_classify_wrong_secret_is_absent() {
        let verifier = TokenVerifier::new(&SecretString::from(SECRET));
        let user_id = UserId::generate();
        let session = session_with(
            token_for(user_id, Utc::now() + Duration::minutes(30), "another-secret-entirely"),
            user_id,
        );

        assert_eq!(verifier.classify(session), SessionRead::Absent);
    }

    #[test]
    fn test_classify_subject_mismatch_is_absent() {
        let verifier = TokenVerifier::new(&SecretString::from(SECRET));
        let session = session_with(
            token_for(UserId::generate(), Utc::now() + Duration::minutes(30), SECRET),
            UserId::generate(),
        );

        assert_eq!(verifier.classify(session), SessionRead::Absent);
    }

    #[test]
    fn test_error_body_detects_reuse() {
        let by_code = ErrorBody {
            error_code: Some("refresh_token_already_used".to_string()),
            ..Default::default()
        };
        assert!(by_code.is_refresh_token_reuse());

        let by_message = ErrorBody {
            msg: Some("Invalid Refresh Token: Already Used".to_string()),
            ..Default::default()
        };
        assert!(by_message.is_refresh_token_reuse());

        assert!(!ErrorBody::default().is_refresh_token_reuse());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long-enough").is_ok());
    }
}
