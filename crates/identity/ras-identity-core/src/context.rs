//! Per-host collaborator surface handed to providers on every request.

use crate::error::{IdentityError, IdentityResult};
use crate::store::{IdentityStore, Principal};
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::HOST;
use axum::http::request::Parts;
use axum::response::Response;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub const DEFAULT_AUTH_PREFIX: &str = "/auth";

/// The parts of an inbound request a provider looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthRequest {
    /// `None` when the request line carried no absolute URI, which is the
    /// normal case behind a server.
    pub scheme: Option<String>,
    pub host: String,
    pub path: String,
    pub query: HashMap<String, String>,
}

impl AuthRequest {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn from_parts(parts: &Parts) -> Self {
        let host = parts
            .headers
            .get(HOST)
            .and_then(|value| value.to_str().ok())
            .map(String::from)
            .or_else(|| parts.uri.authority().map(|a| a.as_str().to_string()))
            .unwrap_or_default();

        let query = parts
            .uri
            .query()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();

        Self {
            scheme: parts.uri.scheme_str().map(String::from),
            host,
            path: parts.uri.path().to_string(),
            query,
        }
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}

impl<S> FromRequestParts<S> for AuthRequest
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

/// Secret material for signing state tokens. Only HMAC algorithms are accepted.
#[derive(Clone)]
pub struct StateSigning {
    algorithm: Algorithm,
    secret: Vec<u8>,
}

impl StateSigning {
    pub fn new(algorithm: Algorithm, secret: impl AsRef<[u8]>) -> IdentityResult<Self> {
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(IdentityError::ConfigError(format!(
                "state signing requires an HMAC algorithm, got {:?}",
                algorithm
            )));
        }

        let secret = secret.as_ref().to_vec();
        if secret.is_empty() {
            return Err(IdentityError::ConfigError(
                "state signing secret can't be blank".to_string(),
            ));
        }

        Ok(Self { algorithm, secret })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(&self.secret)
    }

    pub fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(&self.secret)
    }
}

impl fmt::Debug for StateSigning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSigning")
            .field("algorithm", &self.algorithm)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// The provider's pending work on the callback path.
pub type AuthorizeFuture<'a, U> =
    Pin<Box<dyn Future<Output = IdentityResult<Principal<U>>> + Send + 'a>>;

/// Host entrypoint that drives a provider's callback work and renders the
/// outcome: typically it starts a session on success and an error page
/// otherwise.
#[async_trait]
pub trait LoginHandler<U: Send + 'static>: Send + Sync {
    async fn handle(&self, request: &AuthRequest, authorize: AuthorizeFuture<'_, U>) -> Response;
}

/// Everything a provider borrows from the host for one request.
pub struct AuthContext<S: IdentityStore> {
    store: Arc<S>,
    signing: StateSigning,
    auth_prefix: String,
    login_handler: Arc<dyn LoginHandler<S::User>>,
}

impl<S: IdentityStore> AuthContext<S> {
    pub fn new(
        store: Arc<S>,
        signing: StateSigning,
        login_handler: Arc<dyn LoginHandler<S::User>>,
    ) -> Self {
        Self {
            store,
            signing,
            auth_prefix: DEFAULT_AUTH_PREFIX.to_string(),
            login_handler,
        }
    }

    /// Path the host mounts provider routes under.
    pub fn with_auth_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.auth_prefix = prefix.into();
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn signing(&self) -> &StateSigning {
        &self.signing
    }

    pub fn login_handler(&self) -> &dyn LoginHandler<S::User> {
        self.login_handler.as_ref()
    }

    /// Host-relative path for a provider route, e.g. `github/callback`.
    pub fn auth_url(&self, suffix: &str) -> String {
        format!(
            "{}/{}",
            self.auth_prefix.trim_end_matches('/'),
            suffix.trim_start_matches('/')
        )
    }
}
