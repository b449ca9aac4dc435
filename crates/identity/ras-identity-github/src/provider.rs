//! GitHub implementation of the host's provider lifecycle.

use crate::client::GithubClient;
use crate::config::{GithubConfig, OAuthClientConfig, ValidatedConfig};
use crate::error::GithubError;
use crate::linker::IdentityLinker;
use crate::state::StateToken;
use crate::types::GithubUser;
use async_trait::async_trait;
use axum::http::StatusCode;
use axum::http::header::LOCATION;
use axum::response::{IntoResponse, Response};
use ras_identity_core::{
    AuthContext, AuthRequest, AuthorizeFuture, IdentityError, IdentityProvider, IdentityResult,
    IdentityStore, Principal,
};
use reqwest::Client;
use std::sync::Arc;
use tracing::{error, info};
use url::Url;

pub const PROVIDER_NAME: &str = "github";

/// Replaces identity linking once the state, code and profile have been
/// verified.
#[async_trait]
pub trait AuthorizeHandler<S: IdentityStore>: Send + Sync {
    async fn authorize(
        &self,
        request: &AuthRequest,
        context: &AuthContext<S>,
        profile: &GithubUser,
    ) -> IdentityResult<Principal<S::User>>;
}

pub struct GithubProvider<S: IdentityStore> {
    config: GithubConfig,
    authorize_url: Url,
    token_url: Url,
    client: GithubClient,
    authorize_handler: Option<Arc<dyn AuthorizeHandler<S>>>,
}

impl<S: IdentityStore> GithubProvider<S> {
    /// Fails with [`IdentityError::ConfigError`] when credentials are blank or
    /// an endpoint is not an absolute URL.
    pub fn new(config: GithubConfig) -> IdentityResult<Self> {
        let ValidatedConfig {
            config,
            authorize_url,
            token_url,
        } = config.validated()?;

        let http_client = Client::builder().build().map_err(|e| {
            IdentityError::ConfigError(format!("failed to create HTTP client: {}", e))
        })?;
        let client = GithubClient::new(http_client, &config.user_url, &config.user_agent);

        Ok(Self {
            config,
            authorize_url,
            token_url,
            client,
            authorize_handler: None,
        })
    }

    pub fn with_authorize_handler(mut self, handler: Arc<dyn AuthorizeHandler<S>>) -> Self {
        self.authorize_handler = Some(handler);
        self
    }

    /// Use a host-configured client, e.g. one with timeouts or a proxy.
    pub fn with_http_client(mut self, http_client: Client) -> Self {
        self.client = GithubClient::new(http_client, &self.config.user_url, &self.config.user_agent);
        self
    }

    pub fn config(&self) -> &GithubConfig {
        &self.config
    }

    /// Client settings for this request. Without a configured redirect URL
    /// the callback route on the requesting host is used.
    pub fn oauth_config(&self, request: &AuthRequest, context: &AuthContext<S>) -> OAuthClientConfig {
        let redirect_url = match &self.config.redirect_url {
            Some(url) => url.clone(),
            None => format!(
                "{}://{}{}",
                request.scheme.as_deref().unwrap_or("http"),
                request.host,
                context.auth_url(&format!("{}/callback", PROVIDER_NAME))
            ),
        };

        OAuthClientConfig {
            client_id: self.config.client_id.clone(),
            client_secret: self.config.client_secret.clone(),
            authorize_url: self.authorize_url.clone(),
            token_url: self.token_url.clone(),
            redirect_url,
            scopes: self.config.scopes.clone(),
        }
    }

    /// Callback work: verify state, redeem the code, fetch the profile and
    /// resolve the principal.
    pub async fn authorize(
        &self,
        request: &AuthRequest,
        context: &AuthContext<S>,
    ) -> IdentityResult<Principal<S::User>> {
        let state = request.query_param("state").unwrap_or_default();
        StateToken::verify(state, context.signing())?;

        if let Some(error) = request.query_param("error") {
            let description = request.query_param("error_description").unwrap_or("No description");
            error!("GitHub callback error: {}: {}", error, description);
            return Err(GithubError::CallbackError(format!("{}: {}", error, description)).into());
        }

        let code = request
            .query_param("code")
            .filter(|code| !code.is_empty())
            .ok_or(GithubError::MissingAuthorizationCode)?;

        let oauth_config = self.oauth_config(request, context);
        let token = self.client.exchange(&oauth_config, code).await?;
        let profile = self.client.fetch_profile(&token.access_token).await?;

        match &self.authorize_handler {
            Some(handler) => handler.authorize(request, context, &profile).await,
            None => IdentityLinker::link(context.store(), PROVIDER_NAME, &profile.uid()).await,
        }
    }
}

#[async_trait]
impl<S: IdentityStore> IdentityProvider<S> for GithubProvider<S> {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn login(&self, request: &AuthRequest, context: &AuthContext<S>) -> Response {
        // A signing failure leaves the state empty and the callback rejects it.
        let state = StateToken::mint(context.signing(), self.config.state_ttl_seconds)
            .unwrap_or_default();

        let url = self.oauth_config(request, context).authorization_url(&state);
        info!("Started OAuth2 flow for provider: {}", PROVIDER_NAME);

        (StatusCode::FOUND, [(LOCATION, url.to_string())]).into_response()
    }

    async fn callback(&self, request: &AuthRequest, context: &AuthContext<S>) -> Response {
        let authorize: AuthorizeFuture<'_, S::User> = Box::pin(self.authorize(request, context));
        context.login_handler().handle(request, authorize).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AUTHORIZE_URL;
    use crate::tests::support::test_context;
    use ras_identity_core::InMemoryIdentityStore;
    use std::collections::HashMap;

    fn provider(config: GithubConfig) -> GithubProvider<InMemoryIdentityStore> {
        GithubProvider::new(config).unwrap()
    }

    fn location(response: &Response) -> Url {
        let location = response.headers().get(LOCATION).unwrap().to_str().unwrap();
        Url::parse(location).unwrap()
    }

    #[test]
    fn test_missing_credentials_fail_construction() {
        for config in [GithubConfig::new("", "y"), GithubConfig::new("x", "")] {
            let result = GithubProvider::<InMemoryIdentityStore>::new(config);
            assert!(matches!(result, Err(IdentityError::ConfigError(_))));
        }
    }

    #[test]
    fn test_invalid_endpoint_fails_construction() {
        let result = GithubProvider::<InMemoryIdentityStore>::new(
            GithubConfig::new("x", "y").with_authorize_url("github.com/login"),
        );

        match result {
            Err(IdentityError::ConfigError(message)) => {
                assert!(message.contains("authorize_url"))
            }
            Err(other) => panic!("Expected ConfigError, got: {:?}", other),
            Ok(_) => panic!("Expected ConfigError, got a provider"),
        }
    }

    #[test]
    fn test_redirect_derived_from_request() {
        let context = test_context(InMemoryIdentityStore::new());
        let provider = provider(GithubConfig::new("x", "y"));

        let plain = provider.oauth_config(&AuthRequest::new("localhost:3000"), &context);
        assert_eq!(plain.redirect_url, "http://localhost:3000/auth/github/callback");

        let secure = provider.oauth_config(
            &AuthRequest::new("example.com").with_scheme("https"),
            &context,
        );
        assert_eq!(secure.redirect_url, "https://example.com/auth/github/callback");
    }

    #[test]
    fn test_redirect_follows_auth_prefix() {
        let context = test_context(InMemoryIdentityStore::new()).with_auth_prefix("/accounts/");
        let provider = provider(GithubConfig::new("x", "y"));

        let oauth = provider.oauth_config(&AuthRequest::new("localhost"), &context);
        assert_eq!(oauth.redirect_url, "http://localhost/accounts/github/callback");
    }

    #[test]
    fn test_configured_redirect_is_used_verbatim() {
        let context = test_context(InMemoryIdentityStore::new());
        let provider = provider(
            GithubConfig::new("x", "y").with_redirect_url("https://app.example.com/cb"),
        );

        let oauth = provider.oauth_config(&AuthRequest::new("localhost:3000"), &context);
        assert_eq!(oauth.redirect_url, "https://app.example.com/cb");
        assert_eq!(oauth.authorize_url.as_str(), AUTHORIZE_URL);
    }

    #[tokio::test]
    async fn test_login_redirects_with_signed_state() {
        let context = test_context(InMemoryIdentityStore::new());
        let provider = provider(GithubConfig::new("x", "y").with_scopes(["read:user"]));

        let response = provider
            .login(&AuthRequest::new("localhost:3000"), &context)
            .await;
        assert_eq!(response.status(), StatusCode::FOUND);

        let url = location(&response);
        assert_eq!(url.host_str(), Some("github.com"));

        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params.get("client_id").map(String::as_str), Some("x"));
        assert_eq!(params.get("scope").map(String::as_str), Some("read:user"));
        assert_eq!(
            params.get("redirect_uri").map(String::as_str),
            Some("http://localhost:3000/auth/github/callback")
        );

        let state = params.get("state").unwrap();
        assert!(StateToken::verify(state, context.signing()).is_ok());
    }

    #[tokio::test]
    async fn test_register_is_login() {
        let context = test_context(InMemoryIdentityStore::new());
        let provider = provider(GithubConfig::new("x", "y"));

        let response = provider
            .register(&AuthRequest::new("localhost:3000"), &context)
            .await;
        assert_eq!(response.status(), StatusCode::FOUND);

        let url = location(&response);
        assert_eq!(url.path(), "/login/oauth/authorize");
        assert!(!url.query_pairs().any(|(key, _)| key == "scope"));
    }

    #[tokio::test]
    async fn test_logout_and_serve_http_are_no_ops() {
        let store = InMemoryIdentityStore::new();
        let context = test_context(store.clone());
        let provider = provider(GithubConfig::new("x", "y"));
        let request = AuthRequest::new("localhost:3000");

        assert_eq!(provider.logout(&request, &context).await.status(), StatusCode::OK);
        assert_eq!(provider.serve_http(&request, &context).await.status(), StatusCode::OK);
        assert_eq!(store.identity_count().await, 0);
    }
}
