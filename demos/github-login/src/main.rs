use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use ras_identity_core::{
    Algorithm, AuthContext, AuthRequest, AuthorizeFuture, IdentityError, InMemoryIdentityStore,
    LoginHandler, StateSigning, StoredUser, auth_router,
};
use ras_identity_github::{GithubConfig, GithubProvider};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Configuration for the GitHub login demo
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub github: GithubConfig,
    pub state_secret: String,
    pub server_host: String,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let github = GithubConfig::from_env().context("invalid GitHub configuration")?;
        if github.client_id.is_empty() || github.client_secret.is_empty() {
            anyhow::bail!("GITHUB_CLIENT_ID and GITHUB_CLIENT_SECRET environment variables are required");
        }

        Ok(Self {
            github,
            state_secret: std::env::var("STATE_SECRET")
                .unwrap_or_else(|_| "change-me-in-production-please".to_string()),
            server_host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: std::env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
        })
    }
}

/// Renders the login outcome as JSON.
struct JsonLoginHandler;

#[async_trait]
impl LoginHandler<StoredUser> for JsonLoginHandler {
    async fn handle(
        &self,
        request: &AuthRequest,
        authorize: AuthorizeFuture<'_, StoredUser>,
    ) -> Response {
        match authorize.await {
            Ok(principal) => {
                info!("Login completed on {}{}", request.host, request.path);
                Json(principal).into_response()
            }
            Err(e) => {
                let status = match &e {
                    IdentityError::Unauthorized
                    | IdentityError::UnexpectedSigningMethod { .. }
                    | IdentityError::MalformedState(_) => StatusCode::UNAUTHORIZED,
                    IdentityError::InvalidAccount => StatusCode::FORBIDDEN,
                    IdentityError::IssuerError(_) => StatusCode::BAD_GATEWAY,
                    IdentityError::PersistenceError(_)
                    | IdentityError::SigningError(_)
                    | IdentityError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                error!("Login failed: {}", e);
                (status, Json(serde_json::json!({ "error": e.to_string() }))).into_response()
            }
        }
    }
}

async fn index_handler() -> Html<&'static str> {
    Html(r#"<!doctype html><a href="/auth/github/login">Sign in with GitHub</a>"#)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let _ = dotenvy::dotenv();

    let config = AppConfig::from_env()?;
    info!("Starting GitHub login demo server");

    let signing = StateSigning::new(Algorithm::HS256, &config.state_secret)
        .context("invalid STATE_SECRET")?;
    let store = Arc::new(InMemoryIdentityStore::with_user_model());
    let context = Arc::new(AuthContext::new(store, signing, Arc::new(JsonLoginHandler)));

    let provider = Arc::new(
        GithubProvider::new(config.github.clone()).context("failed to create GitHub provider")?,
    );
    info!("GitHub provider initialized");

    let app = Router::new()
        .route("/", get(index_handler))
        .nest("/auth", auth_router(provider, context));

    let bind_addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    info!("Server running on http://{}", bind_addr);
    match &config.github.redirect_url {
        Some(url) => info!("OAuth2 redirect URI: {}", url),
        None => info!("OAuth2 redirect URI derived from request host"),
    }
    warn!("Identities are kept in memory and lost on restart.");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
