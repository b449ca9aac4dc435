//! Lifecycle contract every pluggable provider exposes to the host.

use crate::context::{AuthContext, AuthRequest};
use crate::store::IdentityStore;
use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[async_trait]
pub trait IdentityProvider<S: IdentityStore>: Send + Sync + 'static {
    /// Stable short name, stored as the `provider` column of identity rows.
    fn name(&self) -> &str;

    /// Starts the flow, usually by redirecting to the issuer.
    async fn login(&self, request: &AuthRequest, context: &AuthContext<S>) -> Response;

    /// Registration happens on first login, so this defaults to [`Self::login`].
    async fn register(&self, request: &AuthRequest, context: &AuthContext<S>) -> Response {
        self.login(request, context).await
    }

    /// Completes the flow through the host's [`LoginHandler`](crate::LoginHandler).
    async fn callback(&self, request: &AuthRequest, context: &AuthContext<S>) -> Response;

    /// Session teardown belongs to the host.
    async fn logout(&self, _request: &AuthRequest, _context: &AuthContext<S>) -> Response {
        StatusCode::OK.into_response()
    }

    async fn serve_http(&self, _request: &AuthRequest, _context: &AuthContext<S>) -> Response {
        StatusCode::OK.into_response()
    }
}
