//! Axum routes for a single provider.

use crate::context::{AuthContext, AuthRequest};
use crate::provider::IdentityProvider;
use crate::store::IdentityStore;
use axum::Router;
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use std::sync::Arc;
use tracing::debug;

struct ProviderState<S: IdentityStore, P> {
    provider: Arc<P>,
    context: Arc<AuthContext<S>>,
}

impl<S: IdentityStore, P> Clone for ProviderState<S, P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            context: self.context.clone(),
        }
    }
}

/// Mounts `/{name}/login`, `/{name}/register`, `/{name}/callback` and
/// `/{name}/logout`. Nest the result under the context's auth prefix.
pub fn auth_router<S, P>(provider: Arc<P>, context: Arc<AuthContext<S>>) -> Router
where
    S: IdentityStore,
    P: IdentityProvider<S>,
{
    let name = provider.name().to_string();
    debug!("Mounting auth routes for provider {}", name);

    Router::new()
        .route(&format!("/{}/login", name), get(login::<S, P>))
        .route(&format!("/{}/register", name), get(register::<S, P>))
        .route(&format!("/{}/callback", name), get(callback::<S, P>))
        .route(&format!("/{}/logout", name), get(logout::<S, P>))
        .with_state(ProviderState { provider, context })
}

async fn login<S: IdentityStore, P: IdentityProvider<S>>(
    State(state): State<ProviderState<S, P>>,
    request: AuthRequest,
) -> Response {
    state.provider.login(&request, &state.context).await
}

async fn register<S: IdentityStore, P: IdentityProvider<S>>(
    State(state): State<ProviderState<S, P>>,
    request: AuthRequest,
) -> Response {
    state.provider.register(&request, &state.context).await
}

async fn callback<S: IdentityStore, P: IdentityProvider<S>>(
    State(state): State<ProviderState<S, P>>,
    request: AuthRequest,
) -> Response {
    state.provider.callback(&request, &state.context).await
}

async fn logout<S: IdentityStore, P: IdentityProvider<S>>(
    State(state): State<ProviderState<S, P>>,
    request: AuthRequest,
) -> Response {
    state.provider.logout(&request, &state.context).await
}
