//! Core traits and types shared by pluggable identity providers.
//!
//! A host application supplies an [`AuthContext`]: an [`IdentityStore`] for
//! linking external accounts to local records, the secret used for signing
//! state tokens, and a [`LoginHandler`] that turns a provider's result into a
//! response. Providers implement [`IdentityProvider`] and are mounted with
//! [`auth_router`].

mod context;
mod error;
mod provider;
mod router;
mod store;

pub use context::{
    AuthContext, AuthRequest, AuthorizeFuture, DEFAULT_AUTH_PREFIX, LoginHandler, StateSigning,
};
pub use error::{IdentityError, IdentityResult, StoreError, StoreResult};
pub use provider::IdentityProvider;
pub use router::auth_router;
pub use store::{
    AuthInfo, IdentityStore, InMemoryIdentityStore, LocalUser, Principal, StoredUser,
};

// Re-exported so providers and hosts agree on the algorithm type.
pub use jsonwebtoken::Algorithm;
