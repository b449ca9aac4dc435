//! Joins an authenticated external account with local identity and user rows.

use ras_identity_core::{
    AuthInfo, IdentityError, IdentityResult, IdentityStore, LocalUser, Principal, StoreError,
};
use tracing::{debug, info, warn};

pub struct IdentityLinker;

impl IdentityLinker {
    /// Resolve the principal for `(provider, uid)`, creating rows on first
    /// sight.
    ///
    /// With a user model the returned principal is always a user; an identity
    /// row without a bound user is rejected as [`IdentityError::InvalidAccount`].
    /// Without one the identity row itself is the principal.
    pub async fn link<S: IdentityStore>(
        store: &S,
        provider: &str,
        uid: &str,
    ) -> IdentityResult<Principal<S::User>> {
        if let Some(existing) = store.find_identity(provider, uid).await? {
            if !store.has_user_model() {
                debug!("Reusing identity {}:{}", provider, uid);
                return Ok(Principal::Identity(existing));
            }

            if existing.user_id.is_empty() {
                warn!("Identity {}:{} has no bound user", provider, uid);
                return Err(IdentityError::InvalidAccount);
            }

            let user = store
                .find_user(&existing.user_id)
                .await?
                .ok_or_else(|| StoreError::NotFound(format!("user {}", existing.user_id)))?;

            debug!(
                "Identity {}:{} resolved to user {}",
                provider,
                uid,
                user.primary_key()
            );
            return Ok(Principal::User(user));
        }

        let auth_info = AuthInfo::new(provider, uid);

        if store.has_user_model() {
            let (user, info) = store.create_user_with_identity(auth_info).await?;
            info!(
                "Linked identity {}:{} to user {}",
                info.provider, info.uid, info.user_id
            );
            return Ok(Principal::User(user));
        }

        let info = store.first_or_create_identity(auth_info).await?;
        info!("Created identity {}:{}", info.provider, info.uid);
        Ok(Principal::Identity(info))
    }
}
