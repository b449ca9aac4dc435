//! Identity records and the persistence seam providers link them through.

use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// The join key between an external account and local records.
///
/// A row with this shape exists at most once per `(provider, uid)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
    pub provider: String,
    pub uid: String,
    /// Empty when the host keeps no user table.
    #[serde(default)]
    pub user_id: String,
}

impl AuthInfo {
    pub fn new(provider: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            uid: uid.into(),
            user_id: String::new(),
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }
}

/// Who the host should treat as logged in after a successful callback.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum Principal<U> {
    Identity(AuthInfo),
    User(U),
}

impl<U> Principal<U> {
    pub fn as_identity(&self) -> Option<&AuthInfo> {
        match self {
            Principal::Identity(info) => Some(info),
            Principal::User(_) => None,
        }
    }

    pub fn as_user(&self) -> Option<&U> {
        match self {
            Principal::User(user) => Some(user),
            Principal::Identity(_) => None,
        }
    }
}

/// A host user record. Providers only ever read its generated key.
pub trait LocalUser: Clone + Send + Sync + 'static {
    fn primary_key(&self) -> String;
}

/// Persistence primitives a provider needs to link external identities.
///
/// Implementations must enforce uniqueness of `(provider, uid)` themselves;
/// providers take no locks.
#[async_trait]
pub trait IdentityStore: Send + Sync + 'static {
    type User: LocalUser;

    /// Whether the host keeps user rows alongside identity rows.
    fn has_user_model(&self) -> bool;

    async fn find_identity(&self, provider: &str, uid: &str) -> StoreResult<Option<AuthInfo>>;

    async fn find_user(&self, user_id: &str) -> StoreResult<Option<Self::User>>;

    /// Inserts `info` unless a row with the same `(provider, uid)` exists, and
    /// returns whichever row is stored afterwards.
    async fn first_or_create_identity(&self, info: AuthInfo) -> StoreResult<AuthInfo>;

    /// Creates an empty user and the identity bound to it as one atomic step.
    ///
    /// If the identity already exists (a concurrent login won the race), no
    /// user is created and the already bound user is returned instead.
    async fn create_user_with_identity(
        &self,
        info: AuthInfo,
    ) -> StoreResult<(Self::User, AuthInfo)>;
}

/// User row kept by [`InMemoryIdentityStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUser {
    pub id: u64,
    pub created_at: DateTime<Utc>,
}

impl LocalUser for StoredUser {
    fn primary_key(&self) -> String {
        self.id.to_string()
    }
}

#[derive(Debug)]
struct Tables {
    identities: HashMap<(String, String), AuthInfo>,
    users: HashMap<String, StoredUser>,
    next_user_id: u64,
}

/// In-memory [`IdentityStore`] for tests and single-process hosts.
#[derive(Clone)]
pub struct InMemoryIdentityStore {
    tables: Arc<RwLock<Tables>>,
    user_model: bool,
}

impl InMemoryIdentityStore {
    /// A store with identity rows only.
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables {
                identities: HashMap::new(),
                users: HashMap::new(),
                next_user_id: 1,
            })),
            user_model: false,
        }
    }

    /// A store that also keeps user rows.
    pub fn with_user_model() -> Self {
        Self {
            user_model: true,
            ..Self::new()
        }
    }

    /// Sets the key the next created user receives.
    pub async fn set_next_user_id(&self, id: u64) {
        self.tables.write().await.next_user_id = id;
    }

    pub async fn seed_identity(&self, info: AuthInfo) {
        let mut tables = self.tables.write().await;
        tables
            .identities
            .insert((info.provider.clone(), info.uid.clone()), info);
    }

    pub async fn seed_user(&self, id: u64) -> StoredUser {
        let user = StoredUser {
            id,
            created_at: Utc::now(),
        };
        let mut tables = self.tables.write().await;
        tables.users.insert(user.primary_key(), user.clone());
        user
    }

    pub async fn identity_count(&self) -> usize {
        self.tables.read().await.identities.len()
    }

    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }
}

impl Default for InMemoryIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    type User = StoredUser;

    fn has_user_model(&self) -> bool {
        self.user_model
    }

    async fn find_identity(&self, provider: &str, uid: &str) -> StoreResult<Option<AuthInfo>> {
        let tables = self.tables.read().await;
        Ok(tables
            .identities
            .get(&(provider.to_string(), uid.to_string()))
            .cloned())
    }

    async fn find_user(&self, user_id: &str) -> StoreResult<Option<StoredUser>> {
        Ok(self.tables.read().await.users.get(user_id).cloned())
    }

    async fn first_or_create_identity(&self, info: AuthInfo) -> StoreResult<AuthInfo> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .identities
            .entry((info.provider.clone(), info.uid.clone()))
            .or_insert(info);
        Ok(stored.clone())
    }

    async fn create_user_with_identity(
        &self,
        info: AuthInfo,
    ) -> StoreResult<(StoredUser, AuthInfo)> {
        if !self.user_model {
            return Err(StoreError::Backend("user model not configured".to_string()));
        }

        let mut tables = self.tables.write().await;
        let key = (info.provider.clone(), info.uid.clone());

        if let Some(existing) = tables.identities.get(&key).cloned() {
            debug!(
                "Identity {}:{} already linked, reusing bound user",
                existing.provider, existing.uid
            );
            if existing.user_id.is_empty() {
                return Err(StoreError::Conflict(format!(
                    "identity {}:{} has no bound user",
                    existing.provider, existing.uid
                )));
            }
            let user = tables
                .users
                .get(&existing.user_id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("user {}", existing.user_id)))?;
            return Ok((user, existing));
        }

        let user = StoredUser {
            id: tables.next_user_id,
            created_at: Utc::now(),
        };
        tables.next_user_id += 1;

        let info = info.with_user_id(user.primary_key());
        tables.users.insert(user.primary_key(), user.clone());
        tables.identities.insert(key, info.clone());

        Ok((user, info))
    }
}
