//! GitHub wire types.

use serde::{Deserialize, Serialize};

/// Raw token endpoint body. GitHub reports bad codes with `200 OK` and an
/// `error` field instead of an access token.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenEndpointResponse {
    pub access_token: Option<String>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Access token issued for an authorization code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub scope: Option<String>,
}

/// Profile of the authenticated GitHub account. Only `id` is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubUser {
    pub id: u64,
    pub login: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

impl GithubUser {
    /// The stable subject id as stored in identity rows.
    pub fn uid(&self) -> String {
        self.id.to_string()
    }
}
