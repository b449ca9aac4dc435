//! GitHub provider configuration.

use ras_identity_core::{IdentityError, IdentityResult};
use serde::{Deserialize, Serialize};
use url::Url;

pub const AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
pub const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
pub const USER_URL: &str = "https://api.github.com/user";
pub const DEFAULT_USER_AGENT: &str = "ras-identity-github";
pub const DEFAULT_STATE_TTL_SECONDS: u64 = 600;

/// Static provider configuration, fixed once the provider is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    /// Endpoint returning the authenticated user's profile.
    pub user_url: String,
    /// When unset the redirect is derived from the inbound request.
    pub redirect_url: Option<String>,
    pub scopes: Vec<String>,
    pub user_agent: String,
    pub state_ttl_seconds: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            authorize_url: AUTHORIZE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            user_url: USER_URL.to_string(),
            redirect_url: None,
            scopes: Vec::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            state_ttl_seconds: DEFAULT_STATE_TTL_SECONDS,
        }
    }
}

impl GithubConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            ..Self::default()
        }
    }

    /// Reads `GITHUB_CLIENT_ID`, `GITHUB_CLIENT_SECRET`, `GITHUB_REDIRECT_URL`,
    /// `GITHUB_SCOPES` (comma separated), `GITHUB_AUTHORIZE_URL`,
    /// `GITHUB_TOKEN_URL`, `GITHUB_USER_URL` and `GITHUB_STATE_TTL_SECONDS`.
    pub fn from_env() -> IdentityResult<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let mut config = Self::new(
            var("GITHUB_CLIENT_ID").unwrap_or_default(),
            var("GITHUB_CLIENT_SECRET").unwrap_or_default(),
        );

        config.redirect_url = var("GITHUB_REDIRECT_URL");
        if let Some(scopes) = var("GITHUB_SCOPES") {
            config.scopes = scopes
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(url) = var("GITHUB_AUTHORIZE_URL") {
            config.authorize_url = url;
        }
        if let Some(url) = var("GITHUB_TOKEN_URL") {
            config.token_url = url;
        }
        if let Some(url) = var("GITHUB_USER_URL") {
            config.user_url = url;
        }
        if let Some(ttl) = var("GITHUB_STATE_TTL_SECONDS") {
            config.state_ttl_seconds = ttl.parse().map_err(|_| {
                IdentityError::ConfigError(
                    "GITHUB_STATE_TTL_SECONDS must be a number of seconds".to_string(),
                )
            })?;
        }

        Ok(config)
    }

    pub fn with_authorize_url(mut self, url: impl Into<String>) -> Self {
        self.authorize_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_user_url(mut self, url: impl Into<String>) -> Self {
        self.user_url = url.into();
        self
    }

    pub fn with_redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = Some(url.into());
        self
    }

    pub fn with_scopes<I, T>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_state_ttl(mut self, seconds: u64) -> Self {
        self.state_ttl_seconds = seconds;
        self
    }

    /// Checks credentials, fills blank endpoints with GitHub's and parses
    /// every URL.
    pub(crate) fn validated(mut self) -> IdentityResult<ValidatedConfig> {
        if self.client_id.trim().is_empty() {
            return Err(IdentityError::ConfigError(
                "Github's client_id can't be blank".to_string(),
            ));
        }
        if self.client_secret.trim().is_empty() {
            return Err(IdentityError::ConfigError(
                "Github's client_secret can't be blank".to_string(),
            ));
        }
        if self.state_ttl_seconds == 0 {
            return Err(IdentityError::ConfigError(
                "state_ttl_seconds must be positive".to_string(),
            ));
        }

        for (field, default) in [
            (&mut self.authorize_url, AUTHORIZE_URL),
            (&mut self.token_url, TOKEN_URL),
            (&mut self.user_url, USER_URL),
        ] {
            if field.trim().is_empty() {
                *field = default.to_string();
            }
        }
        if self.user_agent.trim().is_empty() {
            self.user_agent = DEFAULT_USER_AGENT.to_string();
        }
        self.redirect_url = self.redirect_url.filter(|url| !url.trim().is_empty());

        let authorize_url = parse_url("authorize_url", &self.authorize_url)?;
        let token_url = parse_url("token_url", &self.token_url)?;
        parse_url("user_url", &self.user_url)?;
        if let Some(redirect_url) = &self.redirect_url {
            parse_url("redirect_url", redirect_url)?;
        }

        Ok(ValidatedConfig {
            config: self,
            authorize_url,
            token_url,
        })
    }
}

/// A checked [`GithubConfig`] with its issuer endpoints parsed.
#[derive(Debug)]
pub(crate) struct ValidatedConfig {
    pub config: GithubConfig,
    pub authorize_url: Url,
    pub token_url: Url,
}

fn parse_url(name: &str, value: &str) -> IdentityResult<Url> {
    Url::parse(value)
        .map_err(|e| IdentityError::ConfigError(format!("invalid {}: {}: {}", name, value, e)))
}

/// OAuth client settings resolved for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: Url,
    pub token_url: Url,
    pub redirect_url: String,
    pub scopes: Vec<String>,
}

impl OAuthClientConfig {
    /// Issuer URL the browser is sent to, carrying `state` verbatim.
    pub fn authorization_url(&self, state: &str) -> Url {
        let mut url = self.authorize_url.clone();
        {
            let mut params = url.query_pairs_mut();
            params.append_pair("response_type", "code");
            params.append_pair("client_id", &self.client_id);
            params.append_pair("redirect_uri", &self.redirect_url);
            if !self.scopes.is_empty() {
                params.append_pair("scope", &self.scopes.join(" "));
            }
            params.append_pair("state", state);
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_blank_credentials_are_rejected() {
        for config in [
            GithubConfig::new("", "secret"),
            GithubConfig::new("id", ""),
            GithubConfig::new("  ", "secret"),
            GithubConfig::default(),
        ] {
            assert!(matches!(
                config.validated(),
                Err(IdentityError::ConfigError(_))
            ));
        }
    }

    #[test]
    fn test_blank_endpoints_fall_back_to_github() {
        let validated = GithubConfig::new("x", "y")
            .with_authorize_url("")
            .with_token_url("")
            .with_user_url("")
            .with_redirect_url("")
            .validated()
            .unwrap();

        assert_eq!(validated.config.authorize_url, AUTHORIZE_URL);
        assert_eq!(validated.config.token_url, TOKEN_URL);
        assert_eq!(validated.config.user_url, USER_URL);
        assert_eq!(validated.config.redirect_url, None);
        assert_eq!(validated.authorize_url.as_str(), AUTHORIZE_URL);
        assert_eq!(validated.token_url.as_str(), TOKEN_URL);
    }

    #[test]
    fn test_invalid_url_is_a_config_error() {
        let result = GithubConfig::new("x", "y")
            .with_token_url("not a url")
            .validated();

        match result {
            Err(IdentityError::ConfigError(message)) => assert!(message.contains("token_url")),
            other => panic!("Expected ConfigError, got: {:?}", other),
        }
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: GithubConfig = serde_json::from_value(serde_json::json!({
            "client_id": "x",
            "client_secret": "y",
            "scopes": ["read:user"]
        }))
        .unwrap();

        assert_eq!(config.authorize_url, AUTHORIZE_URL);
        assert_eq!(config.scopes, vec!["read:user".to_string()]);
        assert_eq!(config.state_ttl_seconds, DEFAULT_STATE_TTL_SECONDS);
    }

    fn oauth_config(scopes: Vec<String>) -> OAuthClientConfig {
        OAuthClientConfig {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            authorize_url: Url::parse(AUTHORIZE_URL).unwrap(),
            token_url: Url::parse(TOKEN_URL).unwrap(),
            redirect_url: "http://localhost:3000/auth/github/callback".to_string(),
            scopes,
        }
    }

    #[test]
    fn test_authorization_url_parameters() {
        let url = oauth_config(vec!["read:user".to_string(), "user:email".to_string()])
            .authorization_url("signed-state");

        assert_eq!(url.host_str(), Some("github.com"));
        assert_eq!(url.path(), "/login/oauth/authorize");

        let params: HashMap<_, _> = url.query_pairs().collect();
        assert_eq!(params.get("response_type"), Some(&"code".into()));
        assert_eq!(params.get("client_id"), Some(&"client".into()));
        assert_eq!(
            params.get("redirect_uri"),
            Some(&"http://localhost:3000/auth/github/callback".into())
        );
        assert_eq!(params.get("scope"), Some(&"read:user user:email".into()));
        assert_eq!(params.get("state"), Some(&"signed-state".into()));
        assert!(!params.contains_key("client_secret"));
    }

    #[test]
    fn test_empty_scopes_omit_scope_parameter() {
        let url = oauth_config(Vec::new()).authorization_url("s");
        let params: HashMap<_, _> = url.query_pairs().collect();

        assert!(!params.contains_key("scope"));
        assert_eq!(params.get("state"), Some(&"s".into()));
    }
}
