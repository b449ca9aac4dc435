//! HTTP client for GitHub's token and user endpoints.

use crate::config::OAuthClientConfig;
use crate::error::GithubError;
use crate::types::{GithubUser, TokenEndpointResponse, TokenResponse};
use reqwest::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use tracing::{debug, error, info};

#[derive(Clone)]
pub struct GithubClient {
    http_client: Client,
    user_url: String,
    user_agent: String,
}

impl GithubClient {
    pub fn new(http_client: Client, user_url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            http_client,
            user_url: user_url.into(),
            user_agent: user_agent.into(),
        }
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange(
        &self,
        oauth_config: &OAuthClientConfig,
        code: &str,
    ) -> Result<TokenResponse, GithubError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", oauth_config.client_id.as_str()),
            ("client_secret", oauth_config.client_secret.as_str()),
            ("redirect_uri", oauth_config.redirect_url.as_str()),
        ];

        let response = self
            .http_client
            .post(oauth_config.token_url.clone())
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, &self.user_agent)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Token exchange failed with {}: {}", status, error_text);
            return Err(GithubError::TokenExchangeFailed(format!(
                "{}: {}",
                status, error_text
            )));
        }

        let body: TokenEndpointResponse = response
            .json()
            .await
            .map_err(|e| GithubError::InvalidTokenResponse(e.to_string()))?;

        if let Some(error) = body.error {
            let description = body.error_description.unwrap_or_default();
            error!("Token exchange rejected: {}: {}", error, description);
            return Err(GithubError::OAuthError { error, description });
        }

        let access_token = body
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| GithubError::InvalidTokenResponse("missing access_token".to_string()))?;

        info!("Successfully exchanged code for tokens");
        Ok(TokenResponse {
            access_token,
            token_type: body.token_type.unwrap_or_else(|| "bearer".to_string()),
            scope: body.scope,
        })
    }

    /// Get the profile of the account the access token belongs to.
    pub async fn fetch_profile(&self, access_token: &str) -> Result<GithubUser, GithubError> {
        let response = self
            .http_client
            .get(&self.user_url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("User info request failed with {}: {}", status, error_text);
            return Err(GithubError::UserInfoFailed(format!(
                "{}: {}",
                status, error_text
            )));
        }

        let user: GithubUser = response
            .json()
            .await
            .map_err(|e| GithubError::InvalidUserInfoResponse(e.to_string()))?;

        debug!("Successfully retrieved GitHub user {}", user.id);
        Ok(user)
    }
}
