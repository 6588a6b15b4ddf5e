//! # session: OAuth login against an Innovator server
//!
//! Innovator publishes its token endpoint through an OpenID discovery document.
//! The login flow is the OAuth password grant: the password is sent as the
//! lowercase md5 hex digest Innovator expects, never in plain text.
//!
//! A [`Session`] is obtained once and then shared by every entity client via
//! [`crate::odata::ODataClient`].

use md5::{Digest, Md5};
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::error::PlmError;

/// Everything needed to log in to one Innovator database.
#[derive(Clone)]
pub struct Credentials {
    /// Where Innovator is hosted, e.g. `http://innovator.example.com/InnovatorServer`.
    pub base_url: String,
    /// OAuth client id registered with the Innovator OAuth server.
    pub client_id: String,
    pub database: String,
    pub username: String,
    /// Plain password; only its md5 digest leaves the process.
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An authenticated session: normalised server url plus bearer token.
#[derive(Debug, Clone)]
pub struct Session {
    base_url: String,
    access_token: String,
}

#[derive(Deserialize)]
struct OpenIdConfiguration {
    token_endpoint: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Lowercase hex md5 digest of the password, as the token endpoint expects.
pub fn password_digest(password: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Strips trailing slashes and checks the url is http(s).
pub fn normalise_base_url(raw: &str) -> Result<String, PlmError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(PlmError::BaseUrl {
            url: raw.to_string(),
            reason: "empty".to_string(),
        });
    }
    let parsed = reqwest::Url::parse(trimmed).map_err(|e| PlmError::BaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(PlmError::BaseUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

impl Session {
    /// Builds a session from an already issued token.
    pub fn from_token(base_url: &str, access_token: impl Into<String>) -> Result<Self, PlmError> {
        Ok(Session {
            base_url: normalise_base_url(base_url)?,
            access_token: access_token.into(),
        })
    }

    /// Discovers the token endpoint and performs the password grant.
    pub async fn login(
        client: &reqwest::Client,
        credentials: &Credentials,
    ) -> Result<Self, PlmError> {
        let base_url = normalise_base_url(&credentials.base_url)?;
        let discovery_url = format!("{base_url}/OAuthServer/.well-known/openid-configuration");
        info!(url = %discovery_url, "Discovering Innovator token endpoint");

        let response = client.get(&discovery_url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!(status = %status, url = %discovery_url, "OpenID discovery failed");
            return Err(PlmError::Status {
                method: "GET",
                url: discovery_url,
                status: status.as_u16(),
                body,
            });
        }
        let discovery: OpenIdConfiguration = serde_json::from_str(&body)?;
        let token_endpoint = discovery.token_endpoint.ok_or_else(|| {
            PlmError::Auth("discovery document has no token_endpoint".to_string())
        })?;
        debug!(token_endpoint = %token_endpoint, "Token endpoint discovered");

        let password = password_digest(&credentials.password);
        let form = [
            ("grant_type", "password"),
            ("scope", "Innovator"),
            ("client_id", credentials.client_id.as_str()),
            ("username", credentials.username.as_str()),
            ("password", password.as_str()),
            ("database", credentials.database.as_str()),
        ];

        let response = client.post(&token_endpoint).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!(status = %status, username = %credentials.username, "Token request rejected");
            return Err(PlmError::Status {
                method: "POST",
                url: token_endpoint,
                status: status.as_u16(),
                body,
            });
        }
        let token: TokenResponse = serde_json::from_str(&body)?;
        let access_token = token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PlmError::Auth("token response has no access_token".to_string()))?;

        info!(
            username = %credentials.username,
            database = %credentials.database,
            "Authenticated against Innovator"
        );
        Ok(Session {
            base_url,
            access_token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}
