//! OAuth refresh-token authentication for the ticketing API.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::DeskConfig;
use crate::desk::errors::{DeskError, DeskResult};

/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3_600;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_after: Instant,
}

/// Exchanges the configured refresh token for access tokens and caches them.
#[derive(Debug)]
pub struct DeskAuth {
    http: reqwest::Client,
    accounts_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<String>,
    org_id: Option<String>,
    token: Mutex<Option<CachedToken>>,
}

impl DeskAuth {
    /// Create an authenticator. Credentials are checked on first use.
    #[must_use]
    pub fn new(config: &DeskConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            accounts_url: config.accounts_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            refresh_token: config.refresh_token.clone(),
            org_id: config.org_id.clone(),
            token: Mutex::new(None),
        }
    }

    /// Return a valid access token, refreshing it when it is missing or about to expire.
    ///
    /// # Errors
    /// Returns an error if credentials are missing or the token exchange fails.
    pub async fn access_token(&self) -> DeskResult<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_after {
                return Ok(token.value.clone());
            }
            debug!("access token expiring, refreshing");
        }

        let (Some(client_id), Some(client_secret), Some(refresh_token)) = (
            self.client_id.as_deref(),
            self.client_secret.as_deref(),
            self.refresh_token.as_deref(),
        ) else {
            return Err(DeskError::Config(
                "ZOHO_CLIENT_ID, ZOHO_CLIENT_SECRET, and ZOHO_REFRESH_TOKEN must be set".to_string(),
            ));
        };

        let response = self
            .http
            .post(format!("{}/oauth/v2/token", self.accounts_url))
            .form(&[
                ("refresh_token", refresh_token),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeskError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: TokenResponse = response.json().await?;
        let Some(value) = body.access_token else {
            return Err(DeskError::Auth(
                body.error.unwrap_or_else(|| "no access_token in response".to_string()),
            ));
        };

        let lifetime = Duration::from_secs(body.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS));
        let refresh_after = Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN);
        info!(expires_in = lifetime.as_secs(), "refreshed ticketing access token");

        *cached = Some(CachedToken {
            value: value.clone(),
            refresh_after,
        });
        Ok(value)
    }

    /// Build the authorization headers for an API call.
    ///
    /// # Errors
    /// Returns an error if no token can be obtained.
    pub async fn headers(&self) -> DeskResult<HeaderMap> {
        let token = self.access_token().await?;
        let mut headers = HeaderMap::new();

        let authorization = HeaderValue::from_str(&format!("Zoho-oauthtoken {token}"))
            .map_err(|err| DeskError::Auth(err.to_string()))?;
        headers.insert(AUTHORIZATION, authorization);

        if let Some(org_id) = &self.org_id {
            let value =
                HeaderValue::from_str(org_id).map_err(|err| DeskError::Config(err.to_string()))?;
            headers.insert(HeaderName::from_static("orgid"), value);
        }

        Ok(headers)
    }

    /// Drop the cached token so the next call refreshes it.
    pub async fn invalidate(&self) {
        *self.token.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_credentials_fail_on_use() {
        let auth = DeskAuth::new(&DeskConfig::default(), reqwest::Client::new());
        let err = auth.access_token().await.unwrap_err();
        assert!(matches!(err, DeskError::Config(_)));
    }

    #[tokio::test]
    async fn test_cached_token_is_reused() {
        let config = DeskConfig::default().with_credentials("id", "secret", "refresh");
        let auth = DeskAuth::new(&config, reqwest::Client::new());
        *auth.token.lock().await = Some(CachedToken {
            value: "cached".to_string(),
            refresh_after: Instant::now() + Duration::from_secs(600),
        });

        assert_eq!(auth.access_token().await.unwrap(), "cached");
        let headers = auth.headers().await.unwrap();
        assert_eq!(headers[AUTHORIZATION], "Zoho-oauthtoken cached");
        assert!(headers.get("orgid").is_none());
    }

    #[tokio::test]
    async fn test_org_id_header() {
        let mut config = DeskConfig::default().with_credentials("id", "secret", "refresh");
        config.org_id = Some("20001".to_string());
        let auth = DeskAuth::new(&config, reqwest::Client::new());
        *auth.token.lock().await = Some(CachedToken {
            value: "t".to_string(),
            refresh_after: Instant::now() + Duration::from_secs(600),
        });

        let headers = auth.headers().await.unwrap();
        assert_eq!(headers["orgid"], "20001");
    }
}
