//! OAuth2 client-credentials token lifecycle.
//!
//! The Enedis API authenticates services with the client-credentials grant: a
//! `client_id`/`client_secret` pair is exchanged for a short-lived bearer
//! token. [`TokenManager`] owns that exchange, caches the live token, and
//! refreshes it once expired. The cache is guarded by a mutex held across the
//! whole check-then-refresh sequence, so concurrent callers trigger at most
//! one in-flight refresh.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::transport::{ApiRequest, Transport};

pub mod error;

use error::AuthError;

/// API credentials for the client-credentials grant.
///
/// Immutable for the lifetime of the [`TokenManager`] that owns them.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct EnvCredentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Resolves credentials from `ENEDIS_API_USERNAME` and
    /// `ENEDIS_API_PASSWORD`.
    ///
    /// Environment resolution is a convenience kept at the edge; the core
    /// types only ever take explicit values.
    pub fn from_env() -> Result<Self, AuthError> {
        let raw: EnvCredentials = envy::prefixed("ENEDIS_API_")
            .from_env()
            .map_err(|e| AuthError::Env(e.to_string()))?;
        Ok(Self::new(raw.username, raw.password))
    }
}

/// A bearer token and the instant it stops being usable.
#[derive(Debug, Clone)]
pub struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// A token is usable strictly before its expiry instant.
    fn usable(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Wire shape of `POST /oauth2/v3/token`.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Owns token acquisition and caching for one set of [`Credentials`].
pub struct TokenManager {
    transport: Arc<Transport>,
    base_url: String,
    credentials: Credentials,
    cache: Mutex<Option<AccessToken>>,
}

impl TokenManager {
    pub fn new(
        transport: Arc<Transport>,
        base_url: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            credentials,
            cache: Mutex::new(None),
        }
    }

    /// Returns a usable bearer token value, fetching or refreshing first if
    /// the cache is empty or expired.
    pub async fn bearer(&self) -> Result<String, AuthError> {
        let mut cache = self.cache.lock().await;
        let now = Utc::now();
        if let Some(token) = cache.as_ref() {
            if token.usable(now) {
                return Ok(token.value().to_string());
            }
            debug!("cached token expired at {}, refreshing", token.expires_at());
        }
        let token = self.fetch_token().await?;
        let value = token.value().to_string();
        *cache = Some(token);
        Ok(value)
    }

    async fn fetch_token(&self) -> Result<AccessToken, AuthError> {
        let request = ApiRequest::post(format!("{}/oauth2/v3/token", self.base_url)).form([
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
        ]);
        let response = self.transport.send(&request).await?;
        let parsed: TokenResponse = response.json().map_err(AuthError::Parse)?;
        let expires_at = Utc::now() + Duration::seconds(parsed.expires_in);
        info!("fetched new access token, valid until {expires_at}");
        Ok(AccessToken {
            value: parsed.access_token,
            expires_at,
        })
    }
}
