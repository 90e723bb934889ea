//! OAuth2 Token Lifecycle
//!
//! [`TokenManager`] trades signed assertions for bearer tokens and caches them
//! until they are within the safety margin of expiry. The cache lock is held
//! across the exchange, so concurrent callers share a single exchange.
//!
//! [`CredentialedClient`] is the shared base of the Indexing and Search
//! Console clients: bearer auth, retry/backoff, status-preserving errors.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::credentials::ServiceCredential;
use crate::ai::retry::RetryPolicy;
use crate::constants::auth;
use crate::types::{Result, SeoError};

/// A bearer token and its absolute expiry
#[derive(Clone)]
pub struct AccessToken {
    secret: SecretString,
    expires_at: Instant,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_in: Duration) -> Self {
        Self {
            secret: SecretString::from(token.into()),
            expires_at: Instant::now() + expires_in,
        }
    }

    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Still usable for at least `margin`
    pub fn is_fresh(&self, margin: Duration) -> bool {
        Instant::now() + margin < self.expires_at
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    auth::ASSERTION_LIFETIME_SECS as u64
}

/// Cached, single-flight access token source for one scope
pub struct TokenManager {
    credential: Option<Arc<ServiceCredential>>,
    scope: String,
    http: reqwest::Client,
    margin: Duration,
    cached: Mutex<Option<AccessToken>>,
    exchanges: AtomicUsize,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("credential", &self.credential)
            .field("scope", &self.scope)
            .field("margin", &self.margin)
            .field("exchanges", &self.exchanges.load(Ordering::Relaxed))
            .finish()
    }
}

impl TokenManager {
    pub fn new(
        credential: Option<Arc<ServiceCredential>>,
        scope: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            credential,
            scope: scope.into(),
            http,
            margin: Duration::from_secs(auth::TOKEN_SAFETY_MARGIN_SECS),
            cached: Mutex::new(None),
            exchanges: AtomicUsize::new(0),
        }
    }

    pub fn with_margin(mut self, margin: Duration) -> Self {
        self.margin = margin;
        self
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// Number of token exchanges performed so far
    pub fn exchange_count(&self) -> usize {
        self.exchanges.load(Ordering::Relaxed)
    }

    /// Cached token if still fresh, otherwise a newly exchanged one
    pub async fn get_token(&self) -> Result<AccessToken> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref()
            && token.is_fresh(self.margin)
        {
            return Ok(token.clone());
        }

        let credential = self.credential.as_ref().ok_or_else(|| {
            SeoError::CredentialsMissing("Google service account not configured".to_string())
        })?;

        let token = self.exchange(credential).await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Drop the cached token; the next call exchanges again
    pub async fn invalidate(&self) {
        self.cached.lock().await.take();
    }

    async fn exchange(&self, credential: &ServiceCredential) -> Result<AccessToken> {
        let assertion = credential.sign_assertion(&self.scope, Utc::now())?;
        debug!(
            scope = %self.scope,
            token_uri = credential.token_uri(),
            "Exchanging assertion for access token"
        );

        let response = self
            .http
            .post(credential.token_uri())
            .form(&[
                ("grant_type", auth::JWT_BEARER_GRANT),
                ("assertion", assertion.expose()),
            ])
            .send()
            .await?;

        self.exchanges.fetch_add(1, Ordering::Relaxed);

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Token exchange rejected");
            return Err(SeoError::TokenExchangeFailed {
                status: status.as_u16(),
                body,
            });
        }

        let body: TokenResponse = response.json().await?;
        info!(scope = %self.scope, expires_in = body.expires_in, "Access token refreshed");
        Ok(AccessToken::new(
            body.access_token,
            Duration::from_secs(body.expires_in),
        ))
    }
}

/// Shared base for Google API clients
#[derive(Debug)]
pub struct CredentialedClient {
    http: reqwest::Client,
    tokens: TokenManager,
    retry: RetryPolicy,
}

impl CredentialedClient {
    pub fn new(
        credential: Option<Arc<ServiceCredential>>,
        scope: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            tokens: TokenManager::new(credential, scope, http.clone()),
            http,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub async fn get_token(&self) -> Result<AccessToken> {
        self.tokens.get_token().await
    }

    /// Send an authorized request and decode its JSON body
    ///
    /// `build` receives the HTTP client and bearer token for every attempt.
    /// Non-2xx answers become `on_error(status, body)`. A 401 drops the cached
    /// token and the request is sent once more with a fresh one.
    pub async fn send_json<T, B>(
        &self,
        operation: &str,
        build: B,
        on_error: fn(u16, String) -> SeoError,
    ) -> Result<T>
    where
        T: DeserializeOwned + Send,
        B: Fn(&reqwest::Client, &str) -> reqwest::RequestBuilder + Sync,
    {
        let this = self;
        let build = &build;

        self.retry
            .run(operation, move || async move {
                let mut reauthorized = false;
                loop {
                    let token = this.tokens.get_token().await?;
                    let response = build(&this.http, token.expose()).send().await?;

                    let status = response.status();
                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        this.tokens.invalidate().await;
                        if !reauthorized {
                            debug!(operation, "Token rejected, retrying with a fresh one");
                            reauthorized = true;
                            continue;
                        }
                    }
                    if !status.is_success() {
                        let body = response.text().await.unwrap_or_default();
                        return Err(on_error(status.as_u16(), body));
                    }

                    return Ok(response.json::<T>().await?);
                }
            })
            .await
            .map_err(|exhausted| exhausted.into_inner())
    }
}
