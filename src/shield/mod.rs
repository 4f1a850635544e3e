//! Bot-mitigation pass-through request layer.
//!
//! Every call to the API goes through this module. It sends requests with a
//! realistic browser identity and a persistent cookie jar, watches responses
//! for anti-automation interstitials, and waits them out with jittered
//! backoff where that can work. It deliberately stops there: no JavaScript
//! execution and no captcha solving, the shield is an externally imposed
//! constraint with no stable contract.

pub mod detect;
pub mod profiles;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method};
use rand::Rng;
use serde_json::Value;
use thiserror::Error;
use tokio::time::sleep;
use url::Url;

pub use detect::{ChallengeKind, detect_challenge};
pub use profiles::{BrowserProfile, profile_by_name, random_profile};

/// Errors surfaced by the request layer.
#[derive(Debug, Error)]
pub enum ShieldError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("challenge not cleared after {attempts} attempts ({kind})")]
    ChallengeUnsolved { kind: ChallengeKind, attempts: usize },
    #[error("blocked by shield ({kind})")]
    Blocked { kind: ChallengeKind },
}

/// Request description handed to the transport.
#[derive(Debug, Clone)]
pub struct ShieldRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
}

impl ShieldRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = Some(RequestBody::Form(fields));
        self
    }

    pub fn with_json(mut self, value: Value) -> Self {
        self.body = Some(RequestBody::Json(value));
        self
    }
}

/// Body variants the transport can carry.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Form(Vec<(String, String)>),
    Json(Value),
}

/// Response as seen after the transport, before challenge classification.
#[derive(Debug, Clone)]
pub struct ShieldResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub url: Url,
}

impl ShieldResponse {
    /// Body decoded as UTF-8, lossy. Challenge markers and API error
    /// envelopes are both ASCII so lossy decoding is safe here.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

/// Transport seam. The production implementation is reqwest-backed; tests
/// substitute scripted transports to exercise the retry policy offline.
#[async_trait]
pub trait ShieldHttpClient: Send + Sync {
    async fn send(&self, request: &ShieldRequest) -> Result<ShieldResponse, ShieldError>;
}

/// Reqwest-backed transport with cookie persistence and a browser header
/// profile applied as client defaults.
pub struct ReqwestShieldClient {
    client: reqwest::Client,
}

impl ReqwestShieldClient {
    pub fn new(profile: &BrowserProfile, timeout: Duration) -> Result<Self, ShieldError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(profile.header_map())
            .timeout(timeout)
            .build()
            .map_err(|err| ShieldError::Transport(err.to_string()))?;

        Ok(Self { client })
    }

    /// Wrap an existing reqwest client. The client should already carry a
    /// cookie store, otherwise clearance cookies are lost between attempts.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ShieldHttpClient for ReqwestShieldClient {
    async fn send(&self, request: &ShieldRequest) -> Result<ShieldResponse, ShieldError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());

        match &request.body {
            // Pairs are serialized as-is: field order survives and duplicate
            // keys are allowed.
            Some(RequestBody::Form(fields)) => {
                builder = builder.form(fields);
            }
            Some(RequestBody::Json(value)) => {
                builder = builder.json(value);
            }
            None => {}
        }

        let response = builder
            .send()
            .await
            .map_err(|err| ShieldError::Transport(err.to_string()))?;

        let status = response.status().as_u16();
        let url = response.url().clone();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|err| ShieldError::Transport(err.to_string()))?;

        Ok(ShieldResponse {
            status,
            headers,
            body,
            url,
        })
    }
}

/// Retry budget and backoff shape for challenge handling.
#[derive(Debug, Clone)]
pub struct ShieldConfig {
    /// Total attempts per request, first try included.
    pub max_attempts: usize,
    /// Base wait before replaying after a JS/managed interstitial.
    pub challenge_backoff: Duration,
    /// Base wait after a rate-limit response.
    pub rate_limit_backoff: Duration,
    /// Ceiling for any single wait.
    pub max_backoff: Duration,
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            challenge_backoff: Duration::from_secs(2),
            rate_limit_backoff: Duration::from_secs(10),
            max_backoff: Duration::from_secs(60),
        }
    }
}

/// The pass-through layer itself: transport plus mitigation policy.
pub struct Shield {
    transport: Arc<dyn ShieldHttpClient>,
    config: ShieldConfig,
}

impl Shield {
    pub fn new(transport: Arc<dyn ShieldHttpClient>, config: ShieldConfig) -> Self {
        Self { transport, config }
    }

    /// Sends a request, replaying it with backoff while the shield answers
    /// with a retryable interstitial. Returns the first non-challenge
    /// response untouched; HTTP error statuses are the caller's concern.
    pub async fn execute(&self, request: &ShieldRequest) -> Result<ShieldResponse, ShieldError> {
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            let response = self.transport.send(request).await?;

            let Some(kind) = detect_challenge(response.status, &response.headers, &response.text())
            else {
                return Ok(response);
            };

            if !kind.retryable() {
                log::warn!(
                    "shield blocked {} {} ({kind})",
                    request.method,
                    request.url.path()
                );
                return Err(ShieldError::Blocked { kind });
            }

            if attempt >= self.config.max_attempts {
                return Err(ShieldError::ChallengeUnsolved {
                    kind,
                    attempts: attempt,
                });
            }

            let wait = self.backoff(kind, attempt);
            log::info!(
                "shield challenge ({kind}) on {} {}, retrying in {:.1}s (attempt {attempt}/{})",
                request.method,
                request.url.path(),
                wait.as_secs_f32(),
                self.config.max_attempts
            );
            sleep(wait).await;
        }
    }

    /// Exponential backoff with up to 25% random jitter on top.
    fn backoff(&self, kind: ChallengeKind, attempt: usize) -> Duration {
        let base = match kind {
            ChallengeKind::RateLimit => self.config.rate_limit_backoff,
            _ => self.config.challenge_backoff,
        };

        let exponent = attempt.saturating_sub(1).min(8) as u32;
        let scaled = base.saturating_mul(2u32.saturating_pow(exponent));
        let capped = scaled.min(self.config.max_backoff);

        let jitter = rand::thread_rng().gen_range(0.0..=0.25);
        capped.mul_f64(1.0 + jitter).min(self.config.max_backoff)
    }
}
