//! High level client orchestration.
//!
//! Wires the shield request layer, the authentication flow, and the remote
//! globals registry into one ergonomic client. Every endpoint method funnels
//! through the request core here: bearer attachment, error-envelope parsing,
//! and the single re-login on an expired token.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderValue, Method, header};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{OnceCell, RwLock};
use url::Url;

use crate::auth::{AuthError, Credentials, SessionToken};
use crate::endpoints;
use crate::filters::FilterError;
use crate::registry::{GlobalRegistry, Globals};
use crate::shield::{
    BrowserProfile, ReqwestShieldClient, RequestBody, Shield, ShieldConfig, ShieldError,
    ShieldHttpClient, ShieldRequest, ShieldResponse, random_profile,
};

/// Result alias used across the client surface.
pub type PeerberryResult<T> = Result<T, PeerberryError>;

/// High-level error surfaced by the client.
#[derive(Debug, Error)]
pub enum PeerberryError {
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("request layer error: {0}")]
    Shield(#[from] ShieldError),
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),
    #[error("invalid filter: {0}")]
    Filter(#[from] FilterError),
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("account requires two-factor authentication but no TFA secret was configured")]
    MissingTfaSecret,
    #[error("no credentials configured; supply an email/password or an access token")]
    MissingCredentials,
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("api error (http {status}): {message}")]
    Api { status: u16, message: String },
    #[error("unexpected response shape: {0}")]
    UnexpectedResponse(String),
    #[error("response decoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Client configuration used by the builder.
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub shield: ShieldConfig,
    pub request_timeout: Duration,
    /// Fixed browser identity; a random one is picked when unset.
    pub browser_profile: Option<BrowserProfile>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(endpoints::BASE_URI).expect("static base url"),
            shield: ShieldConfig::default(),
            request_timeout: Duration::from_secs(30),
            browser_profile: None,
        }
    }
}

/// Fluent builder for [`Peerberry`].
pub struct PeerberryBuilder {
    config: ClientConfig,
    credentials: Option<Credentials>,
    access_token: Option<String>,
    transport: Option<Arc<dyn ShieldHttpClient>>,
}

impl PeerberryBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            credentials: None,
            access_token: None,
            transport: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Use a pre-existing JWT instead of (or in addition to) credentials.
    /// Without credentials the client cannot re-login when the token expires.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.config.base_url = base_url;
        self
    }

    pub fn with_shield_config(mut self, shield: ShieldConfig) -> Self {
        self.config.shield = shield;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn with_browser_profile(mut self, profile: BrowserProfile) -> Self {
        self.config.browser_profile = Some(profile);
        self
    }

    /// Substitute the transport, mainly for tests.
    pub fn with_transport(mut self, transport: Arc<dyn ShieldHttpClient>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the client without talking to the API.
    pub fn build(self) -> PeerberryResult<Peerberry> {
        if self.credentials.is_none() && self.access_token.is_none() {
            return Err(PeerberryError::MissingCredentials);
        }

        let profile = self
            .config
            .browser_profile
            .clone()
            .unwrap_or_else(random_profile);

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestShieldClient::new(
                &profile,
                self.config.request_timeout,
            )?),
        };
        let shield = Shield::new(transport, self.config.shield.clone());

        Ok(Peerberry {
            config: self.config,
            credentials: self.credentials,
            shield,
            session: RwLock::new(self.access_token.map(SessionToken::new)),
            globals: OnceCell::new(),
        })
    }

    /// Builds the client and establishes a session: logs in with the
    /// configured credentials, or validates a supplied access token by
    /// fetching the account overview.
    pub async fn connect(self) -> PeerberryResult<Peerberry> {
        let token_supplied = self.access_token.is_some();
        let client = self.build()?;

        if token_supplied {
            client.get_overview().await.map_err(|err| match err {
                // Only auth rejections mean the token is bad; server faults
                // during the validation fetch surface unchanged.
                PeerberryError::Api {
                    status: 401 | 403,
                    message,
                } => {
                    PeerberryError::InvalidCredentials(format!("access token rejected: {message}"))
                }
                other => other,
            })?;
        } else {
            client.login().await?;
        }

        Ok(client)
    }
}

impl Default for PeerberryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Peerberry investor API client.
pub struct Peerberry {
    config: ClientConfig,
    credentials: Option<Credentials>,
    shield: Shield,
    session: RwLock<Option<SessionToken>>,
    globals: OnceCell<GlobalRegistry>,
}

impl Peerberry {
    /// Obtain a builder to configure a client instance.
    pub fn builder() -> PeerberryBuilder {
        PeerberryBuilder::new()
    }

    /// Shortcut for a credentials-backed client against the production API.
    /// Logs in before returning.
    pub async fn connect(credentials: Credentials) -> PeerberryResult<Self> {
        PeerberryBuilder::new()
            .with_credentials(credentials)
            .connect()
            .await
    }

    /// Currently held access token, if a session is established.
    pub async fn access_token(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|token| token.access_token().to_string())
    }

    /// Authenticates with the configured credentials and stores the session
    /// token. Accounts with two-factor enabled answer the login with a
    /// `tfa_token`; the one-time code step follows immediately.
    pub async fn login(&self) -> PeerberryResult<String> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(PeerberryError::MissingCredentials)?;
        self.login_with(credentials).await
    }

    async fn login_with(&self, credentials: &Credentials) -> PeerberryResult<String> {
        if !credentials.has_tfa_secret() {
            log::warn!("logging in without two-factor authentication; enabling it is recommended");
        }

        let form = vec![
            ("email".to_string(), credentials.email.clone()),
            ("password".to_string(), credentials.password().to_string()),
        ];
        let response = self
            .issue(
                Method::POST,
                self.endpoint_url(endpoints::LOGIN, &[])?,
                Some(RequestBody::Form(form)),
                false,
            )
            .await?;

        if response.status >= 400 {
            return Err(PeerberryError::InvalidCredentials(error_message(&response)));
        }

        let payload: Value = serde_json::from_slice(&response.body)?;
        if let Some(access_token) = payload.get("access_token").and_then(Value::as_str) {
            return Ok(self.store_session(access_token).await);
        }

        let tfa_token = payload
            .get("tfa_token")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PeerberryError::UnexpectedResponse(
                    "login response carried neither access_token nor tfa_token".to_string(),
                )
            })?;

        let code = credentials
            .totp_code()?
            .ok_or(PeerberryError::MissingTfaSecret)?;

        let tfa_form = vec![
            ("code".to_string(), code),
            ("tfa_token".to_string(), tfa_token.to_string()),
        ];
        let response = self
            .issue(
                Method::POST,
                self.endpoint_url(endpoints::TFA, &[])?,
                Some(RequestBody::Form(tfa_form)),
                false,
            )
            .await?;

        if response.status >= 400 {
            return Err(PeerberryError::InvalidCredentials(error_message(&response)));
        }

        let payload: Value = serde_json::from_slice(&response.body)?;
        let access_token = payload
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PeerberryError::UnexpectedResponse(
                    "two-factor response carried no access_token".to_string(),
                )
            })?;

        Ok(self.store_session(access_token).await)
    }

    async fn store_session(&self, access_token: &str) -> String {
        let token = SessionToken::new(access_token);
        let bearer = token.bearer();
        *self.session.write().await = Some(token);
        log::info!("session established");
        bearer
    }

    /// Revokes the session server-side and drops the stored token.
    pub async fn logout(&self) -> PeerberryResult<()> {
        let response = self
            .issue(
                Method::GET,
                self.endpoint_url(endpoints::LOGOUT, &[])?,
                None,
                true,
            )
            .await?;
        ensure_success(response)?;

        *self.session.write().await = None;
        log::info!("session closed");
        Ok(())
    }

    /// Country and originator registry, fetched from `/v1/globals` at most
    /// once per client.
    pub(crate) async fn registry(&self) -> PeerberryResult<&GlobalRegistry> {
        self.globals
            .get_or_try_init(|| async {
                let timestamp = chrono::Utc::now().timestamp().to_string();
                let query = [("t".to_string(), timestamp)];
                let url = self.endpoint_url(endpoints::GLOBALS, &query)?;
                let response = ensure_success(self.issue(Method::GET, url, None, false).await?)?;
                let globals: Globals = serde_json::from_slice(&response.body)?;
                Ok(GlobalRegistry::new(globals))
            })
            .await
    }

    // ---- request core -------------------------------------------------

    fn endpoint_url(&self, path: &str, query: &[(String, String)]) -> PeerberryResult<Url> {
        let mut url = self.config.base_url.join(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in query {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }

    async fn issue(
        &self,
        method: Method,
        url: Url,
        body: Option<RequestBody>,
        authorised: bool,
    ) -> PeerberryResult<ShieldResponse> {
        let mut request = ShieldRequest::new(method, url);
        request.headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );

        if authorised
            && let Some(token) = self.session.read().await.as_ref()
        {
            let value = HeaderValue::from_str(&token.bearer()).map_err(|_| {
                PeerberryError::UnexpectedResponse("access token is not header-safe".to_string())
            })?;
            request.headers.insert(header::AUTHORIZATION, value);
        }

        request.body = body;
        Ok(self.shield.execute(&request).await?)
    }

    /// Sends an authorised request. A 401 triggers exactly one re-login
    /// (credentials permitting) before the request is re-issued; the second
    /// answer stands either way.
    pub(crate) async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<RequestBody>,
    ) -> PeerberryResult<ShieldResponse> {
        let url = self.endpoint_url(path, query)?;
        let response = self
            .issue(method.clone(), url.clone(), body.clone(), true)
            .await?;

        if response.status != 401 {
            return Ok(response);
        }

        let Some(credentials) = &self.credentials else {
            return Ok(response);
        };

        log::info!("access token rejected, re-authenticating once");
        self.login_with(credentials).await?;
        self.issue(method, url, body, true).await
    }

    pub(crate) async fn get_value(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> PeerberryResult<Value> {
        let response = ensure_success(self.send(Method::GET, path, query, None).await?)?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    pub(crate) async fn get_typed<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> PeerberryResult<T> {
        let response = ensure_success(self.send(Method::GET, path, query, None).await?)?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    pub(crate) async fn get_bytes(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> PeerberryResult<Bytes> {
        let response = ensure_success(self.send(Method::GET, path, query, None).await?)?;
        Ok(response.body)
    }

    pub(crate) async fn post_form(
        &self,
        path: &str,
        form: Vec<(String, String)>,
    ) -> PeerberryResult<Value> {
        let response = ensure_success(
            self.send(Method::POST, path, &[], Some(RequestBody::Form(form)))
                .await?,
        )?;
        Ok(serde_json::from_slice(&response.body)?)
    }
}

fn ensure_success(response: ShieldResponse) -> PeerberryResult<ShieldResponse> {
    if response.status < 400 {
        return Ok(response);
    }

    Err(PeerberryError::Api {
        status: response.status,
        message: error_message(&response),
    })
}

/// Pulls a human-readable message out of the error envelope. The API answers
/// with `{"errors": [{"message": ...}]}` on most routes, a keyed map on a
/// few older ones, and a bare `{"message": ...}` on login.
fn error_message(response: &ShieldResponse) -> String {
    let fallback = || format!("HTTP {}", response.status);

    let Ok(payload) = serde_json::from_slice::<Value>(&response.body) else {
        return fallback();
    };

    match payload.get("errors") {
        Some(Value::Array(errors)) => errors
            .first()
            .and_then(|entry| entry.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(fallback),
        Some(Value::Object(errors)) => errors
            .values()
            .next()
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(fallback),
        _ => payload
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(fallback),
    }
}

/// Lenient row extraction for listing responses that are either a bare array
/// or an object wrapping a `data` array.
pub(crate) fn rows_from(value: Value) -> PeerberryResult<Vec<Value>> {
    match value {
        Value::Array(rows) => Ok(rows),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(rows)) => Ok(rows),
            _ => Err(PeerberryError::UnexpectedResponse(
                "expected an array or a data-wrapped array".to_string(),
            )),
        },
        _ => Err(PeerberryError::UnexpectedResponse(
            "expected an array or a data-wrapped array".to_string(),
        )),
    }
}
