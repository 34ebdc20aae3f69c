//! Registry client adapter
//!
//! [`RegistryClient`] is the seam the orchestrator and the tests depend on.
//! [`EngineClient`] is the reqwest implementation speaking the Docker Engine
//! HTTP API: `POST /auth` for login and `POST /images/{name}/push` for the
//! streaming push, decoding the JSON-lines body into [`PushEvent`]s at this
//! boundary.

use crate::error::{PushError, Result};
use crate::registry::events::{PushEvent, RawEvent};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use url::Url;

/// Decoded push events, pulled one at a time by the aggregator
pub type EventStream = BoxStream<'static, Result<PushEvent>>;

/// Credentials handed to the registry on login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
}

impl LoginCredentials {
    pub fn new(username: String, password: String, email: Option<String>) -> Self {
        Self {
            username,
            password,
            email,
        }
    }

    /// An API key logs in as the key itself with a single-space placeholder
    /// password and no email.
    pub fn from_apikey(apikey: &str) -> Self {
        Self {
            username: apikey.to_string(),
            password: " ".to_string(),
            email: None,
        }
    }
}

/// Status string the registry reports on a successful login
pub const LOGIN_SUCCEEDED: &str = "Login Succeeded";

/// Login response body
#[derive(Debug, Clone, Deserialize)]
pub struct LoginStatus {
    #[serde(rename = "Status", default)]
    pub status: String,
}

impl LoginStatus {
    pub fn succeeded(&self) -> bool {
        self.status == LOGIN_SUCCEEDED
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushOptions {
    /// Push without certificate validation; login is skipped upstream
    pub insecure_registry: bool,
}

#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn login(&self, credentials: &LoginCredentials, registry: &str) -> Result<LoginStatus>;

    async fn push(&self, repository: &str, tag: &str, options: PushOptions)
    -> Result<EventStream>;
}

#[derive(Serialize)]
struct AuthPayload<'a> {
    username: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    serveraddress: &'a str,
}

pub struct EngineClientBuilder {
    endpoint: String,
    credentials: Option<LoginCredentials>,
    timeout: u64,
}

impl EngineClientBuilder {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            credentials: None,
            timeout: 7200,
        }
    }

    pub fn with_credentials(mut self, credentials: Option<LoginCredentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<EngineClient> {
        // join() below needs a trailing slash to keep the base path intact
        let endpoint = if self.endpoint.ends_with('/') {
            Url::parse(&self.endpoint)?
        } else {
            Url::parse(&format!("{}/", self.endpoint))?
        };
        let http = Client::builder()
            .timeout(Duration::from_secs(self.timeout))
            .build()?;
        Ok(EngineClient {
            http,
            endpoint,
            credentials: self.credentials,
        })
    }
}

/// Docker Engine API client
pub struct EngineClient {
    http: Client,
    endpoint: Url,
    credentials: Option<LoginCredentials>,
}

impl EngineClient {
    pub fn builder(endpoint: &str) -> EngineClientBuilder {
        EngineClientBuilder::new(endpoint)
    }

    /// `X-Registry-Auth` header value: base64 of the auth config JSON, with
    /// the registry host taken from the repository reference.
    fn registry_auth_header(&self, repository: &str) -> Result<String> {
        let registry = repository.split('/').next().unwrap_or_default();
        let payload = match &self.credentials {
            Some(credentials) => serde_json::to_vec(&AuthPayload {
                username: &credentials.username,
                password: &credentials.password,
                email: credentials.email.as_deref(),
                serveraddress: registry,
            })?,
            None => b"{}".to_vec(),
        };
        Ok(BASE64.encode(payload))
    }
}

#[async_trait]
impl RegistryClient for EngineClient {
    async fn login(&self, credentials: &LoginCredentials, registry: &str) -> Result<LoginStatus> {
        let url = self.endpoint.join("auth")?;
        let payload = AuthPayload {
            username: &credentials.username,
            password: &credentials.password,
            email: credentials.email.as_deref(),
            serveraddress: registry,
        };
        let response = self.http.post(url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PushError::Remote(format!(
                "login rejected with status {}: {}",
                status, body
            )));
        }
        Ok(response.json().await?)
    }

    async fn push(
        &self,
        repository: &str,
        tag: &str,
        _options: PushOptions,
    ) -> Result<EventStream> {
        let url = self.endpoint.join(&format!("images/{}/push", repository))?;
        let response = self
            .http
            .post(url)
            .query(&[("tag", tag)])
            .header("X-Registry-Auth", self.registry_auth_header(repository)?)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PushError::Remote(format!(
                "push request failed with status {}: {}",
                status, body
            )));
        }
        Ok(decode_lines(response.bytes_stream()))
    }
}

struct LineDecoder<B> {
    inner: BoxStream<'static, std::result::Result<B, reqwest::Error>>,
    buffer: Vec<u8>,
    pending: VecDeque<Result<PushEvent>>,
    done: bool,
}

impl<B: AsRef<[u8]>> LineDecoder<B> {
    fn feed(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.decode_line(&line[..line.len() - 1]);
        }
    }

    fn flush(&mut self) {
        let trailing = std::mem::take(&mut self.buffer);
        self.decode_line(&trailing);
    }

    fn decode_line(&mut self, line: &[u8]) {
        if line.iter().all(u8::is_ascii_whitespace) {
            return;
        }
        match serde_json::from_slice::<RawEvent>(line) {
            Ok(raw) => {
                if let Some(event) = PushEvent::from_raw(raw) {
                    self.pending.push_back(Ok(event));
                }
            }
            Err(err) => self.pending.push_back(Err(err.into())),
        }
    }
}

/// Split a chunked response body into JSON lines and decode each one
fn decode_lines<S, B>(bytes: S) -> EventStream
where
    S: futures::Stream<Item = std::result::Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let decoder = LineDecoder {
        inner: bytes.boxed(),
        buffer: Vec::new(),
        pending: VecDeque::new(),
        done: false,
    };
    futures::stream::unfold(decoder, |mut decoder| async move {
        loop {
            if let Some(event) = decoder.pending.pop_front() {
                return Some((event, decoder));
            }
            if decoder.done {
                return None;
            }
            match decoder.inner.next().await {
                Some(Ok(chunk)) => decoder.feed(chunk.as_ref()),
                Some(Err(err)) => {
                    decoder.done = true;
                    decoder.pending.push_back(Err(err.into()));
                }
                None => {
                    decoder.done = true;
                    decoder.flush();
                }
            }
        }
    })
    .boxed()
}
