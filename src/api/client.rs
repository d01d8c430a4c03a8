//! Purpose: Send API requests and turn replies into `Response` envelopes.
//! Exports: `Client`, `Transport`, `UreqTransport`, `HttpRequest`.
//! Role: Only component that performs I/O; everything it returns is casting-ready.
//! Invariants: Every request carries an access token before it reaches the transport.
//! Invariants: Error payloads are raised as `ErrorKind::Api` by `send`.
//! Invariants: HTTP error statuses are data; only transport failures are `Io` errors.
#![allow(clippy::result_large_err)]

use super::config::Config;
use super::response::{RawResponse, Response};
use super::token::{AccessToken, App};
use crate::core::edge::{Edge, PageDirection};
use crate::core::error::{Error, ErrorKind};
use crate::core::request::{Method, Request};
use crate::core::subtype::SubtypeRegistry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

type ApiResult<T> = Result<T, Error>;

/// A fully prepared HTTP exchange, ready for a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> ApiResult<RawResponse>;
}

#[derive(Clone, Debug)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent }
    }

    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(super::config::DEFAULT_TIMEOUT_SECS))
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> ApiResult<RawResponse> {
        let mut call = self
            .agent
            .request(request.method.as_str(), &request.url)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            call = call.set(name, value);
        }
        let result = match &request.body {
            Some(body) => call.send_string(body),
            None => call.call(),
        };
        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(err)) => {
                return Err(Error::new(ErrorKind::Io)
                    .with_message("request failed")
                    .with_endpoint(request.url.clone())
                    .with_source(err));
            }
        };
        read_raw_response(response)
    }
}

fn read_raw_response(response: ureq::Response) -> ApiResult<RawResponse> {
    let status = response.status();
    let headers = response
        .headers_names()
        .into_iter()
        .filter_map(|name| {
            let value = response.header(&name)?.to_string();
            Some((name, value))
        })
        .collect();
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read response body")
            .with_source(err)
    })?;
    Ok(RawResponse {
        status,
        headers,
        body,
    })
}

#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: Config,
    base_url: String,
    app: App,
    access_token: Option<AccessToken>,
    registry: Arc<SubtypeRegistry>,
    transport: Arc<dyn Transport>,
    request_count: AtomicU64,
}

impl ClientInner {
    fn rebuild(&self) -> Self {
        Self {
            config: self.config.clone(),
            base_url: self.base_url.clone(),
            app: self.app.clone(),
            access_token: self.access_token.clone(),
            registry: self.registry.clone(),
            transport: self.transport.clone(),
            request_count: AtomicU64::new(self.request_count.load(Ordering::Relaxed)),
        }
    }
}

impl Client {
    pub fn new(config: Config) -> ApiResult<Self> {
        config.validate()?;
        let app = config.app()?;
        let base_url = config
            .parsed_base_url()?
            .as_str()
            .trim_end_matches('/')
            .to_string();
        let transport: Arc<dyn Transport> = Arc::new(UreqTransport::new(config.timeout()));
        let access_token = config.access_token();
        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                base_url,
                app,
                access_token,
                registry: Arc::new(SubtypeRegistry::builtin()),
                transport,
                request_count: AtomicU64::new(0),
            }),
        })
    }

    pub fn with_transport(self, transport: Arc<dyn Transport>) -> Self {
        self.update(|inner| inner.transport = transport)
    }

    pub fn with_registry(self, registry: Arc<SubtypeRegistry>) -> Self {
        self.update(|inner| inner.registry = registry)
    }

    pub fn with_access_token(self, token: impl Into<AccessToken>) -> Self {
        let token = token.into();
        self.update(|inner| inner.access_token = Some(token))
    }

    fn update(mut self, apply: impl FnOnce(&mut ClientInner)) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            apply(inner);
        } else {
            let mut inner = self.inner.rebuild();
            apply(&mut inner);
            self.inner = Arc::new(inner);
        }
        self
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn app(&self) -> &App {
        &self.inner.app
    }

    pub fn default_access_token(&self) -> Option<&AccessToken> {
        self.inner.access_token.as_ref()
    }

    pub fn registry(&self) -> &Arc<SubtypeRegistry> {
        &self.inner.registry
    }

    /// Requests handed to the transport by this client so far.
    pub fn request_count(&self) -> u64 {
        self.inner.request_count.load(Ordering::Relaxed)
    }

    /// Builds a request with the default token and API version applied.
    pub fn request<K, V>(
        &self,
        method: Method,
        endpoint: &str,
        params: impl IntoIterator<Item = (K, V)>,
    ) -> ApiResult<Request>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut request =
            Request::new(method, endpoint)?.with_api_version(self.inner.config.api_version_prefix());
        if request.access_token().is_none() {
            if let Some(token) = &self.inner.access_token {
                request = request.with_access_token(token.value());
            }
        }
        request.with_params(params)
    }

    pub fn get<K, V>(&self, endpoint: &str, params: impl IntoIterator<Item = (K, V)>) -> ApiResult<Response>
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.send(self.request(Method::Get, endpoint, params)?)
    }

    pub fn post<K, V>(&self, endpoint: &str, params: impl IntoIterator<Item = (K, V)>) -> ApiResult<Response>
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.send(self.request(Method::Post, endpoint, params)?)
    }

    pub fn delete<K, V>(&self, endpoint: &str, params: impl IntoIterator<Item = (K, V)>) -> ApiResult<Response>
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.send(self.request(Method::Delete, endpoint, params)?)
    }

    pub fn prepare(&self, request: &Request) -> HttpRequest {
        let mut headers = request.headers();
        headers.push((
            "Content-Type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        ));
        headers.push(("Accept".to_string(), "application/json".to_string()));
        if let Some(token) = request.access_token() {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        let body = (request.method() == Method::Post).then(|| request.url_encoded_body());
        HttpRequest {
            method: request.method(),
            url: format!("{}{}", self.inner.base_url, request.url()),
            headers,
            body,
            timeout: self.inner.config.timeout(),
        }
    }

    /// Sends `request`; an error payload in the reply fails with `ErrorKind::Api`.
    pub fn send(&self, request: Request) -> ApiResult<Response> {
        request.validate_access_token()?;
        let http = self.prepare(&request);
        debug!(method = %request.method(), endpoint = %request.endpoint(), "sending request");
        let raw = self
            .inner
            .transport
            .send(&http)
            .map_err(|err| {
                if err.endpoint().is_some() {
                    return err;
                }
                err.with_endpoint(request.endpoint().to_string())
            })?;
        self.inner.request_count.fetch_add(1, Ordering::Relaxed);
        debug!(status = raw.status, bytes = raw.body.len(), "received response");
        Response::new(Some(Arc::new(request)), raw, self.inner.registry.clone()).into_result()
    }

    pub fn next_page(&self, edge: &Edge) -> ApiResult<Option<Response>> {
        self.page(edge, PageDirection::Next)
    }

    pub fn previous_page(&self, edge: &Edge) -> ApiResult<Option<Response>> {
        self.page(edge, PageDirection::Previous)
    }

    fn page(&self, edge: &Edge, direction: PageDirection) -> ApiResult<Option<Response>> {
        match edge.pagination_request(direction)? {
            Some(request) => self.send(request).map(Some),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url)
            .field("app", &self.inner.app)
            .field("request_count", &self.request_count())
            .finish()
    }
}
