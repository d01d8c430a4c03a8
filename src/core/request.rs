// Outgoing API request values: method, endpoint, token and parameter bookkeeping.
// Requests are plain values; pagination derives new ones via `with_endpoint`.
use crate::core::error::{Error, ErrorKind};
use crate::core::url::{append_params, force_slash_prefix, params_of, remove_params};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use url::form_urlencoded;

pub const ACCESS_TOKEN_PARAM: &str = "access_token";

const USER_AGENT_PREFIX: &str = "steein-rust/";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }

    /// Only retrieval requests can be paginated.
    pub fn is_read_only(self) -> bool {
        matches!(self, Method::Get)
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "DELETE" => Ok(Method::Delete),
            "" => Err(Error::new(ErrorKind::Usage).with_message("http method is not specified")),
            other => Err(Error::new(ErrorKind::Usage)
                .with_message(format!("unsupported http method: {other}"))
                .with_hint("Use GET, POST or DELETE.")),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    method: Method,
    endpoint: String,
    access_token: Option<String>,
    params: BTreeMap<String, String>,
    etag: Option<String>,
    api_version: Option<String>,
}

impl Request {
    pub fn new(method: Method, endpoint: impl AsRef<str>) -> Result<Self, Error> {
        let mut request = Self {
            method,
            endpoint: String::new(),
            access_token: None,
            params: BTreeMap::new(),
            etag: None,
            api_version: None,
        };
        request.set_endpoint(endpoint.as_ref())?;
        Ok(request)
    }

    pub fn get(endpoint: impl AsRef<str>) -> Result<Self, Error> {
        Self::new(Method::Get, endpoint)
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.access_token = (!token.is_empty()).then_some(token);
        self
    }

    pub fn with_api_version(mut self, version: impl AsRef<str>) -> Self {
        let version = force_slash_prefix(version.as_ref().trim_end_matches('/'));
        self.api_version = (!version.is_empty()).then_some(version);
        self
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Merges `params` into the request. An `access_token` entry is moved
    /// onto the request token and must agree with any token already set.
    pub fn with_params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Result<Self, Error>
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in params {
            let key = key.into();
            let value = value.into();
            if key == ACCESS_TOKEN_PARAM {
                self.sync_access_token(value)?;
                continue;
            }
            self.params.insert(key, value);
        }
        Ok(self)
    }

    /// Clones the request onto a new endpoint. Parameters set for the old
    /// endpoint are not carried over; the new endpoint's query is kept.
    pub fn with_endpoint(&self, endpoint: impl AsRef<str>) -> Result<Self, Error> {
        let mut request = self.clone();
        request.params.clear();
        request.set_endpoint(endpoint.as_ref())?;
        Ok(request)
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref()
    }

    /// Fails with `InvalidOperation` for requests that modify data.
    pub fn validate_read_only(&self) -> Result<(), Error> {
        if !self.method.is_read_only() {
            return Err(Error::new(ErrorKind::InvalidOperation)
                .with_message(format!(
                    "operation requires a read-only request, got {}",
                    self.method
                ))
                .with_endpoint(self.endpoint.clone()));
        }
        Ok(())
    }

    pub fn validate_access_token(&self) -> Result<(), Error> {
        if self.access_token.is_none() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("an access token is required")
                .with_endpoint(self.endpoint.clone())
                .with_hint("Pass --token, set STEEIN_ACCESS_TOKEN, or configure default_access_token."));
        }
        Ok(())
    }

    /// Parameters including the access token, as sent on the wire.
    pub fn params_with_token(&self) -> BTreeMap<String, String> {
        let mut params = self.params.clone();
        if let Some(token) = &self.access_token {
            params.insert(ACCESS_TOKEN_PARAM.to_string(), token.clone());
        }
        params
    }

    pub fn post_params(&self) -> BTreeMap<String, String> {
        if self.method == Method::Post {
            return self.params_with_token();
        }
        BTreeMap::new()
    }

    pub fn url_encoded_body(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.post_params() {
            serializer.append_pair(&key, &value);
        }
        serializer.finish()
    }

    /// Version prefix plus endpoint; non-POST requests carry their
    /// parameters in the query string.
    pub fn url(&self) -> String {
        let version = self
            .api_version
            .as_deref()
            .map(force_slash_prefix)
            .unwrap_or_default();
        let url = format!("{version}{}", force_slash_prefix(&self.endpoint));
        if self.method == Method::Post {
            return url;
        }
        append_params(&url, &self.params_with_token())
    }

    pub fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![(
            "User-Agent".to_string(),
            format!("{USER_AGENT_PREFIX}{}", env!("CARGO_PKG_VERSION")),
        )];
        if let Some(etag) = &self.etag {
            headers.push(("If-None-Match".to_string(), etag.clone()));
        }
        headers
    }

    fn set_endpoint(&mut self, endpoint: &str) -> Result<(), Error> {
        if let Some(token) = params_of(endpoint).remove(ACCESS_TOKEN_PARAM) {
            self.sync_access_token(token)?;
        }
        self.endpoint = remove_params(endpoint, &[ACCESS_TOKEN_PARAM]);
        Ok(())
    }

    fn sync_access_token(&mut self, token: String) -> Result<(), Error> {
        match &self.access_token {
            None => {
                self.access_token = (!token.is_empty()).then_some(token);
                Ok(())
            }
            Some(existing) if *existing == token => Ok(()),
            Some(_) => Err(Error::new(ErrorKind::Usage)
                .with_message("access token mismatch between request and parameters")
                .with_endpoint(self.endpoint.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Method, Request};
    use crate::core::error::ErrorKind;

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("get".parse::<Method>().expect("get"), Method::Get);
        assert_eq!("Delete".parse::<Method>().expect("delete"), Method::Delete);
        let err = "PATCH".parse::<Method>().expect_err("patch");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(Method::Get.is_read_only());
        assert!(!Method::Post.is_read_only());
    }

    #[test]
    fn endpoint_token_moves_onto_request() {
        let request = Request::get("/me?access_token=abc&fields=id").expect("request");
        assert_eq!(request.endpoint(), "/me?fields=id");
        assert_eq!(request.access_token(), Some("abc"));
    }

    #[test]
    fn conflicting_tokens_are_rejected() {
        let err = Request::get("/me")
            .expect("request")
            .with_access_token("one")
            .with_params([("access_token", "two")])
            .expect_err("mismatch");
        assert_eq!(err.kind(), ErrorKind::Usage);

        let same = Request::get("/me")
            .expect("request")
            .with_access_token("one")
            .with_params([("access_token", "one")])
            .expect("same token");
        assert!(same.params().is_empty());
    }

    #[test]
    fn get_url_carries_sorted_params_and_token() {
        let request = Request::get("me/posts")
            .expect("request")
            .with_api_version("api/v1/")
            .with_access_token("tok")
            .with_params([("limit", "2"), ("fields", "id")])
            .expect("params");
        assert_eq!(
            request.url(),
            "/api/v1/me/posts?access_token=tok&fields=id&limit=2"
        );
        assert!(request.post_params().is_empty());
    }

    #[test]
    fn post_params_go_to_the_body() {
        let request = Request::new(Method::Post, "/me/feed")
            .expect("request")
            .with_access_token("tok")
            .with_params([("message", "hello world")])
            .expect("params");
        assert_eq!(request.url(), "/me/feed");
        assert_eq!(request.url_encoded_body(), "access_token=tok&message=hello+world");
    }

    #[test]
    fn with_endpoint_drops_old_params_only() {
        let source = Request::get("/me/posts")
            .expect("request")
            .with_api_version("/api/v1")
            .with_access_token("tok")
            .with_etag("\"v1\"")
            .with_params([("limit", "2")])
            .expect("params");
        let next = source
            .with_endpoint("/me/posts?limit=2&after=xyz")
            .expect("next");
        assert_eq!(next.endpoint(), "/me/posts?limit=2&after=xyz");
        assert!(next.params().is_empty());
        assert_eq!(next.method(), source.method());
        assert_eq!(next.access_token(), source.access_token());
        assert_eq!(next.api_version(), source.api_version());
        assert_eq!(next.etag(), source.etag());
        assert_eq!(source.params().len(), 1);
    }

    #[test]
    fn headers_include_etag_when_present() {
        let request = Request::get("/me").expect("request").with_etag("abc");
        let headers = request.headers();
        assert!(headers.iter().any(|(k, v)| k == "If-None-Match" && v == "abc"));
        assert!(headers
            .iter()
            .any(|(k, v)| k == "User-Agent" && v.starts_with("steein-rust/")));
    }

    #[test]
    fn validate_read_only_rejects_writes() {
        assert!(Request::get("/1").expect("request").validate_read_only().is_ok());
        for method in [Method::Post, Method::Delete] {
            let err = Request::new(method, "/1")
                .expect("request")
                .validate_read_only()
                .expect_err("write request");
            assert_eq!(err.kind(), ErrorKind::InvalidOperation);
            assert_eq!(err.endpoint(), Some("/1"));
        }
    }

    #[test]
    fn missing_token_fails_validation() {
        let err = Request::get("/me")
            .expect("request")
            .validate_access_token()
            .expect_err("no token");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}
