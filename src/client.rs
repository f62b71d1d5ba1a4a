use reqwest::blocking::{Client as HttpClient, Request};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::query::{Fields, ListQuery};

/// Blocking client for the `/api/resource` endpoints of a Frappe site.
///
/// Cloning is cheap; clones share the connection pool and auth header.
#[derive(Debug, Clone)]
pub struct Client {
    base: Url,
    verify: bool,
    http: HttpClient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    fn as_http(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

#[derive(Debug)]
enum Payload {
    Empty,
    Query(Vec<(&'static str, String)>),
    Json(Value),
}

impl Client {
    /// Creates a client for `url`, loading credentials with
    /// [`Credentials::from_env`](crate::Credentials::from_env).
    pub fn from_env(url: impl Into<String>) -> Result<Self> {
        Self::new(ClientConfig::from_env(url)?)
    }

    /// Builds the HTTP client and its default headers. No request is sent.
    pub fn new(cfg: ClientConfig) -> Result<Self> {
        let base = parse_base_url(&cfg.url)?;

        let mut auth = HeaderValue::from_str(&format!("Basic {}", cfg.credentials.token()))
            .map_err(|e| Error::Config(format!("invalid credentials: {}", e)))?;
        auth.set_sensitive(true);

        let mut default_headers = HeaderMap::new();
        default_headers.insert(AUTHORIZATION, auth);
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("frappe-client-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("frappe-client-rs")),
        );

        let mut builder = HttpClient::builder()
            .default_headers(default_headers)
            .timeout(cfg.timeout);

        if !cfg.verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().map_err(Error::Client)?;

        Ok(Self {
            base,
            verify: cfg.verify,
            http,
        })
    }

    pub fn url(&self) -> &str {
        self.base.as_str()
    }

    pub fn verify(&self) -> bool {
        self.verify
    }

    /// Fetches one document with all of its fields.
    pub fn get_document(&self, doctype: &str, name: &str) -> Result<Value> {
        self.get_document_with_fields(doctype, name, &Fields::All)
    }

    pub fn get_document_with_fields(
        &self,
        doctype: &str,
        name: &str,
        fields: &Fields,
    ) -> Result<Value> {
        self.dispatch(
            Method::Get,
            &[doctype, name],
            Payload::Query(vec![("fields", fields.to_param())]),
        )
    }

    /// Creates a document. `payload` must carry every field the doctype requires.
    pub fn create_document<T: Serialize + ?Sized>(&self, doctype: &str, payload: &T) -> Result<Value> {
        self.dispatch(Method::Post, &[doctype], Payload::Json(serde_json::to_value(payload)?))
    }

    /// Updates the fields present in `payload`; other fields are left untouched.
    pub fn update_document<T: Serialize + ?Sized>(
        &self,
        doctype: &str,
        name: &str,
        payload: &T,
    ) -> Result<Value> {
        self.dispatch(
            Method::Put,
            &[doctype, name],
            Payload::Json(serde_json::to_value(payload)?),
        )
    }

    pub fn delete_document(&self, doctype: &str, name: &str) -> Result<Value> {
        self.dispatch(Method::Delete, &[doctype, name], Payload::Empty)
    }

    /// Lists documents of `doctype`. The server wraps the rows in a `data` array.
    pub fn list_documents(&self, doctype: &str, query: &ListQuery) -> Result<Value> {
        self.dispatch(Method::Get, &[doctype], Payload::Query(query.to_params()?))
    }

    fn endpoint(&self, path: &[&str]) -> Result<Url> {
        // The url crate drops "." and ".." segments, which would retarget the request.
        if let Some(bad) = path.iter().find(|s| matches!(s.trim(), "" | "." | "..")) {
            return Err(Error::Config(format!(
                "invalid doctype or document name {:?}",
                bad
            )));
        }
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("base url cannot carry a path: {}", self.base)))?
            .pop_if_empty()
            .extend(["api", "resource"])
            .extend(path);
        Ok(url)
    }

    fn build_request(&self, method: Method, path: &[&str], payload: Payload) -> Result<Request> {
        let url = self.endpoint(path)?;
        let req = self.http.request(method.as_http(), url.clone());
        let req = match payload {
            Payload::Empty => req,
            Payload::Query(params) => req.query(&params),
            Payload::Json(body) => req.body(serde_json::to_vec(&body)?),
        };
        req.build().map_err(Error::Request)
    }

    fn dispatch(&self, method: Method, path: &[&str], payload: Payload) -> Result<Value> {
        let request = self.build_request(method, path, payload)?;
        let url = request.url().to_string();
        debug!(method = %request.method(), %url, "sending API request");

        let resp = self
            .http
            .execute(request)
            .map_err(|source| Error::Transport {
                url: url.clone(),
                source,
            })?;

        let status = resp.status();
        debug!(%url, %status, "received API response");

        if !status.is_success() {
            // A truncated error body still reports the status.
            let text = resp.text().unwrap_or_default();
            return Err(Error::from_status(status, &url, text));
        }

        let text = resp.text().map_err(|source| Error::Transport {
            url: url.clone(),
            source,
        })?;

        serde_json::from_str(&text).map_err(|source| Error::Decode {
            url,
            status,
            body: text,
            source,
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| Error::Config(format!("invalid base url {:?}: {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(Error::Config(format!("base url cannot carry a path: {}", raw)));
    }
    Ok(url)
}
