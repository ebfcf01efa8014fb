//! Signed request pipeline for the MaxCDN REST API.
//!
//! # Design
//! Every call is split into three steps: `build_request` produces a fully
//! signed `HttpRequest`, the configured `Transport` performs the round-trip,
//! and `parse_response` turns the `HttpResponse` into a `Response` or an
//! `Error`. The first and last steps are pure, so they can be exercised
//! without a network.
//!
//! Form placement depends on the verb. GET puts the form in the query string,
//! which OAuth canonicalizes on its own. POST, PUT and DELETE send it as the
//! body, and only POST folds the body into the signature.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::{Config, API_ROOT, CONTENT_TYPE, USER_AGENT};
use crate::error::{Error, Result};
use crate::form::Form;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::oauth::{Credentials, OAuthSigner};
use crate::response::Response;

/// Blocking client bound to one account alias.
///
/// Cheap to clone; clones share the transport. Safe to use from several
/// threads at once as long as the transport is, which `Transport` requires.
#[derive(Clone)]
pub struct Client {
    alias: String,
    api_root: String,
    signer: OAuthSigner,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("alias", &self.alias)
            .field("api_root", &self.api_root)
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client for `alias` using the default `UreqTransport`.
    pub fn new(alias: &str, token: &str, secret: &str) -> Result<Self> {
        for (name, value) in [("alias", alias), ("token", token), ("secret", secret)] {
            if value.trim().is_empty() {
                return Err(Error::InvalidArgument(format!("{name} must not be empty")));
            }
        }

        Ok(Self {
            alias: alias.to_string(),
            api_root: API_ROOT.to_string(),
            signer: OAuthSigner::new(Credentials::new(token, secret)),
            transport: Arc::new(UreqTransport::new()),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.alias, &config.token, &config.secret)?.with_api_root(&config.api_root)
    }

    /// Build a client from `MAXCDN_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_config(&Config::from_env()?)
    }

    /// Point the client at a different API root, e.g. a local mock.
    pub fn with_api_root(mut self, api_root: &str) -> Result<Self> {
        let root = api_root.trim_end_matches('/');
        let parsed = Url::parse(root)
            .map_err(|e| Error::InvalidArgument(format!("invalid api root {api_root:?}: {e}")))?;
        if parsed.cannot_be_a_base() || parsed.query().is_some() {
            return Err(Error::InvalidArgument(format!(
                "api root must be a plain base url: {api_root:?}"
            )));
        }
        self.api_root = root.to_string();
        Ok(self)
    }

    #[must_use]
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    /// Swap the transport in place. Meant for test setup, not for use while
    /// other threads hold a reference to this client.
    pub fn set_transport(&mut self, transport: impl Transport + 'static) {
        self.transport = Arc::new(transport);
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    pub fn credentials(&self) -> &Credentials {
        self.signer.consumer()
    }

    /// `<api root>/<alias>/<endpoint>`, with leading slashes on `endpoint`
    /// collapsed. No percent-encoding is applied.
    pub fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}/{}",
            self.api_root,
            self.alias,
            endpoint.trim_start_matches('/')
        )
    }

    pub fn get(&self, endpoint: &str, form: Option<&Form>) -> Result<Response> {
        self.request(HttpMethod::Get, endpoint, form)
    }

    pub fn post(&self, endpoint: &str, form: Option<&Form>) -> Result<Response> {
        self.request(HttpMethod::Post, endpoint, form)
    }

    pub fn put(&self, endpoint: &str, form: Option<&Form>) -> Result<Response> {
        self.request(HttpMethod::Put, endpoint, form)
    }

    pub fn delete(&self, endpoint: &str, form: Option<&Form>) -> Result<Response> {
        self.request(HttpMethod::Delete, endpoint, form)
    }

    /// Build, send and decode one request.
    #[instrument(skip(self, form), fields(alias = %self.alias))]
    pub fn request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        form: Option<&Form>,
    ) -> Result<Response> {
        let request = self.build_request(method, endpoint, form)?;
        self.execute(request)
    }

    /// Produce the signed request for `method` on `endpoint` without sending
    /// it.
    pub fn build_request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        form: Option<&Form>,
    ) -> Result<HttpRequest> {
        let raw = self.url(endpoint);
        let mut url = Url::parse(&raw)
            .map_err(|e| Error::InvalidArgument(format!("invalid url {raw:?}: {e}")))?;

        if method == HttpMethod::Get && url.query().is_some_and(|q| !q.is_empty()) {
            return Err(Error::AmbiguousQuery { url: raw });
        }

        let mut body = None;
        if let Some(form) = form {
            let encoded = form.encode();
            if method == HttpMethod::Get {
                url.set_query((!encoded.is_empty()).then_some(encoded.as_str()));
            } else {
                body = Some(encoded);
            }
        }

        // The signature must cover the final URL, so the query goes on first.
        let signed_form = if method == HttpMethod::Post { form } else { None };
        let authorization = self.signer.authorization_header(method, &url, signed_form)?;

        Ok(HttpRequest {
            method,
            url: url.into(),
            headers: vec![
                ("Authorization".to_string(), authorization),
                ("Content-Type".to_string(), CONTENT_TYPE.to_string()),
                ("User-Agent".to_string(), USER_AGENT.to_string()),
            ],
            body,
        })
    }

    /// Send a prepared request through the transport and decode the reply.
    pub fn execute(&self, request: HttpRequest) -> Result<Response> {
        debug!(method = %request.method, url = %request.url, "sending request");
        let response = self.transport.send(request)?;
        debug!(
            status = response.status,
            content_type = response.header("Content-Type").unwrap_or_default(),
            bytes = response.body.len(),
            "received response"
        );
        Self::parse_response(response)
    }

    /// Decode a transport response into an envelope, surfacing API errors.
    ///
    /// A decodable envelope without an `error` is returned as-is whatever the
    /// status, so callers can inspect `Response::status`. Only a non-2xx
    /// body that fails to decode becomes `Error::Http`.
    pub fn parse_response(response: HttpResponse) -> Result<Response> {
        let status = response.status;
        let success = response.is_success();

        let decoded = match Response::decode(status, response.body) {
            Ok(decoded) => decoded,
            Err(Error::Decode { raw, .. }) if !success => {
                return Err(Error::Http {
                    status,
                    body: String::from_utf8_lossy(&raw).into_owned(),
                })
            }
            Err(e) => return Err(e),
        };

        if let Some(api_error) = decoded.error.clone() {
            warn!(
                status,
                kind = %api_error.kind,
                message = %api_error.message,
                "api returned an error envelope"
            );
            return Err(Error::Api {
                kind: api_error.kind,
                message: api_error.message,
                response: Box::new(decoded),
            });
        }

        if !success {
            debug!(status, "non-2xx response without an error envelope");
        }
        Ok(decoded)
    }
}
