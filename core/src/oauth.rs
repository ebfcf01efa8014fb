//! OAuth 1.0a (RFC 5849) HMAC-SHA1 request signing.
//!
//! The API is two-legged: requests are signed with the consumer credentials
//! only. Token credentials are supported for completeness and for checking
//! against published signing examples.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha1::Sha1;
use url::{Position, Url};
use uuid::Uuid;

use crate::error::Error;
use crate::form::Form;
use crate::http::HttpMethod;

/// Everything outside the RFC 3986 unreserved set: ALPHA / DIGIT / "-" / "." / "_" / "~"
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// A token/secret pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &self.token)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Produces `Authorization` header values for signed requests.
#[derive(Debug, Clone)]
pub struct OAuthSigner {
    consumer: Credentials,
    token: Option<Credentials>,
}

impl OAuthSigner {
    pub fn new(consumer: Credentials) -> Self {
        Self {
            consumer,
            token: None,
        }
    }

    #[must_use]
    pub fn with_token(mut self, token: Credentials) -> Self {
        self.token = Some(token);
        self
    }

    pub fn consumer(&self) -> &Credentials {
        &self.consumer
    }

    /// Sign a request with a fresh nonce and the current time.
    ///
    /// Query parameters already present on `url` are always part of the
    /// signature. `form` is folded in only when the caller passes it, which
    /// the client does for POST bodies alone.
    pub fn authorization_header(
        &self,
        method: HttpMethod,
        url: &Url,
        form: Option<&Form>,
    ) -> Result<String, Error> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::Signature(format!("system clock before UNIX epoch: {e}")))?
            .as_secs();
        let nonce = Uuid::new_v4().simple().to_string();
        self.sign_with(method, url, form, &nonce, timestamp)
    }

    /// Deterministic signing with a caller-supplied nonce and timestamp.
    pub fn sign_with(
        &self,
        method: HttpMethod,
        url: &Url,
        form: Option<&Form>,
        nonce: &str,
        timestamp: u64,
    ) -> Result<String, Error> {
        let mut oauth_params = vec![
            ("oauth_consumer_key", self.consumer.token.clone()),
            ("oauth_nonce", nonce.to_string()),
            ("oauth_signature_method", "HMAC-SHA1".to_string()),
            ("oauth_timestamp", timestamp.to_string()),
        ];
        if let Some(token) = &self.token {
            oauth_params.push(("oauth_token", token.token.clone()));
        }
        oauth_params.push(("oauth_version", "1.0".to_string()));

        let base = base_string(method, url, &oauth_params, form);
        let key = format!(
            "{}&{}",
            encode(&self.consumer.secret),
            encode(self.token.as_ref().map_or("", |t| t.secret.as_str()))
        );
        let signature = hmac_sha1(&key, &base)?;
        oauth_params.push(("oauth_signature", signature));

        let header = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("OAuth {header}"))
    }
}

/// Signature base string, RFC 5849 section 3.4.1.
fn base_string(
    method: HttpMethod,
    url: &Url,
    oauth_params: &[(&str, String)],
    form: Option<&Form>,
) -> String {
    let mut params: Vec<(String, String)> = oauth_params
        .iter()
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    params.extend(url.query_pairs().map(|(k, v)| (encode(&k), encode(&v))));
    if let Some(form) = form {
        params.extend(form.iter().map(|(k, v)| (encode(k), encode(v))));
    }
    params.sort();

    let normalized = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    // Url drops default ports on parse, so this is already the base string URI.
    let base_uri = &url[..Position::AfterPath];

    format!(
        "{}&{}&{}",
        method.as_str(),
        encode(base_uri),
        encode(&normalized)
    )
}

fn encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE_SET).to_string()
}

fn hmac_sha1(key: &str, data: &str) -> Result<String, Error> {
    type HmacSha1 = Hmac<Sha1>;

    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).map_err(|e| Error::Signature(e.to_string()))?;
    mac.update(data.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}
