//! Blocking client for the MaxCDN REST API.
//!
//! # Overview
//! Turns method calls into OAuth 1.0a signed HTTP requests against
//! `https://rws.netdna.com/<alias>/...`, decodes the JSON envelope that
//! comes back, and surfaces either the payload or the vendor's structured
//! error.
//!
//! # Design
//! - `Client` holds the alias, the signer and an `Arc<dyn Transport>`; it is
//!   immutable apart from transport injection during setup.
//! - Each call is `build_request` → `Transport::send` → `parse_response`, so
//!   the pure halves are testable without a network.
//! - `purge_zones` fans out one scoped thread per zone and joins them all
//!   before returning.
//!
//! ```no_run
//! use maxcdn_core::{Client, Form};
//!
//! let client = Client::new("alias", "token", "secret")?;
//! let account = client.get("/account.json", None)?;
//! println!("{:?}", account.get("data"));
//!
//! client.put("/account.json", Some(&Form::from([("name", "foo")])))?;
//! client.purge_file(123456, "/master.css")?;
//! # Ok::<(), maxcdn_core::Error>(())
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod form;
pub mod http;
pub mod oauth;
pub mod purge;
pub mod response;

#[cfg(test)]
mod test_support;

pub use client::Client;
pub use config::{Config, API_ROOT, CONTENT_TYPE, USER_AGENT};
pub use error::{Error, Result};
pub use form::Form;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError, UreqTransport};
pub use oauth::{Credentials, OAuthSigner};
pub use purge::{PurgeOutcome, PurgeResult};
pub use response::{ApiErrorBody, Response};
