//! Process-wide constants and environment-driven configuration.

use crate::error::{Error, Result};

/// Root of the vendor REST API.
pub const API_ROOT: &str = "https://rws.netdna.com";

pub const USER_AGENT: &str = "Rust MaxCDN API Client";

pub const CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

pub const ENV_ALIAS: &str = "MAXCDN_ALIAS";
pub const ENV_TOKEN: &str = "MAXCDN_TOKEN";
pub const ENV_SECRET: &str = "MAXCDN_SECRET";
pub const ENV_API_ROOT: &str = "MAXCDN_API_ROOT";

/// Account settings needed to construct a `Client`.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub alias: String,
    pub token: String,
    pub secret: String,
    pub api_root: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("alias", &self.alias)
            .field("token", &self.token)
            .field("secret", &"<redacted>")
            .field("api_root", &self.api_root)
            .finish()
    }
}

impl Config {
    pub fn new(alias: &str, token: &str, secret: &str) -> Self {
        Self {
            alias: alias.to_string(),
            token: token.to_string(),
            secret: secret.to_string(),
            api_root: API_ROOT.to_string(),
        }
    }

    /// Read `MAXCDN_ALIAS`, `MAXCDN_TOKEN`, `MAXCDN_SECRET` and the optional
    /// `MAXCDN_API_ROOT` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::Config(format!("{key} is not set")))
        };

        Ok(Self {
            alias: required(ENV_ALIAS)?,
            token: required(ENV_TOKEN)?,
            secret: required(ENV_SECRET)?,
            api_root: lookup(ENV_API_ROOT)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| API_ROOT.to_string()),
        })
    }
}
