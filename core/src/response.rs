//! The JSON envelope every API response arrives in.
//!
//! ```json
//! {"code": 200, "data": {...}}
//! {"code": 404, "error": {"type": "not_found", "message": "..."}}
//! ```
//!
//! The payload is kept as an opaque JSON object; `data` offers typed access
//! for callers that know the shape of a particular endpoint.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

/// The `error` sub-object of an envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
}

impl ApiErrorBody {
    /// Read `type` and `message` from an `error` value.
    ///
    /// Each field is taken leniently: null or missing is empty, strings are
    /// used as-is and other scalars keep their JSON text. Returns `None` for
    /// anything that is not an object.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let field = |name: &str| match object.get(name) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        Some(Self {
            kind: field("type"),
            message: field("message"),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_empty() && self.message.is_empty()
    }
}

/// A decoded API response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// HTTP status reported by the transport.
    pub status: u16,
    /// Payload bytes exactly as received.
    pub raw: Vec<u8>,
    /// Decoded top-level object.
    pub body: Map<String, Value>,
    /// Populated only when the envelope carries a non-empty `error`.
    pub error: Option<ApiErrorBody>,
}

impl Response {
    /// Decode `raw` as a JSON object envelope.
    ///
    /// An empty payload decodes to an empty object, which is what the API
    /// sends for some 2xx replies.
    pub fn decode(status: u16, raw: Vec<u8>) -> Result<Self, Error> {
        let body = if raw.iter().all(u8::is_ascii_whitespace) {
            Map::new()
        } else {
            match serde_json::from_slice::<Map<String, Value>>(&raw) {
                Ok(body) => body,
                Err(source) => return Err(Error::Decode { source, raw }),
            }
        };

        let error = body
            .get("error")
            .and_then(ApiErrorBody::from_value)
            .filter(|e| !e.is_empty());

        Ok(Self {
            status,
            raw,
            body,
            error,
        })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    /// The envelope's own `code` field, when present.
    pub fn code(&self) -> Option<u64> {
        self.body.get("code").and_then(Value::as_u64)
    }

    /// Deserialize the `data` member into `T`.
    pub fn data<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(self.body.get("data").unwrap_or(&Value::Null))
    }
}
