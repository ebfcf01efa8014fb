use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use axum::{
    body::Bytes,
    extract::{Path, Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: u64,
    pub name: String,
    pub alias: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullZone {
    pub id: u64,
    pub name: String,
    pub url: String,
}

/// One cache purge received by the server. `files` is empty for a
/// whole-zone purge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purge {
    pub zone: u64,
    pub files: Vec<String>,
}

#[derive(Debug)]
struct Store {
    account: Account,
    zones: BTreeMap<u64, PullZone>,
    next_zone_id: u64,
    purges: Vec<Purge>,
}

/// Shared state of the mock API. Clones observe the same data.
#[derive(Clone, Debug)]
pub struct MockCdn {
    store: Arc<RwLock<Store>>,
}

impl Default for MockCdn {
    fn default() -> Self {
        Self::new("alias")
    }
}

impl MockCdn {
    pub fn new(alias: &str) -> Self {
        let store = Store {
            account: Account {
                id: 1,
                name: "Mock Account".to_string(),
                alias: alias.to_string(),
            },
            zones: BTreeMap::new(),
            next_zone_id: 100_000,
            purges: Vec::new(),
        };
        Self {
            store: Arc::new(RwLock::new(store)),
        }
    }

    /// Seed a pull zone with a fixed id.
    pub fn with_zone(self, id: u64, name: &str) -> Self {
        self.write().zones.insert(
            id,
            PullZone {
                id,
                name: name.to_string(),
                url: format!("http://{name}.example.com"),
            },
        );
        self
    }

    pub fn purges(&self) -> Vec<Purge> {
        self.read().purges.clone()
    }

    pub fn zones(&self) -> Vec<PullZone> {
        self.read().zones.values().cloned().collect()
    }

    pub fn account(&self) -> Account {
        self.read().account.clone()
    }

    // Handlers never hold the lock across an await, and a panicked writer
    // leaves the store consistent enough for a test double.
    fn read(&self) -> RwLockReadGuard<'_, Store> {
        self.store.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(|e| e.into_inner())
    }
}

type Reply = (StatusCode, Json<Value>);

fn success(status: StatusCode, data: Value) -> Reply {
    (
        status,
        Json(json!({ "code": status.as_u16(), "data": data })),
    )
}

fn failure(status: StatusCode, kind: &str, message: impl Into<String>) -> Reply {
    (
        status,
        Json(json!({
            "code": status.as_u16(),
            "error": { "type": kind, "message": message.into() },
        })),
    )
}

fn parse_form(body: &[u8]) -> Vec<(String, String)> {
    url::form_urlencoded::parse(body)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn form_value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
    form.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

pub fn app() -> Router {
    router(MockCdn::default())
}

pub fn router(cdn: MockCdn) -> Router {
    Router::new()
        .route("/{alias}/account.json", get(get_account).put(update_account))
        .route("/{alias}/zones/pull.json", get(list_zones).post(create_zone))
        .route(
            "/{alias}/zones/pull.json/{zone}",
            get(get_zone).put(update_zone).delete(delete_zone),
        )
        .route("/{alias}/zones/pull.json/{zone}/cache", delete(purge_cache))
        .layer(middleware::from_fn(require_oauth))
        .with_state(cdn)
}

pub async fn serve(listener: TcpListener, cdn: MockCdn) -> Result<(), std::io::Error> {
    axum::serve(listener, router(cdn)).await
}

async fn require_oauth(request: Request, next: Next) -> Response {
    let signed = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("OAuth ") && v.contains("oauth_signature="));

    if !signed {
        debug!(uri = %request.uri(), "rejecting unsigned request");
        return failure(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing OAuth authorization",
        )
        .into_response();
    }
    next.run(request).await
}

fn check_alias(cdn: &MockCdn, alias: &str) -> Result<(), Reply> {
    if cdn.read().account.alias == alias {
        Ok(())
    } else {
        Err(failure(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("unknown alias {alias}"),
        ))
    }
}

fn zone_not_found(zone: u64) -> Reply {
    failure(
        StatusCode::NOT_FOUND,
        "not_found",
        format!("pull zone {zone} does not exist"),
    )
}

async fn get_account(State(cdn): State<MockCdn>, Path(alias): Path<String>) -> Reply {
    if let Err(reply) = check_alias(&cdn, &alias) {
        return reply;
    }
    success(StatusCode::OK, json!({ "account": cdn.account() }))
}

async fn update_account(
    State(cdn): State<MockCdn>,
    Path(alias): Path<String>,
    body: Bytes,
) -> Reply {
    if let Err(reply) = check_alias(&cdn, &alias) {
        return reply;
    }
    let form = parse_form(&body);
    let mut store = cdn.write();
    if let Some(name) = form_value(&form, "name") {
        store.account.name = name.to_string();
    }
    success(StatusCode::OK, json!({ "account": store.account }))
}

async fn list_zones(State(cdn): State<MockCdn>, Path(alias): Path<String>) -> Reply {
    if let Err(reply) = check_alias(&cdn, &alias) {
        return reply;
    }
    let zones = cdn.zones();
    success(
        StatusCode::OK,
        json!({ "pullzones": zones, "total": zones.len() }),
    )
}

async fn create_zone(
    State(cdn): State<MockCdn>,
    Path(alias): Path<String>,
    body: Bytes,
) -> Reply {
    if let Err(reply) = check_alias(&cdn, &alias) {
        return reply;
    }
    let form = parse_form(&body);
    let Some(name) = form_value(&form, "name") else {
        return failure(StatusCode::BAD_REQUEST, "validation_error", "name is required");
    };

    let mut store = cdn.write();
    let id = store.next_zone_id;
    store.next_zone_id += 1;
    let zone = PullZone {
        id,
        name: name.to_string(),
        url: form_value(&form, "url")
            .map(str::to_string)
            .unwrap_or_else(|| format!("http://{name}.example.com")),
    };
    store.zones.insert(id, zone.clone());
    info!(id, name, "created pull zone");
    success(StatusCode::CREATED, json!({ "pullzone": zone }))
}

async fn get_zone(
    State(cdn): State<MockCdn>,
    Path((alias, zone)): Path<(String, u64)>,
) -> Reply {
    if let Err(reply) = check_alias(&cdn, &alias) {
        return reply;
    }
    match cdn.read().zones.get(&zone) {
        Some(found) => success(StatusCode::OK, json!({ "pullzone": found })),
        None => zone_not_found(zone),
    }
}

async fn update_zone(
    State(cdn): State<MockCdn>,
    Path((alias, zone)): Path<(String, u64)>,
    body: Bytes,
) -> Reply {
    if let Err(reply) = check_alias(&cdn, &alias) {
        return reply;
    }
    let form = parse_form(&body);
    let mut store = cdn.write();
    let Some(found) = store.zones.get_mut(&zone) else {
        return zone_not_found(zone);
    };
    if let Some(name) = form_value(&form, "name") {
        found.name = name.to_string();
    }
    if let Some(url) = form_value(&form, "url") {
        found.url = url.to_string();
    }
    success(StatusCode::OK, json!({ "pullzone": found }))
}

async fn delete_zone(
    State(cdn): State<MockCdn>,
    Path((alias, zone)): Path<(String, u64)>,
) -> Reply {
    if let Err(reply) = check_alias(&cdn, &alias) {
        return reply;
    }
    match cdn.write().zones.remove(&zone) {
        Some(_) => success(StatusCode::OK, json!({})),
        None => zone_not_found(zone),
    }
}

async fn purge_cache(
    State(cdn): State<MockCdn>,
    Path((alias, zone)): Path<(String, u64)>,
    body: Bytes,
) -> Reply {
    if let Err(reply) = check_alias(&cdn, &alias) {
        return reply;
    }
    let mut store = cdn.write();
    if !store.zones.contains_key(&zone) {
        return zone_not_found(zone);
    }

    let files: Vec<String> = parse_form(&body)
        .into_iter()
        .filter(|(k, _)| k == "file" || k == "files[]")
        .map(|(_, v)| v)
        .collect();
    info!(zone, files = files.len(), "purged cache");
    store.purges.push(Purge { zone, files });
    success(StatusCode::OK, json!({}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_shape() {
        let (status, Json(body)) = success(StatusCode::CREATED, json!({ "id": 1 }));
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["code"], 201);
        assert_eq!(body["data"]["id"], 1);
        assert!(body.get("error").is_none());
    }

    #[test]
    fn failure_envelope_shape() {
        let (status, Json(body)) = failure(StatusCode::NOT_FOUND, "not_found", "gone");
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["type"], "not_found");
        assert_eq!(body["error"]["message"], "gone");
    }

    #[test]
    fn parse_form_decodes_repeated_keys() {
        let form = parse_form(b"files%5B%5D=%2Fa.css&files%5B%5D=%2Fb.js&name=a+b");
        assert_eq!(
            form,
            vec![
                ("files[]".to_string(), "/a.css".to_string()),
                ("files[]".to_string(), "/b.js".to_string()),
                ("name".to_string(), "a b".to_string()),
            ]
        );
        assert_eq!(form_value(&form, "name"), Some("a b"));
        assert_eq!(form_value(&form, "missing"), None);
    }

    #[test]
    fn seeded_zones_are_listed() {
        let cdn = MockCdn::new("acme").with_zone(7, "static");
        assert_eq!(cdn.account().alias, "acme");
        assert_eq!(cdn.zones().len(), 1);
        assert_eq!(cdn.zones()[0].url, "http://static.example.com");
        assert!(cdn.purges().is_empty());
    }

    #[test]
    fn clones_share_state() {
        let cdn = MockCdn::default();
        let other = cdn.clone().with_zone(1, "one");
        assert_eq!(cdn.zones(), other.zones());
    }
}
