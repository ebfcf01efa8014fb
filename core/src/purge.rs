//! Cache purge operations.
//!
//! # Design
//! `purge_zones` runs one scoped worker thread per zone. Each worker returns
//! its result through its own `JoinHandle`, so there is no shared collection
//! to lock, and the handles are joined in input order before the call
//! returns. A panicking worker is re-raised on the calling thread once every
//! other worker has finished.
//!
//! `purge_files` is a single DELETE whose body repeats `files[]=<path>`, so a
//! batch of files succeeds or fails as one request.

use std::thread;

use tracing::{debug, info_span, warn};

use crate::client::Client;
use crate::error::{Error, Result};
use crate::form::Form;
use crate::response::Response;

fn cache_endpoint(zone: u64) -> String {
    format!("/zones/pull.json/{zone}/cache")
}

/// Result of purging a single zone during a fan-out.
#[derive(Debug)]
pub struct PurgeResult {
    pub zone: u64,
    pub result: Result<Response>,
}

/// Aggregate outcome of `Client::purge_zones`.
///
/// Holds one entry per requested zone, in the order the zones were given.
#[derive(Debug, Default)]
pub struct PurgeOutcome {
    results: Vec<PurgeResult>,
}

impl PurgeOutcome {
    pub fn results(&self) -> &[PurgeResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Envelopes of the zones that were purged successfully.
    pub fn responses(&self) -> impl Iterator<Item = &Response> {
        self.results.iter().filter_map(|r| r.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (u64, &Error)> {
        self.results
            .iter()
            .filter_map(|r| r.result.as_ref().err().map(|e| (r.zone, e)))
    }

    /// First failure in input order, if any zone failed.
    pub fn error(&self) -> Option<&Error> {
        self.failures().next().map(|(_, e)| e)
    }

    pub fn is_success(&self) -> bool {
        self.error().is_none()
    }

    /// Collapse into every envelope, or the first error encountered.
    pub fn into_result(self) -> Result<Vec<Response>> {
        self.results.into_iter().map(|r| r.result).collect()
    }
}

impl IntoIterator for PurgeOutcome {
    type Item = PurgeResult;
    type IntoIter = std::vec::IntoIter<PurgeResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl Client {
    /// Purge every cached object in `zone`.
    pub fn purge_zone(&self, zone: u64) -> Result<Response> {
        self.delete(&cache_endpoint(zone), None)
    }

    /// Purge several zones concurrently, one request per zone.
    ///
    /// Blocks until every request has finished. Timeouts are whatever the
    /// transport enforces.
    pub fn purge_zones(&self, zones: &[u64]) -> PurgeOutcome {
        let span = info_span!("purge_zones", alias = %self.alias(), count = zones.len());
        let _guard = span.enter();

        let results: Vec<PurgeResult> = thread::scope(|scope| {
            let handles: Vec<_> = zones
                .iter()
                .map(|&zone| {
                    let span = span.clone();
                    scope.spawn(move || {
                        let _guard = span.enter();
                        debug!(zone, "purge worker started");
                        PurgeResult {
                            zone,
                            result: self.purge_zone(zone),
                        }
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

        let outcome = PurgeOutcome { results };
        let failed = outcome.failures().count();
        if failed > 0 {
            warn!(failed, total = outcome.len(), "zone purge finished with failures");
        } else {
            debug!(total = outcome.len(), "zone purge finished");
        }
        outcome
    }

    /// Purge one cached file from `zone`.
    pub fn purge_file(&self, zone: u64, path: &str) -> Result<Response> {
        let form = Form::from([("file", path)]);
        self.delete(&cache_endpoint(zone), Some(&form))
    }

    /// Purge several cached files from `zone` in a single request.
    pub fn purge_files<P: AsRef<str>>(&self, zone: u64, paths: &[P]) -> Result<Response> {
        if paths.is_empty() {
            return Err(Error::InvalidArgument(
                "purge_files needs at least one path".to_string(),
            ));
        }
        let form: Form = paths.iter().map(|p| ("files[]", p.as_ref())).collect();
        self.delete(&cache_endpoint(zone), Some(&form))
    }
}
