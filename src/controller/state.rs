//! Per-view fetch state

use std::collections::{BTreeMap, BTreeSet};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::endpoint::EndpointSpec;
use crate::api::{ApiResponse, PageLinks, RequestError};

/// Where a view is in its fetch cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Never fetched
    Init,
    Loading,
    Success,
    /// Some non-critical endpoints failed
    PartialError,
    /// Every endpoint failed, or a critical one did
    Error,
}

/// Results of one view's endpoints, keyed by endpoint key
///
/// While a reload is in flight, `data` still holds the previous results.
/// Each key settles on its own; a key's data and error never mix.
#[derive(Debug, Clone, Default)]
pub struct FetchState {
    pub loading: bool,
    pub generation: u64,
    keys: Vec<String>,
    critical: BTreeSet<String>,
    pending: BTreeSet<String>,
    data: BTreeMap<String, serde_json::Value>,
    errors: BTreeMap<String, RequestError>,
    page_links: BTreeMap<String, String>,
}

impl FetchState {
    /// Starts a generation for `endpoints`
    ///
    /// Keys that are no longer requested are dropped; the rest keep their
    /// previous results until the new ones land.
    pub(crate) fn begin(&mut self, generation: u64, endpoints: &[EndpointSpec]) {
        self.generation = generation;
        self.keys = endpoints.iter().map(|e| e.key.clone()).collect();
        self.critical = endpoints
            .iter()
            .filter(|e| e.critical)
            .map(|e| e.key.clone())
            .collect();
        self.pending = self.keys.iter().cloned().collect();

        let keep: BTreeSet<&String> = self.keys.iter().collect();
        self.data.retain(|k, _| keep.contains(k));
        self.errors.retain(|k, _| keep.contains(k));
        self.page_links.retain(|k, _| keep.contains(k));

        self.loading = !self.pending.is_empty();
    }

    /// Records one endpoint's result
    pub(crate) fn settle(&mut self, key: &str, result: Result<ApiResponse, RequestError>) {
        if !self.pending.remove(key) {
            return;
        }

        match result {
            Ok(response) => {
                self.errors.remove(key);
                match response.link {
                    Some(link) => self.page_links.insert(key.to_string(), link),
                    None => self.page_links.remove(key),
                };
                self.data.insert(key.to_string(), response.body);
            }
            // Nobody is waiting for a cancelled request
            Err(e) if e.is_cancelled() => {}
            Err(e) => {
                self.data.remove(key);
                self.page_links.remove(key);
                self.errors.insert(key.to_string(), e);
            }
        }

        self.loading = !self.pending.is_empty();
    }

    pub fn phase(&self) -> Phase {
        if self.generation == 0 {
            return Phase::Init;
        }
        if self.loading {
            return Phase::Loading;
        }
        if self.errors.is_empty() {
            return Phase::Success;
        }

        let all_failed = self.keys.iter().all(|k| self.errors.contains_key(k));
        let critical_failed = self.critical.iter().any(|k| self.errors.contains_key(k));
        if all_failed || critical_failed {
            Phase::Error
        } else {
            Phase::PartialError
        }
    }

    /// Endpoint keys in declaration order
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn data(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Decodes a key's data; `None` if absent or not of type `T`
    pub fn decode<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.data.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::warn!(key, error = %e, "controller.decode");
                None
            }
        }
    }

    pub fn is_critical(&self, key: &str) -> bool {
        self.critical.contains(key)
    }

    pub fn error(&self, key: &str) -> Option<&RequestError> {
        self.errors.get(key)
    }

    pub fn errors(&self) -> impl Iterator<Item = (&str, &RequestError)> {
        self.errors.iter().map(|(k, e)| (k.as_str(), e))
    }

    /// Raw `Link` header of a key's last response
    pub fn raw_page_links(&self, key: &str) -> Option<&str> {
        self.page_links.get(key).map(String::as_str)
    }

    pub fn page_links(&self, key: &str) -> Option<PageLinks> {
        let raw = self.page_links.get(key)?;
        match PageLinks::parse(raw) {
            Ok(links) => Some(links),
            Err(e) => {
                tracing::warn!(key, error = %e, "controller.page_links");
                None
            }
        }
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints(keys: &[(&str, bool)]) -> Vec<EndpointSpec> {
        keys.iter()
            .map(|(k, critical)| {
                let spec = EndpointSpec::new(*k, format!("/{}/", k));
                if *critical {
                    spec.critical()
                } else {
                    spec
                }
            })
            .collect()
    }

    fn failure(key: &str) -> RequestError {
        RequestError::from_status(format!("/{}/", key), 500, serde_json::Value::Null)
    }

    #[test]
    fn phases() {
        let mut state = FetchState::default();
        assert_eq!(state.phase(), Phase::Init);

        state.begin(1, &endpoints(&[("a", false), ("b", false)]));
        assert_eq!(state.phase(), Phase::Loading);

        state.settle("a", Ok(ApiResponse::ok(serde_json::json!([1]))));
        assert_eq!(state.phase(), Phase::Loading);

        state.settle("b", Err(failure("b")));
        assert_eq!(state.phase(), Phase::PartialError);
        assert_eq!(state.data("a"), Some(&serde_json::json!([1])));
    }

    #[test]
    fn critical_failure_is_fatal() {
        let mut state = FetchState::default();
        state.begin(1, &endpoints(&[("group", true), ("tags", false)]));
        state.settle("tags", Ok(ApiResponse::ok(serde_json::json!([]))));
        state.settle("group", Err(failure("group")));

        assert_eq!(state.phase(), Phase::Error);
    }

    #[test]
    fn every_key_failing_is_fatal() {
        let mut state = FetchState::default();
        state.begin(1, &endpoints(&[("a", false), ("b", false)]));
        state.settle("a", Err(failure("a")));
        state.settle("b", Err(failure("b")));

        assert_eq!(state.phase(), Phase::Error);
    }

    #[test]
    fn reload_keeps_stale_data_and_drops_removed_keys() {
        let mut state = FetchState::default();
        state.begin(1, &endpoints(&[("a", false), ("b", false)]));
        state.settle("a", Ok(ApiResponse::ok(serde_json::json!("old"))));
        state.settle("b", Ok(ApiResponse::ok(serde_json::json!("b"))));

        state.begin(2, &endpoints(&[("a", false), ("c", false)]));
        assert!(state.loading);
        assert_eq!(state.data("a"), Some(&serde_json::json!("old")));
        assert!(state.data("b").is_none());
        assert!(state.data("c").is_none());
    }

    #[test]
    fn page_links_follow_latest_response() {
        let mut state = FetchState::default();
        state.begin(1, &endpoints(&[("issues", false)]));

        let mut response = ApiResponse::ok(serde_json::json!([]));
        response.link = Some(
            "<https://x/api/0/?cursor=0:0:1>; rel=\"previous\"; results=\"false\"; cursor=\"0:0:1\", \
             <https://x/api/0/?cursor=0:25:0>; rel=\"next\"; results=\"true\"; cursor=\"0:25:0\""
                .to_string(),
        );
        state.settle("issues", Ok(response));

        let links = state.page_links("issues").unwrap();
        assert_eq!(links.next_cursor(), Some("0:25:0"));
    }

    #[test]
    fn settle_ignores_unknown_keys() {
        let mut state = FetchState::default();
        state.begin(1, &endpoints(&[("a", false)]));
        state.settle("zzz", Ok(ApiResponse::ok(serde_json::json!(1))));

        assert!(state.data("zzz").is_none());
        assert!(state.loading);
    }
}
