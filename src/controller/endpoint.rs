//! Endpoint descriptors

use std::collections::BTreeMap;

use crate::api::{Query, RequestOptions};

/// One request a view needs, stored under `key`
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointSpec {
    pub key: String,
    pub path: String,
    pub options: RequestOptions,

    /// A failed critical endpoint fails the whole view
    pub critical: bool,
}

impl EndpointSpec {
    pub fn new(key: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            path: path.into(),
            options: RequestOptions::get(),
            critical: false,
        }
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.options.query = query;
        self
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }
}

/// True if the two lists describe different requests
///
/// Compared by key, never by position: reordering alone is not a change.
pub fn endpoints_changed(old: &[EndpointSpec], new: &[EndpointSpec]) -> bool {
    let by_key = |list: &[EndpointSpec]| -> BTreeMap<String, EndpointSpec> {
        list.iter().map(|e| (e.key.clone(), e.clone())).collect()
    };
    by_key(old) != by_key(new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reordering_is_not_a_change() {
        let a = EndpointSpec::new("group", "/organizations/acme/issues/1/");
        let b = EndpointSpec::new("tags", "/organizations/acme/issues/1/tags/");

        assert!(!endpoints_changed(&[a.clone(), b.clone()], &[b, a]));
    }

    #[test]
    fn query_change_is_a_change() {
        let old = EndpointSpec::new("issues", "/organizations/acme/issues/")
            .with_query(Query::new().with("query", "is:unresolved"));
        let new = EndpointSpec::new("issues", "/organizations/acme/issues/")
            .with_query(Query::new().with("query", "is:resolved"));

        assert!(endpoints_changed(&[old], &[new]));
    }

    #[test]
    fn added_key_is_a_change() {
        let a = EndpointSpec::new("group", "/organizations/acme/issues/1/");
        let b = EndpointSpec::new("tags", "/organizations/acme/issues/1/tags/");

        assert!(endpoints_changed(&[a.clone()], &[a, b]));
    }
}
