//! Current user and organization

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub is_superuser: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    #[serde(default)]
    pub id: String,

    pub slug: String,

    #[serde(default)]
    pub name: String,

    /// Feature flags enabled for the organization
    #[serde(default)]
    pub features: BTreeSet<String>,
}

impl Organization {
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }
}
