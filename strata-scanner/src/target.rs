use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Selector and query parameters for one depth level. Position in the
/// target list is the depth index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    #[serde(alias = "xpath")]
    pub selector: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl TargetSpec {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}
