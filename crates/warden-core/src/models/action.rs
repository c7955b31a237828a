use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A proposed mutation submitted to the pipeline for validation.
///
/// Transient: created per intercepted event and discarded once the
/// decision is returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    /// Selects which rules apply (`RuleDescriptor::category`).
    pub category: String,
    /// What the mutation touches, e.g. a file path.
    pub target: String,
    pub payload: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Action {
    /// Create an action with a fresh v4 id.
    pub fn new(
        category: impl Into<String>,
        target: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            category: category.into(),
            target: target.into(),
            payload: payload.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// blake3 hash of category, target and payload.
    ///
    /// Two actions proposing the same mutation share a context hash even when
    /// their ids differ.
    pub fn context_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.category.as_bytes());
        hasher.update(&[0]);
        hasher.update(self.target.as_bytes());
        hasher.update(&[0]);
        hasher.update(self.payload.as_bytes());
        hasher.finalize().to_hex().to_string()
    }
}
