//! Industry-code (NAF) labels, used to describe facet values in filter UIs.

use ahash::AHashMap as HashMap;

#[derive(Debug, Clone, Default)]
pub struct NafBook {
    labels: HashMap<String, String>,
}

impl NafBook {
    #[must_use]
    pub fn new(labels: std::collections::HashMap<String, String>) -> Self {
        Self {
            labels: labels.into_iter().collect(),
        }
    }

    /// Label for an industry code, if known.
    #[must_use]
    pub fn label(&self, code: &str) -> Option<&str> {
        self.labels.get(code).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
