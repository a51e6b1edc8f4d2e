use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Low,
    Medium,
    High,
}

impl Default for Sensitivity {
    fn default() -> Self {
        Sensitivity::Medium
    }
}

impl Sensitivity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sensitivity::Low => "low",
            Sensitivity::Medium => "medium",
            Sensitivity::High => "high",
        }
    }
}

/// What the classifier should consider skippable. Sent verbatim to the backend.
///
/// Sets are ordered so that the serialized form is canonical and can key the
/// interval cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UserPreferences {
    pub default_categories: BTreeSet<String>,
    pub custom_keywords: BTreeSet<String>,
    pub custom_phrases: BTreeSet<String>,
    pub sensitivity: Sensitivity,
    pub enabled: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            default_categories: BTreeSet::new(),
            custom_keywords: BTreeSet::new(),
            custom_phrases: BTreeSet::new(),
            sensitivity: Sensitivity::Medium,
            enabled: true,
        }
    }
}

impl UserPreferences {
    pub fn is_customized(&self) -> bool {
        !self.default_categories.is_empty()
            || !self.custom_keywords.is_empty()
            || !self.custom_phrases.is_empty()
    }

    /// Stable string identifying these preferences for caching purposes.
    pub fn cache_key(&self) -> String {
        serde_json::json!({
            "categories": self.default_categories,
            "keywords": self.custom_keywords,
            "phrases": self.custom_phrases,
            "sensitivity": self.sensitivity.as_str(),
        })
        .to_string()
    }
}
