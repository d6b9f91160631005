//! Service catalog models.

use serde::{Deserialize, Serialize};

/// Catalog entry for a bookable service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    /// Base price, used unless the professional sets a custom price
    pub price: f64,
    pub duration: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub features: Vec<String>,
}

impl Service {
    /// Case-insensitive match on name or description
    pub fn matches_term(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.name.to_lowercase().contains(&term) || self.description.to_lowercase().contains(&term)
    }
}
