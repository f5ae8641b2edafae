use serde::{Deserialize, Serialize};

/// Canonical product shape served to callers and persisted in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub title: Option<String>,
    pub product_id: Option<String>,
    pub price: Option<String>,
    pub extracted_price: Option<f64>,
    pub old_price: Option<String>,
    pub extracted_old_price: Option<f64>,
    pub source: Option<String>,
    pub source_icon: Option<String>,
    #[serde(default)]
    pub multiple_sources: bool,
    pub rating: Option<f64>,
    pub reviews: Option<i64>,
    pub snippet: Option<String>,
    pub thumbnail: Option<String>,
    pub brand: Option<String>,
    pub weight: Option<String>,
    pub product_link: Option<String>,
    #[serde(default)]
    pub additional_data: ProductAttributes,
}

/// Open-ended bag of upstream attributes that have no first-class column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductAttributes {
    pub position: Option<i64>,
    pub badge: Option<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
    pub second_hand_condition: Option<serde_json::Value>,
    pub delivery: Option<serde_json::Value>,
}
