use crate::models::{ProductAttributes, ProductRecord};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use thiserror::Error;

const WEIGHT_UNITS: &[&str] = &["oz", "lb", "kg", "g", "ml", "l"];

/// One `shopping_results` item as returned by the upstream engine.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProduct {
    pub title: Option<String>,
    pub product_id: Option<String>,
    pub price: Option<String>,
    pub extracted_price: Option<f64>,
    pub old_price: Option<String>,
    pub extracted_old_price: Option<f64>,
    pub source: Option<String>,
    pub source_icon: Option<String>,
    pub multiple_sources: Option<bool>,
    pub rating: Option<f64>,
    pub reviews: Option<i64>,
    pub snippet: Option<String>,
    pub thumbnail: Option<String>,
    pub product_link: Option<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
    pub badge: Option<String>,
    pub position: Option<i64>,
    pub delivery: Option<serde_json::Value>,
    pub second_hand_condition: Option<serde_json::Value>,
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("upstream record is not an object")]
    NotAnObject,

    #[error("malformed upstream record: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Decodes and extracts a single raw upstream record.
pub fn extract_value(value: serde_json::Value) -> Result<ProductRecord, ExtractionError> {
    if !value.is_object() {
        return Err(ExtractionError::NotAnObject);
    }
    let raw: RawProduct = serde_json::from_value(value)?;
    Ok(extract_product(raw))
}

#[must_use]
pub fn extract_product(raw: RawProduct) -> ProductRecord {
    let title = raw.title.as_deref().unwrap_or_default();
    let brand = extract_brand(title);
    let weight = extract_weight(&raw.extensions, title);

    ProductRecord {
        brand,
        weight,
        title: raw.title,
        product_id: raw.product_id,
        price: raw.price,
        extracted_price: raw.extracted_price,
        old_price: raw.old_price,
        extracted_old_price: raw.extracted_old_price,
        source: raw.source,
        source_icon: raw.source_icon,
        multiple_sources: raw.multiple_sources.unwrap_or(false),
        rating: raw.rating.and_then(normalize_rating),
        reviews: raw.reviews,
        snippet: raw.snippet,
        thumbnail: raw.thumbnail,
        product_link: raw.product_link,
        additional_data: ProductAttributes {
            position: raw.position,
            badge: raw.badge,
            extensions: raw.extensions,
            second_hand_condition: raw.second_hand_condition,
            delivery: raw.delivery,
        },
    }
}

/// First title token, kept only when it is longer than two characters.
#[must_use]
pub fn extract_brand(title: &str) -> Option<String> {
    title
        .split_whitespace()
        .next()
        .filter(|token| token.chars().count() > 2)
        .map(str::to_string)
}

/// Extensions are searched before the title; the extension is returned verbatim,
/// a title match is returned lower-cased.
#[must_use]
pub fn extract_weight(extensions: &[String], title: &str) -> Option<String> {
    weight_from_extensions(extensions).or_else(|| weight_from_title(title))
}

fn weight_from_extensions(extensions: &[String]) -> Option<String> {
    extensions
        .iter()
        .find(|ext| {
            let lower = ext.to_lowercase();
            WEIGHT_UNITS.iter().any(|unit| lower.contains(unit))
        })
        .cloned()
}

fn weight_from_title(title: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"(\d+(?:\.\d+)?)\s*(oz|lb|kg|g|ml|l)\b")
            .expect("Invalid regex pattern defined in code")
    });

    re.find(&title.to_lowercase()).map(|m| m.as_str().to_string())
}

fn normalize_rating(rating: f64) -> Option<f64> {
    if !rating.is_finite() || !(0.0..=5.0).contains(&rating) {
        return None;
    }
    Some((rating * 10.0).round() / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_brand_and_weight_from_title() {
        let record = extract_product(RawProduct {
            title: Some("Jif Peanut Butter 16 oz".to_string()),
            ..Default::default()
        });
        assert_eq!(record.brand.as_deref(), Some("Jif"));
        assert_eq!(record.weight.as_deref(), Some("16 oz"));
    }

    #[test]
    fn test_short_first_token_has_no_brand() {
        assert_eq!(extract_brand("A"), None);
        assert_eq!(extract_brand("Jo Malone"), None);
        assert_eq!(extract_brand(""), None);
        assert_eq!(extract_brand("  Skippy Creamy"), Some("Skippy".to_string()));
    }

    #[test]
    fn test_weight_prefers_extensions() {
        let extensions = vec!["Creamy".to_string(), "28 OZ".to_string()];
        assert_eq!(
            extract_weight(&extensions, "Smucker's Natural 16 oz"),
            Some("28 OZ".to_string())
        );
    }

    #[test]
    fn test_weight_title_patterns() {
        assert_eq!(weight_from_title("Honey 1.5 Kg Jar"), Some("1.5 kg".to_string()));
        assert_eq!(weight_from_title("Olive Oil 500ml"), Some("500ml".to_string()));
        assert_eq!(weight_from_title("Pack of 12 items"), None);
        assert_eq!(weight_from_title("Flour 2 lbs"), None);
    }

    #[test]
    fn test_missing_fields_are_absent() {
        let record = extract_value(json!({ "title": "A" })).unwrap();
        assert_eq!(record.brand, None);
        assert_eq!(record.weight, None);
        assert_eq!(record.price, None);
        assert_eq!(record.rating, None);
        assert!(!record.multiple_sources);
        assert!(record.additional_data.extensions.is_empty());
    }

    #[test]
    fn test_full_record_passthrough() {
        let record = extract_value(json!({
            "position": 3,
            "title": "365 Whole Foods Peanut Butter",
            "product_id": "123456",
            "price": "$3.49",
            "extracted_price": 3.49,
            "source": "Whole Foods Market",
            "multiple_sources": true,
            "rating": 4.66,
            "reviews": 812,
            "extensions": ["Free delivery"],
            "badge": "Top Pick",
            "delivery": "Free by Fri"
        }))
        .unwrap();

        assert_eq!(record.brand.as_deref(), Some("365"));
        assert_eq!(record.extracted_price, Some(3.49));
        assert_eq!(record.rating, Some(4.7));
        assert_eq!(record.reviews, Some(812));
        assert!(record.multiple_sources);
        assert_eq!(record.additional_data.position, Some(3));
        assert_eq!(record.additional_data.badge.as_deref(), Some("Top Pick"));
        // "Free delivery" contains the "l" unit substring
        assert_eq!(record.weight.as_deref(), Some("Free delivery"));
    }

    #[test]
    fn test_out_of_range_rating_dropped() {
        let record = extract_value(json!({ "title": "Thing", "rating": 7.5 })).unwrap();
        assert_eq!(record.rating, None);
    }

    #[test]
    fn test_malformed_records_rejected() {
        assert!(matches!(
            extract_value(json!("just a string")),
            Err(ExtractionError::NotAnObject)
        ));
        assert!(matches!(
            extract_value(json!({ "title": "X", "reviews": "many" })),
            Err(ExtractionError::Malformed(_))
        ));
    }
}
