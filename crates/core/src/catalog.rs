use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use super::money::Money;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Unknown category: {0}")]
    UnknownCategory(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse JSON catalog: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to parse TOML catalog: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Category → subcategory → target amount. Read-only once loaded.
///
/// Category names are matched case-sensitively against the bracketed header
/// tokens of the tracking sheet (`[FOOD]` ↔ `"FOOD"`). Subcategory names are
/// the categories carried by ledger records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryCatalog {
    categories: BTreeMap<String, BTreeMap<String, Decimal>>,
}

impl CategoryCatalog {
    pub fn new(categories: BTreeMap<String, BTreeMap<String, Decimal>>) -> Self {
        Self { categories }
    }

    pub fn from_json(content: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_toml(content: &str) -> Result<Self, CatalogError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from disk; `.toml` files are read as TOML, anything else as JSON.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_json(&content),
        }
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn contains(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    pub fn subcategories(&self, category: &str) -> Result<impl Iterator<Item = &str>, CatalogError> {
        Ok(self.entry(category)?.keys().map(String::as_str))
    }

    /// Sum of every subcategory target of `category`.
    pub fn target(&self, category: &str) -> Result<Money, CatalogError> {
        let total: Decimal = self.entry(category)?.values().copied().sum();
        Ok(Money::from_decimal(total))
    }

    fn entry(&self, category: &str) -> Result<&BTreeMap<String, Decimal>, CatalogError> {
        self.categories
            .get(category)
            .ok_or_else(|| CatalogError::UnknownCategory(category.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "FOOD": {"groceries": 300, "dining": 100},
        "HOUSING": {"rent": "1250.00", "utilities": 140.5}
    }"#;

    #[test]
    fn target_is_sum_of_subcategory_targets() {
        let catalog = CategoryCatalog::from_json(r#"{"FOOD": {"groceries": 300, "dining": 100}}"#).unwrap();
        assert_eq!(catalog.target("FOOD").unwrap(), Money::from_cents(40000));
    }

    #[test]
    fn accepts_numeric_and_string_targets() {
        let catalog = CategoryCatalog::from_json(SAMPLE).unwrap();
        assert_eq!(catalog.target("HOUSING").unwrap(), Money::from_cents(139050));
    }

    #[test]
    fn enumerates_categories_and_subcategories() {
        let catalog = CategoryCatalog::from_json(SAMPLE).unwrap();
        assert_eq!(catalog.categories().collect::<Vec<_>>(), vec!["FOOD", "HOUSING"]);
        let subs: Vec<&str> = catalog.subcategories("FOOD").unwrap().collect();
        assert_eq!(subs, vec!["dining", "groceries"]);
    }

    #[test]
    fn unknown_category_is_typed() {
        let catalog = CategoryCatalog::from_json(SAMPLE).unwrap();
        assert!(matches!(catalog.target("food"), Err(CatalogError::UnknownCategory(c)) if c == "food"));
        assert!(catalog.subcategories("TRAVEL").is_err());
        assert!(!catalog.contains("TRAVEL"));
    }

    #[test]
    fn empty_category_targets_zero() {
        let catalog = CategoryCatalog::from_json(r#"{"SAVINGS": {}}"#).unwrap();
        assert!(catalog.target("SAVINGS").unwrap().is_zero());
    }

    #[test]
    fn loads_toml_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("categories.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "[FOOD]\ngroceries = 300\ndining = 100").unwrap();
        let catalog = CategoryCatalog::load(&path).unwrap();
        assert_eq!(catalog.target("FOOD").unwrap(), Money::from_cents(40000));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            CategoryCatalog::from_json("{\"FOOD\": 12}"),
            Err(CatalogError::Json(_))
        ));
    }
}
