//! Application settings loaded from `config.toml`.
//!
//! Every section is optional; a missing file yields [`AppConfig::default`].
//! The catalog entries (`[[categories]]`, `[[products]]`) seed an empty
//! database on first run and are skipped when a row with the same name exists.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Database URL; `DATABASE_URL` in the environment takes precedence
    pub database_url: Option<String>,
    pub storage: StorageConfig,
    pub pricing: PricingConfig,
    /// Delivery zones offered at checkout
    pub shipping_zones: Vec<ShippingZone>,
    pub categories: Vec<CategorySeed>,
    pub products: Vec<ProductSeed>,
}

/// Where product images are written and how they are served
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub image_dir: PathBuf,
    pub public_base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("data/product_images"),
            public_base_url: "http://localhost:8080/product_images".to_string(),
        }
    }
}

/// Rates used by the seller and courier dashboards
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct PricingConfig {
    /// Flat amount a courier earns per delivered order
    pub courier_delivery_fee: f64,
    /// Share of settled sales paid to the assigned seller
    pub seller_commission_rate: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            courier_delivery_fee: 250.0,
            seller_commission_rate: 0.20,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ShippingZone {
    pub name: String,
    pub cost: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CategorySeed {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProductSeed {
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub stock: i32,
    pub cost: Option<f64>,
    pub description: Option<String>,
    /// Name of a category from `[[categories]]` or already in the database
    pub category: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

impl AppConfig {
    /// Shipping cost for a named zone; no zone means pickup at the counter.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] when the zone is not configured.
    pub fn shipping_cost(&self, zone: Option<&str>) -> Result<f64> {
        let Some(zone) = zone else {
            return Ok(0.0);
        };
        self.shipping_zones
            .iter()
            .find(|z| z.name.eq_ignore_ascii_case(zone))
            .map(|z| z.cost)
            .ok_or_else(|| Error::validation(format!("unknown shipping zone '{zone}'")))
    }
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Loads `POS_CONFIG` (or `./config.toml`), falling back to defaults when the
/// file does not exist.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var("POS_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    if Path::new(&path).exists() {
        let config = load_config(&path)?;
        tracing::info!(
            "Loaded configuration from {path} ({} categories, {} products to seed)",
            config.categories.len(),
            config.products.len()
        );
        Ok(config)
    } else {
        tracing::warn!("No configuration file at {path}; using defaults");
        Ok(AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_parse_app_config() {
        let toml_str = r#"
            database_url = "sqlite::memory:"

            [pricing]
            courier_delivery_fee = 300.0

            [[shipping_zones]]
            name = "santo_domingo"
            cost = 250.0

            [[shipping_zones]]
            name = "interior"
            cost = 290.0

            [[categories]]
            name = "Beverages"

            [[products]]
            name = "Coffee"
            price = 120.0
            stock = 40
            category = "Beverages"
            featured = true
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.database_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(config.pricing.courier_delivery_fee, 300.0);
        // Unset keys keep their defaults
        assert_eq!(config.pricing.seller_commission_rate, 0.20);
        assert_eq!(config.shipping_zones.len(), 2);
        assert_eq!(config.categories[0].name, "Beverages");
        assert_eq!(config.products[0].stock, 40);
        assert!(config.products[0].featured);
        assert_eq!(config.products[0].category.as_deref(), Some("Beverages"));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(config.database_url.is_none());
        assert_eq!(config.pricing.courier_delivery_fee, 250.0);
        assert_eq!(
            config.storage.image_dir,
            PathBuf::from("data/product_images")
        );
        assert!(config.products.is_empty());
    }

    #[test]
    fn test_shipping_cost_lookup() {
        let config = AppConfig {
            shipping_zones: vec![ShippingZone {
                name: "interior".to_string(),
                cost: 290.0,
            }],
            ..AppConfig::default()
        };
        assert_eq!(config.shipping_cost(None).unwrap(), 0.0);
        assert_eq!(config.shipping_cost(Some("Interior")).unwrap(), 290.0);
        assert!(matches!(
            config.shipping_cost(Some("mars")),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("/nonexistent/pos-hub/config.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
