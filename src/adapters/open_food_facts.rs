use crate::domain::model::{coerce_amount, NutritionRecord, ProductLookup};
use crate::domain::ports::{ConfigProvider, ProductDatabase};
use crate::utils::error::{NutriError, Result};
use crate::utils::validation::validate_barcode;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://world.openfoodfacts.org";

// Plain keys, then per-serving, then per-100g. The first key present wins.
const CALORIE_KEYS: &[&str] = &[
    "energy-kcal",
    "energy_kcal",
    "energy-kcal_serving",
    "energy-kcal_100g",
];
const PROTEIN_KEYS: &[&str] = &["proteins", "protein", "proteins_serving", "proteins_100g"];
const FAT_KEYS: &[&str] = &["fat", "fat_serving", "fat_100g"];
const CARBOHYDRATE_KEYS: &[&str] = &[
    "carbohydrates",
    "carbohydrates_serving",
    "carbohydrates_100g",
];
const SUGAR_KEYS: &[&str] = &["sugars", "sugar", "sugars_serving", "sugars_100g"];

/// Product lookups against the Open Food Facts v0 product API.
#[derive(Debug, Clone)]
pub struct OpenFoodFactsClient {
    client: Client,
    base_url: String,
}

impl OpenFoodFactsClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        Self::new(
            config.database_url(),
            config.request_timeout(),
            config.user_agent(),
        )
    }

    pub fn product_url(&self, barcode: &str) -> String {
        format!(
            "{}/api/v0/product/{}.json",
            self.base_url.trim_end_matches('/'),
            barcode
        )
    }
}

#[async_trait]
impl ProductDatabase for OpenFoodFactsClient {
    async fn lookup(&self, barcode: &str) -> Result<ProductLookup> {
        let barcode = validate_barcode(barcode)?;
        let url = self.product_url(barcode);

        tracing::debug!("Making product request to: {}", url);
        let response = self.client.get(&url).send().await?;
        tracing::debug!("Product response status: {}", response.status());

        if !response.status().is_success() {
            return Err(NutriError::BarcodeNotFound {
                barcode: barcode.to_string(),
            });
        }

        let body: Value = response.json().await?;
        parse_product_response(barcode, &body)
    }
}

/// Turns a v0 product response into a lookup result.
///
/// Anything other than `status: 1` means the product is unknown.
pub fn parse_product_response(barcode: &str, body: &Value) -> Result<ProductLookup> {
    let found = body.get("status").and_then(Value::as_i64) == Some(1);
    if !found {
        tracing::debug!(
            barcode,
            status_verbose = ?body.get("status_verbose"),
            "Product not in database"
        );
        return Err(NutriError::BarcodeNotFound {
            barcode: barcode.to_string(),
        });
    }

    let product = body.get("product");
    let nutriments = product
        .and_then(|p| p.get("nutriments"))
        .or_else(|| body.get("nutriments"));

    let record = match nutriments {
        Some(map) => NutritionRecord::new(
            first_amount(map, CALORIE_KEYS),
            first_amount(map, PROTEIN_KEYS),
            first_amount(map, FAT_KEYS),
            first_amount(map, CARBOHYDRATE_KEYS),
            first_amount(map, SUGAR_KEYS),
        ),
        None => NutritionRecord::default(),
    };

    let product_name = product
        .and_then(|p| p.get("product_name"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    Ok(ProductLookup {
        record,
        product_name,
    })
}

fn first_amount(nutriments: &Value, keys: &[&str]) -> f64 {
    coerce_amount(keys.iter().find_map(|key| nutriments.get(*key)))
}
