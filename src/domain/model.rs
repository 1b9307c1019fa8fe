use crate::utils::error::NutriError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One user action's worth of input: a photo, a barcode, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    pub photo_url: Option<String>,
    pub barcode: Option<String>,
}

impl ExtractionRequest {
    pub fn new(photo_url: Option<String>, barcode: Option<String>) -> Self {
        Self { photo_url, barcode }
    }

    pub fn from_barcode(barcode: impl Into<String>) -> Self {
        Self {
            photo_url: None,
            barcode: Some(barcode.into()),
        }
    }

    pub fn from_photo(photo_url: impl Into<String>) -> Self {
        Self {
            photo_url: Some(photo_url.into()),
            barcode: None,
        }
    }

    /// Barcode, if present and not blank.
    pub fn barcode(&self) -> Option<&str> {
        non_blank(self.barcode.as_deref())
    }

    /// Photo URL, if present and not blank.
    pub fn photo_url(&self) -> Option<&str> {
        non_blank(self.photo_url.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.barcode().is_none() && self.photo_url().is_none()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Coerces a reported nutrient amount. Negative, NaN and infinite become 0.
pub fn sanitize_amount(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Reads a nutrient amount out of loosely typed JSON.
///
/// Numbers and numeric strings are accepted; everything else is 0.
pub fn coerce_amount(value: Option<&serde_json::Value>) -> f64 {
    let raw = match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    sanitize_amount(raw)
}

/// Overflowed totals stay at the largest finite amount instead of dropping to 0.
fn saturate(value: f64) -> f64 {
    if value == f64::INFINITY {
        f64::MAX
    } else {
        value
    }
}

/// Normalized calories (kcal) and macros (grams) for one serving.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawNutritionRecord")]
pub struct NutritionRecord {
    calories: f64,
    protein: f64,
    fat: f64,
    carbohydrates: f64,
    sugar: f64,
}

// 反序列化也要經過 NutritionRecord::new 清理數值
#[derive(Default, Deserialize)]
#[serde(default)]
struct RawNutritionRecord {
    calories: f64,
    protein: f64,
    fat: f64,
    carbohydrates: f64,
    sugar: f64,
}

impl From<RawNutritionRecord> for NutritionRecord {
    fn from(raw: RawNutritionRecord) -> Self {
        Self::new(raw.calories, raw.protein, raw.fat, raw.carbohydrates, raw.sugar)
    }
}

impl NutritionRecord {
    pub fn new(calories: f64, protein: f64, fat: f64, carbohydrates: f64, sugar: f64) -> Self {
        Self {
            calories: sanitize_amount(calories),
            protein: sanitize_amount(protein),
            fat: sanitize_amount(fat),
            carbohydrates: sanitize_amount(carbohydrates),
            sugar: sanitize_amount(sugar),
        }
    }

    /// Builds a record from a JSON object whose keys are already the field names.
    pub fn from_json_object(value: &serde_json::Value) -> Self {
        Self::new(
            coerce_amount(value.get("calories")),
            coerce_amount(value.get("protein")),
            coerce_amount(value.get("fat")),
            coerce_amount(value.get("carbohydrates")),
            coerce_amount(value.get("sugar")),
        )
    }

    pub fn calories(&self) -> f64 {
        self.calories
    }

    pub fn protein(&self) -> f64 {
        self.protein
    }

    pub fn fat(&self) -> f64 {
        self.fat
    }

    pub fn carbohydrates(&self) -> f64 {
        self.carbohydrates
    }

    pub fn sugar(&self) -> f64 {
        self.sugar
    }

    pub fn get(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Calories => self.calories,
            Nutrient::Protein => self.protein,
            Nutrient::Fat => self.fat,
            Nutrient::Carbohydrates => self.carbohydrates,
            Nutrient::Sugar => self.sugar,
        }
    }

    /// Returns a new record with every field multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(
            saturate(self.calories * factor),
            saturate(self.protein * factor),
            saturate(self.fat * factor),
            saturate(self.carbohydrates * factor),
            saturate(self.sugar * factor),
        )
    }

    pub fn plus(&self, other: &NutritionRecord) -> Self {
        Self::new(
            saturate(self.calories + other.calories),
            saturate(self.protein + other.protein),
            saturate(self.fat + other.fat),
            saturate(self.carbohydrates + other.carbohydrates),
            saturate(self.sugar + other.sugar),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nutrient {
    Calories,
    Protein,
    Fat,
    Carbohydrates,
    Sugar,
}

impl Nutrient {
    pub const ALL: [Nutrient; 5] = [
        Nutrient::Calories,
        Nutrient::Protein,
        Nutrient::Fat,
        Nutrient::Carbohydrates,
        Nutrient::Sugar,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Nutrient::Calories => "Calories",
            Nutrient::Protein => "Protein",
            Nutrient::Fat => "Fat",
            Nutrient::Carbohydrates => "Carbs",
            Nutrient::Sugar => "Sugar",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Nutrient::Calories => "kcal",
            _ => "g",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionSource {
    AiLabel,
    AiBarcode,
    ProductDatabase,
}

impl ExtractionSource {
    pub fn label(&self) -> &'static str {
        match self {
            ExtractionSource::AiLabel => "AI Label Scanning",
            ExtractionSource::AiBarcode => "AI Barcode Scanning",
            ExtractionSource::ProductDatabase => "Open Food Facts API",
        }
    }

    pub fn image_type(&self) -> &'static str {
        match self {
            ExtractionSource::AiLabel => "label",
            ExtractionSource::AiBarcode | ExtractionSource::ProductDatabase => "barcode",
        }
    }
}

impl fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionErrorKind {
    NoInputProvided,
    BarcodeNotFound,
    ImageExtractionFailed,
    NetworkError,
}

/// Displayable failure of one extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionError {
    pub kind: ExtractionErrorKind,
    pub message: String,
}

impl ExtractionError {
    pub fn new(kind: ExtractionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn no_input() -> Self {
        Self::new(ExtractionErrorKind::NoInputProvided, "no input provided")
    }

    pub fn barcode_not_found() -> Self {
        Self::new(ExtractionErrorKind::BarcodeNotFound, "barcode not found")
    }

    pub fn image_extraction_failed(message: impl Into<String>) -> Self {
        Self::new(ExtractionErrorKind::ImageExtractionFailed, message)
    }
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// What the interpreter read off a photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpretedLabel {
    pub record: NutritionRecord,
    pub barcode: Option<String>,
}

/// What the product database returned for a barcode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductLookup {
    pub record: NutritionRecord,
    pub product_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionOutcome {
    Success {
        record: NutritionRecord,
        source: ExtractionSource,
        barcode: Option<String>,
        product_name: Option<String>,
    },
    Failure {
        error: ExtractionError,
        attempted_source: Option<ExtractionSource>,
        barcode: Option<String>,
    },
}

/// Successful resolution, as returned by `ExtractionResolver::resolve_record`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedNutrition {
    pub record: NutritionRecord,
    pub source: ExtractionSource,
    pub barcode: Option<String>,
    pub product_name: Option<String>,
}

impl ExtractionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionOutcome::Success { .. })
    }

    pub fn record(&self) -> Option<&NutritionRecord> {
        match self {
            ExtractionOutcome::Success { record, .. } => Some(record),
            ExtractionOutcome::Failure { .. } => None,
        }
    }

    /// Source that produced the record, or the one that was attempted last.
    pub fn source(&self) -> Option<ExtractionSource> {
        match self {
            ExtractionOutcome::Success { source, .. } => Some(*source),
            ExtractionOutcome::Failure {
                attempted_source, ..
            } => *attempted_source,
        }
    }

    /// Barcode looked up or read off the photo, if any.
    pub fn barcode(&self) -> Option<&str> {
        match self {
            ExtractionOutcome::Success { barcode, .. } | ExtractionOutcome::Failure { barcode, .. } => {
                barcode.as_deref()
            }
        }
    }

    pub fn into_result(self) -> Result<ResolvedNutrition, NutriError> {
        match self {
            ExtractionOutcome::Success {
                record,
                source,
                barcode,
                product_name,
            } => Ok(ResolvedNutrition {
                record,
                source,
                barcode,
                product_name,
            }),
            ExtractionOutcome::Failure { error, barcode, .. } => {
                Err(error.into_nutri_error(barcode))
            }
        }
    }
}

impl ExtractionError {
    fn into_nutri_error(self, barcode: Option<String>) -> NutriError {
        match self.kind {
            ExtractionErrorKind::NoInputProvided => NutriError::NoInputProvided,
            ExtractionErrorKind::BarcodeNotFound | ExtractionErrorKind::NetworkError => {
                NutriError::BarcodeNotFound {
                    barcode: barcode.unwrap_or_default(),
                }
            }
            ExtractionErrorKind::ImageExtractionFailed => NutriError::ImageExtractionFailed {
                message: self.message,
            },
        }
    }
}
