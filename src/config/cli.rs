use crate::adapters::{open_food_facts, vision_interpreter};
use crate::config::toml_config::{TomlConfig, DEFAULT_TIMEOUT_SECONDS, DEFAULT_USER_AGENT};
use crate::core::tracker::DailyTargets;
use crate::core::ConfigProvider;
use crate::domain::model::{ExtractionRequest, Nutrient};
use crate::utils::error::{NutriError, Result};
use crate::utils::validation::{self, Validate};
use clap::Parser;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "nutri-track")]
#[command(about = "Track daily nutrition from food label photos and barcodes")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Product barcode to look up
    #[arg(short, long)]
    pub barcode: Option<String>,

    /// Food label photo: http(s) URL, data URL or local file
    #[arg(short, long)]
    pub photo: Option<String>,

    /// Number of servings to add to today's intake
    #[arg(short, long, default_value_t = 1.0)]
    pub servings: f64,

    /// Name to log the food under
    #[arg(long)]
    pub food_name: Option<String>,

    #[arg(long)]
    pub calories_target: Option<f64>,

    #[arg(long)]
    pub protein_target: Option<f64>,

    #[arg(long)]
    pub fat_target: Option<f64>,

    #[arg(long)]
    pub carbs_target: Option<f64>,

    #[arg(long)]
    pub sugar_target: Option<f64>,

    /// Open Food Facts base URL [default: https://world.openfoodfacts.org]
    #[arg(long, env = "NUTRI_TRACK_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Chat completions endpoint [default: https://api.openai.com/v1]
    #[arg(long, env = "NUTRI_TRACK_INTERPRETER_ENDPOINT")]
    pub interpreter_endpoint: Option<String>,

    /// Vision model name [default: gpt-4o-mini]
    #[arg(long, env = "NUTRI_TRACK_INTERPRETER_MODEL")]
    pub interpreter_model: Option<String>,

    #[arg(long, env = "NUTRI_TRACK_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// HTTP request timeout in seconds [default: 30]
    #[arg(long)]
    pub timeout: Option<u64>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Print the result as JSON and log as JSON lines
    #[arg(long)]
    pub json: bool,
}

impl CliConfig {
    /// Pairs the `--barcode` flag with the photo after it has been turned into a URL.
    pub fn extraction_request(&self, photo_url: Option<String>) -> ExtractionRequest {
        ExtractionRequest::new(photo_url, self.barcode.clone())
    }

    /// Flags and `NUTRI_TRACK_*` variables given explicitly take precedence over the file.
    pub fn apply_to(&self, config: &mut TomlConfig) {
        if let Some(url) = &self.database_url {
            tracing::debug!("Overriding product_database.base_url from command line");
            config.product_database.base_url = url.clone();
        }
        if let Some(endpoint) = &self.interpreter_endpoint {
            tracing::debug!("Overriding interpreter.endpoint from command line");
            config.interpreter.endpoint = endpoint.clone();
        }
        if let Some(model) = &self.interpreter_model {
            tracing::debug!("Overriding interpreter.model from command line");
            config.interpreter.model = model.clone();
        }
        if let Some(key) = self.api_key.as_deref().filter(|key| !key.is_empty()) {
            config.interpreter.api_key = Some(key.to_string());
        }
        if let Some(timeout) = self.timeout {
            config.http.timeout_seconds = Some(timeout);
        }
    }

    /// Targets given on the command line, applied on top of the configured ones.
    pub fn target_overrides(&self) -> Vec<(Nutrient, f64)> {
        [
            (Nutrient::Calories, self.calories_target),
            (Nutrient::Protein, self.protein_target),
            (Nutrient::Fat, self.fat_target),
            (Nutrient::Carbohydrates, self.carbs_target),
            (Nutrient::Sugar, self.sugar_target),
        ]
        .into_iter()
        .filter_map(|(nutrient, value)| value.map(|v| (nutrient, v)))
        .collect()
    }
}

impl ConfigProvider for CliConfig {
    fn database_url(&self) -> &str {
        self.database_url
            .as_deref()
            .unwrap_or(open_food_facts::DEFAULT_BASE_URL)
    }

    fn interpreter_endpoint(&self) -> &str {
        self.interpreter_endpoint
            .as_deref()
            .unwrap_or(vision_interpreter::DEFAULT_ENDPOINT)
    }

    fn interpreter_model(&self) -> &str {
        self.interpreter_model
            .as_deref()
            .unwrap_or(vision_interpreter::DEFAULT_MODEL)
    }

    fn interpreter_api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    fn user_agent(&self) -> &str {
        DEFAULT_USER_AGENT
    }

    fn daily_targets(&self) -> DailyTargets {
        DailyTargets::default()
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("database_url", self.database_url())?;
        validation::validate_url("interpreter_endpoint", self.interpreter_endpoint())?;
        validation::validate_non_empty_string("interpreter_model", self.interpreter_model())?;
        if let Some(timeout) = self.timeout {
            validation::validate_positive_number("timeout", timeout, 1)?;
        }

        if !self.servings.is_finite() || self.servings <= 0.0 {
            return Err(NutriError::InvalidConfigValueError {
                field: "servings".to_string(),
                value: self.servings.to_string(),
                reason: "Serving size must be greater than 0".to_string(),
            });
        }

        if let Some(path) = &self.config {
            validation::validate_path("config", path)?;
        }

        Ok(())
    }
}
