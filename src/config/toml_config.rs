use crate::adapters::{open_food_facts, vision_interpreter};
use crate::core::tracker::{target_limits, DailyTargets};
use crate::core::ConfigProvider;
use crate::domain::model::Nutrient;
use crate::utils::error::{NutriError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = concat!("nutri-track/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub product_database: ProductDatabaseConfig,
    #[serde(default)]
    pub interpreter: InterpreterConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub targets: DailyTargets,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductDatabaseConfig {
    pub base_url: String,
}

impl Default for ProductDatabaseConfig {
    fn default() -> Self {
        Self {
            base_url: open_food_facts::DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            endpoint: vision_interpreter::DEFAULT_ENDPOINT.to_string(),
            model: vision_interpreter::DEFAULT_MODEL.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_seconds: Option<u64>,
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: Some(DEFAULT_TIMEOUT_SECONDS),
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub json_logs: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(NutriError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| NutriError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${OPENAI_API_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| NutriError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        crate::utils::validation::validate_url(
            "product_database.base_url",
            &self.product_database.base_url,
        )?;
        crate::utils::validation::validate_url("interpreter.endpoint", &self.interpreter.endpoint)?;
        crate::utils::validation::validate_non_empty_string(
            "interpreter.model",
            &self.interpreter.model,
        )?;

        if let Some(timeout) = self.http.timeout_seconds {
            crate::utils::validation::validate_positive_number("http.timeout_seconds", timeout, 1)?;
        }

        for nutrient in Nutrient::ALL {
            let limits = target_limits(nutrient);
            crate::utils::validation::validate_range(
                &format!("targets.{}", nutrient.display_name().to_lowercase()),
                self.targets.get(nutrient),
                0.0,
                limits.max,
            )?;
        }

        Ok(())
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json_logs)
            .unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn database_url(&self) -> &str {
        &self.product_database.base_url
    }

    fn interpreter_endpoint(&self) -> &str {
        &self.interpreter.endpoint
    }

    fn interpreter_model(&self) -> &str {
        &self.interpreter.model
    }

    fn interpreter_api_key(&self) -> Option<&str> {
        // 未設定的環境變數會保留 ${...}
        self.interpreter
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty() && !key.starts_with("${"))
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }

    fn user_agent(&self) -> &str {
        self.http.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    fn daily_targets(&self) -> DailyTargets {
        self.targets
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[product_database]
base_url = "https://world.openfoodfacts.org"

[interpreter]
endpoint = "https://llm.example.com/v1"
model = "vision-small"
api_key = "abc123"

[http]
timeout_seconds = 10
user_agent = "tests/1.0"

[targets]
calories = 1800
protein = 120

[monitoring]
json_logs = true
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.interpreter_endpoint(), "https://llm.example.com/v1");
        assert_eq!(config.interpreter_model(), "vision-small");
        assert_eq!(config.interpreter_api_key(), Some("abc123"));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.user_agent(), "tests/1.0");
        assert_eq!(config.daily_targets().calories, 1800.0);
        assert_eq!(config.daily_targets().protein, 120.0);
        // 未指定的目標使用預設值
        assert_eq!(config.daily_targets().fat, 70.0);
        assert!(config.json_logs());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();

        assert_eq!(config.database_url(), open_food_facts::DEFAULT_BASE_URL);
        assert_eq!(config.interpreter_model(), vision_interpreter::DEFAULT_MODEL);
        assert_eq!(config.interpreter_api_key(), None);
        assert_eq!(
            config.request_timeout(),
            Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)
        );
        assert_eq!(config.daily_targets(), DailyTargets::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("NUTRI_TRACK_TEST_KEY", "from-env");

        let toml_content = r#"
[interpreter]
endpoint = "https://llm.example.com/v1"
model = "vision-small"
api_key = "${NUTRI_TRACK_TEST_KEY}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.interpreter_api_key(), Some("from-env"));

        std::env::remove_var("NUTRI_TRACK_TEST_KEY");
    }

    #[test]
    fn test_unresolved_api_key_is_none() {
        let toml_content = r#"
[interpreter]
endpoint = "https://llm.example.com/v1"
model = "vision-small"
api_key = "${NUTRI_TRACK_SURELY_UNSET_VARIABLE}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.interpreter_api_key(), None);
    }

    #[test]
    fn test_config_validation() {
        let invalid_url = r#"
[product_database]
base_url = "invalid-url"
"#;
        let config = TomlConfig::from_toml_str(invalid_url).unwrap();
        assert!(config.validate().is_err());

        let target_too_high = r#"
[targets]
sugar = 500
"#;
        let config = TomlConfig::from_toml_str(target_too_high).unwrap();
        assert!(config.validate().is_err());

        let zero_timeout = r#"
[http]
timeout_seconds = 0
"#;
        let config = TomlConfig::from_toml_str(zero_timeout).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[targets]
carbohydrates = 300
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.daily_targets().carbohydrates, 300.0);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("[targets\ncalories = ").unwrap_err();
        assert!(matches!(err, NutriError::ConfigValidationError { .. }));
    }
}
