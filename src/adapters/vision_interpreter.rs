use crate::domain::model::{InterpretedLabel, NutritionRecord};
use crate::domain::ports::{ConfigProvider, LabelInterpreter};
use crate::utils::error::{NutriError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const EXTRACTION_PROMPT: &str = r#"You are an AI trained to extract nutritional information from food labels.
Given an image of a food label or a product barcode, extract the following information if present. If a value is not found return 0:
- Calories
- Protein (in grams)
- Fat (in grams)
- Total Carbohydrates (in grams)
- Sugar (in grams)

If the label specifies "Added Sugars", use this value for the sugar content. Otherwise use the "Sugar" value.

Ensure that you accurately identify and extract the "Total Carbohydrates" value from the label.

If a barcode is visible in the image, return its digits in "barcode". Otherwise return null for "barcode".

Respond with a single JSON object and nothing else:
{"calories": number, "protein": number, "fat": number, "carbohydrates": number, "sugar": number, "barcode": string or null}"#;

/// Label interpreter backed by an OpenAI-compatible chat completions API
/// with image input.
#[derive(Debug, Clone)]
pub struct VisionLabelInterpreter {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl VisionLabelInterpreter {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key,
        })
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        Self::new(
            config.interpreter_endpoint(),
            config.interpreter_model(),
            config.interpreter_api_key().map(str::to_string),
            config.request_timeout(),
            config.user_agent(),
        )
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
    }

    fn request_body(&self, photo_url: &str) -> Value {
        json!({
            "model": self.model,
            "temperature": 0,
            "response_format": {"type": "json_object"},
            "messages": [
                {
                    "role": "system",
                    "content": EXTRACTION_PROMPT
                },
                {
                    "role": "user",
                    "content": [
                        {"type": "text", "text": "Here is the food label image."},
                        {"type": "image_url", "image_url": {"url": photo_url}}
                    ]
                }
            ]
        })
    }
}

#[async_trait]
impl LabelInterpreter for VisionLabelInterpreter {
    async fn interpret(&self, photo_url: &str) -> Result<InterpretedLabel> {
        let mut request = self
            .client
            .post(self.completions_url())
            .json(&self.request_body(photo_url));

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        tracing::debug!(model = %self.model, "Requesting label interpretation");
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(NutriError::ImageExtractionFailed {
                message: format!("API request failed: Status {}, Body: {}", status, error_text),
            });
        }

        let response_json: Value = response.json().await?;

        if let Some(error) = response_json.get("error") {
            return Err(NutriError::ImageExtractionFailed {
                message: format!("API returned error: {}", error),
            });
        }

        let content = response_json
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .ok_or_else(|| NutriError::ImageExtractionFailed {
                message: "Model response did not contain any content".to_string(),
            })?;

        parse_label_content(content)
    }
}

/// Parses the model's JSON reply, tolerating a surrounding code fence.
pub fn parse_label_content(content: &str) -> Result<InterpretedLabel> {
    let cleaned = strip_code_fence(content);

    let value: Value =
        serde_json::from_str(cleaned).map_err(|e| NutriError::ImageExtractionFailed {
            message: format!("Model returned invalid JSON: {}", e),
        })?;

    if !value.is_object() {
        return Err(NutriError::ImageExtractionFailed {
            message: "Model returned JSON that is not an object".to_string(),
        });
    }

    Ok(InterpretedLabel {
        record: NutritionRecord::from_json_object(&value),
        barcode: value.get("barcode").and_then(barcode_digits),
    })
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner
        .strip_prefix("json")
        .or_else(|| inner.strip_prefix("JSON"))
        .unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn barcode_digits(value: &Value) -> Option<String> {
    // 數字形式只接受整數，浮點數可能是科學記號
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.as_u64()?.to_string(),
        _ => return None,
    };
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    // 0 代表模型沒讀到條碼
    if digits.is_empty() || digits == "0" {
        None
    } else {
        Some(digits)
    }
}
