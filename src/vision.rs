//! Vision-inference client for reading hoarding details off a photo.
//!
//! Enrichment is strictly best effort: any transport failure, refusal or
//! unparseable answer turns into `None` and the caller proceeds with
//! whatever the operator typed in. Nothing here may fail a create.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "gemini-pro-vision".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisionConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
}

/// Fields the vision service managed to read off the image. Anything it
/// could not determine stays `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HoardingDetails {
    pub name: Option<String>,
    pub address: Option<String>,
    pub width_in_feet: Option<f64>,
    pub height_in_feet: Option<f64>,
}

impl HoardingDetails {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.address.is_none()
            && self.width_in_feet.is_none()
            && self.height_in_feet.is_none()
    }
}

/// Capability seam for image-to-metadata extraction, so record creation
/// never depends on a concrete vendor.
#[async_trait]
pub trait VisionAnalyzer: Send + Sync {
    async fn extract_details(&self, image: &[u8], content_type: &str) -> Option<HoardingDetails>;
}

const PROMPT: &str = r#"Analyze the attached image of a billboard/hoarding. Extract the following details and provide them ONLY as a valid JSON object:
1. "name": A suitable title or name for the hoarding. If not obvious, use "N/A".
2. "address": The street address or a descriptive location. If not determinable, use "N/A".
3. "heightInFeet": An estimated height of the hoarding in feet (provide only the number). If not estimable, use "N/A".
4. "widthInFeet": An estimated width of the hoarding in feet (provide only the number). If not estimable, use "N/A".
Your response must be ONLY the JSON object, with no other text or explanations."#;

pub struct GeminiVision {
    config: VisionConfig,
    client: reqwest::Client,
}

impl GeminiVision {
    pub fn new(config: VisionConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(45))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn generate(&self, image: &[u8], content_type: &str) -> Option<String> {
        let body = json!({
            "contents": [
                {
                    "parts": [
                        { "text": PROMPT },
                        {
                            "inline_data": {
                                "mime_type": content_type,
                                "data": BASE64.encode(image)
                            }
                        }
                    ]
                }
            ]
        });

        let response = match self
            .client
            .post(self.endpoint())
            .query(&[("key", &self.config.api_key)])
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("Vision request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(
                "Vision request failed with status {}: {:?}",
                response.status(),
                response.text().await.ok()
            );
            return None;
        }

        let data: serde_json::Value = match response.json().await {
            Ok(d) => d,
            Err(e) => {
                warn!("Failed to parse vision response: {}", e);
                return None;
            }
        };

        data["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(String::from)
    }
}

#[async_trait]
impl VisionAnalyzer for GeminiVision {
    async fn extract_details(&self, image: &[u8], content_type: &str) -> Option<HoardingDetails> {
        let text = self.generate(image, content_type).await?;
        debug!("Vision raw answer: {}", text);

        let details = parse_details(&text)?;
        if details.is_empty() {
            return None;
        }
        Some(details)
    }
}

/// Pull a number out of a field the model may have answered as a number,
/// a numeric string or "N/A".
fn number_field(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text_field(value: &serde_json::Value) -> Option<String> {
    let text = value.as_str()?.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("n/a") {
        return None;
    }
    Some(text.to_string())
}

/// Parse the model's answer. The answer sometimes arrives fenced in
/// markdown or wrapped in prose, so only the outermost object is parsed.
fn parse_details(text: &str) -> Option<HoardingDetails> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    let parsed: serde_json::Value = serde_json::from_str(&text[start..=end]).ok()?;

    Some(HoardingDetails {
        name: text_field(&parsed["name"]),
        address: text_field(&parsed["address"]),
        width_in_feet: number_field(&parsed["widthInFeet"]),
        height_in_feet: number_field(&parsed["heightInFeet"]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_plain_json_answer() {
        let details = parse_details(
            r#"{"name": "Main Street Billboard", "address": "123 Main St", "heightInFeet": 20, "widthInFeet": 40}"#,
        )
        .unwrap();
        assert_eq!(details.name.as_deref(), Some("Main Street Billboard"));
        assert_eq!(details.width_in_feet, Some(40.0));
        assert_eq!(details.height_in_feet, Some(20.0));
    }

    #[test]
    fn parses_a_fenced_answer_with_string_numbers() {
        let text = "```json\n{\"name\": \"N/A\", \"address\": \"Ring Road\", \"heightInFeet\": \"12.5\", \"widthInFeet\": \"N/A\"}\n```";
        let details = parse_details(text).unwrap();
        assert_eq!(details.name, None);
        assert_eq!(details.address.as_deref(), Some("Ring Road"));
        assert_eq!(details.height_in_feet, Some(12.5));
        assert_eq!(details.width_in_feet, None);
    }

    #[test]
    fn rejects_answers_without_json() {
        assert_eq!(parse_details("I cannot see a billboard here."), None);
    }

    #[test]
    fn all_na_answer_counts_as_empty() {
        let details = parse_details(
            r#"{"name": "N/A", "address": "N/A", "heightInFeet": "N/A", "widthInFeet": "N/A"}"#,
        )
        .unwrap();
        assert!(details.is_empty());
    }
}
