//! Photo analysis through a chat-completion API.
//!
//! The photo is sent as a base64 data URL together with a prompt asking for a
//! short JSON verdict, which is mapped onto an [`AmenityStatus`] suggestion.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::AiConfig;
use crate::errors::AppError;
use crate::models::AmenityStatus;

const SYSTEM_PROMPT: &str = "You inspect photos of railway station amenities such as \
water booths, toilets, seating and lighting. Reply with JSON only, in the form \
{\"summary\": \"<one or two sentences>\", \"condition\": \"ok\" | \"needs_maintenance\" | \"out_of_service\"}.";

/// Result of analysing one photo.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoAnalysis {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_status: Option<AmenityStatus>,
    pub model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Verdict {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    condition: Option<String>,
}

/// Client for the configured analysis provider.
pub struct PhotoAnalyzer {
    client: reqwest::Client,
    config: AiConfig,
}

impl PhotoAnalyzer {
    pub fn new(config: AiConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Whether an API key is configured.
    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Analyse a JPEG photo. `context` is extra text from the caller, e.g. the
    /// amenity name.
    pub async fn analyze(
        &self,
        jpeg: &[u8],
        context: Option<&str>,
    ) -> Result<PhotoAnalysis, AppError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Unavailable("Photo analysis is not configured".to_string()))?;

        let body = build_request(&self.config.model, jpeg, context);

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Analysis request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!("Analysis provider returned {}: {}", status, text);
            return Err(AppError::Upstream(format!(
                "Analysis provider returned {}",
                status
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Invalid analysis response: {}", e)))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::Upstream("Analysis response was empty".to_string()))?;

        let (summary, suggested_status) = parse_verdict(&content);
        Ok(PhotoAnalysis {
            summary,
            suggested_status,
            model: self.config.model.clone(),
        })
    }
}

fn build_request(model: &str, jpeg: &[u8], context: Option<&str>) -> serde_json::Value {
    let data_url = format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg));
    let mut text = "Assess the condition of the amenity in this photo.".to_string();
    if let Some(context) = context.map(str::trim).filter(|c| !c.is_empty()) {
        text.push_str("\nContext: ");
        text.push_str(context);
    }

    json!({
        "model": model,
        "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            {
                "role": "user",
                "content": [
                    { "type": "text", "text": text },
                    { "type": "image_url", "image_url": { "url": data_url } }
                ]
            }
        ],
        "max_tokens": 300
    })
}

/// Read the model's reply. Models sometimes wrap JSON in a code fence or ignore
/// the format entirely; in the latter case the raw text becomes the summary.
fn parse_verdict(content: &str) -> (String, Option<AmenityStatus>) {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    match serde_json::from_str::<Verdict>(unfenced) {
        Ok(verdict) => {
            let status = verdict
                .condition
                .as_deref()
                .map(|c| c.trim().to_lowercase().replace([' ', '-'], "_"))
                .and_then(|c| AmenityStatus::from_str(&c));
            let summary = if verdict.summary.trim().is_empty() {
                unfenced.to_string()
            } else {
                verdict.summary.trim().to_string()
            };
            (summary, status)
        }
        Err(_) => (trimmed.to_string(), None),
    }
}
