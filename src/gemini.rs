//! Gemini enhancement client
//!
//! Optional natural-language polish for data-bearing replies: given the
//! user's words and a short banking context, produce one brief friendly
//! acknowledgment. Entirely best-effort — the assistant is fully
//! functional with this absent, and every failure collapses to `None`.

use crate::error::AssistantError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

const MAX_ACKNOWLEDGMENT_LEN: usize = 100;

/// Reusable Gemini client (connection-pooled)
struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    fn new(api_key: String) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent".to_string(),
        })
    }

    async fn generate(&self, prompt: &str) -> crate::Result<String> {
        let url = format!("{}?key={}", self.base_url, self.api_key);

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.3,
                max_output_tokens: 64,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AssistantError::Upstream(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AssistantError::Upstream(format!(
                "Gemini returned status {}",
                response.status()
            )));
        }

        let body: GeminiResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::Upstream(format!("Gemini parse error: {}", e)))?;

        body.candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .ok_or_else(|| AssistantError::Upstream("empty Gemini response".to_string()))
    }
}

/// Best-effort response enhancer. Present when an API key was configured,
/// absent otherwise; absence is a normal branch, not an error.
pub struct ResponseEnhancer {
    client: Option<GeminiClient>,
}

impl ResponseEnhancer {
    pub fn new(api_key: Option<String>) -> Self {
        let client = api_key
            .filter(|key| !key.is_empty())
            .and_then(|key| match GeminiClient::new(key) {
                Ok(client) => {
                    info!("Gemini enhancement enabled");
                    Some(client)
                }
                Err(e) => {
                    warn!("Could not build Gemini client, running without enhancement: {}", e);
                    None
                }
            });

        Self { client }
    }

    pub fn disabled() -> Self {
        Self { client: None }
    }

    /// One short friendly acknowledgment, or `None` when the enhancer is
    /// absent, errors out, or rambles past the length cap.
    pub async fn enhance(&self, user_input: &str, banking_context: &str) -> Option<String> {
        let client = self.client.as_ref()?;

        let prompt = format!(
            r#"You're a friendly banking assistant. User said: "{}"

Context: {}

Provide ONLY a brief, friendly acknowledgment (1 sentence max).
DO NOT provide banking data - that will be added separately.
DO NOT say you can't access data - you can.

Examples:
- "Sure, let me check that for you"
- "Of course, here's what I found"
- "Absolutely, let me pull that up"

Keep it very short and natural."#,
            user_input, banking_context
        );

        match client.generate(&prompt).await {
            Ok(text) if text.len() <= MAX_ACKNOWLEDGMENT_LEN && !text.is_empty() => Some(text),
            Ok(_) => None,
            Err(e) => {
                warn!("Gemini enhancement failed: {}", e);
                None
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: i32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}
