//! Ollama-backed receipt extractor.

use super::parse::parse_scan_response;
use super::{ExtractOptions, Extractor, ExtractorError, ScanFields};
use crate::normalizer;
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const SYSTEM_PROMPT: &str = "You are an expert at reading and extracting information from \
receipts and invoices. You must carefully read all text in images and extract accurate \
information.";

/// Scan prompt shared by vision backends.
const SCAN_PROMPT: &str = r#"You are analyzing a receipt or invoice document. Carefully read all text in the image and extract the following information:

1. **Store/Business Name**: Look for the merchant name, store name, or business name at the top of the receipt. This is usually the largest text or in a header. Examples: "Walmart", "CVS Pharmacy", "Walgreens", "Target".

2. **Date**: Find the transaction date, purchase date, or invoice date on the receipt. Convert it to ISO 8601 format (YYYY-MM-DD). Look for dates near the top or bottom of the receipt. Common formats: MM/DD/YYYY, DD/MM/YYYY, or written dates.

3. **Total Amount**: Find the final total, grand total, or amount due. This is usually at the bottom of the receipt, often labeled as "TOTAL", "Amount Due", "Grand Total", or similar. Extract only the numeric value (e.g., 42.75 for $42.75).

Return ONLY valid JSON in this exact format:
{
  "title": "Store Name - Brief Description",
  "date": "YYYY-MM-DD",
  "amount": 0.00
}

Important:
- The title should start with the actual store/business name from the receipt
- The date must be in YYYY-MM-DD format
- The amount must be a number (not a string), representing dollars and cents
- If you cannot find a field, use null for that field
- Do not include any text before or after the JSON
- Do not use markdown code blocks"#;

/// Receipt extractor backed by an Ollama server's `/api/chat` endpoint
/// with a vision model.
pub struct OllamaExtractor {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaExtractor {
    /// Create a new Ollama extractor.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the Ollama server (e.g., "http://localhost:11434").
    /// * `model` - Vision model to use (e.g., "llava").
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Extractor for OllamaExtractor {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn extract(
        &self,
        data: &[u8],
        content_type: &str,
        options: &ExtractOptions,
    ) -> Result<ScanFields, ExtractorError> {
        let normalized = normalizer::normalize(data, content_type)?;
        let image_b64 = base64::engine::general_purpose::STANDARD.encode(&normalized.bytes);

        let request = OllamaChatRequest {
            model: self.model.clone(),
            stream: false,
            messages: vec![
                OllamaMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                    images: None,
                },
                OllamaMessage {
                    role: "user".to_string(),
                    content: SCAN_PROMPT.to_string(),
                    images: Some(vec![image_b64]),
                },
            ],
        };

        debug!(
            model = %self.model,
            converted = normalized.converted,
            image_bytes = normalized.bytes.len(),
            "Sending scan request to Ollama"
        );

        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractorError::Timeout
                } else {
                    ExtractorError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            // Surfaced verbatim: Ollama encodes rate-limit and model-load
            // hints in the body.
            let message = response.text().await.unwrap_or_default();
            return Err(ExtractorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat: OllamaChatResponse = response.json().await.map_err(|e| {
            ExtractorError::InvalidResponse(format!("failed to parse Ollama response: {e}"))
        })?;

        debug!(model = %self.model, "Received scan response from Ollama");

        parse_scan_response(&chat.message.content)
    }

    async fn health_check(&self) -> Result<(), ExtractorError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractorError::Timeout
                } else {
                    ExtractorError::Connection(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(ExtractorError::Api {
                status: response.status().as_u16(),
                message: "health check failed".to_string(),
            });
        }

        Ok(())
    }
}

// Ollama API types

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    #[allow(dead_code)]
    #[serde(default)]
    done: bool,
}
