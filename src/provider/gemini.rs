//! Google Gemini client.
//!
//! Calls the `generateContent` REST endpoint directly with an API key.
//! Each send replays the full history held by the [`Conversation`] handle,
//! carrying the system instruction in the request's native field.

use super::{ChatMessage, ProviderError};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Default Gemini API endpoint.
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Client for the Gemini API.
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    client: Client,
}

// ══════════════════════════════════════════════════════════════════════════════
// API REQUEST/RESPONSE TYPES
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: i64,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

// ══════════════════════════════════════════════════════════════════════════════
// CONVERSATION HANDLE
// ══════════════════════════════════════════════════════════════════════════════

/// An ongoing exchange with a Gemini model.
///
/// The handle owns the history that is replayed on every send. The system
/// instruction rides in its own request field and is never part of the
/// history, so `turns` counts completed user/model exchanges only.
#[derive(Debug, Clone)]
pub struct Conversation {
    model: String,
    system_instruction: String,
    temperature: f64,
    max_output_tokens: i64,
    history: Vec<ChatMessage>,
}

impl Conversation {
    /// Override the generation settings for this conversation.
    pub fn with_generation(mut self, temperature: f64, max_output_tokens: i64) -> Self {
        self.temperature = temperature;
        self.max_output_tokens = max_output_tokens;
        self
    }

    /// Number of completed user/model exchanges.
    pub fn turns(&self) -> usize {
        self.history.len() / 2
    }

    /// Full message history, oldest first.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Model this conversation is bound to.
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Result of one conversation exchange.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    /// Model reply text
    pub reply: String,
    /// Completed exchanges now in the conversation
    pub turns: usize,
}

// ══════════════════════════════════════════════════════════════════════════════
// CLIENT
// ══════════════════════════════════════════════════════════════════════════════

impl GeminiClient {
    /// Create a new Gemini client.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_API_BASE)
    }

    /// Create with a custom API base URL.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Start a fresh conversation bound to a model, seeded with a system
    /// instruction.
    pub fn create_conversation(
        &self,
        model: impl Into<String>,
        system_instruction: impl Into<String>,
    ) -> Conversation {
        Conversation {
            model: model.into(),
            system_instruction: system_instruction.into(),
            temperature: 0.7,
            max_output_tokens: 8192,
            history: Vec::new(),
        }
    }

    /// Send one user message, replaying the conversation history.
    ///
    /// The exchange is appended to the history only on success; a failed
    /// send leaves the conversation unchanged.
    pub async fn send(
        &self,
        conversation: &mut Conversation,
        text: &str,
    ) -> Result<SendOutcome, ProviderError> {
        let system_instruction = Some(Content {
            role: None,
            parts: vec![Part {
                text: conversation.system_instruction.clone(),
            }],
        });

        let mut contents: Vec<Content> = conversation
            .history
            .iter()
            .map(|msg| Content {
                role: Some(msg.role.clone()),
                parts: vec![Part {
                    text: msg.content.clone(),
                }],
            })
            .collect();
        contents.push(Content {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: text.to_string(),
            }],
        });

        let request = GenerateContentRequest {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                temperature: conversation.temperature,
                max_output_tokens: conversation.max_output_tokens,
            },
        };

        let model_name = if conversation.model.starts_with("models/") {
            conversation.model.clone()
        } else {
            format!("models/{}", conversation.model)
        };

        let url = format!(
            "{}/v1beta/{}:generateContent?key={}",
            self.base_url, model_name, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError {
                message: format!("Request failed: {}", e),
                status_code: None,
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError {
                message: format!("API error ({}): {}", status.as_u16(), error_text),
                status_code: Some(status.as_u16()),
            });
        }

        let result: GenerateContentResponse =
            response.json().await.map_err(|e| ProviderError {
                message: format!("Failed to parse response: {}", e),
                status_code: None,
            })?;

        // Check for API error in response body
        if let Some(err) = result.error {
            return Err(ProviderError {
                message: format!("API error: {}", err.message),
                status_code: None,
            });
        }

        let reply = result
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .and_then(|part| part.text)
            .ok_or_else(|| ProviderError {
                message: "No response from Gemini".into(),
                status_code: None,
            })?;

        conversation.history.push(ChatMessage::user(text));
        conversation.history.push(ChatMessage::model(reply.clone()));

        Ok(SendOutcome {
            reply,
            turns: conversation.turns(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_starts_empty() {
        let client = GeminiClient::new("test-key");
        let conversation = client.create_conversation("gemini-2.5-flash", "Be helpful.");

        assert_eq!(conversation.turns(), 0);
        assert!(conversation.history().is_empty());
        assert_eq!(conversation.model(), "gemini-2.5-flash");
    }

    #[test]
    fn generation_settings_can_be_overridden() {
        let client = GeminiClient::new("test-key");
        let conversation = client
            .create_conversation("gemini-2.5-flash", "Be helpful.")
            .with_generation(0.2, 1024);

        assert!((conversation.temperature - 0.2).abs() < f64::EPSILON);
        assert_eq!(conversation.max_output_tokens, 1024);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = GeminiClient::with_base_url("key", "http://localhost:9999/");
        assert_eq!(client.base_url, "http://localhost:9999");
    }

    #[test]
    fn request_serializes_gemini_wire_format() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![Part {
                    text: "hello".into(),
                }],
            }],
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part {
                    text: "Be helpful.".into(),
                }],
            }),
            generation_config: GenerationConfig {
                temperature: 0.7,
                max_output_tokens: 8192,
            },
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"generationConfig\""));
        assert!(json.contains("\"maxOutputTokens\""));
        assert!(json.contains("\"system_instruction\""));
        // The system instruction content has no role at all
        assert!(!json.contains("\"role\":null"));
    }

    #[test]
    fn response_parses_candidates() {
        let json = r#"{
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "Hi there"}]}}
            ]
        }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(json).unwrap();
        let text = parsed
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .and_then(|part| part.text);

        assert_eq!(text.as_deref(), Some("Hi there"));
        assert!(parsed.error.is_none());
    }

    #[test]
    fn response_parses_error_body() {
        let json = r#"{"error": {"message": "API key not valid", "code": 400}}"#;
        let parsed: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.error.unwrap().message, "API key not valid");
    }
}
