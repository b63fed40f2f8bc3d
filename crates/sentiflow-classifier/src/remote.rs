//! Remote LLM fallback backend.
//!
//! Talks to an OpenAI-compatible chat-completions endpoint. The system
//! prompt pins the reply to a strict JSON object so the completion can be
//! parsed mechanically; models that wrap their answer in a Markdown code
//! fence are tolerated by stripping the fence before parsing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use async_trait::async_trait;

use crate::backend::{Classification, ClassifierBackend};
use crate::error::{ClassifierError, Result};
use sentiflow_core::Sentiment;

const SYSTEM_INSTRUCTION: &str = "You are a sentiment analysis AI. Respond ONLY with valid JSON in this exact format: {\"sentiment\": \"positive|negative|neutral\", \"confidence\": 0.0-1.0, \"emotion\": \"joy|sadness|anger|fear|surprise|neutral\"}. No other text.";

/// Configuration for the remote chat-completions backend.
#[derive(Debug, Clone)]
pub struct RemoteLlmConfig {
    /// Full URL of the chat-completions endpoint.
    pub endpoint: String,
    /// Bearer token for the provider.
    pub api_key: String,
    /// Model identifier sent in the request body.
    pub model: String,
    /// Whole-request timeout.
    pub request_timeout: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// The JSON object the system instruction asks the model to emit.
#[derive(Deserialize)]
struct Verdict {
    sentiment: String,
    confidence: f64,
    emotion: String,
}

/// Classifier backend calling an OpenAI-compatible completions API.
pub struct RemoteLlmBackend {
    config: RemoteLlmConfig,
    client: reqwest::Client,
}

impl RemoteLlmBackend {
    pub fn new(config: RemoteLlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClassifierError::Provider(e.to_string()))?;
        Ok(Self { config, client })
    }
}

/// Strip a surrounding Markdown code fence, with or without a `json` tag.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse the model's completion text into a [`Classification`].
fn parse_verdict(content: &str, model_name: &str) -> Result<Classification> {
    let verdict: Verdict = serde_json::from_str(strip_code_fences(content))?;
    Ok(Classification {
        sentiment: Sentiment::from_label(&verdict.sentiment),
        confidence: verdict.confidence,
        emotion: verdict.emotion,
        model_name: model_name.to_string(),
    })
}

#[async_trait]
impl ClassifierBackend for RemoteLlmBackend {
    async fn classify(&self, text: &str) -> Result<Classification> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_INSTRUCTION.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!(
                        "Analyze the sentiment and emotion of this text: \"{}\"",
                        text
                    ),
                },
            ],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClassifierError::Timeout(self.config.request_timeout)
                } else {
                    ClassifierError::Provider(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Provider(format!(
                "HTTP {status}: {detail}"
            )));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| ClassifierError::Provider(e.to_string()))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ClassifierError::Provider("empty choices".to_string()))?;

        parse_verdict(&content, &self.config.model)
    }

    fn name(&self) -> &str {
        "remote-llm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---------------------------------------------------------------
    // Code fence stripping
    // ---------------------------------------------------------------

    #[test]
    fn test_strip_no_fence() {
        assert_eq!(strip_code_fences(r#"{"a":1}"#), r#"{"a":1}"#);
    }

    #[test]
    fn test_strip_plain_fence() {
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), r#"{"a":1}"#);
    }

    #[test]
    fn test_strip_json_fence() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), r#"{"a":1}"#);
    }

    #[test]
    fn test_strip_fence_with_surrounding_whitespace() {
        assert_eq!(
            strip_code_fences("  ```json\n{\"a\":1}\n```  "),
            r#"{"a":1}"#
        );
    }

    // ---------------------------------------------------------------
    // Verdict parsing
    // ---------------------------------------------------------------

    #[test]
    fn test_parse_verdict_plain() {
        let c = parse_verdict(
            r#"{"sentiment":"negative","confidence":0.85,"emotion":"anger"}"#,
            "llama-3.1-8b-instant",
        )
        .unwrap();
        assert_eq!(c.sentiment, Sentiment::Negative);
        assert_eq!(c.confidence, 0.85);
        assert_eq!(c.emotion, "anger");
        assert_eq!(c.model_name, "llama-3.1-8b-instant");
    }

    #[test]
    fn test_parse_verdict_fenced() {
        let c = parse_verdict(
            "```json\n{\"sentiment\": \"positive\", \"confidence\": 0.9, \"emotion\": \"joy\"}\n```",
            "m",
        )
        .unwrap();
        assert_eq!(c.sentiment, Sentiment::Positive);
    }

    #[test]
    fn test_parse_verdict_unknown_sentiment_is_neutral() {
        let c = parse_verdict(
            r#"{"sentiment":"mixed","confidence":0.5,"emotion":"neutral"}"#,
            "m",
        )
        .unwrap();
        assert_eq!(c.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_parse_verdict_not_json() {
        let err = parse_verdict("I think it's positive!", "m").unwrap_err();
        assert!(matches!(err, ClassifierError::MalformedReply(_)));
    }

    // ---------------------------------------------------------------
    // Completion body parsing
    // ---------------------------------------------------------------

    #[test]
    fn test_completion_body_shape() {
        let body = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [
                {
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": "{\"sentiment\":\"neutral\",\"confidence\":0.6,\"emotion\":\"neutral\"}"
                    },
                    "finish_reason": "stop"
                }
            ]
        }"#;
        let completion: ChatCompletion = serde_json::from_str(body).unwrap();
        let content = &completion.choices[0].message.content;
        let c = parse_verdict(content, "m").unwrap();
        assert_eq!(c.sentiment, Sentiment::Neutral);
        assert_eq!(c.confidence, 0.6);
    }

    #[test]
    fn test_backend_name() {
        let backend = RemoteLlmBackend::new(RemoteLlmConfig {
            endpoint: "https://api.example.com/v1/chat/completions".to_string(),
            api_key: "k".to_string(),
            model: "m".to_string(),
            request_timeout: Duration::from_secs(30),
        })
        .unwrap();
        assert_eq!(backend.name(), "remote-llm");
    }
}
