use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::{LlmProvider, ProviderRequest};

const CHAT_ENDPOINT: &str = "https://api.cohere.com/v2/chat";

/// Cohere `/v2/chat` client.
pub struct CohereProvider {
    api_key: String,
    model: String,
    client: Client,
}

impl CohereProvider {
    /// Builds a client for `model`.
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Cohere HTTP client")?;
        Ok(Self {
            api_key,
            model,
            client,
        })
    }
}

impl LlmProvider for CohereProvider {
    fn answer(&self, request: &ProviderRequest) -> Result<String> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", self.api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).context("invalid Cohere API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let body = chat_request(&self.model, request);
        let resp = self
            .client
            .post(CHAT_ENDPOINT)
            .headers(headers)
            .json(&body)
            .send()
            .context("failed to call Cohere chat API")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            bail!("Cohere chat request failed ({}): {}", status, text);
        }
        let parsed: ChatResponse = resp.json().context("failed to parse Cohere response")?;
        response_text(parsed)
    }
}

fn chat_request<'a>(model: &'a str, request: &ProviderRequest<'a>) -> ChatRequest<'a> {
    ChatRequest {
        model,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        messages: vec![
            ChatMessage {
                role: "system",
                content: request.system,
            },
            ChatMessage {
                role: "user",
                content: request.prompt,
            },
        ],
    }
}

fn response_text(parsed: ChatResponse) -> Result<String> {
    let answer = parsed
        .message
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        })
        .collect::<Vec<_>>()
        .join("");
    if answer.trim().is_empty() {
        bail!("Cohere response missing text content");
    }
    Ok(answer.trim().to_string())
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn request_carries_system_and_user_turns() {
        let request = ProviderRequest {
            system: "sys",
            prompt: "سوال",
            temperature: 0.3,
            max_tokens: 64,
        };
        let value = serde_json::to_value(chat_request("command-r-plus", &request)).unwrap();
        assert_eq!(value["model"], "command-r-plus");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "سوال");
        assert_eq!(value["max_tokens"], 64);
    }

    #[test]
    fn joins_text_blocks() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"id":"1","finish_reason":"COMPLETE","message":{"role":"assistant","content":[{"type":"text","text":"ریچارد "},{"type":"text","text":"استالمن"}]}}"#,
        )
        .unwrap();
        assert_eq!(response_text(parsed).unwrap(), "ریچارد استالمن");
    }

    #[test]
    fn empty_content_is_an_error() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"message":{"role":"assistant","content":[]}}"#).unwrap();
        assert!(response_text(parsed).is_err());
    }
}
