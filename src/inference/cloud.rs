use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use super::SummaryModel;
use crate::settings::SummarizerSettings;

const REQUEST_TIMEOUT_SECS: u64 = 60;
const SUMMARY_MAX_TOKENS: u32 = 256;
const SUMMARY_TEMPERATURE: f32 = 0.2;

/// Shared context sent with every request. Fixed at construction so each
/// call only carries the text to summarize.
const SUMMARY_SYSTEM_PROMPT: &str = "\
You summarize web page text for a focus tracker. Write a short plain-prose \
summary, three sentences at most, of what the text is about. Name the main \
topics and entities. Do not address the reader and do not add commentary.";

/// Summarization backed by an OpenAI-compatible chat completions endpoint.
///
/// Availability is just "an API key is configured": with no key every call
/// would be rejected upstream, so the wrapping summarizer degrades to a
/// no-op instead of hammering the endpoint.
pub struct CloudSummaryModel {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
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

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}

impl CloudSummaryModel {
    pub fn new(settings: &SummarizerSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build HTTP client for summarization")?;

        if settings.api_key.is_empty() {
            warn!("No summarizer API key configured; summarization is disabled");
        }

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }
}

#[async_trait]
impl SummaryModel for CloudSummaryModel {
    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SUMMARY_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            max_tokens: SUMMARY_MAX_TOKENS,
            temperature: SUMMARY_TEMPERATURE,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    anyhow!("summarization request timed out")
                } else if err.is_connect() {
                    anyhow!("summarization endpoint unreachable: {err}")
                } else {
                    anyhow!("summarization request failed: {err}")
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("failed to read summarization response")?;

        debug!("summarization response status: {status}");

        if !status.is_success() {
            error!("summarization API error: status={status}, body={body}");
            if let Ok(parsed) = serde_json::from_str::<ApiErrorResponse>(&body) {
                bail!("summarization API error: {}", parsed.error.message);
            }
            bail!("summarization API error ({status})");
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).context("failed to parse summarization response")?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("summarization response contained no choices"))?;

        Ok(content.trim().to_string())
    }
}
