//! LLM client for summary generation

use crate::config::LlmConfig;
use crate::llm::{
    summary_prompt, LlmError, LlmProvider, LlmResult, Summarizer, MAX_TOKENS, SYSTEM_PROMPT,
    TEMPERATURE,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub struct LlmClient {
    client: Client,
    config: LlmConfig,
    api_base_url: String,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> LlmResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| LlmError::ConfigError(e.to_string()))?;

        let api_base_url = config
            .api_base_url
            .clone()
            .unwrap_or_else(|| config.provider.default_base_url().to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            config: config.clone(),
            api_base_url,
        })
    }

    pub fn provider(&self) -> LlmProvider {
        self.config.provider
    }

    fn system_prompt(&self) -> String {
        self.config
            .system_prompt
            .clone()
            .unwrap_or_else(|| SYSTEM_PROMPT.to_string())
    }

    /// Send one user prompt with the system prompt and return the reply text.
    pub async fn complete(&self, prompt: &str) -> LlmResult<String> {
        debug!("LLM request via {:?} ({} chars)", self.config.provider, prompt.len());
        match self.config.provider {
            LlmProvider::Groq | LlmProvider::OpenAI => self.chat_completions(prompt).await,
            LlmProvider::Ollama => self.ollama_generate(prompt).await,
            LlmProvider::Mock => Ok(mock_summary(prompt)),
        }
    }

    async fn chat_completions(&self, prompt: &str) -> LlmResult<String> {
        #[derive(Serialize)]
        struct Message {
            role: String,
            content: String,
        }

        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            messages: Vec<Message>,
            temperature: f32,
            max_tokens: u32,
        }

        #[derive(Deserialize)]
        struct Response {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: MessageContent,
        }

        #[derive(Deserialize)]
        struct MessageContent {
            content: Option<String>,
        }

        let api_key = self.config.api_key.as_ref().ok_or_else(|| {
            LlmError::ConfigError(format!("{:?} requires an API key", self.config.provider))
        })?;

        let url = format!("{}/chat/completions", self.api_base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&Request {
                model: &self.config.model,
                messages: vec![
                    Message { role: "system".to_string(), content: self.system_prompt() },
                    Message { role: "user".to_string(), content: prompt.to_string() },
                ],
                temperature: TEMPERATURE,
                max_tokens: MAX_TOKENS,
            })
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::ApiError(format!("{:?} error {}: {}", self.config.provider, status, text)));
        }

        let result: Response = resp
            .json()
            .await
            .map_err(|e| LlmError::SerializationError(e.to_string()))?;
        result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::ApiError("response contained no choices".to_string()))
    }

    async fn ollama_generate(&self, prompt: &str) -> LlmResult<String> {
        #[derive(Serialize)]
        struct Options {
            temperature: f32,
            num_predict: u32,
        }

        #[derive(Serialize)]
        struct Request<'a> {
            model: &'a str,
            prompt: String,
            system: String,
            stream: bool,
            options: Options,
        }

        #[derive(Deserialize)]
        struct Response {
            response: String,
        }

        let url = format!("{}/api/generate", self.api_base_url);
        let resp = self
            .client
            .post(&url)
            .json(&Request {
                model: &self.config.model,
                prompt: prompt.to_string(),
                system: self.system_prompt(),
                stream: false,
                options: Options { temperature: TEMPERATURE, num_predict: MAX_TOKENS },
            })
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(LlmError::ApiError(format!("Ollama error: {}", resp.status())));
        }

        let result: Response = resp
            .json()
            .await
            .map_err(|e| LlmError::SerializationError(e.to_string()))?;
        Ok(result.response)
    }
}

#[async_trait]
impl Summarizer for LlmClient {
    async fn summarize(&self, content: &str) -> LlmResult<String> {
        self.complete(&summary_prompt(content)).await
    }
}

/// Offline stand-in: one bullet per requested point, quoting the prompt's content line.
fn mock_summary(prompt: &str) -> String {
    let points = if prompt.contains("seven-point") {
        7
    } else if prompt.contains("five-point") {
        5
    } else {
        3
    };
    let excerpt: String = prompt
        .lines()
        .find_map(|l| l.trim().strip_prefix("Document Content:"))
        .unwrap_or("")
        .trim()
        .chars()
        .take(60)
        .collect();

    (1..=points)
        .map(|i| format!("- Point {}: {}", i, excerpt))
        .collect::<Vec<_>>()
        .join("\n")
}
