//! Chat-completions client shared by scoring and translation.
//! Talks to any OpenAI-compatible endpoint (DeepSeek by default).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::llm::LlmConfig;

/// One system + user exchange.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub system: &'a str,
    pub user: &'a str,
    pub temperature: f32,
}

/// Trait object used by the scorer and the translator.
pub trait ChatClient: Send + Sync {
    /// Return the assistant message content, trimmed.
    fn complete<'a>(
        &'a self,
        req: ChatRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynChatClient = Arc<dyn ChatClient>;

/// Build the real client when credentials exist.
pub fn build_chat_client(config: Option<&LlmConfig>) -> Result<Option<DynChatClient>> {
    match config {
        Some(cfg) => Ok(Some(Arc::new(OpenAiCompatClient::new(cfg.clone())?))),
        None => Ok(None),
    }
}

/// Chat Completions over HTTP. `timeout` bounds each call end to end.
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    cfg: LlmConfig,
}

impl OpenAiCompatClient {
    pub fn new(cfg: LlmConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("campus-digest/0.1")
            .connect_timeout(Duration::from_secs(5).min(cfg.timeout))
            .timeout(cfg.timeout)
            .build()
            .context("building chat http client")?;
        Ok(Self { http, cfg })
    }

    async fn complete_impl(&self, req: ChatRequest<'_>) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            stream: bool,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: Option<String>,
        }

        let body = Req {
            model: &self.cfg.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: req.system,
                },
                Msg {
                    role: "user",
                    content: req.user,
                },
            ],
            temperature: req.temperature,
            stream: false,
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.cfg.base_url))
            .bearer_auth(&self.cfg.api_key)
            .json(&body)
            .send()
            .await
            .context("chat request")?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("chat endpoint returned {status}"));
        }
        let parsed: Resp = resp.json().await.context("chat response body")?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| anyhow!("chat response without content"))
    }
}

impl ChatClient for OpenAiCompatClient {
    fn complete<'a>(
        &'a self,
        req: ChatRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(self.complete_impl(req))
    }
    fn provider_name(&self) -> &'static str {
        "openai-compatible"
    }
}

/// Canned replies for tests and offline runs.
pub struct FixedReplyClient {
    pub reply: Result<String, String>,
}

impl ChatClient for FixedReplyClient {
    fn complete<'a>(
        &'a self,
        _req: ChatRequest<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        let out = self.reply.clone().map_err(|e| anyhow!(e));
        Box::pin(async move { out })
    }
    fn provider_name(&self) -> &'static str {
        "fixed"
    }
}
