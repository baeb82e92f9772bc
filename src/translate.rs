// src/translate.rs
//! Title translation for the digest. Best effort: on any problem the
//! original text is shown instead.

use async_trait::async_trait;
use tracing::debug;

use crate::llm::{ChatRequest, DynChatClient};

const SYSTEM_PROMPT: &str = "You are a precise translation assistant. Output only the translation.";

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> String;
}

/// Translates through the chat client; without one it echoes the input.
pub struct ChatTranslator {
    client: Option<DynChatClient>,
    target_language: String,
}

impl ChatTranslator {
    pub fn new(client: Option<DynChatClient>, target_language: impl Into<String>) -> Self {
        Self {
            client,
            target_language: target_language.into(),
        }
    }
}

#[async_trait]
impl Translator for ChatTranslator {
    async fn translate(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return String::new();
        }
        let Some(client) = &self.client else {
            return text.to_string();
        };

        let prompt = format!(
            "Translate the following into natural, concise {}:\n{}",
            self.target_language, text
        );
        let req = ChatRequest {
            system: SYSTEM_PROMPT,
            user: &prompt,
            temperature: 0.1,
        };
        match client.complete(req).await {
            Ok(out) if !out.trim().is_empty() => out.trim().to_string(),
            Ok(_) => text.to_string(),
            Err(e) => {
                debug!(target: "translate", error = %e, "translation failed, keeping original");
                text.to_string()
            }
        }
    }
}
