// src/config/llm.rs
use std::env;
use std::time::Duration;

pub const ENV_API_KEY: &str = "DEEPSEEK_API_KEY";
pub const ENV_BASE_URL: &str = "DEEPSEEK_BASE_URL";
pub const ENV_MODEL: &str = "DEEPSEEK_MODEL";

pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// Credentials and endpoint for the OpenAI-compatible chat API.
#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never print the key itself
        f.debug_struct("LlmConfig")
            .field("key_len", &self.api_key.len())
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl LlmConfig {
    /// `None` when no API key is configured; callers skip LLM features.
    pub fn from_env(timeout: Duration) -> Option<Self> {
        let api_key = env::var(ENV_API_KEY).ok()?.trim().to_string();
        if api_key.is_empty() {
            return None;
        }
        let base_url = env::var(ENV_BASE_URL)
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = env::var(ENV_MODEL)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Some(Self {
            api_key,
            base_url,
            model,
            timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[serial_test::serial]
    #[test]
    fn missing_or_blank_key_disables() {
        env::remove_var(ENV_API_KEY);
        assert!(LlmConfig::from_env(Duration::from_secs(1)).is_none());
        env::set_var(ENV_API_KEY, "   ");
        assert!(LlmConfig::from_env(Duration::from_secs(1)).is_none());
        env::remove_var(ENV_API_KEY);
    }

    #[serial_test::serial]
    #[test]
    fn defaults_and_overrides() {
        env::set_var(ENV_API_KEY, "sk-test");
        env::remove_var(ENV_MODEL);
        env::set_var(ENV_BASE_URL, "https://llm.example/");
        let cfg = LlmConfig::from_env(Duration::from_secs(3)).unwrap();
        assert_eq!(cfg.base_url, "https://llm.example");
        assert_eq!(cfg.model, DEFAULT_MODEL);
        assert!(!format!("{cfg:?}").contains("sk-test"));
        env::remove_var(ENV_API_KEY);
        env::remove_var(ENV_BASE_URL);
    }
}
