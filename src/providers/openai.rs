//! OpenAI 兼容的大模型翻译适配器
//!
//! 通过 `chat/completions` 接口翻译；`endpoint` 可指向任何兼容服务。

use crate::adapter::support::{self, ConfigSlot};
use crate::adapter::TranslationAdapter;
use crate::config::AdapterConfig;
use crate::error::{Result, TranslationError};
use crate::types::{
    DetectionResult, Formality, ProviderCategory, ProviderInfo, TranslationRequest,
    TranslationResponse, Usage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const PROVIDER_ID: &str = "openai";

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// 每千 token 的美元价格（输入+输出的粗略均价）
const COST_PER_1K_TOKENS: &[(&str, f64)] = &[
    ("gpt-4o-mini", 0.0004),
    ("gpt-4o", 0.0075),
    ("gpt-4.1-mini", 0.001),
    ("gpt-3.5-turbo", 0.001),
];

const LANGUAGES: &[&str] = &[
    "ar", "bg", "bn", "cs", "da", "de", "el", "en", "es", "et", "fa", "fi", "fr", "he", "hi",
    "hr", "hu", "id", "it", "ja", "ko", "lt", "lv", "ms", "nl", "no", "pl", "pt", "ro", "ru",
    "sk", "sl", "sr", "sv", "sw", "ta", "th", "tr", "uk", "ur", "vi", "zh-CN", "zh-TW",
];

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: u64,
}

pub struct OpenAiAdapter {
    client: Client,
    settings: ConfigSlot,
}

fn estimate_cost(model: &str, tokens: u64) -> Option<f64> {
    COST_PER_1K_TOKENS
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, price)| tokens as f64 / 1000.0 * price)
}

fn system_prompt(request: &TranslationRequest) -> String {
    let source = if request.is_auto_detect() {
        "the detected source language".to_string()
    } else {
        request.source_lang().to_string()
    };
    let mut prompt = format!(
        "You are a professional translator. Translate the user's text from {} to {}. \
         Reply with the translation only, without explanations or quotes.",
        source,
        request.target_lang()
    );
    let options = request.options();
    if let Some(domain) = &options.domain {
        prompt.push_str(&format!(" Use terminology appropriate for the {} domain.", domain));
    }
    match options.formality {
        Some(Formality::More) => prompt.push_str(" Use a formal register."),
        Some(Formality::Less) => prompt.push_str(" Use an informal register."),
        Some(Formality::Default) | None => {}
    }
    prompt
}

impl OpenAiAdapter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: support::build_client(PROVIDER_ID)?,
            settings: ConfigSlot::default(),
        })
    }

    async fn complete(
        &self,
        config: &AdapterConfig,
        api_key: &str,
        system: &str,
        user: &str,
    ) -> Result<(String, Option<u64>)> {
        let base = config.endpoint().unwrap_or(DEFAULT_ENDPOINT).trim_end_matches('/');
        let payload = ChatRequest {
            model: config.model().unwrap_or(DEFAULT_MODEL),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", base))
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| support::transport_error(PROVIDER_ID, e))?;
        let body: ChatResponse = support::read_json(PROVIDER_ID, response).await?;

        let content = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| TranslationError::Parse {
                provider: PROVIDER_ID.to_string(),
                message: "model returned no content".to_string(),
            })?;
        Ok((content, body.usage.map(|u| u.total_tokens)))
    }
}

#[async_trait]
impl TranslationAdapter for OpenAiAdapter {
    fn configure(&self, config: AdapterConfig) {
        self.settings.replace(config);
    }

    fn config(&self) -> AdapterConfig {
        self.settings.snapshot()
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo {
            id: PROVIDER_ID.to_string(),
            name: "OpenAI".to_string(),
            description: "Context-aware translation with GPT chat models".to_string(),
            website: "https://platform.openai.com".to_string(),
            category: ProviderCategory::Ai,
            languages: LANGUAGES.iter().map(|l| l.to_string()).collect(),
            requires_api_key: true,
            requires_secret: false,
            requires_region: false,
            pricing: "Billed per token, depends on model".to_string(),
            features: vec![
                "context-aware".to_string(),
                "domain".to_string(),
                "formality".to_string(),
            ],
        }
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResponse> {
        let settings = self.config();
        let config = &settings;
        let api_key = support::require_api_key(PROVIDER_ID, config)?;
        let prompt = system_prompt(request);
        let prompt = prompt.as_str();

        let (text, tokens) = support::execute(PROVIDER_ID, config, move || {
            self.complete(config, api_key, prompt, request.text())
        })
        .await?;

        let cost = tokens.and_then(|t| estimate_cost(config.model().unwrap_or(DEFAULT_MODEL), t));
        Ok(TranslationResponse::new(PROVIDER_ID, text).with_usage(Usage {
            characters: request.char_count(),
            tokens,
            cost,
        }))
    }

    async fn detect_language(&self, text: &str) -> Result<DetectionResult> {
        let settings = self.config();
        let config = &settings;
        let api_key = support::require_api_key(PROVIDER_ID, config)?;
        let prompt = "Identify the language of the user's text. \
                      Reply with its ISO 639-1 code only (use zh-CN or zh-TW for Chinese).";

        let (code, _) = support::execute(PROVIDER_ID, config, move || {
            self.complete(config, api_key, prompt, text)
        })
        .await?;

        Ok(DetectionResult {
            language: code
                .trim_matches(|c: char| !c.is_alphanumeric() && c != '-')
                .to_string(),
            confidence: 0.9,
        })
    }
}
