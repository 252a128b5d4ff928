//! DeepLX 自建服务适配器
//!
//! 兼容标准 DeepLX 接口和 dptrans 变体；响应格式不固定，
//! 依次尝试标准结构、常见 JSON 字段和纯文本。

use crate::adapter::support::{self, ConfigSlot};
use crate::adapter::TranslationAdapter;
use crate::config::AdapterConfig;
use crate::error::{Result, TranslationError};
use crate::types::{
    DetectionResult, ProviderCategory, ProviderInfo, TranslationRequest, TranslationResponse,
    Usage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const PROVIDER_ID: &str = "deeplx";

const DEFAULT_ENDPOINT: &str = "http://localhost:1188/translate";

const LANGUAGES: &[&str] = &[
    "bg", "cs", "da", "de", "el", "en", "es", "et", "fi", "fr", "hu", "id", "it", "ja", "ko",
    "lt", "lv", "nb", "nl", "pl", "pt", "ro", "ru", "sk", "sl", "sv", "tr", "uk", "zh-CN",
];

#[derive(Debug, Serialize)]
struct DeepLXRequest<'a> {
    text: &'a str,
    source_lang: String,
    target_lang: String,
}

#[derive(Debug, Deserialize)]
struct DeepLXResponse {
    code: i32,
    data: String,
    source_lang: Option<String>,
}

pub struct DeepLXAdapter {
    client: Client,
    settings: ConfigSlot,
}

fn lang_code(lang: &str) -> String {
    match lang {
        "auto" => "auto".to_string(),
        "zh-CN" | "zh-TW" => "ZH".to_string(),
        other => other.to_uppercase(),
    }
}

fn parse_error(message: String) -> TranslationError {
    TranslationError::Parse {
        provider: PROVIDER_ID.to_string(),
        message,
    }
}

/// 解析 DeepLX 响应体，返回译文和（可能的）检测到的源语言
fn extract_translation(body: &str) -> Result<(String, Option<String>)> {
    if let Ok(result) = serde_json::from_str::<DeepLXResponse>(body) {
        if result.code != 200 {
            return Err(TranslationError::Server {
                provider: PROVIDER_ID.to_string(),
                code: u16::try_from(result.code).unwrap_or(500),
                message: format!("DeepLX returned code {}", result.code),
            });
        }
        if result.data.is_empty() {
            return Err(parse_error("DeepLX returned an empty translation".to_string()));
        }
        return Ok((result.data, result.source_lang.map(|l| l.to_lowercase())));
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(parse_error("API returned an empty translation".to_string()));
    }
    if !trimmed.starts_with('{') {
        return Ok((trimmed.to_string(), None));
    }

    let json: serde_json::Value = serde_json::from_str(trimmed)
        .map_err(|_| parse_error(format!("unable to parse JSON response: {}", trimmed)))?;
    json.get("translated_text")
        .or_else(|| json.get("result"))
        .or_else(|| json.get("translation"))
        .or_else(|| json.get("data"))
        .and_then(|v| v.as_str())
        .map(|text| (text.to_string(), None))
        .ok_or_else(|| {
            parse_error(format!(
                "unable to extract translation from JSON response: {}",
                trimmed
            ))
        })
}

impl DeepLXAdapter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: support::build_client(PROVIDER_ID)?,
            settings: ConfigSlot::default(),
        })
    }

    async fn call(
        &self,
        config: &AdapterConfig,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<(String, Option<String>)> {
        let endpoint = config.endpoint().unwrap_or(DEFAULT_ENDPOINT);
        let payload = DeepLXRequest {
            text,
            source_lang: lang_code(source_lang),
            target_lang: lang_code(target_lang),
        };

        let mut builder = self.client.post(endpoint).json(&payload);
        builder = if endpoint.contains("dptrans") {
            tracing::debug!("using dptrans request format");
            builder.header("Accept", "application/json, text/plain, */*")
        } else {
            builder.header("Accept", "application/json")
        };
        if let Some(token) = config.api_key() {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| support::transport_error(PROVIDER_ID, e))?;
        let response = support::ensure_success(PROVIDER_ID, response).await?;
        let body = response
            .text()
            .await
            .map_err(|e| support::transport_error(PROVIDER_ID, e))?;
        extract_translation(&body)
    }
}

#[async_trait]
impl TranslationAdapter for DeepLXAdapter {
    fn configure(&self, config: AdapterConfig) {
        self.settings.replace(config);
    }

    fn config(&self) -> AdapterConfig {
        self.settings.snapshot()
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo {
            id: PROVIDER_ID.to_string(),
            name: "DeepLX".to_string(),
            description: "Self-hosted DeepL-compatible endpoint (DeepLX or dptrans)".to_string(),
            website: "https://github.com/OwO-Network/DeepLX".to_string(),
            category: ProviderCategory::Local,
            languages: LANGUAGES.iter().map(|l| l.to_string()).collect(),
            requires_api_key: false,
            requires_secret: false,
            requires_region: false,
            pricing: "Free (self-hosted)".to_string(),
            features: vec!["auto-detect".to_string()],
        }
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResponse> {
        let settings = self.config();
        let config = &settings;
        tracing::debug!(
            chars = request.char_count(),
            "sending DeepLX request to {}",
            config.endpoint().unwrap_or(DEFAULT_ENDPOINT)
        );

        let (text, detected) = support::execute(PROVIDER_ID, config, move || {
            self.call(
                config,
                request.text(),
                request.source_lang(),
                request.target_lang(),
            )
        })
        .await?;

        Ok(TranslationResponse::new(PROVIDER_ID, text)
            .detected(detected, None)
            .with_usage(Usage {
                characters: request.char_count(),
                tokens: None,
                cost: None,
            }))
    }

    async fn detect_language(&self, text: &str) -> Result<DetectionResult> {
        let settings = self.config();
        let config = &settings;
        let (_, detected) = support::execute(PROVIDER_ID, config, move || {
            self.call(config, text, "auto", "en")
        })
        .await?;
        detected
            .map(|language| DetectionResult {
                language,
                confidence: 0.8,
            })
            .ok_or_else(|| parse_error("DeepLX did not report a source language".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_standard_response() {
        let body = r#"{"code":200,"data":"Hallo Welt","source_lang":"EN"}"#;
        let (text, detected) = extract_translation(body).unwrap();
        assert_eq!(text, "Hallo Welt");
        assert_eq!(detected.as_deref(), Some("en"));
    }

    #[test]
    fn non_200_code_is_a_server_error() {
        let body = r#"{"code":503,"data":""}"#;
        assert!(matches!(
            extract_translation(body),
            Err(TranslationError::Server { code: 503, .. })
        ));
    }

    #[test]
    fn falls_back_to_common_fields_and_plain_text() {
        let (text, _) = extract_translation(r#"{"result":"你好"}"#).unwrap();
        assert_eq!(text, "你好");

        let (text, _) = extract_translation("Bonjour\n").unwrap();
        assert_eq!(text, "Bonjour");

        assert!(extract_translation(r#"{"unexpected":1}"#).is_err());
        assert!(extract_translation("  ").is_err());
    }

    #[test]
    fn maps_chinese_variants_to_deepl_codes() {
        assert_eq!(lang_code("zh-CN"), "ZH");
        assert_eq!(lang_code("auto"), "auto");
        assert_eq!(lang_code("de"), "DE");
    }
}
