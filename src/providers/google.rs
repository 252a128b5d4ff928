//! Google 翻译适配器
//!
//! 未配置 API key 时使用免费的 `translate_a/single` 网页接口，
//! 配置后改用 Cloud Translation v2。

use crate::adapter::support::{self, ConfigSlot};
use crate::adapter::TranslationAdapter;
use crate::config::AdapterConfig;
use crate::error::{Result, TranslationError};
use crate::types::{
    DetectionResult, ProviderCategory, ProviderInfo, TranslationRequest, TranslationResponse,
    Usage, ValidationResult,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

pub const PROVIDER_ID: &str = "google";

const FREE_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";
const CLOUD_ENDPOINT: &str = "https://translation.googleapis.com/language/translate/v2";

const LANGUAGES: &[&str] = &[
    "af", "ar", "bg", "bn", "ca", "cs", "cy", "da", "de", "el", "en", "es", "et", "fa", "fi",
    "fr", "ga", "he", "hi", "hr", "hu", "id", "is", "it", "ja", "ko", "lt", "lv", "ms", "mt",
    "nl", "no", "pl", "pt", "ro", "ru", "sk", "sl", "sq", "sr", "sv", "sw", "ta", "th", "tl",
    "tr", "uk", "ur", "vi", "zh-CN", "zh-TW",
];

pub struct GoogleAdapter {
    client: Client,
    settings: ConfigSlot,
}

impl GoogleAdapter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: support::build_client(PROVIDER_ID)?,
            settings: ConfigSlot::default(),
        })
    }

    async fn translate_free(
        &self,
        endpoint: &str,
        request: &TranslationRequest,
    ) -> Result<(String, Option<String>)> {
        let response = self
            .client
            .get(endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", request.source_lang()),
                ("tl", request.target_lang()),
                ("dt", "t"),
                ("q", request.text()),
            ])
            .send()
            .await
            .map_err(|e| support::transport_error(PROVIDER_ID, e))?;
        let body: serde_json::Value = support::read_json(PROVIDER_ID, response).await?;
        parse_free_response(&body)
    }

    async fn translate_cloud(
        &self,
        endpoint: &str,
        api_key: &str,
        request: &TranslationRequest,
    ) -> Result<(String, Option<String>)> {
        let mut payload = serde_json::json!({
            "q": request.text(),
            "target": request.target_lang(),
            "format": "text",
        });
        if !request.is_auto_detect() {
            payload["source"] = serde_json::Value::from(request.source_lang());
        }

        let response = self
            .client
            .post(endpoint)
            .query(&[("key", api_key)])
            .json(&payload)
            .send()
            .await
            .map_err(|e| support::transport_error(PROVIDER_ID, e))?;
        let body: CloudResponse<CloudTranslations> =
            support::read_json(PROVIDER_ID, response).await?;

        body.data
            .translations
            .into_iter()
            .next()
            .map(|t| (t.translated_text, t.detected_source_language))
            .ok_or_else(|| parse_error("no translation in response"))
    }
}

#[derive(Debug, Deserialize)]
struct CloudResponse<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct CloudTranslations {
    translations: Vec<CloudTranslation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CloudTranslation {
    translated_text: String,
    detected_source_language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CloudDetections {
    detections: Vec<Vec<CloudDetection>>,
}

#[derive(Debug, Deserialize)]
struct CloudDetection {
    language: String,
    confidence: Option<f32>,
}

fn parse_error(message: impl Into<String>) -> TranslationError {
    TranslationError::Parse {
        provider: PROVIDER_ID.to_string(),
        message: message.into(),
    }
}

/// 网页接口返回嵌套数组：`[[["译文","原文",...],...], null, "en", ...]`
fn parse_free_response(body: &serde_json::Value) -> Result<(String, Option<String>)> {
    let segments = body
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| parse_error("unexpected response shape"))?;

    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(|s| s.as_str()))
        .collect();
    if translated.is_empty() {
        return Err(parse_error("empty translation"));
    }

    let detected = body.get(2).and_then(|v| v.as_str()).map(str::to_string);
    Ok((translated, detected))
}

#[async_trait]
impl TranslationAdapter for GoogleAdapter {
    fn configure(&self, config: AdapterConfig) {
        self.settings.replace(config);
    }

    fn config(&self) -> AdapterConfig {
        self.settings.snapshot()
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo {
            id: PROVIDER_ID.to_string(),
            name: "Google Translate".to_string(),
            description: "Google machine translation, keyless web endpoint or Cloud Translation v2"
                .to_string(),
            website: "https://cloud.google.com/translate".to_string(),
            category: ProviderCategory::Traditional,
            languages: LANGUAGES.iter().map(|l| l.to_string()).collect(),
            requires_api_key: false,
            requires_secret: false,
            requires_region: false,
            pricing: "Free web endpoint; Cloud v2 $20 per million characters".to_string(),
            features: vec!["auto-detect".to_string(), "batch".to_string()],
        }
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResponse> {
        let settings = self.config();
        let config = &settings;
        if !self.is_language_pair_supported(request.source_lang(), request.target_lang()) {
            return Err(TranslationError::UnsupportedLanguagePair {
                provider: PROVIDER_ID.to_string(),
                source_lang: request.source_lang().to_string(),
                target_lang: request.target_lang().to_string(),
            });
        }

        let (text, detected) = support::execute(PROVIDER_ID, config, move || async move {
            match config.api_key() {
                Some(key) => {
                    let endpoint = config.endpoint().unwrap_or(CLOUD_ENDPOINT);
                    self.translate_cloud(endpoint, key, request).await
                }
                None => {
                    let endpoint = config.endpoint().unwrap_or(FREE_ENDPOINT);
                    self.translate_free(endpoint, request).await
                }
            }
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

        match config.api_key() {
            Some(key) => {
                let url = format!("{}/detect", config.endpoint().unwrap_or(CLOUD_ENDPOINT));
                let endpoint = url.as_str();
                support::execute(PROVIDER_ID, config, move || async move {
                    let response = self
                        .client
                        .post(endpoint)
                        .query(&[("key", key)])
                        .json(&serde_json::json!({ "q": text }))
                        .send()
                        .await
                        .map_err(|e| support::transport_error(PROVIDER_ID, e))?;
                    let body: CloudResponse<CloudDetections> =
                        support::read_json(PROVIDER_ID, response).await?;
                    body.data
                        .detections
                        .into_iter()
                        .flatten()
                        .next()
                        .map(|d| DetectionResult {
                            language: d.language,
                            confidence: d.confidence.unwrap_or(1.0),
                        })
                        .ok_or_else(|| parse_error("no detection in response"))
                })
                .await
            }
            None => {
                let probe = TranslationRequest::new(text, "auto", "en")?;
                let request = &probe;
                let endpoint = config.endpoint().unwrap_or(FREE_ENDPOINT);
                let (_, detected) = support::execute(PROVIDER_ID, config, move || {
                    self.translate_free(endpoint, request)
                })
                .await?;
                detected
                    .map(|language| DetectionResult {
                        language,
                        confidence: 1.0,
                    })
                    .ok_or_else(|| parse_error("no detected language in response"))
            }
        }
    }

    async fn validate_config(&self) -> ValidationResult {
        match self.detect_language("Hello, world").await {
            Ok(_) => ValidationResult::valid("Google Translate is reachable"),
            Err(e) => ValidationResult::invalid(e.to_string()),
        }
    }
}
