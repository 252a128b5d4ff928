//! DeepL 官方 API 适配器

use crate::adapter::support::{self, ConfigSlot};
use crate::adapter::TranslationAdapter;
use crate::config::AdapterConfig;
use crate::error::{Result, TranslationError};
use crate::types::{
    DetectionResult, Formality, ProviderCategory, ProviderInfo, QuotaInfo, TranslationRequest,
    TranslationResponse, Usage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

pub const PROVIDER_ID: &str = "deepl";

const FREE_API: &str = "https://api-free.deepl.com/v2";
const PRO_API: &str = "https://api.deepl.com/v2";

const LANGUAGES: &[&str] = &[
    "ar", "bg", "cs", "da", "de", "el", "en", "es", "et", "fi", "fr", "hu", "id", "it", "ja",
    "ko", "lt", "lv", "nb", "nl", "pl", "pt", "ro", "ru", "sk", "sl", "sv", "tr", "uk", "zh-CN",
    "zh-TW",
];

pub struct DeepLAdapter {
    client: Client,
    settings: ConfigSlot,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
struct Translation {
    text: String,
    detected_source_language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageResponse {
    character_count: u64,
    character_limit: Option<u64>,
}

/// 免费密钥以 `:fx` 结尾，对应不同的 API 主机
fn base_url(config: &AdapterConfig, api_key: &str) -> String {
    match config.endpoint() {
        Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
        None if api_key.ends_with(":fx") => FREE_API.to_string(),
        None => PRO_API.to_string(),
    }
}

/// DeepL 的目标语言代码：中文需区分简繁，英语/葡语需区分变体
fn target_code(lang: &str) -> String {
    match lang {
        "zh-CN" | "zh" => "ZH-HANS".to_string(),
        "zh-TW" => "ZH-HANT".to_string(),
        "en" => "EN-US".to_string(),
        "pt" => "PT-PT".to_string(),
        other => other.to_uppercase(),
    }
}

fn source_code(lang: &str) -> Option<String> {
    match lang {
        "auto" => None,
        "zh-CN" | "zh-TW" => Some("ZH".to_string()),
        other => Some(other.to_uppercase()),
    }
}

/// DeepL 返回的源语言代码转回本库约定
fn normalize_detected(code: &str) -> String {
    match code {
        "ZH" => "zh-CN".to_string(),
        other => other.to_lowercase(),
    }
}

impl DeepLAdapter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: support::build_client(PROVIDER_ID)?,
            settings: ConfigSlot::default(),
        })
    }

    fn form_for(request: &TranslationRequest) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("text", request.text().to_string()),
            ("target_lang", target_code(request.target_lang())),
        ];
        if let Some(source) = source_code(request.source_lang()) {
            form.push(("source_lang", source));
        }
        let options = request.options();
        match options.formality {
            Some(Formality::More) => form.push(("formality", "prefer_more".to_string())),
            Some(Formality::Less) => form.push(("formality", "prefer_less".to_string())),
            Some(Formality::Default) | None => {}
        }
        if let Some(glossary) = &options.glossary {
            form.push(("glossary_id", glossary.clone()));
        }
        form
    }

    async fn post_translate(
        &self,
        url: &str,
        api_key: &str,
        form: &[(&'static str, String)],
    ) -> Result<Translation> {
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("DeepL-Auth-Key {}", api_key))
            .form(form)
            .send()
            .await
            .map_err(|e| support::transport_error(PROVIDER_ID, e))?;
        let body: TranslateResponse = support::read_json(PROVIDER_ID, response).await?;
        body.translations
            .into_iter()
            .next()
            .ok_or_else(|| TranslationError::Parse {
                provider: PROVIDER_ID.to_string(),
                message: "no translation in response".to_string(),
            })
    }
}

#[async_trait]
impl TranslationAdapter for DeepLAdapter {
    fn configure(&self, config: AdapterConfig) {
        self.settings.replace(config);
    }

    fn config(&self) -> AdapterConfig {
        self.settings.snapshot()
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo {
            id: PROVIDER_ID.to_string(),
            name: "DeepL".to_string(),
            description: "High quality neural translation for European and Asian languages"
                .to_string(),
            website: "https://www.deepl.com/pro-api".to_string(),
            category: ProviderCategory::Traditional,
            languages: LANGUAGES.iter().map(|l| l.to_string()).collect(),
            requires_api_key: true,
            requires_secret: false,
            requires_region: false,
            pricing: "Free tier 500,000 characters/month; Pro $25 per million characters"
                .to_string(),
            features: vec![
                "formality".to_string(),
                "glossary".to_string(),
                "quota".to_string(),
            ],
        }
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResponse> {
        let settings = self.config();
        let config = &settings;
        let api_key = support::require_api_key(PROVIDER_ID, config)?;
        if !self.is_language_pair_supported(request.source_lang(), request.target_lang()) {
            return Err(TranslationError::UnsupportedLanguagePair {
                provider: PROVIDER_ID.to_string(),
                source_lang: request.source_lang().to_string(),
                target_lang: request.target_lang().to_string(),
            });
        }

        let url = format!("{}/translate", base_url(config, api_key));
        let form = Self::form_for(request);
        let (url, form) = (url.as_str(), form.as_slice());

        let translation = support::execute(PROVIDER_ID, config, move || {
            self.post_translate(url, api_key, form)
        })
        .await?;

        Ok(TranslationResponse::new(PROVIDER_ID, translation.text)
            .detected(
                translation
                    .detected_source_language
                    .as_deref()
                    .map(normalize_detected),
                None,
            )
            .with_usage(Usage {
                characters: request.char_count(),
                tokens: None,
                cost: None,
            }))
    }

    async fn detect_language(&self, text: &str) -> Result<DetectionResult> {
        let settings = self.config();
        let config = &settings;
        let api_key = support::require_api_key(PROVIDER_ID, config)?;

        let url = format!("{}/translate", base_url(config, api_key));
        let form = vec![
            ("text", text.to_string()),
            ("target_lang", "EN-US".to_string()),
        ];
        let (url, form) = (url.as_str(), form.as_slice());

        let translation = support::execute(PROVIDER_ID, config, move || {
            self.post_translate(url, api_key, form)
        })
        .await?;

        translation
            .detected_source_language
            .map(|code| DetectionResult {
                language: normalize_detected(&code),
                confidence: 1.0,
            })
            .ok_or_else(|| TranslationError::Parse {
                provider: PROVIDER_ID.to_string(),
                message: "no detected language in response".to_string(),
            })
    }

    async fn quota(&self) -> Result<Option<QuotaInfo>> {
        let settings = self.config();
        let config = &settings;
        let api_key = support::require_api_key(PROVIDER_ID, config)?;
        let url = format!("{}/usage", base_url(config, api_key));
        let url = url.as_str();

        let usage: UsageResponse = support::execute(PROVIDER_ID, config, move || async move {
            let response = self
                .client
                .get(url)
                .header("Authorization", format!("DeepL-Auth-Key {}", api_key))
                .send()
                .await
                .map_err(|e| support::transport_error(PROVIDER_ID, e))?;
            support::read_json(PROVIDER_ID, response).await
        })
        .await?;

        Ok(Some(QuotaInfo {
            used: usage.character_count,
            limit: usage.character_limit,
            unit: "characters".to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TranslationOptions;

    #[test]
    fn free_keys_use_free_host() {
        let config = AdapterConfig::default();
        assert_eq!(base_url(&config, "abc:fx"), FREE_API);
        assert_eq!(base_url(&config, "abc"), PRO_API);

        let custom = AdapterConfig {
            endpoint: Some("http://localhost:9000/v2/".into()),
            ..AdapterConfig::default()
        };
        assert_eq!(base_url(&custom, "abc:fx"), "http://localhost:9000/v2");
    }

    #[test]
    fn builds_form_with_formality_and_glossary() {
        let options = TranslationOptions {
            formality: Some(Formality::Less),
            glossary: Some("g-1".into()),
            ..TranslationOptions::default()
        };
        let request = TranslationRequest::with_options("Hi", "auto", "zh-CN", options).unwrap();
        let form = DeepLAdapter::form_for(&request);

        assert!(form.contains(&("target_lang", "ZH-HANS".to_string())));
        assert!(form.contains(&("formality", "prefer_less".to_string())));
        assert!(form.contains(&("glossary_id", "g-1".to_string())));
        assert!(!form.iter().any(|(k, _)| *k == "source_lang"));
    }

    #[tokio::test]
    async fn missing_key_is_a_credential_error() {
        let adapter = DeepLAdapter::new().unwrap();
        let request = TranslationRequest::new("Hi", "en", "de").unwrap();
        let err = tokio_test::assert_err!(adapter.translate(&request).await);
        assert!(err.is_auth_error());
        assert_eq!(err.provider(), Some(PROVIDER_ID));

        let validation = adapter.validate_config().await;
        assert!(!validation.valid);
    }
}
