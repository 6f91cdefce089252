//! 生成模型服务
//!
//! 封装对外部大模型的调用。核心逻辑只负责把组装好的提示词发出去、
//! 把候选文本取回来，不解析、不校验模型说了什么。

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use crate::config::config::LlmConfig;
use crate::error::{AppError, Result};

/// 生成模型
#[async_trait]
pub trait GenerationModel: Send + Sync {
    /// 根据提示词生成一段回复文本
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// 模型名称
    fn model_name(&self) -> &str;
}

/// 本地回声模型
///
/// 开发和测试用，原样回显最后一轮输入，不依赖任何外部服务。
#[derive(Default)]
pub struct EchoGenerationModel;

#[async_trait]
impl GenerationModel for EchoGenerationModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let last_line = prompt.lines().last().unwrap_or_default();
        Ok(format!("[echo] {}", last_line))
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

/// Gemini 生成模型客户端
pub struct GeminiGenerationModel {
    client: reqwest::Client,
    api_key: String,
    model_name: String,
    base_url: String,
    temperature: f32,
    max_output_tokens: u32,
    max_retries: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GenerateContentResponse {
    /// 取第一个候选的全部文本分片
    fn extract_text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().map(|p| p.text.as_str()).collect();
        if text.is_empty() { None } else { Some(text) }
    }
}

impl GeminiGenerationModel {
    /// 创建新客户端
    pub fn new(config: &LlmConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(AppError::Config(
                "Gemini API 密钥未配置，请设置 llm.api_key".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model_name: config.model_name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            max_retries: config.max_retries,
        })
    }

    async fn call_once(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model_name
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&serde_json::json!({
                "contents": [{
                    "role": "user",
                    "parts": [{ "text": prompt }]
                }],
                "generationConfig": {
                    "temperature": self.temperature,
                    "maxOutputTokens": self.max_output_tokens,
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Generation(format!(
                "Gemini 调用失败: {}",
                error_text
            )));
        }

        let body: GenerateContentResponse = response.json().await?;
        body.extract_text()
            .ok_or_else(|| AppError::Generation("响应中没有候选文本".to_string()))
    }
}

#[async_trait]
impl GenerationModel for GeminiGenerationModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let mut last_err: Option<AppError> = None;

        for attempt in 0..=self.max_retries {
            match self.call_once(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!(attempt, "模型调用失败: {}", e);
                    last_err = Some(e);
                    if attempt < self.max_retries {
                        let backoff = Duration::from_secs((1 + attempt as u64 * 2).min(10));
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| AppError::Generation("模型调用失败".to_string())))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// 创建生成模型
pub fn create_generation_model(config: &LlmConfig) -> Result<Box<dyn GenerationModel>> {
    match config.backend.as_str() {
        "gemini" => {
            let model = GeminiGenerationModel::new(config)?;
            Ok(Box::new(model))
        }
        "echo" | _ => Ok(Box::new(EchoGenerationModel)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config::AppConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gemini_config(base_url: &str, max_retries: u32) -> LlmConfig {
        let mut config = AppConfig::development().llm;
        config.backend = "gemini".into();
        config.api_key = "test-key".into();
        config.model_name = "test-model".into();
        config.base_url = base_url.into();
        config.max_retries = max_retries;
        config
    }

    #[tokio::test]
    async fn test_echo_model_replays_last_line() {
        let model = EchoGenerationModel;
        let reply = model.generate("她: 还没~\n我: 晚安").await.unwrap();
        assert_eq!(reply, "[echo] 我: 晚安");
    }

    #[tokio::test]
    async fn test_gemini_extracts_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/test-model:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {
                        "parts": [{ "text": "刚下班，" }, { "text": "饿晕了都[流泪]" }]
                    }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let model = GeminiGenerationModel::new(&gemini_config(&server.uri(), 0)).unwrap();
        let reply = model.generate("我: 晚上吃了吗？").await.unwrap();
        assert_eq!(reply, "刚下班，饿晕了都[流泪]");
    }

    #[tokio::test]
    async fn test_gemini_retries_then_surfaces_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/test-model:generateContent"))
            .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
            .expect(2)
            .mount(&server)
            .await;

        let model = GeminiGenerationModel::new(&gemini_config(&server.uri(), 1)).unwrap();
        let err = model.generate("我: 在吗").await.unwrap_err();
        assert!(matches!(err, AppError::Generation(_)));
    }

    #[tokio::test]
    async fn test_gemini_empty_candidates_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/test-model:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let model = GeminiGenerationModel::new(&gemini_config(&server.uri(), 0)).unwrap();
        assert!(model.generate("我: 在吗").await.is_err());
    }

    #[test]
    fn test_factory_requires_api_key_for_gemini() {
        let mut config = AppConfig::development().llm;
        config.backend = "gemini".into();
        config.api_key = String::new();
        assert!(create_generation_model(&config).is_err());
    }

    #[test]
    fn test_factory_defaults_to_echo() {
        let config = AppConfig::development().llm;
        let model = create_generation_model(&config).unwrap();
        assert_eq!(model.model_name(), "echo");
    }
}
