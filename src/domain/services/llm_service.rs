// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::errors::ExtractionError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

/// 生成参数
///
/// 偏向确定性输出：低温度、有限输出长度。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f64,
    pub top_p: f64,
    pub num_predict: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            top_p: 0.9,
            num_predict: 2000,
        }
    }
}

#[async_trait]
pub trait LLMServiceTrait: Send + Sync {
    /// 发送提示词并返回模型生成的文本
    async fn generate(&self, prompt: &str) -> Result<String, ExtractionError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerationOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Ollama 服务 - 调用本地或远程的 `/api/generate` 端点
///
/// # 配置
///
/// 由 `Settings` 的 `ollama` 段提供：
/// - `model` - 模型名称
/// - `base_url` - 端点基础URL
/// - `timeout_seconds` - 请求级超时
pub struct OllamaService {
    client: reqwest::Client,
    model: String,
    base_url: String,
    timeout: Duration,
    options: GenerationOptions,
}

#[async_trait]
impl LLMServiceTrait for OllamaService {
    async fn generate(&self, prompt: &str) -> Result<String, ExtractionError> {
        OllamaService::generate(self, prompt).await
    }
}

impl OllamaService {
    pub fn new(model: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            options: GenerationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    /// 调用生成端点
    ///
    /// # 参数
    /// * `prompt` - 完整的提示词
    ///
    /// # 返回值
    /// * `Ok(String)` - 去除首尾空白后的 `response` 字段
    ///
    /// # 错误
    /// * 超时返回 `ExtractionError::Timeout`
    /// * 连接失败、非成功状态码或响应体无法解码返回 `ExtractionError::Transport`
    pub async fn generate(&self, prompt: &str) -> Result<String, ExtractionError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: self.options,
        };

        let response = self
            .client
            .post(self.endpoint())
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Ollama API error: {} - {}", status, error_text);
            return Err(ExtractionError::Transport(format!(
                "Ollama API returned {}",
                status.as_u16()
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        debug!(chars = body.response.len(), "Received model response");
        Ok(body.response.trim().to_string())
    }

    fn map_transport_error(&self, e: reqwest::Error) -> ExtractionError {
        if e.is_timeout() {
            error!("Ollama request timeout after {}s", self.timeout.as_secs());
            ExtractionError::Timeout(self.timeout.as_secs())
        } else {
            error!("Ollama request failed: {}", e);
            ExtractionError::from(e)
        }
    }
}
