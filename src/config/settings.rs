// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use validator::{Validate, ValidationErrors};

use crate::domain::services::llm_service::GenerationOptions;
use crate::engines::browser_engine::BrowserOptions;
use crate::utils::retry_policy::RetryPolicy;
use crate::workers::manager::DEFAULT_CONCURRENCY;
use crate::workers::scrape_worker::WorkerConfig;

pub const DEFAULT_MODEL: &str = "gemma3n:e4b";
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
/// 嵌套结构的配置文件，与旧版扁平格式的 `.storage_scraper_config.json` 区分
pub const DEFAULT_CONFIG_FILE: &str = ".storage_scraper.json";
pub const ENV_PREFIX: &str = "STORAGE_SCRAPER";

/// 配置错误类型
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("配置加载失败: {0}")]
    Load(#[from] ConfigError),

    #[error("配置校验失败: {0}")]
    Invalid(#[from] ValidationErrors),

    #[error("配置文件读写失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// 应用程序配置设置
///
/// 包含模型端点与抓取行为两部分配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Settings {
    /// 生成端点配置
    #[validate(nested)]
    pub ollama: OllamaSettings,
    /// 抓取配置
    #[validate(nested)]
    pub scraper: ScraperSettings,
}

/// 生成端点配置设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct OllamaSettings {
    /// 模型名称
    #[validate(length(min = 1, message = "Model cannot be empty"))]
    pub model: String,
    /// 端点基础URL
    #[validate(url)]
    pub base_url: String,
    /// 采样温度
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub top_p: f64,
    /// 最大输出token数
    #[validate(range(min = 1))]
    pub num_predict: u32,
    /// 提示词中HTML摘录的字符上限
    #[validate(range(min = 100))]
    pub max_prompt_chars: usize,
}

/// 抓取配置设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ScraperSettings {
    /// 页面抓取与模型调用的超时时间（秒）
    #[validate(range(min = 1))]
    pub timeout_seconds: u64,
    /// 可重试抓取错误的最大重试次数
    #[validate(range(max = 10))]
    pub max_retries: u32,
    #[validate(length(min = 1))]
    pub user_agent: String,
    /// 同时处理的URL数
    #[validate(range(min = 1, max = 64))]
    pub concurrency: usize,
    /// 网络空闲后的额外等待（毫秒）
    pub settle_delay_ms: u64,
    /// 判定网络空闲的静默时长（毫秒）
    #[validate(range(min = 1))]
    pub network_idle_ms: u64,
    /// 远程 Chrome 调试地址
    #[serde(default)]
    pub remote_debugging_url: Option<String>,
    /// Chrome 可执行文件路径
    #[serde(default)]
    pub chrome_executable: Option<PathBuf>,
    /// 额外请求头
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// 命令行对配置的修改
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl ConfigUpdate {
    pub fn is_empty(&self) -> bool {
        self.model.is_none() && self.base_url.is_none() && self.timeout_seconds.is_none()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ollama: OllamaSettings {
                model: DEFAULT_MODEL.to_string(),
                base_url: DEFAULT_BASE_URL.to_string(),
                temperature: 0.1,
                top_p: 0.9,
                num_predict: 2000,
                max_prompt_chars: 8000,
            },
            scraper: ScraperSettings {
                timeout_seconds: 3600,
                max_retries: 3,
                user_agent: DEFAULT_USER_AGENT.to_string(),
                concurrency: DEFAULT_CONCURRENCY,
                settle_delay_ms: 2000,
                network_idle_ms: 500,
                remote_debugging_url: None,
                chrome_executable: None,
                headers: HashMap::new(),
            },
        }
    }
}

/// 默认配置文件路径 `~/.storage_scraper.json`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DEFAULT_CONFIG_FILE))
}

impl Settings {
    /// 加载配置
    ///
    /// 依次叠加内置默认值、配置文件（可选，不存在时忽略）和
    /// `STORAGE_SCRAPER__<段>__<键>` 环境变量
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载并通过校验的配置
    /// * `Err(SettingsError)` - 配置加载或校验失败
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default("ollama.model", defaults.ollama.model)?
            .set_default("ollama.base_url", defaults.ollama.base_url)?
            .set_default("ollama.temperature", defaults.ollama.temperature)?
            .set_default("ollama.top_p", defaults.ollama.top_p)?
            .set_default("ollama.num_predict", defaults.ollama.num_predict as i64)?
            .set_default("ollama.max_prompt_chars", defaults.ollama.max_prompt_chars as i64)?
            .set_default("scraper.timeout_seconds", defaults.scraper.timeout_seconds as i64)?
            .set_default("scraper.max_retries", defaults.scraper.max_retries as i64)?
            .set_default("scraper.user_agent", defaults.scraper.user_agent)?
            .set_default("scraper.concurrency", defaults.scraper.concurrency as i64)?
            .set_default("scraper.settle_delay_ms", defaults.scraper.settle_delay_ms as i64)?
            .set_default("scraper.network_idle_ms", defaults.scraper.network_idle_ms as i64)?;

        if let Some(path) = path.map(Path::to_path_buf).or_else(default_config_path) {
            builder = builder.add_source(File::from(path).required(false));
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// 以格式化JSON写入配置文件
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// 应用命令行修改并重新校验
    pub fn apply(&mut self, update: ConfigUpdate) -> Result<(), SettingsError> {
        if let Some(model) = update.model {
            self.ollama.model = model;
        }
        if let Some(base_url) = update.base_url {
            self.ollama.base_url = base_url;
        }
        if let Some(timeout_seconds) = update.timeout_seconds {
            self.scraper.timeout_seconds = timeout_seconds;
        }
        self.validate()?;
        Ok(())
    }

    /// 抓取工作器配置
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            user_agent: self.scraper.user_agent.clone(),
            headers: self.scraper.headers.clone(),
            timeout: self.scraper.timeout(),
            retry_policy: RetryPolicy::with_max_retries(self.scraper.max_retries),
        }
    }
}

impl OllamaSettings {
    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: self.temperature,
            top_p: self.top_p,
            num_predict: self.num_predict,
        }
    }
}

impl ScraperSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn browser_options(&self) -> BrowserOptions {
        BrowserOptions {
            remote_debugging_url: self.remote_debugging_url.clone(),
            chrome_executable: self.chrome_executable.clone(),
            network_idle: Duration::from_millis(self.network_idle_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            ..BrowserOptions::default()
        }
    }
}
