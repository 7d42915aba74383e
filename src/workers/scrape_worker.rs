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

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::domain::models::PageResult;
use crate::domain::services::extraction_service::ExtractionService;
use crate::engines::traits::{EngineError, FetchRequest, FetchedPage, PageFetcher};
use crate::utils::retry_policy::RetryPolicy;

/// 抓取工作器配置
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// 导航时使用的 User-Agent
    pub user_agent: String,
    /// 额外请求头
    pub headers: HashMap<String, String>,
    /// 单次抓取超时
    pub timeout: Duration,
    /// 抓取失败时的重试策略
    pub retry_policy: RetryPolicy,
}

impl WorkerConfig {
    fn request_for(&self, url: &str) -> FetchRequest {
        FetchRequest {
            headers: self.headers.clone(),
            ..FetchRequest::new(url, self.user_agent.clone(), self.timeout)
        }
    }
}

/// 抓取工作器
///
/// 执行单个URL的完整流程：抓取 → 提取 → 页面结果。
/// 抓取失败直接生成失败结果，不会调用提取。
pub struct ScrapeWorker {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<ExtractionService>,
    config: WorkerConfig,
}

impl ScrapeWorker {
    /// 创建新的抓取工作器实例
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<ExtractionService>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            config,
        }
    }

    /// 处理单个URL
    #[instrument(skip(self), fields(engine = self.fetcher.name()))]
    pub async fn process(&self, url: &str) -> PageResult {
        info!("Scraping {}", url);

        let page = match self.fetch_with_retry(url).await {
            Ok(page) => page,
            Err(e) => {
                error!("{}: {}", url, e);
                return PageResult::failure(url, e);
            }
        };
        info!(
            status = page.status_code,
            elapsed_ms = page.response_time_ms,
            "Page loaded"
        );

        match self.extractor.extract(&page.content, url).await {
            Ok(units) if units.is_empty() => {
                warn!("No storage units found at {}", url);
                PageResult::success(url, units)
            }
            Ok(units) => {
                info!("Found {} storage units at {}", units.len(), url);
                PageResult::success(url, units)
            }
            Err(e) if e.is_parse() => {
                warn!("Model output for {} was unusable: {}", url, e);
                PageResult::extraction_failed(url, e)
            }
            Err(e) => {
                warn!(transport = e.is_transport(), "Extraction failed for {}: {}", url, e);
                PageResult::extraction_failed(url, e)
            }
        }
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<FetchedPage, EngineError> {
        let request = self.config.request_for(url);
        let policy = &self.config.retry_policy;
        let mut attempt = 0;

        loop {
            match self.fetcher.fetch(&request).await {
                Ok(page) => return Ok(page),
                Err(e) if policy.should_retry_with_error(attempt, &e) => {
                    attempt += 1;
                    let backoff = policy.calculate_backoff(attempt);
                    warn!(attempt, ?backoff, "Fetch failed, retrying: {}", e);
                    sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
