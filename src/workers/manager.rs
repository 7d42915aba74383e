// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::{PageResult, RunSummary};
use crate::workers::scrape_worker::ScrapeWorker;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tracing::{error, info};

/// 默认并发数
pub const DEFAULT_CONCURRENCY: usize = 3;

/// 抓取管理器
///
/// 把URL列表分发给最多 N 个并发的抓取流程，每个URL在独立任务中运行，
/// 任何一个流程的失败或 panic 都不会影响其他URL。
/// 结果按输入顺序返回，而不是完成顺序。
pub struct ScrapeManager {
    worker: Arc<ScrapeWorker>,
    concurrency: usize,
}

impl ScrapeManager {
    pub fn new(worker: Arc<ScrapeWorker>, concurrency: usize) -> Self {
        Self {
            worker,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// 抓取全部URL
    ///
    /// # 参数
    ///
    /// * `urls` - 已去重的URL列表
    ///
    /// # 返回值
    ///
    /// 每个输入URL对应一个结果，顺序与输入一致
    pub async fn run(&self, urls: &[String]) -> Vec<PageResult> {
        info!(
            "Starting to scrape {} URLs with concurrency {}",
            urls.len(),
            self.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let handles: Vec<_> = urls
            .iter()
            .cloned()
            .map(|url| {
                let worker = Arc::clone(&self.worker);
                let semaphore = Arc::clone(&semaphore);
                tokio::spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => return PageResult::failure(url, e),
                    };
                    worker.process(&url).await
                })
            })
            .collect();

        // join_all keeps input order, so results land at their input index
        let results: Vec<PageResult> = urls
            .iter()
            .zip(join_all(handles).await)
            .map(|(url, joined)| match joined {
                Ok(result) => result,
                Err(e) => {
                    error!("Error scraping {}: {}", url, e);
                    PageResult::failure(url, describe_join_error(e))
                }
            })
            .collect();

        let summary = RunSummary::from_results(&results);
        info!(
            successful = summary.successful,
            failed = summary.failed,
            total_units = summary.total_units,
            "Scraping completed: {}/{} successful",
            summary.successful,
            summary.total
        );

        results
    }
}

fn describe_join_error(e: JoinError) -> String {
    if !e.is_panic() {
        return format!("Scraping task cancelled: {}", e);
    }

    let payload = e.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("Scraping error: {}", message)
}
