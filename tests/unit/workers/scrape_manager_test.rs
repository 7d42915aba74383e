// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 抓取管理器测试模块
///
/// 验证结果顺序、单URL故障隔离、并发上限与重试行为

#[cfg(test)]
mod tests {
    use crate::integration::helpers::{
        build_worker, instant_retries, urls, Behavior, CountingLLM, MockFetcher, UNITS_JSON,
    };
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;
    use storage_scraper::engines::traits::EngineError;
    use storage_scraper::utils::errors::ExtractionError;
    use storage_scraper::utils::retry_policy::RetryPolicy;
    use storage_scraper::workers::ScrapeManager;

    #[tokio::test]
    async fn test_results_follow_input_order() {
        let urls = urls(5);
        let fetcher = Arc::new(MockFetcher::new().with_delay(Duration::from_millis(5)));
        let llm = Arc::new(CountingLLM::new(UNITS_JSON));
        let manager = ScrapeManager::new(build_worker(fetcher, llm, RetryPolicy::none()), 2);

        let results = manager.run(&urls).await;

        assert_eq!(results.len(), urls.len());
        for (result, url) in results.iter().zip(&urls) {
            assert_eq!(&result.url, url);
            assert!(result.success);
            assert!(result.error.is_none());
            assert_eq!(result.units.len(), 2);
            assert!(result.units.iter().all(|u| &u.source_url == url));
        }
    }

    #[tokio::test]
    async fn test_failing_url_does_not_affect_others() {
        let urls = urls(5);
        let fetcher = Arc::new(MockFetcher::new().on(
            &urls[1],
            Behavior::Fail(EngineError::NavigationFailed("net::ERR_NAME_NOT_RESOLVED".into())),
        ));
        let llm = Arc::new(CountingLLM::new(UNITS_JSON));
        let manager = ScrapeManager::new(build_worker(fetcher, llm, RetryPolicy::none()), 2);

        let results = manager.run(&urls).await;

        assert_eq!(results.len(), 5);
        assert!(!results[1].success);
        assert!(results[1].units.is_empty());
        assert!(results[1]
            .error
            .as_deref()
            .unwrap()
            .contains("ERR_NAME_NOT_RESOLVED"));
        for i in [0, 2, 3, 4] {
            assert!(results[i].success, "url #{} should succeed", i + 1);
            assert_eq!(results[i].units.len(), 2);
        }
    }

    #[tokio::test]
    async fn test_panicking_url_becomes_failed_result() {
        let urls = urls(5);
        let fetcher = Arc::new(MockFetcher::new().on(&urls[1], Behavior::Panic));
        let llm = Arc::new(CountingLLM::new(UNITS_JSON));
        let manager = ScrapeManager::new(build_worker(fetcher, llm, RetryPolicy::none()), 2);

        let results = manager.run(&urls).await;

        assert_eq!(results.len(), 5);
        assert_eq!(results[1].url, urls[1]);
        assert!(!results[1].success);
        let error = results[1].error.as_deref().unwrap();
        assert!(error.starts_with("Scraping error:"), "got {}", error);
        assert!(error.contains("fetcher exploded"));
        assert!(results
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 1)
            .all(|(_, r)| r.success));
    }

    #[tokio::test]
    async fn test_http_error_skips_extraction() {
        let urls = urls(1);
        let fetcher =
            Arc::new(MockFetcher::new().on(&urls[0], Behavior::Fail(EngineError::HttpError(404))));
        let llm = Arc::new(CountingLLM::new(UNITS_JSON));
        let manager = ScrapeManager::new(
            build_worker(fetcher.clone(), llm.clone(), instant_retries(3)),
            1,
        );

        let results = manager.run(&urls).await;

        assert!(!results[0].success);
        assert!(results[0].error.as_deref().unwrap().contains("404"));
        assert_eq!(llm.call_count(), 0);
        // 404 is not retryable
        assert_eq!(fetcher.calls_for(&urls[0]), 1);
    }

    #[tokio::test]
    async fn test_concurrency_bound_is_respected() {
        let urls = urls(8);
        let fetcher = Arc::new(MockFetcher::new().with_delay(Duration::from_millis(20)));
        let llm = Arc::new(CountingLLM::new("[]"));
        let manager = ScrapeManager::new(
            build_worker(fetcher.clone(), llm, RetryPolicy::none()),
            3,
        );

        let results = manager.run(&urls).await;

        assert_eq!(results.len(), 8);
        let peak = fetcher.max_in_flight.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency {} exceeded bound", peak);
        assert!(peak >= 1);
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_clamped() {
        let fetcher = Arc::new(MockFetcher::new());
        let llm = Arc::new(CountingLLM::new("[]"));
        let manager = ScrapeManager::new(build_worker(fetcher, llm, RetryPolicy::none()), 0);

        assert_eq!(manager.concurrency(), 1);
        let results = manager.run(&urls(2)).await;
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_retryable_failure_is_retried() {
        let urls = urls(1);
        let fetcher = Arc::new(MockFetcher::new().on(
            &urls[0],
            Behavior::FlakyThenPage(
                2,
                EngineError::HttpError(503),
                "<p>10x10 $99</p>".to_string(),
            ),
        ));
        let llm = Arc::new(CountingLLM::new(UNITS_JSON));
        let manager = ScrapeManager::new(
            build_worker(fetcher.clone(), llm, instant_retries(3)),
            1,
        );

        let results = manager.run(&urls).await;

        assert!(results[0].success);
        assert_eq!(fetcher.calls_for(&urls[0]), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let urls = urls(1);
        let fetcher = Arc::new(MockFetcher::new().on(
            &urls[0],
            Behavior::Fail(EngineError::NavigationFailed("timeout".into())),
        ));
        let llm = Arc::new(CountingLLM::new(UNITS_JSON));
        let manager = ScrapeManager::new(
            build_worker(fetcher.clone(), llm, instant_retries(2)),
            1,
        );

        let results = manager.run(&urls).await;

        assert!(!results[0].success);
        assert_eq!(fetcher.calls_for(&urls[0]), 3);
    }

    #[tokio::test]
    async fn test_navigation_timeout_is_not_retried() {
        let urls = urls(1);
        let fetcher = Arc::new(
            MockFetcher::new().on(&urls[0], Behavior::Fail(EngineError::NavigationTimeout(3600))),
        );
        let llm = Arc::new(CountingLLM::new(UNITS_JSON));
        let manager = ScrapeManager::new(
            build_worker(fetcher.clone(), llm.clone(), instant_retries(3)),
            1,
        );

        let results = manager.run(&urls).await;

        assert!(!results[0].success);
        assert!(results[0].error.as_deref().unwrap().contains("timed out"));
        assert_eq!(fetcher.calls_for(&urls[0]), 1);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_extraction_failure_is_success_with_diagnostic() {
        let urls = urls(2);
        let fetcher = Arc::new(MockFetcher::new());
        let llm = Arc::new(CountingLLM::failing(ExtractionError::Timeout(30)));
        let manager = ScrapeManager::new(build_worker(fetcher, llm, RetryPolicy::none()), 2);

        let results = manager.run(&urls).await;

        for result in &results {
            assert!(result.success);
            assert!(result.units.is_empty());
            assert!(result.error.is_none());
            assert!(result.extraction_error.is_some());
        }
    }

    #[tokio::test]
    async fn test_unparseable_model_output_yields_empty_success() {
        let urls = urls(1);
        let fetcher = Arc::new(MockFetcher::new());
        let llm = Arc::new(CountingLLM::new("not json at all"));
        let manager = ScrapeManager::new(build_worker(fetcher, llm, RetryPolicy::none()), 1);

        let results = manager.run(&urls).await;

        assert!(results[0].success);
        assert!(results[0].units.is_empty());
        assert!(results[0].error.is_none());
        assert!(results[0].extraction_error.is_some());
    }

    #[tokio::test]
    async fn test_empty_input_returns_empty_results() {
        let fetcher = Arc::new(MockFetcher::new());
        let llm = Arc::new(CountingLLM::new("[]"));
        let manager = ScrapeManager::new(build_worker(fetcher, llm, RetryPolicy::none()), 3);

        assert!(manager.run(&[]).await.is_empty());
    }
}
