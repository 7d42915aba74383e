// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 浏览器引擎集成测试
///
/// 需要本机安装 Chromium，默认忽略

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use storage_scraper::engines::browser_engine::{BrowserEngine, BrowserOptions};
    use storage_scraper::engines::traits::{EngineError, FetchRequest, PageFetcher};
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_options() -> BrowserOptions {
        BrowserOptions {
            settle_delay: Duration::from_millis(100),
            ..BrowserOptions::default()
        }
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_fetch_renders_script_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/units"))
            .and(header("user-agent", "storage-scraper-test"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "<html><body><div id=\"units\"></div><script>document.getElementById('units').textContent = '5x5 $50/month';</script></body></html>",
                "text/html",
            ))
            .mount(&server)
            .await;

        let engine = BrowserEngine::launch(&fast_options()).await.unwrap();
        let request = FetchRequest::new(
            format!("{}/units", server.uri()),
            "storage-scraper-test",
            Duration::from_secs(30),
        );

        let page = engine.fetch(&request).await.unwrap();
        assert_eq!(page.status_code, 200);
        assert!(page.content.contains("5x5 $50/month"));

        engine.shutdown().await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_cookies_do_not_leak_between_fetches() {
        let server = MockServer::start().await;
        // mounted first so it wins whenever a cookie comes back
        Mock::given(method("GET"))
            .and(path("/b"))
            .and(header_exists("cookie"))
            .respond_with(ResponseTemplate::new(409).set_body_raw("<p>shared</p>", "text/html"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Set-Cookie", "session=unit-a; Path=/")
                    .set_body_raw("<p>facility a</p>", "text/html"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<p>facility b</p>", "text/html"))
            .mount(&server)
            .await;

        let engine = BrowserEngine::launch(&fast_options()).await.unwrap();
        let timeout = Duration::from_secs(30);

        let first = FetchRequest::new(format!("{}/a", server.uri()), "storage-scraper-test", timeout);
        assert_eq!(engine.fetch(&first).await.unwrap().status_code, 200);

        let second = FetchRequest::new(format!("{}/b", server.uri()), "storage-scraper-test", timeout);
        let page = engine.fetch(&second).await.unwrap();
        assert_eq!(page.status_code, 200);
        assert!(page.content.contains("facility b"));

        engine.shutdown().await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_error_status_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_raw("<h1>gone</h1>", "text/html"))
            .mount(&server)
            .await;

        let engine = BrowserEngine::launch(&fast_options()).await.unwrap();
        let request = FetchRequest::new(server.uri(), "storage-scraper-test", Duration::from_secs(30));

        assert_eq!(
            engine.fetch(&request).await.unwrap_err(),
            EngineError::HttpError(404)
        );

        engine.shutdown().await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_unreachable_host_is_navigation_failure() {
        let engine = BrowserEngine::launch(&fast_options()).await.unwrap();
        let request = FetchRequest::new(
            "http://127.0.0.1:9/",
            "storage-scraper-test",
            Duration::from_secs(15),
        );

        let err = engine.fetch(&request).await.unwrap_err();
        assert!(matches!(err, EngineError::NavigationFailed(_)), "got {:?}", err);

        engine.shutdown().await.unwrap();
    }
}
