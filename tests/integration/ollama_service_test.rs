// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 生成端点客户端测试
///
/// 使用 wiremock 模拟 `/api/generate`，验证请求体、错误映射与超时

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use storage_scraper::domain::services::llm_service::{
        GenerationOptions, LLMServiceTrait, OllamaService,
    };
    use storage_scraper::utils::errors::ExtractionError;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_generate_sends_expected_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "gemma3n:e4b",
                "response": "  [{\"size\":\"5x5\",\"price\":\"$50/month\"}]\n",
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let service = OllamaService::new("gemma3n:e4b", server.uri(), Duration::from_secs(5));
        let text = service.generate("extract please").await.unwrap();

        assert_eq!(text, "[{\"size\":\"5x5\",\"price\":\"$50/month\"}]");

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["model"], "gemma3n:e4b");
        assert_eq!(body["prompt"], "extract please");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["temperature"], 0.1);
        assert_eq!(body["options"]["num_predict"], 2000);
    }

    #[tokio::test]
    async fn test_custom_generation_options_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "response": "[]" })),
            )
            .mount(&server)
            .await;

        let service = OllamaService::new("llama3", server.uri(), Duration::from_secs(5))
            .with_options(GenerationOptions {
                temperature: 0.0,
                top_p: 0.5,
                num_predict: 512,
            });
        service.generate("p").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["options"]["top_p"], 0.5);
        assert_eq!(body["options"]["num_predict"], 512);
    }

    #[tokio::test]
    async fn test_non_success_status_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&server)
            .await;

        let service = OllamaService::new("gemma3n:e4b", server.uri(), Duration::from_secs(5));
        let err = service.generate("p").await.unwrap_err();

        assert!(err.is_transport());
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "response": "[]" }))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let service = OllamaService::new("gemma3n:e4b", server.uri(), Duration::from_secs(1));
        let err = service.generate("p").await.unwrap_err();

        assert_eq!(err, ExtractionError::Timeout(1));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        // Nothing listens on the discard port
        let service =
            OllamaService::new("gemma3n:e4b", "http://127.0.0.1:9", Duration::from_secs(2));
        let err = service.generate("p").await.unwrap_err();

        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_usable_through_trait_object() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "response": "ok" })),
            )
            .mount(&server)
            .await;

        let llm: Box<dyn LLMServiceTrait> = Box::new(OllamaService::new(
            "gemma3n:e4b",
            server.uri(),
            Duration::from_secs(5),
        ));
        assert_eq!(llm.generate("p").await.unwrap(), "ok");
    }
}
