//! API 集成测试
//!
//! 用真实的服务栈（echo 模型 + 临时存储文件）走一遍路由。

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use crate::api::{app_state::AppState, create_router};
use crate::config::config::AppConfig;
use crate::llm::EchoGenerationModel;
use crate::models::message::MemoryStore;
use crate::observability::AppMetrics;
use crate::services::chat::create_chat_service;
use crate::services::memory::{MemoryService, create_memory_service};
use crate::services::normalizer::TranscriptNormalizer;
use crate::storage::memory_file::JsonFileRepository;

fn test_router(dir: &tempfile::TempDir) -> Router {
    let config = AppConfig::development();
    let normalizer = TranscriptNormalizer::new(&config.transcript, &config.persona).unwrap();
    let repository = Arc::new(JsonFileRepository::new(&dir.path().join("memory.json")));
    let memory_service: Arc<dyn MemoryService> = Arc::from(create_memory_service(
        normalizer,
        repository,
        MemoryStore::new(),
    ));
    let chat_service = Arc::from(create_chat_service(
        memory_service.clone(),
        Arc::new(EchoGenerationModel),
        &config.persona,
        &config.context,
    ));
    let state = AppState::new(memory_service, chat_service, Arc::new(AppMetrics::default()));
    create_router(state)
}

async fn post_json(router: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

const SAMPLE_TRANSCRIPT: &str = "\
我(2024-01-03 21:15:00): 晚上吃了吗？\n\
她(2024-01-03 21:16:00): 还没呢，刚下班\n\
她(2024-01-03 21:17:00): 饿晕了都[流泪] 你呢？\n";

mod memory_api_tests {
    use super::*;

    #[tokio::test]
    async fn test_import_returns_201_with_report() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(&dir);

        let (status, body) = post_json(
            router,
            "/api/v1/memory/import",
            json!({ "transcript": SAMPLE_TRANSCRIPT }),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["stored"], 3);
        assert_eq!(body["skipped"], 0);
    }

    #[tokio::test]
    async fn test_import_malformed_returns_400() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(&dir);

        let (status, body) = post_json(
            router,
            "/api/v1/memory/import",
            json!({ "transcript": "完全不符合格式的文本" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "MALFORMED_TRANSCRIPT");
    }

    #[tokio::test]
    async fn test_import_empty_returns_400() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(&dir);

        let (status, _) =
            post_json(router, "/api/v1/memory/import", json!({ "transcript": "" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_stats_and_listing_after_import() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(&dir);

        let (status, _) = post_json(
            router.clone(),
            "/api/v1/memory/import",
            json!({ "transcript": SAMPLE_TRANSCRIPT }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, stats) = get_json(router.clone(), "/api/v1/memory").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["total"], 3);
        assert_eq!(stats["persona_count"], 2);

        let (status, listing) =
            get_json(router, "/api/v1/memory/messages?page=1&page_size=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listing["messages"].as_array().unwrap().len(), 2);
        assert_eq!(listing["total"], 3);
        assert_eq!(listing["messages"][0]["speaker"], "other");
    }
}

mod chat_api_tests {
    use super::*;

    #[tokio::test]
    async fn test_chat_empty_message_returns_400() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(&dir);

        let (status, body) = post_json(router, "/api/v1/chat", json!({ "message": "  " })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_chat_returns_reply_with_context() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(&dir);

        post_json(
            router.clone(),
            "/api/v1/memory/import",
            json!({ "transcript": SAMPLE_TRANSCRIPT }),
        )
        .await;

        let (status, body) =
            post_json(router, "/api/v1/chat", json!({ "message": "我也没吃" })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["context_turns"], 3);
        assert_eq!(body["truncated"], false);
        assert_eq!(body["model"], "echo");
        assert!(body["reply"].as_str().unwrap().starts_with("[echo]"));
    }

    #[tokio::test]
    async fn test_chat_works_on_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let router = test_router(&dir);

        let (status, body) =
            post_json(router, "/api/v1/chat", json!({ "message": "在吗" })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["context_turns"], 0);
    }
}
