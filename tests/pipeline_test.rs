//! 回答生成链路的集成测试
//!
//! 用 mockito 模拟 OpenAI / Gemini 端点，覆盖：
//! 后端调用、缓存命中（零网络）、缓存过期、凭据缺失、错误信息透传。

use std::path::PathBuf;
use std::sync::Arc;

use mockito::{Matcher, Server};
use tokio_test::assert_ok;
use serde_json::json;

use interview_copilot::error::{AppError, BackendError, ConfigError};
use interview_copilot::models::{AiProvider, DetectionContext, Settings};
use interview_copilot::services::storage::question_hash;
use interview_copilot::{AiService, Config, StorageManager};

fn temp_store_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "interview_copilot_it_{}_{}.json",
        tag,
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    ))
}

/// 构造指向 mock 端点的 AiService
async fn service_with(
    server_url: &str,
    settings: Settings,
    tag: &str,
) -> (AiService, Arc<StorageManager>) {
    let storage = Arc::new(StorageManager::new(temp_store_path(tag), 50));
    storage.save_settings(settings).await;
    let config = Config {
        openai_api_base: server_url.to_string(),
        gemini_api_base: server_url.to_string(),
        ..Config::default()
    };
    (AiService::new(&config, Arc::clone(&storage)), storage)
}

fn gemini_settings(api_key: &str) -> Settings {
    Settings {
        enabled: true,
        ai_provider: AiProvider::Gemini,
        api_key: api_key.to_string(),
        ..Settings::default()
    }
}

#[tokio::test]
async fn test_gemini_answer_then_cache_hit_without_network() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/models/gemini-pro:generateContent")
        .match_query(Matcher::UrlEncoded("key".into(), "g-key".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "  Saya orang yang teliti.  " }] }
                }]
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let (service, _storage) =
        service_with(&server.url(), gemini_settings("g-key"), "gemini_cache").await;
    let ctx = DetectionContext::default();

    let first = service
        .generate_answer("What is your biggest weakness?", &ctx)
        .await
        .unwrap();
    assert_eq!(first, "Saya orang yang teliti.");

    // 第二次必须命中缓存，不产生网络调用
    let second = service
        .generate_answer("What is your biggest weakness?", &ctx)
        .await
        .unwrap();
    assert_eq!(second, first);

    mock.assert_async().await;
}

#[tokio::test]
async fn test_expired_cache_entry_goes_back_to_network() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/models/gemini-pro:generateContent")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "fresh answer" }] }
                }]
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    // 预先写入一条 25 小时前的缓存（TTL 24 小时）
    let path = temp_store_path("expired");
    let stale_ms = chrono::Utc::now().timestamp_millis() - 25 * 60 * 60 * 1000;
    let blob = json!({
        "settings": gemini_settings("g-key"),
        "history": [],
        "response_cache": {
            question_hash("Why do you want this job?"): {
                "answer": "stale answer",
                "created_at": stale_ms
            }
        }
    });
    tokio::fs::write(&path, blob.to_string()).await.unwrap();

    let storage = Arc::new(StorageManager::new(path, 50));
    let config = Config {
        gemini_api_base: server.url(),
        ..Config::default()
    };
    let service = AiService::new(&config, storage);

    let answer = service
        .generate_answer("Why do you want this job?", &DetectionContext::default())
        .await
        .unwrap();
    assert_eq!(answer, "fresh answer");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_missing_api_key_fails_before_any_network_call() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let (service, _storage) =
        service_with(&server.url(), gemini_settings(""), "missing_key").await;

    let err = service
        .generate_answer("Tell me about yourself please", &DetectionContext::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Config(ConfigError::MissingApiKey)
    ));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_gemini_error_message_is_surfaced() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/models/gemini-pro:generateContent")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(json!({ "error": { "message": "API key not valid" } }).to_string())
        .create_async()
        .await;

    let (service, _storage) =
        service_with(&server.url(), gemini_settings("bad-key"), "gemini_err").await;

    let err = service
        .generate_answer("Why should we hire you?", &DetectionContext::default())
        .await
        .unwrap_err();
    match err {
        AppError::Backend(BackendError::Api { provider, message }) => {
            assert_eq!(provider, "Gemini");
            assert_eq!(message, "API key not valid");
        }
        other => panic!("意外的错误类型: {:?}", other),
    }
}

#[tokio::test]
async fn test_openai_answer_and_history_friendly_output() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "chatcmpl-test",
                "object": "chat.completion",
                "created": 1700000000,
                "model": "gpt-3.5-turbo",
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": "I focus on results." },
                    "finish_reason": "stop"
                }],
                "usage": {
                    "prompt_tokens": 20,
                    "completion_tokens": 5,
                    "total_tokens": 25
                }
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let settings = Settings {
        enabled: true,
        ai_provider: AiProvider::OpenAi,
        api_key: "sk-test".to_string(),
        response_language: "en".to_string(),
        ..Settings::default()
    };
    let (service, _storage) = service_with(&server.url(), settings, "openai").await;

    let result = service
        .generate_answer("What motivates you?", &DetectionContext::default())
        .await;
    let answer = assert_ok!(result);
    assert_eq!(answer, "I focus on results.");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_validate_api_key_against_models_endpoint() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/models")
        .match_query(Matcher::UrlEncoded("key".into(), "good".into()))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;
    server
        .mock("GET", "/models")
        .match_query(Matcher::UrlEncoded("key".into(), "bad".into()))
        .with_status(403)
        .with_body("{}")
        .create_async()
        .await;

    let (service, _storage) =
        service_with(&server.url(), gemini_settings("unused"), "validate").await;

    assert!(service.validate_api_key(AiProvider::Gemini, "good").await);
    assert!(!service.validate_api_key(AiProvider::Gemini, "bad").await);
}
