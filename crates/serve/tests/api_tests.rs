//! HTTP surface integration tests
//!
//! The provider is replaced by a scripted in-process adapter seeded into the
//! engine cache, so every endpoint is exercised end to end without network.

use async_trait::async_trait;
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use textproof_core::{
    CorrectionEngine, EngineOptions, PromptManager, Provider, ProviderError, ProviderKind,
    Settings,
};
use textproof_serve::api::create_routes;
use textproof_serve::state::AppState;
use textproof_serve::store::SqliteStore;
use textproof_serve::tasks::TaskManager;

/// Scripted provider: echoes its input, or always fails
struct ScriptedProvider {
    failure: Option<ProviderError>,
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn correct(
        &self,
        text: &str,
        _prompt: &str,
    ) -> std::result::Result<String, ProviderError> {
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(text.to_string()),
        }
    }

    async fn health_check(&self) -> bool {
        self.failure.is_none()
    }
}

struct TestApp {
    server: TestServer,
    state: AppState,
    _dir: tempfile::TempDir,
}

async fn test_app(provider_failure: Option<ProviderError>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        default_provider: "openai".to_string(),
        default_model_name: "gpt-test".to_string(),
        retry_delay: 0.0,
        max_retries: 1,
        ..Settings::default()
    };

    let prompts = Arc::new(PromptManager::from_settings(&settings));
    let store = Arc::new(SqliteStore::open(dir.path()).await.unwrap());
    let tasks = Arc::new(TaskManager::new(store));
    let state = AppState::from_parts(
        settings.clone(),
        prompts.clone(),
        tasks,
        dir.path().join(".env"),
    );

    let engine = Arc::new(
        CorrectionEngine::new(
            Arc::new(ScriptedProvider {
                failure: provider_failure,
            }),
            ProviderKind::OpenAi,
            prompts,
            EngineOptions::from_settings(&settings),
        )
        .unwrap(),
    );
    state.seed_engine("openai", "gpt-test", engine);

    let server = TestServer::new(create_routes(state.clone())).unwrap();
    TestApp {
        server,
        state,
        _dir: dir,
    }
}

fn multipart_body(filename: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "textproof-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: text/plain\r\n\r\n",
            boundary, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    (format!("multipart/form-data; boundary={}", boundary), body)
}

const SIX_CHAPTER_NOVEL: &str = "第一章 初入江湖\n\n少年背着行囊离开了山村。\n\n第二章 风雨欲来\n\n城里的消息一天比一天紧。\n\n第三章 暗流涌动\n\n他在茶馆里听到了那个名字。\n\n第四章 狭路相逢\n\n对手比传闻中还要难缠。\n\n第五章 绝处逢生\n\n山穷水尽时有人递来一只手。\n\n第六章 尘埃落定\n\n一切结束得比开始还要突然。";

#[tokio::test]
async fn test_root_banner() {
    let app = test_app(None).await;
    let response = app.server.get("/").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["name"].as_str().unwrap().contains("TextProof"));
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app(None).await;
    let response = app.server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["provider"], "openai");
    assert_eq!(body["model_name"], "gpt-test");
    assert_eq!(body["available"], true);
}

#[tokio::test]
async fn test_correct_clean_text_saves_result() {
    // S1: a clean text comes back unchanged and is recorded as a Result
    let app = test_app(None).await;
    let response = app
        .server
        .post("/api/correct")
        .json(&json!({ "text": "这是一段没有错误的文本。" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["original"], body["corrected"]);
    assert_eq!(body["has_changes"], false);
    assert_eq!(body["has_failures"], false);

    let listing: Value = app.server.get("/api/results").await.json();
    assert_eq!(listing["total"], 1);
    let item = &listing["results"][0];
    assert_eq!(item["source"], "manual_input");
    assert!(item["filename"].as_str().unwrap().starts_with("输入框校对结果_"));
}

#[tokio::test]
async fn test_correct_all_failures_is_500() {
    let app = test_app(Some(ProviderError::unavailable("503 overloaded"))).await;
    let response = app
        .server
        .post("/api/correct")
        .json(&json!({ "text": "短文本。" }))
        .await;
    response.assert_status(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert!(body["detail"].as_str().unwrap().contains("片段"));
}

#[tokio::test]
async fn test_correct_with_invalid_chunk_overrides_is_400() {
    let app = test_app(None).await;
    let response = app
        .server
        .post("/api/correct")
        .json(&json!({ "text": "文本。", "chunk_size": 100, "chunk_overlap": 100 }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_file_upload_sync() {
    let app = test_app(None).await;
    let (content_type, body) = multipart_body("novel.txt", "同步校对的文本。".as_bytes());
    let response = app
        .server
        .post("/api/correct/file")
        .content_type(&content_type)
        .bytes(body.into())
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["original"], "同步校对的文本。");
    assert_eq!(body["corrected"], "同步校对的文本。");
}

#[tokio::test]
async fn test_file_upload_rejects_non_txt() {
    let app = test_app(None).await;
    let (content_type, body) = multipart_body("novel.pdf", b"whatever");
    let response = app
        .server
        .post("/api/correct/file")
        .content_type(&content_type)
        .bytes(body.into())
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["detail"].as_str().unwrap().contains("TXT"));
}

#[tokio::test]
async fn test_file_upload_rejects_non_utf8() {
    // S6: a UTF-16 payload is refused with an encoding message
    let app = test_app(None).await;
    let mut utf16 = vec![0xFFu8, 0xFE];
    for unit in "这是UTF-16编码的文本".encode_utf16() {
        utf16.extend_from_slice(&unit.to_le_bytes());
    }
    let (content_type, body) = multipart_body("novel.txt", &utf16);
    let response = app
        .server
        .post("/api/correct/file")
        .content_type(&content_type)
        .bytes(body.into())
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["detail"].as_str().unwrap().contains("编码"));
}

#[tokio::test]
async fn test_async_chapter_task_flow() {
    // S2: a six-chapter upload runs through the chapter worker
    let app = test_app(None).await;
    let (content_type, body) = multipart_body("novel.txt", SIX_CHAPTER_NOVEL.as_bytes());
    let response = app
        .server
        .post("/api/correct/file")
        .add_query_param("async_task", "true")
        .content_type(&content_type)
        .bytes(body.into())
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["async"], true);
    assert_eq!(body["use_chapters"], true);
    assert_eq!(body["chapter_count"], 6);
    let task_id = body["task_id"].as_str().unwrap().to_string();

    // Wait for the background worker
    let mut task: Value = Value::Null;
    for _ in 0..200 {
        let response = app.server.get(&format!("/api/tasks/{}", task_id)).await;
        task = response.json();
        if task["status"] == "completed" || task["status"] == "failed" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(task["status"], "completed", "task: {}", task);
    let chapter_progress = task["chapter_progress"].as_object().unwrap();
    assert_eq!(chapter_progress.len(), 6);
    assert!(chapter_progress
        .values()
        .all(|ch| ch["status"] == "completed"));

    // The Result is chapter-backed
    let result: Value = app
        .server
        .get(&format!("/api/results/{}", task_id))
        .await
        .json();
    assert_eq!(result["use_chapters"], true);
    assert_eq!(result["chapter_count"], 6);
    assert!(result["chapters"]
        .as_array()
        .unwrap()
        .iter()
        .all(|ch| ch["has_changes"] == false));

    // Chapter text is fetched separately
    let chapter: Value = app
        .server
        .get(&format!("/api/results/{}/chapters/1", task_id))
        .await
        .json();
    assert_eq!(chapter["original"], "少年背着行囊离开了山村。");
    assert_eq!(chapter["corrected"], "少年背着行囊离开了山村。");
}

#[tokio::test]
async fn test_diff_endpoint_with_given_correction() {
    let app = test_app(None).await;
    let response = app
        .server
        .post("/api/diff")
        .json(&json!({ "text": "我de书。", "corrected": "我的书。" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["has_changes"], true);
    assert!(body["original_segments"].as_array().unwrap().len() >= 2);
}

#[tokio::test]
async fn test_diff_endpoint_corrects_when_missing() {
    let app = test_app(None).await;
    let response = app
        .server
        .post("/api/diff")
        .json(&json!({ "text": "没有错误的文本。" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["has_changes"], false);
}

#[tokio::test]
async fn test_providers_and_models() {
    let app = test_app(None).await;
    let body: Value = app.server.get("/api/providers").await.json();
    assert_eq!(body["providers"], json!(["openai", "deepseek", "ollama"]));
    assert_eq!(body["default"], "openai");

    let body: Value = app
        .server
        .get("/api/models")
        .add_query_param("provider", "deepseek")
        .await
        .json();
    assert_eq!(body["models"], json!(["deepseek-chat", "deepseek-coder"]));
    assert_eq!(body["default"], Value::Null);

    let body: Value = app.server.get("/api/models").await.json();
    assert_eq!(body["default_provider"], "openai");
    assert!(body["models"]["ollama"].as_array().unwrap().len() > 0);
}

#[tokio::test]
async fn test_config_roundtrip() {
    let app = test_app(None).await;
    let body: Value = app.server.get("/api/config").await.json();
    assert_eq!(body["chunk_size"], 2000);

    let response = app
        .server
        .post("/api/config")
        .json(&json!({ "chunk_size": 3000, "chunk_overlap": 250 }))
        .await;
    response.assert_status_ok();

    let body: Value = app.server.get("/api/config").await.json();
    assert_eq!(body["chunk_size"], 3000);
    assert_eq!(body["chunk_overlap"], 250);
}

#[tokio::test]
async fn test_config_validation() {
    let app = test_app(None).await;
    let response = app
        .server
        .post("/api/config")
        .json(&json!({ "chunk_size": 0 }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);

    let response = app.server.post("/api/config").json(&json!({})).await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);

    // Overlap must stay below size
    let response = app
        .server
        .post("/api/config")
        .json(&json!({ "chunk_overlap": 99999 }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_config_update_clears_engine_cache() {
    let app = test_app(None).await;
    app.server
        .post("/api/config")
        .json(&json!({ "chunk_size": 1234 }))
        .await
        .assert_status_ok();
    // The seeded engine is gone; rebuilding needs an OpenAI key and fails
    let response = app
        .server
        .post("/api/correct")
        .json(&json!({ "text": "文本。" }))
        .await;
    response.assert_status(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    let _ = &app.state;
}

#[tokio::test]
async fn test_prompt_endpoints() {
    let app = test_app(None).await;
    let body: Value = app.server.get("/api/prompt").await.json();
    assert!(body["prompt"].as_str().unwrap().contains("校对"));
    assert_eq!(body["is_custom"], false);

    let response = app
        .server
        .post("/api/prompt")
        .json(&json!({ "prompt": "新的提示词" }))
        .await;
    response.assert_status_ok();
    let body: Value = app.server.get("/api/prompt").await.json();
    assert_eq!(body["prompt"], "新的提示词");

    let response = app.server.post("/api/prompt").json(&json!({})).await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_manual_result_and_deletion() {
    let app = test_app(None).await;
    let response = app
        .server
        .post("/api/results/manual")
        .json(&json!({ "original": "原文。", "corrected": "校对后。" }))
        .await;
    response.assert_status_ok();
    let result_id = response.json::<Value>()["result_id"]
        .as_str()
        .unwrap()
        .to_string();

    let body: Value = app
        .server
        .get(&format!("/api/results/{}", result_id))
        .await
        .json();
    assert_eq!(body["original"], "原文。");
    assert_eq!(body["has_changes"], true);

    app.server
        .delete(&format!("/api/results/{}", result_id))
        .await
        .assert_status_ok();
    let response = app.server.get(&format!("/api/results/{}", result_id)).await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_manual_result_requires_texts() {
    let app = test_app(None).await;
    let response = app
        .server
        .post("/api/results/manual")
        .json(&json!({ "original": "", "corrected": "x" }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_download_endpoint() {
    let app = test_app(None).await;
    let response = app
        .server
        .post("/api/results/manual")
        .json(&json!({ "original": "原文内容。", "corrected": "校对内容。", "filename": "book.txt" }))
        .await;
    let result_id = response.json::<Value>()["result_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .server
        .get(&format!("/api/results/{}/download", result_id))
        .add_query_param("which", "corrected")
        .await;
    response.assert_status_ok();
    assert_eq!(response.text(), "校对内容。");
    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment;"));

    let response = app
        .server
        .get(&format!("/api/results/{}/download", result_id))
        .add_query_param("which", "both")
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_task_and_result_are_404() {
    let app = test_app(None).await;
    app.server
        .get("/api/tasks/does-not-exist")
        .await
        .assert_status(axum::http::StatusCode::NOT_FOUND);
    app.server
        .get("/api/results/does-not-exist")
        .await
        .assert_status(axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_tasks_listing_includes_created_tasks() {
    let app = test_app(None).await;
    let id = app
        .state
        .tasks
        .create_task("listed.txt", 10, None, None, false);
    let body: Value = app.server.get("/api/tasks").await.json();
    let tasks = body["tasks"].as_array().unwrap();
    assert!(tasks.iter().any(|t| t["task_id"] == id.as_str()));
}
