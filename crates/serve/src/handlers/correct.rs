//! Correction, upload and diff endpoints

use crate::error::{bad_request, ApiError};
use crate::state::AppState;
use crate::worker::spawn_correction_task;
use axum::extract::{Multipart, Query, State};
use axum::response::{IntoResponse, Json, Response};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use textproof_core::{
    has_meaningful_changes, highlight_diff, ChapterSplitter, ChunkFailure, CorrectionOutcome,
    DiffHighlight,
};
use tracing::{info, warn};

/// Body of `POST /api/correct`
#[derive(Debug, Deserialize)]
pub struct CorrectionRequest {
    pub text: String,
    pub provider: Option<String>,
    pub model_name: Option<String>,
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
}

/// Body of `POST /api/diff`
#[derive(Debug, Deserialize)]
pub struct DiffRequest {
    pub text: String,
    pub corrected: Option<String>,
    pub provider: Option<String>,
    pub model_name: Option<String>,
}

/// Response of the correction endpoints
#[derive(Debug, Serialize)]
pub struct CorrectionResponse {
    pub original: String,
    pub corrected: String,
    pub chunks_processed: usize,
    pub total_chunks: usize,
    pub has_changes: bool,
    pub failed_chunks: usize,
    pub has_failures: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_details: Option<Vec<ChunkFailure>>,
}

impl CorrectionResponse {
    fn from_outcome(outcome: CorrectionOutcome, has_changes: bool) -> Self {
        Self {
            original: outcome.original,
            corrected: outcome.corrected,
            chunks_processed: outcome.chunks_processed,
            total_chunks: outcome.total_chunks,
            has_changes,
            failed_chunks: outcome.failed_chunks,
            has_failures: outcome.has_failures,
            failure_details: (!outcome.failure_details.is_empty())
                .then_some(outcome.failure_details),
        }
    }
}

/// Query of `GET /health`
#[derive(Debug, Deserialize)]
pub struct HealthQuery {
    pub provider: Option<String>,
    pub model_name: Option<String>,
}

/// Response of `GET /health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub provider: String,
    pub model_name: String,
    pub available: bool,
}

/// Query of `POST /api/correct/file`
#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub provider: Option<String>,
    pub model_name: Option<String>,
    #[serde(default)]
    pub async_task: bool,
}

/// Service banner
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "TextProof 文本精校系统",
        "version": crate::VERSION,
        "description": "用于对长篇中文文本进行最小侵入式精校",
    }))
}

/// Provider health probe
pub async fn health_check(
    State(state): State<AppState>,
    Query(query): Query<HealthQuery>,
) -> Result<Json<HealthResponse>, ApiError> {
    let (kind, model) =
        state.resolve_provider(query.provider.as_deref(), query.model_name.as_deref())?;
    let engine = state.engine_for(query.provider.as_deref(), query.model_name.as_deref())?;
    let available = engine.health_check().await;

    Ok(Json(HealthResponse {
        status: if available { "ok" } else { "unavailable" }.to_string(),
        provider: kind.to_string(),
        model_name: model,
        available,
    }))
}

/// Correct a text posted directly by the client
pub async fn correct_text(
    State(state): State<AppState>,
    Json(request): Json<CorrectionRequest>,
) -> Result<Json<CorrectionResponse>, ApiError> {
    info!(
        "correction request: provider={:?}, model={:?}, {} chars",
        request.provider,
        request.model_name,
        request.text.chars().count()
    );

    let engine = if request.chunk_size.is_some() || request.chunk_overlap.is_some() {
        state.engine_with_overrides(
            request.provider.as_deref(),
            request.model_name.as_deref(),
            request.chunk_size,
            request.chunk_overlap,
        )?
    } else {
        state.engine_for(request.provider.as_deref(), request.model_name.as_deref())?
    };

    let outcome = engine.correct(&request.text, None).await?;
    let has_changes = has_meaningful_changes(&outcome.original, &outcome.corrected);

    // The result is kept even if the client has long disconnected
    let filename = format!("输入框校对结果_{}", Utc::now().format("%Y%m%d_%H%M%S"));
    if let Err(e) = state
        .tasks
        .save_manual_result(
            &filename,
            &outcome.original,
            &outcome.corrected,
            has_changes,
            request.provider.as_deref(),
            request.model_name.as_deref(),
        )
        .await
    {
        warn!("cannot save manual correction result: {}", e);
    }

    Ok(Json(CorrectionResponse::from_outcome(outcome, has_changes)))
}

/// Correct an uploaded `.txt` file, synchronously or as a background task
pub async fn correct_file(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("上传解析失败: {}", e)))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("upload.txt").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| bad_request(format!("上传读取失败: {}", e)))?;
            upload = Some((filename, data.to_vec()));
        }
    }

    let Some((filename, data)) = upload else {
        return Err(bad_request("缺少file字段"));
    };
    if !filename.to_lowercase().ends_with(".txt") {
        return Err(bad_request("仅支持TXT文件"));
    }

    let file_size = data.len() as i64;
    let text =
        String::from_utf8(data).map_err(|_| bad_request("文件编码错误，请使用UTF-8编码"))?;

    if query.async_task {
        let detection = ChapterSplitter::new().detect_chapters(&text);
        let use_chapters = detection.has_chapters && detection.chapter_count > 1;

        let task_id = state.tasks.create_task(
            &filename,
            file_size,
            query.provider.as_deref(),
            query.model_name.as_deref(),
            use_chapters,
        );
        info!(
            "created task {} for {} ({} bytes, {} chapters)",
            task_id, filename, file_size, detection.chapter_count
        );

        spawn_correction_task(
            state.clone(),
            task_id.clone(),
            text,
            query.provider.clone(),
            query.model_name.clone(),
            use_chapters,
        );

        let mut response = json!({
            "task_id": task_id,
            "async": true,
            "message": "任务已创建，正在后台处理",
        });
        if use_chapters {
            response["use_chapters"] = json!(true);
            response["chapter_count"] = json!(detection.chapter_count);
            response["message"] = json!(format!(
                "任务已创建，检测到{}个章节，正在按章节处理",
                detection.chapter_count
            ));
        }
        return Ok(Json(response).into_response());
    }

    let engine = state.engine_for(query.provider.as_deref(), query.model_name.as_deref())?;
    let outcome = engine.correct(&text, None).await?;
    let has_changes = has_meaningful_changes(&outcome.original, &outcome.corrected);
    Ok(Json(CorrectionResponse::from_outcome(outcome, has_changes)).into_response())
}

/// Diff a text against a correction, producing highlight segments
pub async fn get_diff(
    State(state): State<AppState>,
    Json(request): Json<DiffRequest>,
) -> Result<Json<DiffHighlight>, ApiError> {
    let corrected = match request.corrected {
        Some(corrected) => corrected,
        None => {
            let engine =
                state.engine_for(request.provider.as_deref(), request.model_name.as_deref())?;
            engine.correct(&request.text, None).await?.corrected
        }
    };

    Ok(Json(highlight_diff(&request.text, &corrected)))
}
