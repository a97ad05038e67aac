//! Result listing, retrieval, deletion and download endpoints

use crate::error::{bad_request, not_found, ApiError};
use crate::state::AppState;
use crate::store::StoredResult;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use textproof_core::has_meaningful_changes;

/// Streamed download chunk size in bytes
const DOWNLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Query of `GET /api/results`
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Query of `GET /api/results/{id}`
#[derive(Debug, Deserialize)]
pub struct GetResultQuery {
    pub include_text: Option<bool>,
}

/// Body of `POST /api/results/manual`
#[derive(Debug, Deserialize)]
pub struct ManualResultRequest {
    pub original: String,
    pub corrected: String,
    pub filename: Option<String>,
    pub provider: Option<String>,
    pub model_name: Option<String>,
}

/// Query of `GET /api/results/{id}/download`
#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub which: Option<String>,
    pub chapter_index: Option<i64>,
}

/// Paginated result listing, newest first
pub async fn list_results(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let page = state
        .tasks
        .store()
        .list_results(query.limit.unwrap_or(50), query.offset.unwrap_or(0))
        .await?;
    Ok(Json(json!({
        "results": page.items,
        "total": page.total,
        "limit": page.limit,
        "offset": page.offset,
    })))
}

/// One result; chapter results come back as metadata with summed lengths
pub async fn get_result(
    State(state): State<AppState>,
    Path(result_id): Path<String>,
    Query(query): Query<GetResultQuery>,
) -> Result<Json<Value>, ApiError> {
    let include_text = query.include_text.unwrap_or(true);
    let result = state
        .tasks
        .store()
        .get_result(&result_id, include_text, true)
        .await?
        .ok_or_else(|| not_found("结果不存在"))?;

    if result.use_chapters {
        if let Some(chapters) = &result.chapters {
            return Ok(Json(simplified_chapter_view(&result, chapters)));
        }
    }

    Ok(Json(serde_json::to_value(&result)?))
}

fn simplified_chapter_view(result: &StoredResult, chapters: &[crate::store::ChapterMeta]) -> Value {
    let total_original: i64 = chapters.iter().map(|c| c.original_length).sum();
    let total_corrected: i64 = chapters.iter().map(|c| c.corrected_length).sum();
    json!({
        "result_id": result.result_id,
        "task_id": result.task_id,
        "filename": result.filename,
        "has_changes": result.has_changes,
        "use_chapters": true,
        "chapter_count": chapters.len(),
        "original_length": total_original,
        "corrected_length": total_corrected,
        "provider": result.provider,
        "model_name": result.model_name,
        "chapters": chapters,
        "created_at": result.created_at,
        "completed_at": result.completed_at,
    })
}

/// One chapter of a chapter-mode result
pub async fn get_chapter(
    State(state): State<AppState>,
    Path((result_id, chapter_index)): Path<(String, i64)>,
) -> Result<Json<Value>, ApiError> {
    let meta = state
        .tasks
        .store()
        .get_result(&result_id, false, false)
        .await?
        .ok_or_else(|| not_found("结果不存在"))?;
    if !meta.use_chapters {
        return Err(bad_request("该结果不是按章节处理的"));
    }

    let chapter = state
        .tasks
        .store()
        .get_chapter(&result_id, chapter_index)
        .await?
        .ok_or_else(|| not_found("章节不存在"))?;
    Ok(Json(serde_json::to_value(&chapter)?))
}

/// Delete a result and its chapters
pub async fn delete_result(
    State(state): State<AppState>,
    Path(result_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !state.tasks.store().delete_result(&result_id).await? {
        return Err(not_found("结果不存在"));
    }
    Ok(Json(json!({
        "message": "结果已删除",
        "result_id": result_id,
    })))
}

/// Save a correction produced outside the service as a manual result
pub async fn save_manual_result(
    State(state): State<AppState>,
    Json(request): Json<ManualResultRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.original.is_empty() || request.corrected.is_empty() {
        return Err(bad_request("original 和 corrected 不能为空"));
    }

    let filename = request.filename.unwrap_or_else(|| {
        format!(
            "输入框校对结果_{}",
            chrono::Utc::now().format("%Y%m%d_%H%M%S")
        )
    });
    let has_changes = has_meaningful_changes(&request.original, &request.corrected);

    let result_id = state
        .tasks
        .save_manual_result(
            &filename,
            &request.original,
            &request.corrected,
            has_changes,
            request.provider.as_deref(),
            request.model_name.as_deref(),
        )
        .await?;

    Ok(Json(json!({
        "message": "结果已保存",
        "result_id": result_id,
    })))
}

/// Stream a stored text as a plain-text attachment
pub async fn download_result(
    State(state): State<AppState>,
    Path(result_id): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let which = query.which.unwrap_or_else(|| "corrected".to_string());
    if which != "original" && which != "corrected" {
        return Err(bad_request("which 必须是 original 或 corrected"));
    }

    let store = state.tasks.store();
    let meta = store
        .get_result(&result_id, false, false)
        .await?
        .ok_or_else(|| not_found("结果不存在"))?;
    let filename_base = if meta.filename.is_empty() {
        result_id.clone()
    } else {
        meta.filename.clone()
    };

    let (text, download_name) = if meta.use_chapters {
        let Some(chapter_index) = query.chapter_index else {
            return Err(bad_request("该结果按章节处理，请提供 chapter_index"));
        };
        let chapter = store
            .get_chapter(&result_id, chapter_index)
            .await?
            .ok_or_else(|| not_found("章节不存在"))?;
        let text = if which == "original" {
            chapter.original
        } else {
            chapter.corrected
        };
        let name = format!("{}_{}_{}.txt", filename_base, chapter.chapter_title, which);
        (text, name)
    } else {
        let full = store
            .get_result(&result_id, true, false)
            .await?
            .ok_or_else(|| not_found("结果不存在"))?;
        let text = if which == "original" {
            full.original.unwrap_or_default()
        } else {
            full.corrected.unwrap_or_default()
        };
        (text, format!("{}_{}.txt", filename_base, which))
    };

    Ok(stream_text(text, &download_name))
}

fn stream_text(text: String, download_name: &str) -> Response {
    let bytes = text.into_bytes();
    let chunks: Vec<Vec<u8>> = bytes
        .chunks(DOWNLOAD_CHUNK_BYTES)
        .map(<[u8]>::to_vec)
        .collect();
    let stream = futures::stream::iter(chunks.into_iter().map(Ok::<_, std::io::Error>));

    let headers = [
        (
            header::CONTENT_TYPE,
            "text/plain; charset=utf-8".to_string(),
        ),
        (
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename*=UTF-8''{}",
                urlencoding::encode(download_name)
            ),
        ),
    ];
    (headers, Body::from_stream(stream)).into_response()
}
