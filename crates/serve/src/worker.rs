//! Background correction workers
//!
//! An uploaded file processed asynchronously runs here: chapter mode walks
//! the detected chapters and invokes the engine once per chapter so progress
//! is reported at chapter granularity; plain mode hands the whole text to
//! the engine. Engine-fatal errors fail the task; per-chapter fatals only
//! fail that chapter and the task completes with what was corrected.

use crate::state::AppState;
use crate::tasks::ChapterOutcome;
use textproof_core::{has_meaningful_changes, ChapterSplitter, Result};
use tracing::{error, info, warn};

/// Spawn the background worker for an upload task
pub fn spawn_correction_task(
    state: AppState,
    task_id: String,
    text: String,
    provider: Option<String>,
    model_name: Option<String>,
    use_chapters: bool,
) {
    tokio::spawn(async move {
        let outcome = process_task(
            &state,
            &task_id,
            &text,
            provider.as_deref(),
            model_name.as_deref(),
            use_chapters,
        )
        .await;

        if let Err(e) = outcome {
            error!("task {} failed: {}", task_id, e);
            state.tasks.fail_task(&task_id, &e.to_string()).await;
        }
    });
}

async fn process_task(
    state: &AppState,
    task_id: &str,
    text: &str,
    provider: Option<&str>,
    model_name: Option<&str>,
    use_chapters: bool,
) -> Result<()> {
    let engine = state.engine_for(provider, model_name)?;

    if use_chapters {
        process_chapters(state, task_id, text, &engine).await
    } else {
        let tasks = state.tasks.clone();
        let id = task_id.to_string();
        let progress = move |current: usize, total: usize| {
            tasks.update_progress(&id, current as i64, total as i64, None);
        };

        let outcome = engine.correct(text, Some(&progress)).await?;
        let has_changes = has_meaningful_changes(&outcome.original, &outcome.corrected);
        state
            .tasks
            .complete_task(task_id, &outcome.original, &outcome.corrected, has_changes, None)
            .await?;
        info!(
            "task {} completed: {}/{} units, {} failed",
            task_id, outcome.chunks_processed, outcome.total_chunks, outcome.failed_chunks
        );
        Ok(())
    }
}

async fn process_chapters(
    state: &AppState,
    task_id: &str,
    text: &str,
    engine: &textproof_core::CorrectionEngine,
) -> Result<()> {
    let chapters = ChapterSplitter::new().split_by_chapters(text);
    info!("task {}: processing {} chapters", task_id, chapters.len());

    let mut outcomes: Vec<ChapterOutcome> = Vec::with_capacity(chapters.len());
    let mut units_done: i64 = 0;

    for chapter in &chapters {
        let index = chapter.chapter_index as u32;
        let title = chapter.chapter_title.clone();
        state
            .tasks
            .update_chapter_status(task_id, index, "processing", Some(&title));

        let tasks = state.tasks.clone();
        let id = task_id.to_string();
        let cb_title = title.clone();
        let done = units_done;
        let progress = move |current: usize, total: usize| {
            tasks.update_progress(
                &id,
                done + current as i64,
                done + total as i64,
                Some((index, cb_title.as_str())),
            );
        };

        let (original, corrected, status, chapter_units) =
            match engine.correct(&chapter.chapter_content, Some(&progress)).await {
                Ok(outcome) => {
                    let all_failed =
                        outcome.has_failures && outcome.failed_chunks == outcome.total_chunks;
                    let status = if all_failed { "failed" } else { "completed" };
                    (
                        outcome.original,
                        outcome.corrected,
                        status,
                        outcome.total_chunks as i64,
                    )
                }
                Err(e) => {
                    warn!("task {}: chapter {} failed entirely: {}", task_id, index, e);
                    (
                        chapter.chapter_content.clone(),
                        chapter.chapter_content.clone(),
                        "failed",
                        0,
                    )
                }
            };

        state
            .tasks
            .update_chapter_status(task_id, index, status, Some(&title));

        let has_changes = has_meaningful_changes(&original, &corrected);
        outcomes.push(ChapterOutcome {
            chapter_index: index,
            chapter_title: title,
            original,
            corrected,
            has_changes,
        });
        units_done += chapter_units;
    }

    // Assembled full texts keep the chapter headers for convenience
    let full_original = join_with_titles(&outcomes, |c| c.original.as_str());
    let full_corrected = join_with_titles(&outcomes, |c| c.corrected.as_str());
    let has_changes = outcomes.iter().any(|c| c.has_changes);

    state
        .tasks
        .complete_task(task_id, &full_original, &full_corrected, has_changes, Some(outcomes))
        .await?;
    info!("task {} completed across {} chapters", task_id, chapters.len());
    Ok(())
}

fn join_with_titles<'a, F>(outcomes: &'a [ChapterOutcome], text: F) -> String
where
    F: Fn(&'a ChapterOutcome) -> &'a str,
{
    outcomes
        .iter()
        .map(|c| format!("{}\n\n{}", c.chapter_title, text(c)))
        .collect::<Vec<_>>()
        .join("\n\n")
}
