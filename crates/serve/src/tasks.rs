//! In-memory task state and lifecycle management
//!
//! Live tasks are held in a map owned by the [`TaskManager`]; every state
//! transition also upserts a best-effort snapshot into the durable store,
//! where a failed write is logged and never aborts the correction work. Progress
//! updates run synchronously so engine callbacks stay cheap; the snapshot
//! write is spawned.

use crate::store::{ChapterRecord, ResultRecord, SqliteStore};
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use textproof_core::Result;
use tracing::warn;

/// Task lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Stable string form used in the database and the API
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse a stored status, defaulting unknown values to `failed`
    pub fn parse(raw: &str) -> Self {
        match raw {
            "pending" => Self::Pending,
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            _ => Self::Failed,
        }
    }
}

/// Unit progress counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub current: i64,
    pub total: i64,
}

/// Per-chapter progress entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterProgress {
    pub chapter_index: u32,
    pub chapter_title: String,
    pub status: String,
    pub progress: Progress,
}

/// One background task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub filename: String,
    pub file_size: i64,
    pub status: TaskStatus,
    pub provider: Option<String>,
    pub model_name: Option<String>,
    pub use_chapters: bool,
    pub progress: Progress,
    pub chapter_progress: Option<BTreeMap<u32, ChapterProgress>>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub error: Option<String>,
}

/// One corrected chapter handed to [`TaskManager::complete_task`]
#[derive(Debug, Clone)]
pub struct ChapterOutcome {
    pub chapter_index: u32,
    pub chapter_title: String,
    pub original: String,
    pub corrected: String,
    pub has_changes: bool,
}

/// Task manager: live in-memory state plus durable snapshots
pub struct TaskManager {
    tasks: Mutex<HashMap<String, Task>>,
    store: Arc<SqliteStore>,
}

impl TaskManager {
    /// Create a manager over a store
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            store,
        }
    }

    /// The underlying durable store
    pub fn store(&self) -> &Arc<SqliteStore> {
        &self.store
    }

    /// Create a new pending task and return its id
    pub fn create_task(
        &self,
        filename: &str,
        file_size: i64,
        provider: Option<&str>,
        model_name: Option<&str>,
        use_chapters: bool,
    ) -> String {
        let task_id = uuid::Uuid::new_v4().to_string();
        let task = Task {
            task_id: task_id.clone(),
            filename: filename.to_string(),
            file_size,
            status: TaskStatus::Pending,
            provider: provider.map(str::to_string),
            model_name: model_name.map(str::to_string),
            use_chapters,
            progress: Progress::default(),
            chapter_progress: use_chapters.then(BTreeMap::new),
            created_at: Utc::now().to_rfc3339(),
            started_at: None,
            completed_at: None,
            error: None,
        };
        self.tasks.lock().insert(task_id.clone(), task.clone());
        self.persist_snapshot(task);
        task_id
    }

    /// Live task state, if the task is known to this process
    pub fn get_task(&self, task_id: &str) -> Option<Task> {
        self.tasks.lock().get(task_id).cloned()
    }

    /// Live task state, falling back to the persisted snapshot
    pub async fn get_task_or_stored(&self, task_id: &str) -> Option<Task> {
        if let Some(task) = self.get_task(task_id) {
            return Some(task);
        }
        self.store.get_task(task_id).await.ok().flatten()
    }

    /// Update unit progress, optionally scoped to a chapter
    pub fn update_progress(
        &self,
        task_id: &str,
        current: i64,
        total: i64,
        chapter: Option<(u32, &str)>,
    ) {
        let snapshot = {
            let mut tasks = self.tasks.lock();
            let Some(task) = tasks.get_mut(task_id) else {
                return;
            };

            task.progress = Progress { current, total };

            if let (Some((index, title)), true) = (chapter, task.use_chapters) {
                let entries = task.chapter_progress.get_or_insert_with(BTreeMap::new);
                let entry = entries.entry(index).or_insert_with(|| ChapterProgress {
                    chapter_index: index,
                    chapter_title: title.to_string(),
                    status: "processing".to_string(),
                    progress: Progress::default(),
                });
                entry.progress = Progress { current, total };
            }

            if task.status == TaskStatus::Pending {
                task.status = TaskStatus::Processing;
                task.started_at = Some(Utc::now().to_rfc3339());
            }

            task.clone()
        };
        self.persist_snapshot(snapshot);
    }

    /// Update one chapter's status
    pub fn update_chapter_status(
        &self,
        task_id: &str,
        chapter_index: u32,
        status: &str,
        chapter_title: Option<&str>,
    ) {
        let snapshot = {
            let mut tasks = self.tasks.lock();
            let Some(task) = tasks.get_mut(task_id) else {
                return;
            };
            if !task.use_chapters {
                return;
            }

            let entries = task.chapter_progress.get_or_insert_with(BTreeMap::new);
            let entry = entries
                .entry(chapter_index)
                .or_insert_with(|| ChapterProgress {
                    chapter_index,
                    chapter_title: chapter_title
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("第{}章", chapter_index)),
                    status: status.to_string(),
                    progress: Progress::default(),
                });
            entry.status = status.to_string();
            if let Some(title) = chapter_title {
                entry.chapter_title = title.to_string();
            }

            task.clone()
        };
        self.persist_snapshot(snapshot);
    }

    /// Mark a task completed and write its Result (and chapters) durably.
    ///
    /// With chapters present, the per-chapter rows are authoritative: the
    /// result row keeps empty full-text columns and only the summed lengths.
    pub async fn complete_task(
        &self,
        task_id: &str,
        original: &str,
        corrected: &str,
        has_changes: bool,
        chapters: Option<Vec<ChapterOutcome>>,
    ) -> Result<()> {
        let snapshot = {
            let mut tasks = self.tasks.lock();
            let Some(task) = tasks.get_mut(task_id) else {
                return Ok(());
            };
            task.status = TaskStatus::Completed;
            task.completed_at = Some(Utc::now().to_rfc3339());
            task.progress.current = task.progress.total;
            task.clone()
        };

        if let Err(e) = self.store.upsert_task(&snapshot).await {
            warn!("cannot persist completed task {}: {}", task_id, e);
        }

        let use_chapters = chapters.is_some();
        let (original_text, corrected_text, original_length, corrected_length) = match &chapters {
            Some(chapters) => {
                let original_length: i64 = chapters
                    .iter()
                    .map(|c| c.original.chars().count() as i64)
                    .sum();
                let corrected_length: i64 = chapters
                    .iter()
                    .map(|c| c.corrected.chars().count() as i64)
                    .sum();
                // Chapter rows carry the text
                (String::new(), String::new(), Some(original_length), Some(corrected_length))
            }
            None => (original.to_string(), corrected.to_string(), None, None),
        };

        // The result id matches the task id so clients can fetch by either
        self.store
            .upsert_result(&ResultRecord {
                result_id: task_id.to_string(),
                task_id: Some(task_id.to_string()),
                source: "task".to_string(),
                filename: snapshot.filename.clone(),
                provider: snapshot.provider.clone(),
                model_name: snapshot.model_name.clone(),
                has_changes,
                use_chapters,
                created_at: snapshot.created_at.clone(),
                completed_at: snapshot.completed_at.clone(),
                original_text,
                corrected_text,
                original_length,
                corrected_length,
            })
            .await?;

        if let Some(chapters) = chapters {
            let records: Vec<ChapterRecord> = chapters
                .into_iter()
                .map(|c| ChapterRecord {
                    chapter_index: i64::from(c.chapter_index),
                    chapter_title: c.chapter_title,
                    has_changes: c.has_changes,
                    original: c.original,
                    corrected: c.corrected,
                })
                .collect();
            self.store.replace_chapters(task_id, &records).await?;
        }

        Ok(())
    }

    /// Mark a task failed
    pub async fn fail_task(&self, task_id: &str, error: &str) {
        let snapshot = {
            let mut tasks = self.tasks.lock();
            let Some(task) = tasks.get_mut(task_id) else {
                return;
            };
            task.status = TaskStatus::Failed;
            task.completed_at = Some(Utc::now().to_rfc3339());
            task.error = Some(error.to_string());
            task.clone()
        };
        if let Err(e) = self.store.upsert_task(&snapshot).await {
            warn!("cannot persist failed task {}: {}", task_id, e);
        }
    }

    /// Save a correction produced from direct text input as a Result
    pub async fn save_manual_result(
        &self,
        filename: &str,
        original: &str,
        corrected: &str,
        has_changes: bool,
        provider: Option<&str>,
        model_name: Option<&str>,
    ) -> Result<String> {
        let result_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        self.store
            .upsert_result(&ResultRecord {
                result_id: result_id.clone(),
                task_id: None,
                source: "manual_input".to_string(),
                filename: filename.to_string(),
                provider: provider.map(str::to_string),
                model_name: model_name.map(str::to_string),
                has_changes,
                use_chapters: false,
                created_at: now.clone(),
                completed_at: Some(now),
                original_text: original.to_string(),
                corrected_text: corrected.to_string(),
                original_length: None,
                corrected_length: None,
            })
            .await?;
        Ok(result_id)
    }

    /// All tasks, live state overriding persisted snapshots, newest first
    pub async fn all_tasks(&self) -> Vec<Task> {
        let live: Vec<Task> = self.tasks.lock().values().cloned().collect();

        let mut by_id: HashMap<String, Task> = HashMap::new();
        match self.store.list_tasks(TASKS_HISTORY_LIMIT, 0).await {
            Ok(page) => {
                for task in page.items {
                    by_id.insert(task.task_id.clone(), task);
                }
            }
            Err(e) => warn!("cannot list persisted tasks: {}", e),
        }
        for task in live {
            by_id.insert(task.task_id.clone(), task);
        }

        let mut merged: Vec<Task> = by_id.into_values().collect();
        merged.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        merged
    }

    /// Drop in-memory tasks older than `days`
    pub fn cleanup_old_tasks(&self, days: i64) {
        let cutoff = Utc::now() - chrono::Duration::days(days);
        self.tasks.lock().retain(|_, task| {
            match chrono::DateTime::parse_from_rfc3339(&task.created_at) {
                Ok(created) => created.with_timezone(&Utc) >= cutoff,
                Err(_) => true,
            }
        });
    }

    /// Spawn a best-effort snapshot write; failures only log
    fn persist_snapshot(&self, task: Task) {
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.upsert_task(&task).await {
                warn!("cannot persist task snapshot {}: {}", task.task_id, e);
            }
        });
    }
}

/// Persisted history window merged into the task listing
const TASKS_HISTORY_LIMIT: i64 = 500;
