//! SQLite-backed durable store for results, chapters and task snapshots
//!
//! One database file under the cache directory. Large texts live in TEXT
//! columns and are loaded only on request; listings return metadata plus
//! pagination. A legacy single-JSON `results.json` cache is migrated once at
//! startup and moved aside.

use crate::tasks::Task;
use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use textproof_core::{has_meaningful_changes, ProofError, Result};
use tracing::{info, warn};

/// Database file name under the cache directory
const DB_FILE: &str = "textproof.db";

/// Legacy JSON cache recognized for one-shot migration
const LEGACY_RESULTS_FILE: &str = "results.json";

/// Hard cap for result listings
const RESULTS_PAGE_CAP: i64 = 200;

/// Hard cap for task listings
const TASKS_PAGE_CAP: i64 = 500;

/// One page of a listing
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Input row for a result upsert
#[derive(Debug, Clone)]
pub struct ResultRecord {
    pub result_id: String,
    pub task_id: Option<String>,
    /// `task` or `manual_input`
    pub source: String,
    pub filename: String,
    pub provider: Option<String>,
    pub model_name: Option<String>,
    pub has_changes: bool,
    pub use_chapters: bool,
    pub created_at: String,
    pub completed_at: Option<String>,
    pub original_text: String,
    pub corrected_text: String,
    /// Overrides the derived length when the text columns are left empty
    pub original_length: Option<i64>,
    pub corrected_length: Option<i64>,
}

/// Input row for a chapter upsert
#[derive(Debug, Clone)]
pub struct ChapterRecord {
    pub chapter_index: i64,
    pub chapter_title: String,
    pub has_changes: bool,
    pub original: String,
    pub corrected: String,
}

/// Stored result, text and chapter metadata loaded on demand
#[derive(Debug, Clone, Serialize)]
pub struct StoredResult {
    pub result_id: String,
    pub task_id: Option<String>,
    pub filename: String,
    pub provider: Option<String>,
    pub model_name: Option<String>,
    pub source: String,
    pub has_changes: bool,
    pub use_chapters: bool,
    pub created_at: String,
    pub completed_at: Option<String>,
    pub original_length: i64,
    pub corrected_length: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapters: Option<Vec<ChapterMeta>>,
}

/// Chapter metadata without text
#[derive(Debug, Clone, Serialize)]
pub struct ChapterMeta {
    pub chapter_index: i64,
    pub chapter_title: String,
    pub has_changes: bool,
    pub original_length: i64,
    pub corrected_length: i64,
}

/// One chapter with its texts
#[derive(Debug, Clone, Serialize)]
pub struct StoredChapter {
    pub chapter_index: i64,
    pub chapter_title: String,
    pub has_changes: bool,
    pub original: String,
    pub corrected: String,
}

/// SQLite store
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    cache_dir: PathBuf,
}

impl SqliteStore {
    /// Open (creating if needed) the store under a cache directory, apply
    /// the schema and run the legacy migration.
    pub async fn open(cache_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(cache_dir)?;
        let options = SqliteConnectOptions::new()
            .filename(cache_dir.join(DB_FILE))
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        let store = Self {
            pool,
            cache_dir: cache_dir.to_path_buf(),
        };
        store.init_schema().await?;
        store.migrate_legacy_results().await?;
        Ok(store)
    }

    /// Cache directory this store lives in
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    async fn init_schema(&self) -> Result<()> {
        let statements = [
            "CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT
            )",
            "CREATE TABLE IF NOT EXISTS results (
                result_id TEXT PRIMARY KEY,
                task_id TEXT,
                source TEXT NOT NULL,
                filename TEXT NOT NULL,
                provider TEXT,
                model_name TEXT,
                has_changes INTEGER NOT NULL,
                use_chapters INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                completed_at TEXT,
                original_text TEXT,
                corrected_text TEXT,
                original_length INTEGER NOT NULL DEFAULT 0,
                corrected_length INTEGER NOT NULL DEFAULT 0
            )",
            "CREATE TABLE IF NOT EXISTS chapters (
                result_id TEXT NOT NULL,
                chapter_index INTEGER NOT NULL,
                chapter_title TEXT NOT NULL,
                has_changes INTEGER NOT NULL DEFAULT 0,
                original_text TEXT,
                corrected_text TEXT,
                original_length INTEGER NOT NULL DEFAULT 0,
                corrected_length INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (result_id, chapter_index),
                FOREIGN KEY (result_id) REFERENCES results(result_id) ON DELETE CASCADE
            )",
            "CREATE TABLE IF NOT EXISTS tasks (
                task_id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                filename TEXT NOT NULL,
                file_size INTEGER NOT NULL DEFAULT 0,
                provider TEXT,
                model_name TEXT,
                use_chapters INTEGER NOT NULL DEFAULT 0,
                progress_current INTEGER NOT NULL DEFAULT 0,
                progress_total INTEGER NOT NULL DEFAULT 0,
                chapter_progress_json TEXT,
                error TEXT,
                created_at TEXT NOT NULL,
                started_at TEXT,
                completed_at TEXT
            )",
            "CREATE INDEX IF NOT EXISTS idx_results_completed_at ON results(completed_at)",
            "CREATE INDEX IF NOT EXISTS idx_results_created_at ON results(created_at)",
            "CREATE INDEX IF NOT EXISTS idx_results_task_id ON results(task_id)",
            "CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        }
        Ok(())
    }

    // ----------------------------
    // Legacy migration (results.json)
    // ----------------------------

    async fn migrate_legacy_results(&self) -> Result<()> {
        let legacy_path = self.cache_dir.join(LEGACY_RESULTS_FILE);
        let backup_path = self.cache_dir.join(format!("{}.bak", LEGACY_RESULTS_FILE));
        if !legacy_path.exists() || backup_path.exists() {
            return Ok(());
        }

        // Only migrate into an empty table
        let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM results")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        if count > 0 {
            return Ok(());
        }

        let raw = match tokio::fs::read_to_string(&legacy_path).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("cannot read legacy results cache: {}", e);
                return Ok(());
            }
        };
        let legacy: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("legacy results cache is not valid JSON, skipping migration: {}", e);
                return Ok(());
            }
        };
        let Some(entries) = legacy.as_object() else {
            warn!("legacy results cache has an unexpected shape, skipping migration");
            return Ok(());
        };

        let mut migrated = 0usize;
        for result in entries.values() {
            match self.migrate_legacy_entry(result).await {
                Ok(true) => migrated += 1,
                Ok(false) => {}
                Err(e) => warn!("skipping bad legacy result row: {}", e),
            }
        }
        info!("migrated {} legacy results into SQLite", migrated);

        if let Err(e) = tokio::fs::rename(&legacy_path, &backup_path).await {
            warn!("cannot move legacy results cache aside: {}", e);
        }
        Ok(())
    }

    async fn migrate_legacy_entry(&self, result: &Value) -> Result<bool> {
        let Some(result_id) = result.get("result_id").and_then(Value::as_str) else {
            return Ok(false);
        };

        let chapters: Vec<ChapterRecord> = result
            .get("chapters")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|ch| {
                        let original = str_field(ch, "original").unwrap_or_default();
                        let corrected = str_field(ch, "corrected").unwrap_or_default();
                        let has_changes = ch
                            .get("has_changes")
                            .and_then(Value::as_bool)
                            .unwrap_or_else(|| has_meaningful_changes(&original, &corrected));
                        ChapterRecord {
                            chapter_index: ch
                                .get("chapter_index")
                                .and_then(Value::as_i64)
                                .unwrap_or(0),
                            chapter_title: str_field(ch, "chapter_title").unwrap_or_default(),
                            has_changes,
                            original,
                            corrected,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let task_id = str_field(result, "task_id");
        let use_chapters =
            result.get("use_chapters").and_then(Value::as_bool).unwrap_or(false) || !chapters.is_empty();
        let source = str_field(result, "source")
            .unwrap_or_else(|| if task_id.is_some() { "task" } else { "manual_input" }.to_string());
        let (original_length, corrected_length) = if chapters.is_empty() {
            (None, None)
        } else {
            (
                Some(chapters.iter().map(|c| c.original.chars().count() as i64).sum()),
                Some(chapters.iter().map(|c| c.corrected.chars().count() as i64).sum()),
            )
        };

        let record = ResultRecord {
            result_id: result_id.to_string(),
            task_id,
            source,
            filename: str_field(result, "filename").unwrap_or_else(|| "未知文件".to_string()),
            provider: str_field(result, "provider"),
            model_name: str_field(result, "model_name"),
            has_changes: result.get("has_changes").and_then(Value::as_bool).unwrap_or(false),
            use_chapters,
            created_at: str_field(result, "created_at")
                .or_else(|| str_field(result, "completed_at"))
                .unwrap_or_default(),
            completed_at: str_field(result, "completed_at"),
            original_text: str_field(result, "original").unwrap_or_default(),
            corrected_text: str_field(result, "corrected").unwrap_or_default(),
            original_length,
            corrected_length,
        };

        self.upsert_result(&record).await?;
        if !chapters.is_empty() {
            self.replace_chapters(result_id, &chapters).await?;
        }
        Ok(true)
    }

    // ----------------------------
    // Results CRUD
    // ----------------------------

    /// Insert or fully overwrite one result row
    pub async fn upsert_result(&self, record: &ResultRecord) -> Result<()> {
        let original_length = record
            .original_length
            .unwrap_or_else(|| record.original_text.chars().count() as i64);
        let corrected_length = record
            .corrected_length
            .unwrap_or_else(|| record.corrected_text.chars().count() as i64);

        sqlx::query(
            "INSERT INTO results (
                result_id, task_id, source, filename, provider, model_name,
                has_changes, use_chapters, created_at, completed_at,
                original_text, corrected_text, original_length, corrected_length
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(result_id) DO UPDATE SET
                task_id=excluded.task_id,
                source=excluded.source,
                filename=excluded.filename,
                provider=excluded.provider,
                model_name=excluded.model_name,
                has_changes=excluded.has_changes,
                use_chapters=excluded.use_chapters,
                created_at=excluded.created_at,
                completed_at=excluded.completed_at,
                original_text=excluded.original_text,
                corrected_text=excluded.corrected_text,
                original_length=excluded.original_length,
                corrected_length=excluded.corrected_length",
        )
        .bind(&record.result_id)
        .bind(&record.task_id)
        .bind(&record.source)
        .bind(&record.filename)
        .bind(&record.provider)
        .bind(&record.model_name)
        .bind(i64::from(record.has_changes))
        .bind(i64::from(record.use_chapters))
        .bind(&record.created_at)
        .bind(&record.completed_at)
        .bind(&record.original_text)
        .bind(&record.corrected_text)
        .bind(original_length)
        .bind(corrected_length)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// List results, newest first, metadata only
    pub async fn list_results(&self, limit: i64, offset: i64) -> Result<Page<StoredResult>> {
        let limit = limit.clamp(1, RESULTS_PAGE_CAP);
        let offset = offset.max(0);

        let total: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM results")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let rows = sqlx::query(
            "SELECT result_id, task_id, filename, provider, model_name, source,
                    has_changes, use_chapters, created_at, completed_at,
                    original_length, corrected_length
             FROM results
             ORDER BY COALESCE(completed_at, created_at) DESC
             LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let mut item = result_from_row(&row)?;
            if item.use_chapters {
                let count: i64 =
                    sqlx::query_scalar("SELECT COUNT(1) FROM chapters WHERE result_id = ?")
                        .bind(&item.result_id)
                        .fetch_one(&self.pool)
                        .await
                        .map_err(db_err)?;
                item.chapter_count = Some(count);
            }
            items.push(item);
        }

        Ok(Page {
            items,
            total,
            limit,
            offset,
        })
    }

    /// Load one result; text only for non-chapter results when requested,
    /// chapter metadata (without chapter text) when requested
    pub async fn get_result(
        &self,
        result_id: &str,
        include_text: bool,
        include_chapter_meta: bool,
    ) -> Result<Option<StoredResult>> {
        let row = sqlx::query("SELECT * FROM results WHERE result_id = ?")
            .bind(result_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut result = result_from_row(&row)?;
        if include_text && !result.use_chapters {
            result.original = Some(row.try_get::<Option<String>, _>("original_text").map_err(db_err)?.unwrap_or_default());
            result.corrected = Some(row.try_get::<Option<String>, _>("corrected_text").map_err(db_err)?.unwrap_or_default());
        }

        if result.use_chapters && include_chapter_meta {
            let rows = sqlx::query(
                "SELECT chapter_index, chapter_title, has_changes, original_length, corrected_length
                 FROM chapters
                 WHERE result_id = ?
                 ORDER BY chapter_index ASC",
            )
            .bind(result_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

            let chapters: Vec<ChapterMeta> = rows
                .iter()
                .map(|ch| {
                    Ok(ChapterMeta {
                        chapter_index: ch.try_get("chapter_index").map_err(db_err)?,
                        chapter_title: ch.try_get("chapter_title").map_err(db_err)?,
                        has_changes: ch.try_get::<i64, _>("has_changes").map_err(db_err)? != 0,
                        original_length: ch
                            .try_get::<Option<i64>, _>("original_length")
                            .map_err(db_err)?
                            .unwrap_or(0),
                        corrected_length: ch
                            .try_get::<Option<i64>, _>("corrected_length")
                            .map_err(db_err)?
                            .unwrap_or(0),
                    })
                })
                .collect::<Result<_>>()?;
            result.chapter_count = Some(chapters.len() as i64);
            result.chapters = Some(chapters);
        }

        Ok(Some(result))
    }

    /// Load one chapter with its texts
    pub async fn get_chapter(
        &self,
        result_id: &str,
        chapter_index: i64,
    ) -> Result<Option<StoredChapter>> {
        let row = sqlx::query(
            "SELECT chapter_index, chapter_title, has_changes, original_text, corrected_text
             FROM chapters WHERE result_id = ? AND chapter_index = ?",
        )
        .bind(result_id)
        .bind(chapter_index)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(|ch| {
            Ok(StoredChapter {
                chapter_index: ch.try_get("chapter_index").map_err(db_err)?,
                chapter_title: ch.try_get("chapter_title").map_err(db_err)?,
                has_changes: ch.try_get::<i64, _>("has_changes").map_err(db_err)? != 0,
                original: ch
                    .try_get::<Option<String>, _>("original_text")
                    .map_err(db_err)?
                    .unwrap_or_default(),
                corrected: ch
                    .try_get::<Option<String>, _>("corrected_text")
                    .map_err(db_err)?
                    .unwrap_or_default(),
            })
        })
        .transpose()
    }

    /// Delete one result; chapters follow through the foreign key
    pub async fn delete_result(&self, result_id: &str) -> Result<bool> {
        let outcome = sqlx::query("DELETE FROM results WHERE result_id = ?")
            .bind(result_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(outcome.rows_affected() > 0)
    }

    /// Atomically replace the chapter rows of a result
    pub async fn replace_chapters(
        &self,
        result_id: &str,
        chapters: &[ChapterRecord],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("DELETE FROM chapters WHERE result_id = ?")
            .bind(result_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        for chapter in chapters {
            sqlx::query(
                "INSERT INTO chapters (
                    result_id, chapter_index, chapter_title, has_changes,
                    original_text, corrected_text, original_length, corrected_length
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(result_id)
            .bind(chapter.chapter_index)
            .bind(&chapter.chapter_title)
            .bind(i64::from(chapter.has_changes))
            .bind(&chapter.original)
            .bind(&chapter.corrected)
            .bind(chapter.original.chars().count() as i64)
            .bind(chapter.corrected.chars().count() as i64)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    // ----------------------------
    // Tasks persistence (best-effort snapshots)
    // ----------------------------

    /// Insert or fully overwrite one task snapshot
    pub async fn upsert_task(&self, task: &Task) -> Result<()> {
        let chapter_progress_json = task
            .chapter_progress
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            "INSERT INTO tasks (
                task_id, status, filename, file_size, provider, model_name, use_chapters,
                progress_current, progress_total, chapter_progress_json, error,
                created_at, started_at, completed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(task_id) DO UPDATE SET
                status=excluded.status,
                filename=excluded.filename,
                file_size=excluded.file_size,
                provider=excluded.provider,
                model_name=excluded.model_name,
                use_chapters=excluded.use_chapters,
                progress_current=excluded.progress_current,
                progress_total=excluded.progress_total,
                chapter_progress_json=excluded.chapter_progress_json,
                error=excluded.error,
                created_at=excluded.created_at,
                started_at=excluded.started_at,
                completed_at=excluded.completed_at",
        )
        .bind(&task.task_id)
        .bind(task.status.as_str())
        .bind(&task.filename)
        .bind(task.file_size)
        .bind(&task.provider)
        .bind(&task.model_name)
        .bind(i64::from(task.use_chapters))
        .bind(task.progress.current)
        .bind(task.progress.total)
        .bind(chapter_progress_json)
        .bind(&task.error)
        .bind(&task.created_at)
        .bind(&task.started_at)
        .bind(&task.completed_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// List task snapshots, newest first
    pub async fn list_tasks(&self, limit: i64, offset: i64) -> Result<Page<Task>> {
        let limit = limit.clamp(1, TASKS_PAGE_CAP);
        let offset = offset.max(0);

        let total: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM tasks")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let rows = sqlx::query(
            "SELECT * FROM tasks ORDER BY created_at DESC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let items: Vec<Task> = rows.iter().map(task_from_row).collect::<Result<_>>()?;
        Ok(Page {
            items,
            total,
            limit,
            offset,
        })
    }

    /// Load one task snapshot
    pub async fn get_task(&self, task_id: &str) -> Result<Option<Task>> {
        let row = sqlx::query("SELECT * FROM tasks WHERE task_id = ?")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(task_from_row).transpose()
    }
}

fn db_err(e: sqlx::Error) -> ProofError {
    ProofError::storage(e.to_string())
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn result_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<StoredResult> {
    Ok(StoredResult {
        result_id: row.try_get("result_id").map_err(db_err)?,
        task_id: row.try_get("task_id").map_err(db_err)?,
        filename: row.try_get("filename").map_err(db_err)?,
        provider: row.try_get("provider").map_err(db_err)?,
        model_name: row.try_get("model_name").map_err(db_err)?,
        source: row.try_get("source").map_err(db_err)?,
        has_changes: row.try_get::<i64, _>("has_changes").map_err(db_err)? != 0,
        use_chapters: row.try_get::<i64, _>("use_chapters").map_err(db_err)? != 0,
        created_at: row.try_get("created_at").map_err(db_err)?,
        completed_at: row.try_get("completed_at").map_err(db_err)?,
        original_length: row
            .try_get::<Option<i64>, _>("original_length")
            .map_err(db_err)?
            .unwrap_or(0),
        corrected_length: row
            .try_get::<Option<i64>, _>("corrected_length")
            .map_err(db_err)?
            .unwrap_or(0),
        original: None,
        corrected: None,
        chapter_count: None,
        chapters: None,
    })
}

fn task_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Task> {
    use crate::tasks::{Progress, TaskStatus};

    let chapter_progress = row
        .try_get::<Option<String>, _>("chapter_progress_json")
        .map_err(db_err)?
        .and_then(|raw| match serde_json::from_str(&raw) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("dropping unparsable chapter progress: {}", e);
                None
            }
        });

    Ok(Task {
        task_id: row.try_get("task_id").map_err(db_err)?,
        filename: row.try_get("filename").map_err(db_err)?,
        file_size: row.try_get::<Option<i64>, _>("file_size").map_err(db_err)?.unwrap_or(0),
        status: TaskStatus::parse(&row.try_get::<String, _>("status").map_err(db_err)?),
        provider: row.try_get("provider").map_err(db_err)?,
        model_name: row.try_get("model_name").map_err(db_err)?,
        use_chapters: row.try_get::<i64, _>("use_chapters").map_err(db_err)? != 0,
        progress: Progress {
            current: row
                .try_get::<Option<i64>, _>("progress_current")
                .map_err(db_err)?
                .unwrap_or(0),
            total: row
                .try_get::<Option<i64>, _>("progress_total")
                .map_err(db_err)?
                .unwrap_or(0),
        },
        chapter_progress,
        created_at: row.try_get("created_at").map_err(db_err)?,
        started_at: row.try_get("started_at").map_err(db_err)?,
        completed_at: row.try_get("completed_at").map_err(db_err)?,
        error: row.try_get("error").map_err(db_err)?,
    })
}
