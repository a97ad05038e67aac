//! Correction engine
//!
//! Orchestrates the splitters, the provider adapter and the reassembler.
//! Strategy selection: the Ollama path corrects sentence by sentence with
//! the line structure preserved; large-context cloud providers get the whole
//! text in one call when it fits, and fall back to overlapping chunks
//! otherwise.
//!
//! Unit processing is strictly sequential. Failures keep the unit's original
//! text in place so the reassembled document stays coherent; a network-level
//! failure or three consecutive transient failures abandon the remaining
//! units of the run.

use crate::config::Settings;
use crate::error::{ProofError, Result};
use crate::prompt::{PromptKind, PromptManager};
use crate::providers::{Provider, ProviderKind};
use crate::split::{char_len, reassemble_units, split_with_line_endings, TextSplitter};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Consecutive transient failures tolerated before the circuit-breaker trips
const MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// Unit-level errors quoted in an all-failed engine error
const FATAL_ERROR_SAMPLES: usize = 5;

/// Progress callback: `(units_done, units_total)`. Invoked from the engine's
/// own task; implementations must be cheap and non-blocking.
pub type ProgressFn = dyn Fn(usize, usize) + Send + Sync;

/// Pluggable pre-pass applied to each sentence on the per-sentence path
/// before the provider call. Implementations may block; the engine runs them
/// on the blocking pool. Any error bypasses the pass for that sentence.
pub trait SentenceCorrector: Send + Sync {
    /// Correct a single sentence
    fn correct(&self, sentence: &str) -> anyhow::Result<String>;
}

/// Tunables snapshot the engine is built with
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Chunk size for the recursive splitter
    pub chunk_size: usize,
    /// Chunk overlap for the recursive splitter
    pub chunk_overlap: usize,
    /// Per-sentence length budget on the Ollama path
    pub ollama_chunk_size: usize,
    /// Direct-mode threshold for cloud providers
    pub fast_provider_max_chars: usize,
    /// Attempts per unit
    pub max_retries: u32,
    /// Base retry delay in seconds
    pub retry_delay: f64,
    /// Whether the sentence pre-corrector pass is enabled
    pub pre_correct: bool,
}

impl EngineOptions {
    /// Snapshot the engine tunables from the current settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
            ollama_chunk_size: settings.ollama_chunk_size,
            fast_provider_max_chars: settings.fast_provider_max_chars,
            max_retries: settings.max_retries,
            retry_delay: settings.retry_delay,
            pre_correct: settings.ollama_pre_correct,
        }
    }
}

/// One failed unit in a correction run
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChunkFailure {
    /// 1-based unit index
    pub chunk_index: usize,
    /// Failure description
    pub error: String,
}

/// Report of a finished correction run
#[derive(Debug, Clone, Serialize)]
pub struct CorrectionOutcome {
    /// Input text
    pub original: String,
    /// Reassembled output
    pub corrected: String,
    /// Units whose provider call returned successfully
    pub chunks_processed: usize,
    /// Units the run consisted of
    pub total_chunks: usize,
    /// Units that kept their original text
    pub failed_chunks: usize,
    /// Whether any unit failed
    pub has_failures: bool,
    /// Per-unit failure descriptions
    pub failure_details: Vec<ChunkFailure>,
}

impl CorrectionOutcome {
    fn unchanged(text: &str) -> Self {
        Self {
            original: text.to_string(),
            corrected: text.to_string(),
            chunks_processed: 0,
            total_chunks: 0,
            failed_chunks: 0,
            has_failures: false,
            failure_details: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum StopReason {
    Connection,
    ConsecutiveFailures,
}

impl StopReason {
    fn annotation(&self) -> &'static str {
        match self {
            Self::Connection => "因连接错误跳过处理",
            Self::ConsecutiveFailures => "因连续失败跳过处理",
        }
    }
}

struct UnitRun {
    corrected: Vec<String>,
    processed: usize,
    failures: Vec<ChunkFailure>,
}

/// Correction engine bound to one provider and one tunables snapshot
pub struct CorrectionEngine {
    provider: Arc<dyn Provider>,
    kind: ProviderKind,
    prompts: Arc<PromptManager>,
    splitter: TextSplitter,
    options: EngineOptions,
    pre_corrector: Option<Arc<dyn SentenceCorrector>>,
}

impl CorrectionEngine {
    /// Build an engine from a provider adapter and options
    pub fn new(
        provider: Arc<dyn Provider>,
        kind: ProviderKind,
        prompts: Arc<PromptManager>,
        options: EngineOptions,
    ) -> Result<Self> {
        let splitter = TextSplitter::new(options.chunk_size, options.chunk_overlap)?;
        Ok(Self {
            provider,
            kind,
            prompts,
            splitter,
            options,
            pre_corrector: None,
        })
    }

    /// Attach a sentence pre-corrector for the per-sentence path
    pub fn with_pre_corrector(mut self, corrector: Arc<dyn SentenceCorrector>) -> Self {
        self.pre_corrector = Some(corrector);
        self
    }

    /// The provider kind this engine drives
    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Probe the underlying provider
    pub async fn health_check(&self) -> bool {
        self.provider.health_check().await
    }

    /// Correct a text, reporting progress through the optional callback
    pub async fn correct(
        &self,
        text: &str,
        progress: Option<&ProgressFn>,
    ) -> Result<CorrectionOutcome> {
        if self.kind == ProviderKind::Ollama {
            return self.correct_sentences(text, progress).await;
        }

        if char_len(text) <= self.options.fast_provider_max_chars {
            match self.correct_direct(text, progress).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => {
                    warn!("direct correction failed, falling back to chunked mode: {}", e);
                }
            }
        }

        self.correct_chunked(text, progress).await
    }

    /// Direct mode: the whole text in a single call
    async fn correct_direct(
        &self,
        text: &str,
        progress: Option<&ProgressFn>,
    ) -> Result<CorrectionOutcome> {
        let prompt = self.prompts.get(PromptKind::General);
        info!(
            "correcting {} chars in direct mode via {}",
            char_len(text),
            self.provider.name()
        );

        let corrected = self
            .provider
            .correct_with_retry(
                text,
                &prompt,
                self.options.max_retries,
                self.options.retry_delay,
            )
            .await?;

        if let Some(cb) = progress {
            cb(1, 1);
        }

        Ok(CorrectionOutcome {
            original: text.to_string(),
            corrected,
            chunks_processed: 1,
            total_chunks: 1,
            failed_chunks: 0,
            has_failures: false,
            failure_details: Vec::new(),
        })
    }

    /// Chunked mode: overlapping chunks, merged afterwards
    async fn correct_chunked(
        &self,
        text: &str,
        progress: Option<&ProgressFn>,
    ) -> Result<CorrectionOutcome> {
        let prompt = self.prompts.get(PromptKind::General);
        let chunks = self.splitter.split(text);
        if chunks.is_empty() {
            return Ok(CorrectionOutcome::unchanged(text));
        }

        info!(
            "correcting {} chars in {} chunks via {}",
            char_len(text),
            chunks.len(),
            self.provider.name()
        );

        let run = self.drive_units(&chunks, &prompt, false, progress).await?;
        let corrected = self.splitter.merge(&run.corrected);

        Ok(CorrectionOutcome {
            original: text.to_string(),
            corrected,
            chunks_processed: run.processed,
            total_chunks: chunks.len(),
            failed_chunks: run.failures.len(),
            has_failures: !run.failures.is_empty(),
            failure_details: run.failures,
        })
    }

    /// Per-sentence mode for Ollama, line structure preserved
    async fn correct_sentences(
        &self,
        text: &str,
        progress: Option<&ProgressFn>,
    ) -> Result<CorrectionOutcome> {
        let prompt = self.prompts.get(PromptKind::Ollama);
        let units = split_with_line_endings(text, self.options.ollama_chunk_size);
        let texts: Vec<String> = units
            .iter()
            .filter(|u| !u.blank)
            .map(|u| u.text.clone())
            .collect();

        if texts.is_empty() {
            return Ok(CorrectionOutcome::unchanged(text));
        }

        info!(
            "correcting {} chars in {} sentences via {}",
            char_len(text),
            texts.len(),
            self.provider.name()
        );

        let run = self.drive_units(&texts, &prompt, true, progress).await?;
        let corrected = reassemble_units(&units, &run.corrected);

        Ok(CorrectionOutcome {
            original: text.to_string(),
            corrected,
            chunks_processed: run.processed,
            total_chunks: texts.len(),
            failed_chunks: run.failures.len(),
            has_failures: !run.failures.is_empty(),
            failure_details: run.failures,
        })
    }

    /// Sequential unit loop shared by the sentence and chunk strategies
    async fn drive_units(
        &self,
        units: &[String],
        prompt: &str,
        pre_correct: bool,
        progress: Option<&ProgressFn>,
    ) -> Result<UnitRun> {
        let total = units.len();
        let mut corrected = Vec::with_capacity(total);
        let mut failures = Vec::new();
        let mut processed = 0usize;
        let mut consecutive_failures = 0u32;
        let mut stop: Option<StopReason> = None;

        for (i, unit) in units.iter().enumerate() {
            if let Some(reason) = stop {
                corrected.push(unit.clone());
                failures.push(ChunkFailure {
                    chunk_index: i + 1,
                    error: reason.annotation().to_string(),
                });
                continue;
            }

            let input = if pre_correct {
                self.pre_correct(unit).await
            } else {
                unit.clone()
            };

            match self
                .provider
                .correct_with_retry(
                    &input,
                    prompt,
                    self.options.max_retries,
                    self.options.retry_delay,
                )
                .await
            {
                Ok(result) => {
                    corrected.push(result);
                    processed += 1;
                    consecutive_failures = 0;
                }
                Err(e) => {
                    warn!("unit {}/{} failed, keeping original: {}", i + 1, total, e);
                    corrected.push(unit.clone());
                    failures.push(ChunkFailure {
                        chunk_index: i + 1,
                        error: e.to_string(),
                    });
                    if e.is_fatal() {
                        stop = Some(StopReason::Connection);
                    } else {
                        consecutive_failures += 1;
                        if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                            warn!(
                                "{} consecutive failures, abandoning remaining units",
                                consecutive_failures
                            );
                            stop = Some(StopReason::ConsecutiveFailures);
                        }
                    }
                }
            }

            if let Some(cb) = progress {
                cb(i + 1, total);
            }
        }

        if processed == 0 {
            let summary: Vec<String> = failures
                .iter()
                .take(FATAL_ERROR_SAMPLES)
                .map(|f| format!("片段{}: {}", f.chunk_index, f.error))
                .collect();
            return Err(ProofError::engine(format!(
                "全部{}个片段校对失败: {}",
                total,
                summary.join("; ")
            )));
        }

        Ok(UnitRun {
            corrected,
            processed,
            failures,
        })
    }

    /// Run the pre-corrector off the scheduling loop; any error bypasses it
    async fn pre_correct(&self, sentence: &str) -> String {
        if !self.options.pre_correct {
            return sentence.to_string();
        }
        let Some(corrector) = self.pre_corrector.clone() else {
            return sentence.to_string();
        };

        let input = sentence.to_string();
        match tokio::task::spawn_blocking(move || corrector.correct(&input)).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                debug!("pre-corrector failed, using original sentence: {}", e);
                sentence.to_string()
            }
            Err(e) => {
                debug!("pre-corrector task failed, using original sentence: {}", e);
                sentence.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted provider: echoes its input unless the call number (0-based)
    /// is mapped to an error.
    struct MockProvider {
        calls: AtomicUsize,
        failures: Mutex<HashMap<usize, ProviderError>>,
    }

    impl MockProvider {
        fn echo() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failures: Mutex::new(HashMap::new()),
            }
        }

        fn failing_calls(failures: impl IntoIterator<Item = (usize, ProviderError)>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failures: Mutex::new(failures.into_iter().collect()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn correct(
            &self,
            text: &str,
            _prompt: &str,
        ) -> std::result::Result<String, ProviderError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.failures.lock().get(&call) {
                Some(e) => Err(e.clone()),
                None => Ok(text.to_string()),
            }
        }

        async fn health_check(&self) -> bool {
            true
        }
    }

    fn options() -> EngineOptions {
        EngineOptions {
            chunk_size: 50,
            chunk_overlap: 10,
            ollama_chunk_size: 20,
            fast_provider_max_chars: 100,
            max_retries: 1,
            retry_delay: 0.0,
            pre_correct: true,
        }
    }

    fn engine(provider: Arc<MockProvider>, kind: ProviderKind, options: EngineOptions) -> CorrectionEngine {
        let prompts = Arc::new(PromptManager::from_settings(&Settings::default()));
        CorrectionEngine::new(provider, kind, prompts, options).unwrap()
    }

    // Paragraphs sized so that no two fit in one 50-char chunk: each one
    // becomes its own chunk under the test options.
    fn paragraphs(count: usize) -> String {
        (0..count)
            .map(|i| format!("第{}段的正文内容都在这里写着呢，再多补充一些字数。", i))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    #[tokio::test]
    async fn test_direct_mode_single_call() {
        let provider = Arc::new(MockProvider::echo());
        let engine = engine(provider.clone(), ProviderKind::OpenAi, options());
        let text = "这是一段没有错误的文本。";

        let outcome = engine.correct(text, None).await.unwrap();
        assert_eq!(provider.call_count(), 1);
        assert_eq!(outcome.total_chunks, 1);
        assert_eq!(outcome.chunks_processed, 1);
        assert_eq!(outcome.corrected, text);
        assert!(!outcome.has_failures);
    }

    #[tokio::test]
    async fn test_direct_mode_reports_progress() {
        let provider = Arc::new(MockProvider::echo());
        let engine = engine(provider, ProviderKind::OpenAi, options());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = seen.clone();
        let cb = move |current: usize, total: usize| {
            seen_cb.lock().push((current, total));
        };

        engine.correct("短文本。", Some(&cb)).await.unwrap();
        assert_eq!(*seen.lock(), vec![(1, 1)]);
    }

    #[tokio::test]
    async fn test_long_text_uses_chunked_mode() {
        let provider = Arc::new(MockProvider::echo());
        let engine = engine(provider.clone(), ProviderKind::OpenAi, options());
        let text = paragraphs(8);
        assert!(char_len(&text) > 100);

        let outcome = engine.correct(&text, None).await.unwrap();
        assert!(outcome.total_chunks > 1);
        assert_eq!(outcome.chunks_processed, outcome.total_chunks);
        assert_eq!(provider.call_count(), outcome.total_chunks);

        // Echo provider: reassembly reproduces the input modulo whitespace
        let normalize = |s: &str| s.split_whitespace().collect::<String>();
        assert_eq!(normalize(&outcome.corrected), normalize(&text));
    }

    #[tokio::test]
    async fn test_direct_failure_falls_back_to_chunked() {
        let provider = Arc::new(MockProvider::failing_calls([(
            0,
            ProviderError::other("model overloaded"),
        )]));
        let engine = engine(provider.clone(), ProviderKind::OpenAi, options());
        let text = "这是一段不太长的文本，直发失败后走分段。";

        let outcome = engine.correct(text, None).await.unwrap();
        assert!(outcome.total_chunks >= 1);
        assert!(!outcome.has_failures);
        assert_eq!(outcome.corrected, text);
        // One failed direct call plus one call per chunk
        assert_eq!(provider.call_count(), 1 + outcome.total_chunks);
    }

    #[tokio::test]
    async fn test_connection_error_stops_remaining_units() {
        let provider = Arc::new(MockProvider::failing_calls([(
            2,
            ProviderError::connection("connection refused"),
        )]));
        let mut opts = options();
        opts.fast_provider_max_chars = 1; // force chunked mode
        let engine = engine(provider.clone(), ProviderKind::OpenAi, opts);
        let text = paragraphs(10);

        let outcome = engine.correct(&text, None).await.unwrap();
        assert_eq!(outcome.total_chunks, 10);
        // Units 1..2 processed, 3 failed fatally, 4..10 skipped
        assert_eq!(provider.call_count(), 3);
        assert_eq!(outcome.chunks_processed, 2);
        assert_eq!(outcome.failed_chunks, 8);
        assert!(outcome.has_failures);
        assert_eq!(outcome.failure_details[0].chunk_index, 3);
        assert!(outcome.failure_details[1].error.contains("跳过处理"));

        // Skipped units keep their originals in the output
        let normalize = |s: &str| s.split_whitespace().collect::<String>();
        assert_eq!(normalize(&outcome.corrected), normalize(&text));
    }

    #[tokio::test]
    async fn test_circuit_breaker_after_three_consecutive_failures() {
        let provider = Arc::new(MockProvider::failing_calls([
            (2, ProviderError::unavailable("503")),
            (3, ProviderError::unavailable("503")),
            (4, ProviderError::unavailable("503")),
        ]));
        let mut opts = options();
        opts.fast_provider_max_chars = 1;
        let engine = engine(provider.clone(), ProviderKind::OpenAi, opts);
        let text = paragraphs(10);

        let outcome = engine.correct(&text, None).await.unwrap();
        assert_eq!(outcome.total_chunks, 10);
        // Calls for units 1..5 only; the breaker trips on the third failure
        assert_eq!(provider.call_count(), 5);
        assert_eq!(outcome.chunks_processed, 2);
        assert_eq!(outcome.failed_chunks, 8);
    }

    #[tokio::test]
    async fn test_success_resets_consecutive_failure_counter() {
        // Failures on units 2 and 4 with successes between never trip the breaker
        let provider = Arc::new(MockProvider::failing_calls([
            (1, ProviderError::unavailable("503")),
            (3, ProviderError::unavailable("503")),
        ]));
        let mut opts = options();
        opts.fast_provider_max_chars = 1;
        let engine = engine(provider.clone(), ProviderKind::OpenAi, opts);
        let text = paragraphs(6);

        let outcome = engine.correct(&text, None).await.unwrap();
        assert_eq!(provider.call_count(), 6);
        assert_eq!(outcome.chunks_processed, 4);
        assert_eq!(outcome.failed_chunks, 2);
    }

    #[tokio::test]
    async fn test_all_units_failing_is_fatal() {
        let provider = Arc::new(MockProvider::failing_calls([
            (0, ProviderError::unavailable("503")),
            (1, ProviderError::unavailable("503")),
            (2, ProviderError::unavailable("503")),
        ]));
        let mut opts = options();
        opts.ollama_chunk_size = 100;
        let engine = engine(provider, ProviderKind::Ollama, opts);
        let text = "第一句。\n第二句。\n第三句。";

        let err = engine.correct(text, None).await.unwrap_err();
        match err {
            ProofError::Engine { message } => {
                assert!(message.contains("全部3个片段校对失败"));
                assert!(message.contains("片段1"));
            }
            other => panic!("expected engine error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sentence_mode_preserves_lines_exactly() {
        let provider = Arc::new(MockProvider::echo());
        let engine = engine(provider, ProviderKind::Ollama, options());
        let text = "第一行的句子。\n\n第二行的句子！第二行还有一句？\n最后一行没有换行";

        let outcome = engine.correct(text, None).await.unwrap();
        assert_eq!(outcome.corrected, text);
        assert!(!outcome.has_failures);
    }

    #[tokio::test]
    async fn test_sentence_mode_counts_only_nonblank_units() {
        let provider = Arc::new(MockProvider::echo());
        let engine = engine(provider.clone(), ProviderKind::Ollama, options());
        let text = "句子一。\n\n\n句子二。";

        let outcome = engine.correct(text, None).await.unwrap();
        assert_eq!(outcome.total_chunks, 2);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_sentence_mode_progress_per_sentence() {
        let provider = Arc::new(MockProvider::echo());
        let engine = engine(provider, ProviderKind::Ollama, options());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = seen.clone();
        let cb = move |current: usize, total: usize| {
            seen_cb.lock().push((current, total));
        };

        engine.correct("一句。\n两句。\n三句。", Some(&cb)).await.unwrap();
        assert_eq!(*seen.lock(), vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn test_pre_corrector_applied_before_provider() {
        struct SwapCorrector;
        impl SentenceCorrector for SwapCorrector {
            fn correct(&self, sentence: &str) -> anyhow::Result<String> {
                Ok(sentence.replace("de", "的"))
            }
        }

        let provider = Arc::new(MockProvider::echo());
        let engine = engine(provider, ProviderKind::Ollama, options())
            .with_pre_corrector(Arc::new(SwapCorrector));

        let outcome = engine.correct("我de书。", None).await.unwrap();
        assert_eq!(outcome.corrected, "我的书。");
    }

    #[tokio::test]
    async fn test_pre_corrector_error_is_bypassed() {
        struct BrokenCorrector;
        impl SentenceCorrector for BrokenCorrector {
            fn correct(&self, _sentence: &str) -> anyhow::Result<String> {
                anyhow::bail!("model not installed")
            }
        }

        let provider = Arc::new(MockProvider::echo());
        let engine = engine(provider, ProviderKind::Ollama, options())
            .with_pre_corrector(Arc::new(BrokenCorrector));

        let outcome = engine.correct("一句话。", None).await.unwrap();
        assert_eq!(outcome.corrected, "一句话。");
        assert!(!outcome.has_failures);
    }

    #[tokio::test]
    async fn test_pre_corrector_disabled_by_flag() {
        struct SwapCorrector;
        impl SentenceCorrector for SwapCorrector {
            fn correct(&self, _sentence: &str) -> anyhow::Result<String> {
                Ok("不应出现".to_string())
            }
        }

        let mut opts = options();
        opts.pre_correct = false;
        let provider = Arc::new(MockProvider::echo());
        let engine = engine(provider, ProviderKind::Ollama, opts)
            .with_pre_corrector(Arc::new(SwapCorrector));

        let outcome = engine.correct("原样的句子。", None).await.unwrap();
        assert_eq!(outcome.corrected, "原样的句子。");
    }

    #[tokio::test]
    async fn test_empty_text_is_a_no_op() {
        let provider = Arc::new(MockProvider::echo());
        let engine = engine(provider.clone(), ProviderKind::Ollama, options());

        let outcome = engine.correct("", None).await.unwrap();
        assert_eq!(outcome.total_chunks, 0);
        assert_eq!(outcome.corrected, "");
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_retry_count_fails_then_succeeds() {
        // Fails twice, succeeds on the third call
        let provider = Arc::new(MockProvider::failing_calls([
            (0, ProviderError::unavailable("503")),
            (1, ProviderError::unavailable("503")),
        ]));

        let result = provider
            .correct_with_retry("文本", "提示", 3, 0.0)
            .await;
        assert!(result.is_ok());
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_returns_last_error() {
        let provider = Arc::new(MockProvider::failing_calls([
            (0, ProviderError::unavailable("first")),
            (1, ProviderError::unavailable("second")),
            (2, ProviderError::other("third")),
        ]));

        let err = provider
            .correct_with_retry("文本", "提示", 3, 0.0)
            .await
            .unwrap_err();
        assert_eq!(provider.call_count(), 3);
        assert!(matches!(err, ProviderError::Other(_)));
        assert!(err.to_string().contains("third"));
    }
}
