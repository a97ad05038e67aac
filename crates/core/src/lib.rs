//! TextProof Core Library
//!
//! Core components of the TextProof proofreading service: configuration and
//! prompt management, the text/chapter/sentence splitters, the provider
//! adapters, the correction engine and the diff service. The HTTP surface
//! and the durable store live in the serve crate.

pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod prompt;
pub mod providers;
pub mod split;

// Re-export commonly used types
pub use config::{ConfigUpdate, EnvFile, Settings};
pub use diff::{
    compute_diff, has_meaningful_changes, highlight_diff, DiffHighlight, DiffSegment, SegmentKind,
};
pub use engine::{
    ChunkFailure, CorrectionEngine, CorrectionOutcome, EngineOptions, ProgressFn,
    SentenceCorrector,
};
pub use error::{ProofError, ProviderError, Result};
pub use prompt::{PromptKind, PromptManager};
pub use providers::{create_provider, Provider, ProviderKind};
pub use split::{
    Chapter, ChapterDetection, ChapterSplitter, ChapterSummary, SentenceUnit, TextSplitter,
};

/// Initialize logging with custom configuration
pub fn init_logging_with_config(level: &str, format: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        "pretty" => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        "compact" | "text" => {
            registry
                .with(tracing_subscriber::fmt::layer().compact())
                .init();
        }
        _ => {
            return Err(ProofError::validation(format!(
                "Unknown log format: {}",
                format
            )));
        }
    }

    Ok(())
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get version info as a formatted string
pub fn version_info() -> String {
    format!("{} v{} - {}", NAME, VERSION, DESCRIPTION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let _: Result<()> = Ok(());
        let _ = ProviderKind::Ollama;
        let _ = Settings::default();
    }

    #[test]
    fn test_version_info() {
        let info = version_info();
        assert!(info.contains("textproof-core"));
        assert!(info.contains("v"));
    }

    #[test]
    fn test_unknown_log_format_rejected() {
        assert!(init_logging_with_config("info", "xml").is_err());
    }
}
