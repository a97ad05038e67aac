//! Configuration for the TextProof service
//!
//! Settings are loaded from a line-oriented `KEY=VALUE` dotfile (`.env` by
//! convention) with process environment variables taking precedence. The
//! dotfile is also the persistence target for runtime configuration changes;
//! rewrites keep unrelated lines, comments and insertion order intact.

use crate::error::{ProofError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Process-wide settings, mutable at runtime
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// OpenAI API key
    pub openai_api_key: Option<String>,
    /// OpenAI-compatible endpoint base URL
    pub openai_base_url: String,
    /// DeepSeek API key
    pub deepseek_api_key: Option<String>,
    /// DeepSeek endpoint base URL
    pub deepseek_base_url: String,
    /// Ollama endpoint base URL
    pub ollama_base_url: String,
    /// Default model provider (`openai` / `deepseek` / `ollama`)
    pub default_provider: String,
    /// Default model name
    pub default_model_name: String,
    /// Comma-separated OpenAI model menu
    pub openai_models: String,
    /// Comma-separated DeepSeek model menu
    pub deepseek_models: String,
    /// Comma-separated Ollama model menu
    pub ollama_models: String,
    /// Chunk size (characters) for the recursive splitter
    pub chunk_size: usize,
    /// Chunk overlap (characters), must stay below `chunk_size`
    pub chunk_overlap: usize,
    /// Per-sentence maximum length (characters) on the Ollama path
    pub ollama_chunk_size: usize,
    /// Overlap used when an Ollama text falls back to chunked splitting
    pub ollama_chunk_overlap: usize,
    /// Whole-text direct-send threshold for large-context cloud providers
    pub fast_provider_max_chars: usize,
    /// Total attempts per unit in `correct_with_retry`
    pub max_retries: u32,
    /// Base retry delay in seconds (attempt N waits `retry_delay * N`)
    pub retry_delay: f64,
    /// Optional custom prompt file path
    pub prompt_file: Option<String>,
    /// Optional Ollama-specific prompt file path
    pub ollama_prompt_file: Option<String>,
    /// Whether the per-sentence pre-corrector pass is enabled
    pub ollama_pre_correct: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            deepseek_api_key: None,
            deepseek_base_url: "https://api.deepseek.com/v1".to_string(),
            ollama_base_url: "http://localhost:11434".to_string(),
            default_provider: "openai".to_string(),
            default_model_name: "gpt-4-turbo-preview".to_string(),
            openai_models: "gpt-4-turbo-preview,gpt-4,gpt-3.5-turbo,gpt-4o-mini".to_string(),
            deepseek_models: "deepseek-chat,deepseek-coder".to_string(),
            ollama_models: "llama2,llama3,qwen,mistral".to_string(),
            chunk_size: 2000,
            chunk_overlap: 200,
            ollama_chunk_size: 500,
            ollama_chunk_overlap: 50,
            fast_provider_max_chars: 10000,
            max_retries: 3,
            retry_delay: 1.0,
            prompt_file: None,
            ollama_prompt_file: None,
            ollama_pre_correct: true,
        }
    }
}

impl Settings {
    /// Load settings from a dotfile, with process environment overrides
    pub fn load(env_path: &Path) -> Result<Self> {
        let file = EnvFile::load(env_path)?;
        let mut settings = Self::default();

        let lookup = |key: &str| -> Option<String> {
            std::env::var(key)
                .ok()
                .or_else(|| file.get(key).map(str::to_string))
        };

        if let Some(v) = lookup("OPENAI_API_KEY") {
            settings.openai_api_key = non_empty(v);
        }
        if let Some(v) = lookup("OPENAI_BASE_URL") {
            settings.openai_base_url = v;
        }
        if let Some(v) = lookup("DEEPSEEK_API_KEY") {
            settings.deepseek_api_key = non_empty(v);
        }
        if let Some(v) = lookup("DEEPSEEK_BASE_URL") {
            settings.deepseek_base_url = v;
        }
        if let Some(v) = lookup("OLLAMA_BASE_URL") {
            settings.ollama_base_url = v;
        }
        if let Some(v) = lookup("DEFAULT_MODEL_PROVIDER") {
            settings.default_provider = v;
        }
        if let Some(v) = lookup("DEFAULT_MODEL_NAME") {
            settings.default_model_name = v;
        }
        if let Some(v) = lookup("OPENAI_MODELS") {
            settings.openai_models = v;
        }
        if let Some(v) = lookup("DEEPSEEK_MODELS") {
            settings.deepseek_models = v;
        }
        if let Some(v) = lookup("OLLAMA_MODELS") {
            settings.ollama_models = v;
        }
        parse_into(&lookup, "CHUNK_SIZE", &mut settings.chunk_size);
        parse_into(&lookup, "CHUNK_OVERLAP", &mut settings.chunk_overlap);
        parse_into(&lookup, "OLLAMA_CHUNK_SIZE", &mut settings.ollama_chunk_size);
        parse_into(
            &lookup,
            "OLLAMA_CHUNK_OVERLAP",
            &mut settings.ollama_chunk_overlap,
        );
        parse_into(
            &lookup,
            "FAST_PROVIDER_MAX_CHARS",
            &mut settings.fast_provider_max_chars,
        );
        parse_into(&lookup, "MAX_RETRIES", &mut settings.max_retries);
        parse_into(&lookup, "RETRY_DELAY", &mut settings.retry_delay);
        if let Some(v) = lookup("PROMPT_FILE") {
            settings.prompt_file = non_empty(v);
        }
        if let Some(v) = lookup("OLLAMA_PROMPT_FILE") {
            settings.ollama_prompt_file = non_empty(v);
        }
        if let Some(v) = lookup("OLLAMA_PRE_CORRECT") {
            settings.ollama_pre_correct = matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Validate the configured values
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ProofError::config("chunk_size must be greater than 0"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ProofError::config(
                "chunk_overlap must be smaller than chunk_size",
            ));
        }
        if self.ollama_chunk_size == 0 {
            return Err(ProofError::config(
                "ollama_chunk_size must be greater than 0",
            ));
        }
        if self.fast_provider_max_chars == 0 {
            return Err(ProofError::config(
                "fast_provider_max_chars must be greater than 0",
            ));
        }
        if self.retry_delay < 0.0 {
            return Err(ProofError::config("retry_delay must not be negative"));
        }
        Ok(())
    }

    /// Apply a runtime update, validating ranges and the overlap invariant.
    ///
    /// Returns an error without mutating `self` when any value is invalid.
    pub fn update_runtime_config(&mut self, update: &ConfigUpdate) -> Result<()> {
        let mut next = self.clone();

        if let Some(v) = update.chunk_size {
            if v == 0 {
                return Err(ProofError::validation("chunk_size must be greater than 0"));
            }
            next.chunk_size = v;
        }
        if let Some(v) = update.chunk_overlap {
            next.chunk_overlap = v;
        }
        if let Some(v) = update.ollama_chunk_size {
            if v == 0 {
                return Err(ProofError::validation(
                    "ollama_chunk_size must be greater than 0",
                ));
            }
            next.ollama_chunk_size = v;
        }
        if let Some(v) = update.ollama_chunk_overlap {
            next.ollama_chunk_overlap = v;
        }
        if let Some(v) = update.fast_provider_max_chars {
            if v == 0 {
                return Err(ProofError::validation(
                    "fast_provider_max_chars must be greater than 0",
                ));
            }
            next.fast_provider_max_chars = v;
        }
        if let Some(v) = update.max_retries {
            next.max_retries = v;
        }
        if let Some(v) = update.retry_delay {
            if v < 0.0 {
                return Err(ProofError::validation("retry_delay must not be negative"));
            }
            next.retry_delay = v;
        }
        if let Some(ref v) = update.default_provider {
            next.default_provider = v.clone();
        }
        if let Some(ref v) = update.default_model {
            next.default_model_name = v.clone();
        }
        if let Some(ref v) = update.openai_models {
            next.openai_models = v.clone();
        }
        if let Some(ref v) = update.deepseek_models {
            next.deepseek_models = v.clone();
        }
        if let Some(ref v) = update.ollama_models {
            next.ollama_models = v.clone();
        }
        if let Some(v) = update.ollama_pre_correct {
            next.ollama_pre_correct = v;
        }

        if next.chunk_overlap >= next.chunk_size {
            return Err(ProofError::validation(
                "chunk_overlap must be smaller than chunk_size",
            ));
        }

        *self = next;
        Ok(())
    }

    /// Persist the current values back to the dotfile.
    ///
    /// Existing comments, blank lines and key order are preserved; unknown
    /// keys are left alone and missing keys are appended.
    pub fn save_to_env_file(&self, env_path: &Path) -> Result<()> {
        let mut file = EnvFile::load(env_path)?;
        file.set("OPENAI_BASE_URL", &self.openai_base_url);
        file.set("DEEPSEEK_BASE_URL", &self.deepseek_base_url);
        file.set("OLLAMA_BASE_URL", &self.ollama_base_url);
        file.set("DEFAULT_MODEL_PROVIDER", &self.default_provider);
        file.set("DEFAULT_MODEL_NAME", &self.default_model_name);
        file.set("OPENAI_MODELS", &self.openai_models);
        file.set("DEEPSEEK_MODELS", &self.deepseek_models);
        file.set("OLLAMA_MODELS", &self.ollama_models);
        file.set("CHUNK_SIZE", &self.chunk_size.to_string());
        file.set("CHUNK_OVERLAP", &self.chunk_overlap.to_string());
        file.set("OLLAMA_CHUNK_SIZE", &self.ollama_chunk_size.to_string());
        file.set(
            "OLLAMA_CHUNK_OVERLAP",
            &self.ollama_chunk_overlap.to_string(),
        );
        file.set(
            "FAST_PROVIDER_MAX_CHARS",
            &self.fast_provider_max_chars.to_string(),
        );
        file.set("MAX_RETRIES", &self.max_retries.to_string());
        file.set("RETRY_DELAY", &self.retry_delay.to_string());
        if let Some(ref p) = self.prompt_file {
            file.set("PROMPT_FILE", p);
        }
        if let Some(ref p) = self.ollama_prompt_file {
            file.set("OLLAMA_PROMPT_FILE", p);
        }
        file.save()
    }

    /// Model menu for one provider
    pub fn models_for_provider(&self, provider: &str) -> Vec<String> {
        let raw = match provider {
            "openai" => &self.openai_models,
            "deepseek" => &self.deepseek_models,
            "ollama" => &self.ollama_models,
            _ => return Vec::new(),
        };
        parse_models(raw)
    }

    /// Model menus for every provider
    pub fn all_models(&self) -> HashMap<String, Vec<String>> {
        let mut map = HashMap::new();
        map.insert("openai".to_string(), parse_models(&self.openai_models));
        map.insert("deepseek".to_string(), parse_models(&self.deepseek_models));
        map.insert("ollama".to_string(), parse_models(&self.ollama_models));
        map
    }
}

/// Partial settings patch accepted by the configuration endpoint
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ConfigUpdate {
    pub chunk_size: Option<usize>,
    pub chunk_overlap: Option<usize>,
    pub ollama_chunk_size: Option<usize>,
    pub ollama_chunk_overlap: Option<usize>,
    pub fast_provider_max_chars: Option<usize>,
    pub max_retries: Option<u32>,
    pub retry_delay: Option<f64>,
    pub default_provider: Option<String>,
    pub default_model: Option<String>,
    pub openai_models: Option<String>,
    pub deepseek_models: Option<String>,
    pub ollama_models: Option<String>,
    pub ollama_pre_correct: Option<bool>,
}

impl ConfigUpdate {
    /// Whether the patch carries at least one field
    pub fn is_empty(&self) -> bool {
        self.chunk_size.is_none()
            && self.chunk_overlap.is_none()
            && self.ollama_chunk_size.is_none()
            && self.ollama_chunk_overlap.is_none()
            && self.fast_provider_max_chars.is_none()
            && self.max_retries.is_none()
            && self.retry_delay.is_none()
            && self.default_provider.is_none()
            && self.default_model.is_none()
            && self.openai_models.is_none()
            && self.deepseek_models.is_none()
            && self.ollama_models.is_none()
            && self.ollama_pre_correct.is_none()
    }
}

/// Line-oriented `KEY=VALUE` dotfile with comment-preserving rewrites
#[derive(Debug, Clone)]
pub struct EnvFile {
    path: PathBuf,
    lines: Vec<EnvLine>,
}

#[derive(Debug, Clone)]
enum EnvLine {
    /// Comment or blank line, stored verbatim
    Verbatim(String),
    Pair { key: String, value: String },
}

impl EnvFile {
    /// Load a dotfile; a missing file yields an empty document
    pub fn load(path: &Path) -> Result<Self> {
        let lines = match std::fs::read_to_string(path) {
            Ok(content) => content.lines().map(parse_env_line).collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path: path.to_path_buf(),
            lines,
        })
    }

    /// Look up a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().rev().find_map(|line| match line {
            EnvLine::Pair { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Set a key, updating the existing line in place or appending one
    pub fn set(&mut self, key: &str, value: &str) {
        for line in &mut self.lines {
            if let EnvLine::Pair { key: k, value: v } = line {
                if k == key {
                    *v = value.to_string();
                    return;
                }
            }
        }
        self.lines.push(EnvLine::Pair {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    /// Write the document back to its path
    pub fn save(&self) -> Result<()> {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                EnvLine::Verbatim(raw) => out.push_str(raw),
                EnvLine::Pair { key, value } => {
                    out.push_str(key);
                    out.push('=');
                    out.push_str(value);
                }
            }
            out.push('\n');
        }
        std::fs::write(&self.path, out)?;
        Ok(())
    }
}

fn parse_env_line(raw: &str) -> EnvLine {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return EnvLine::Verbatim(raw.to_string());
    }
    match raw.split_once('=') {
        Some((key, value)) => EnvLine::Pair {
            key: key.trim().to_string(),
            value: value.trim().to_string(),
        },
        None => EnvLine::Verbatim(raw.to_string()),
    }
}

fn parse_models(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_into<T, F>(lookup: &F, key: &str, slot: &mut T)
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse() {
            Ok(v) => *slot = v,
            Err(_) => warn!("Ignoring invalid value for {}: {:?}", key, raw),
        }
    }
}
