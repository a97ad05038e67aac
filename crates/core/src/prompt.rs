//! Prompt catalog for the correction providers
//!
//! Two templates are kept: a general one for the large-context cloud
//! providers and a terser one for local Ollama models, which follow long
//! instructions poorly. Both can be overridden from files at startup and
//! replaced at runtime; the general prompt can be persisted back to the
//! conventional `prompts/custom_prompt.txt` path.

use crate::config::Settings;
use crate::error::Result;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Built-in general correction prompt
pub const DEFAULT_PROMPT: &str = "你是一名专业的文本校对员。你的任务是纠正文本中的错误，但必须严格遵守以下规则：

【核心原则】
1. 只纠正错误，不改变原文意思和风格
2. 只修正：错别字、病句、拼音或谐音转简体中文、明显错误的标点符号
3. 禁止任何文风、语气、措辞层面的优化
4. 禁止添加、删除或改写内容
5. 如果原文没有明显错误，必须保持完全不变

【具体规则】
- 错别字：将错误的字词替换为正确的（如\"的\"误用为\"地\"）
- 病句：修正语法错误，但保持原意不变
- 拼音转中文：将拼音或谐音字转换为正确的简体中文
- 标点错误：修正明显错误的标点符号（如句号误用为逗号）
- 保持原意：任何修改都不能改变原文要表达的意思
- 保持风格：保持原文的语言风格和表达方式

【输出要求】
直接输出校对后的文本，不要添加任何说明、注释或标记。如果原文没有错误，直接原样输出。

现在请校对以下文本：";

/// Built-in Ollama correction prompt, kept short for small local models
pub const DEFAULT_OLLAMA_PROMPT: &str = "你是中文校对员。只改正错别字、明显病句和错误标点，不改写、不增删、不解释。没有错误就原样输出。只输出校对后的文本本身。";

/// Conventional path the persisted custom prompt is written to
pub const CUSTOM_PROMPT_PATH: &str = "./prompts/custom_prompt.txt";

/// Which template a caller wants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// General template for OpenAI-compatible providers
    General,
    /// Ollama-specific template
    Ollama,
}

/// Process-wide prompt catalog
pub struct PromptManager {
    general: RwLock<String>,
    ollama: RwLock<String>,
    general_file: RwLock<Option<PathBuf>>,
    ollama_file: Option<PathBuf>,
}

impl PromptManager {
    /// Build a catalog from the configured override paths
    pub fn from_settings(settings: &Settings) -> Self {
        let general_file = settings.prompt_file.as_ref().map(PathBuf::from);
        let ollama_file = settings.ollama_prompt_file.as_ref().map(PathBuf::from);

        let general = load_or_default(general_file.as_deref(), DEFAULT_PROMPT);
        let ollama = load_or_default(ollama_file.as_deref(), DEFAULT_OLLAMA_PROMPT);

        Self {
            general: RwLock::new(general),
            ollama: RwLock::new(ollama),
            general_file: RwLock::new(general_file),
            ollama_file,
        }
    }

    /// Current prompt for a template kind
    pub fn get(&self, kind: PromptKind) -> String {
        match kind {
            PromptKind::General => self.general.read().clone(),
            PromptKind::Ollama => self.ollama.read().clone(),
        }
    }

    /// Replace the general prompt at runtime
    pub fn set(&self, prompt: String) {
        *self.general.write() = prompt;
    }

    /// Re-read the general prompt from its configured file, if any.
    /// Falls back to the built-in default when no file is configured.
    pub fn reload(&self) -> String {
        let fresh = load_or_default(self.general_file.read().as_deref(), DEFAULT_PROMPT);
        *self.general.write() = fresh.clone();
        fresh
    }

    /// Whether the general prompt is backed by a file override
    pub fn is_custom(&self) -> bool {
        self.general_file.read().is_some()
    }

    /// Configured general prompt file path, if any
    pub fn prompt_file(&self) -> Option<String> {
        self.general_file
            .read()
            .as_ref()
            .map(|p| p.display().to_string())
    }

    /// Persist the general prompt to the conventional custom-prompt path.
    ///
    /// Returns the path written. The catalog switches to the persisted file
    /// so later reloads pick it up.
    pub fn save_to_default_file(&self) -> Result<String> {
        let path = PathBuf::from(CUSTOM_PROMPT_PATH);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, self.general.read().as_str())?;
        *self.general_file.write() = Some(path.clone());
        Ok(path.display().to_string())
    }
}

fn load_or_default(path: Option<&Path>, fallback: &str) -> String {
    match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                warn!("Cannot read prompt file {}: {}, using default", p.display(), e);
                fallback.to_string()
            }
        },
        None => fallback.to_string(),
    }
}
