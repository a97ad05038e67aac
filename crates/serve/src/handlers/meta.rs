//! Provider, model, prompt and configuration endpoints

use crate::error::{bad_request, ApiError};
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use textproof_core::prompt::CUSTOM_PROMPT_PATH;
use textproof_core::{ConfigUpdate, EnvFile, ProviderKind, Settings};
use tracing::info;

/// Query of `GET /api/models`
#[derive(Debug, Deserialize)]
pub struct ModelsQuery {
    pub provider: Option<String>,
}

/// Query of `GET /api/prompt`
#[derive(Debug, Deserialize)]
pub struct PromptQuery {
    #[serde(default)]
    pub reload: bool,
}

/// Body of `POST /api/prompt`
#[derive(Debug, Deserialize)]
pub struct PromptUpdateRequest {
    pub prompt: Option<String>,
    #[serde(default)]
    pub persist: bool,
}

/// Body of `POST /api/config`
#[derive(Debug, Deserialize)]
pub struct ConfigUpdateRequest {
    #[serde(flatten)]
    pub update: ConfigUpdate,
    #[serde(default)]
    pub persist: bool,
}

/// Configuration echo returned by the config endpoints
#[derive(Debug, Serialize)]
pub struct ConfigView {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub ollama_chunk_size: usize,
    pub ollama_chunk_overlap: usize,
    pub fast_provider_max_chars: usize,
    pub max_retries: u32,
    pub retry_delay: f64,
    pub default_provider: String,
    pub default_model: String,
    pub openai_models: String,
    pub deepseek_models: String,
    pub ollama_models: String,
    pub ollama_pre_correct: bool,
}

impl ConfigView {
    fn from_settings(settings: &Settings) -> Self {
        Self {
            chunk_size: settings.chunk_size,
            chunk_overlap: settings.chunk_overlap,
            ollama_chunk_size: settings.ollama_chunk_size,
            ollama_chunk_overlap: settings.ollama_chunk_overlap,
            fast_provider_max_chars: settings.fast_provider_max_chars,
            max_retries: settings.max_retries,
            retry_delay: settings.retry_delay,
            default_provider: settings.default_provider.clone(),
            default_model: settings.default_model_name.clone(),
            openai_models: settings.openai_models.clone(),
            deepseek_models: settings.deepseek_models.clone(),
            ollama_models: settings.ollama_models.clone(),
            ollama_pre_correct: settings.ollama_pre_correct,
        }
    }
}

/// List the supported providers and the configured default
pub async fn get_providers(State(state): State<AppState>) -> Json<Value> {
    let providers: Vec<&str> = ProviderKind::ALL.iter().map(|p| p.as_str()).collect();
    Json(json!({
        "providers": providers,
        "default": state.settings.read().default_provider,
    }))
}

/// Model menus, for one provider or all of them
pub async fn get_models(
    State(state): State<AppState>,
    Query(query): Query<ModelsQuery>,
) -> Json<Value> {
    let settings = state.settings.read();
    match query.provider {
        Some(provider) => {
            let default = (provider == settings.default_provider)
                .then(|| settings.default_model_name.clone());
            Json(json!({
                "provider": provider,
                "models": settings.models_for_provider(&provider),
                "default": default,
            }))
        }
        None => Json(json!({
            "models": settings.all_models(),
            "default_provider": settings.default_provider,
            "default_model": settings.default_model_name,
        })),
    }
}

/// Current correction prompt
pub async fn get_prompt(
    State(state): State<AppState>,
    Query(query): Query<PromptQuery>,
) -> Json<Value> {
    let prompt = if query.reload {
        state.prompts.reload()
    } else {
        state.prompts.get(textproof_core::PromptKind::General)
    };
    Json(json!({
        "prompt": prompt,
        "is_custom": state.prompts.is_custom(),
        "prompt_file": state.prompts.prompt_file(),
    }))
}

/// Replace the correction prompt, optionally persisting it
pub async fn update_prompt(
    State(state): State<AppState>,
    Json(request): Json<PromptUpdateRequest>,
) -> Result<Json<Value>, ApiError> {
    let Some(prompt) = request.prompt else {
        return Err(bad_request("缺少prompt字段"));
    };

    state.prompts.set(prompt);

    let mut message = "Prompt已更新并立即生效（重启后恢复为配置文件中的Prompt）".to_string();
    let mut prompt_file = None;

    if request.persist {
        match persist_prompt(&state) {
            Ok(path) => {
                prompt_file = Some(path);
                message =
                    "Prompt已更新并立即生效，已保存到文件并更新.env配置（重启后也会生效）"
                        .to_string();
            }
            Err(e) => {
                message = format!("Prompt已更新并立即生效，但保存文件失败: {}", e);
            }
        }
    }

    Ok(Json(json!({
        "message": message,
        "prompt": state.prompts.get(textproof_core::PromptKind::General),
        "persisted": request.persist,
        "prompt_file": prompt_file,
    })))
}

fn persist_prompt(state: &AppState) -> textproof_core::Result<String> {
    let path = state.prompts.save_to_default_file()?;

    let mut env = EnvFile::load(&state.env_file)?;
    env.set("PROMPT_FILE", CUSTOM_PROMPT_PATH);
    env.save()?;
    state.settings.write().prompt_file = Some(CUSTOM_PROMPT_PATH.to_string());

    Ok(path)
}

/// Current configuration
pub async fn get_config(State(state): State<AppState>) -> Json<ConfigView> {
    Json(ConfigView::from_settings(&state.settings.read()))
}

/// Apply a configuration update, optionally persisting it to the dotfile
pub async fn update_config(
    State(state): State<AppState>,
    Json(request): Json<ConfigUpdateRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.update.is_empty() {
        return Err(bad_request("没有提供要更新的配置项"));
    }

    state
        .settings
        .write()
        .update_runtime_config(&request.update)?;
    // Cached engines were built from the old values
    state.clear_engines();
    info!("runtime configuration updated");

    let message = if request.persist {
        match state.settings.read().save_to_env_file(&state.env_file) {
            Ok(()) => "配置已更新并立即生效，同时已保存到.env文件（重启后也会生效）",
            Err(e) => {
                tracing::warn!("cannot persist configuration: {}", e);
                "配置已更新并立即生效，但保存到.env文件失败，请检查文件权限"
            }
        }
    } else {
        "配置已更新并立即生效（重启后恢复为.env文件中的值）"
    };

    Ok(Json(json!({
        "message": message,
        "persisted": request.persist,
        "config": ConfigView::from_settings(&state.settings.read()),
    })))
}
