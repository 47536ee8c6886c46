// SPDX-License-Identifier: MIT

//! Backend configuration, read once at startup

use std::str::FromStr;
use std::sync::Arc;

use crate::adk::error::{Result, StepwiseError};
use crate::adk::model::openai::ChatCompletionsModel;
use crate::adk::model::responses::ResponsesModel;
use crate::adk::model::Model;
use crate::stepwise::workflow::graph::DEFAULT_STEP_LIMIT;

pub const ENV_BASE_URL: &str = "LLAMA_STACK_SERVER_OPENAI";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_MODEL: &str = "INFERENCE_MODEL";
pub const ENV_API: &str = "INFERENCE_API";
pub const ENV_STEP_LIMIT: &str = "WORKFLOW_STEP_LIMIT";

/// Sent when the backend does not check keys
pub const DEFAULT_API_KEY: &str = "not applicable";

/// Local Llama Stack defaults used by the birthdate demo
pub const LOCAL_BASE_URL: &str = "http://localhost:8321/v1/openai/v1";
pub const LOCAL_MODEL: &str = "ollama/llama3.2:3b-instruct-fp16";

/// Wire protocol spoken to the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendApi {
    /// `POST /responses`, supports built-in tools and MCP servers
    #[default]
    Responses,
    /// `POST /chat/completions`, local tools only
    Chat,
}

impl FromStr for BackendApi {
    type Err = StepwiseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "responses" => Ok(BackendApi::Responses),
            "chat" | "chat_completions" => Ok(BackendApi::Chat),
            other => Err(StepwiseError::config(format!(
                "{} must be 'responses' or 'chat', got '{}'",
                ENV_API, other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub api: BackendApi,
    pub step_limit: usize,
}

impl BackendConfig {
    /// Read the process environment; base URL and model are required
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), None)
    }

    /// Read the process environment, falling back to the given base URL and model
    pub fn from_env_or(base_url: &str, model: &str) -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), Some((base_url, model)))
    }

    /// Build from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F, defaults: Option<(&str, &str)>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = get(ENV_BASE_URL)
            .or_else(|| defaults.map(|(url, _)| url.to_string()))
            .ok_or_else(|| StepwiseError::config(format!("{} must be set", ENV_BASE_URL)))?;
        let model = get(ENV_MODEL)
            .or_else(|| defaults.map(|(_, model)| model.to_string()))
            .ok_or_else(|| StepwiseError::config(format!("{} must be set", ENV_MODEL)))?;
        let api_key = get(ENV_API_KEY).unwrap_or_else(|| DEFAULT_API_KEY.to_string());

        let api = match get(ENV_API) {
            Some(value) => value.parse()?,
            None => BackendApi::default(),
        };

        let step_limit = match get(ENV_STEP_LIMIT) {
            Some(value) => match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(StepwiseError::config(format!(
                        "{} must be a positive integer, got '{}'",
                        ENV_STEP_LIMIT, value
                    )))
                }
            },
            None => DEFAULT_STEP_LIMIT,
        };

        Ok(Self {
            base_url,
            api_key,
            model,
            api,
            step_limit,
        })
    }

    /// Instantiate the configured backend
    pub fn build_model(&self) -> Arc<dyn Model> {
        log::info!(
            "Connecting to {} model {} ({:?} API)",
            self.base_url,
            self.model,
            self.api
        );
        match self.api {
            BackendApi::Responses => Arc::new(ResponsesModel::new(
                self.base_url.clone(),
                self.api_key.clone(),
                self.model.clone(),
            )),
            BackendApi::Chat => Arc::new(ChatCompletionsModel::new(
                self.base_url.clone(),
                self.api_key.clone(),
                self.model.clone(),
            )),
        }
    }
}
