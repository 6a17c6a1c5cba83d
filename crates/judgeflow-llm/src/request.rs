use judgeflow_config::LlmConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    Json,
}

/// Model family prefixes that reject `temperature`/`top_p` and instead take
/// `reasoning_effort`/`verbosity` (§4.8, GLOSSARY "Reasoning model").
const REASONING_MODEL_PREFIXES: &[&str] = &["o1", "o3", "o4", "gpt-5"];

pub fn is_reasoning_model(model: &str) -> bool {
    REASONING_MODEL_PREFIXES.iter().any(|prefix| model.starts_with(prefix))
}

/// §6's wire shape: `{model, messages[], temperature?, top_p?,
/// response_format?, reasoning?, verbosity?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub response_format: Option<ResponseFormat>,
    pub reasoning_effort: Option<String>,
    pub verbosity: Option<String>,
}

impl CompletionRequest {
    /// Builds a request with the deterministic sampling policy from
    /// §4.8: `temperature = 0.0, top_p = 1.0` for ordinary chat models, or
    /// `reasoning_effort`/`verbosity` in place of sampling params for
    /// reasoning-family models.
    pub fn deterministic(model: impl Into<String>, messages: Vec<ChatMessage>, response_format: Option<ResponseFormat>, config: &LlmConfig) -> Self {
        let model = model.into();
        if is_reasoning_model(&model) {
            Self {
                model,
                messages,
                temperature: None,
                top_p: None,
                response_format,
                reasoning_effort: Some(config.reasoning_effort.clone()),
                verbosity: Some(config.verbosity.clone()),
            }
        } else {
            Self {
                model,
                messages,
                temperature: Some(0.0),
                top_p: Some(1.0),
                response_format,
                reasoning_effort: None,
                verbosity: None,
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub text: String,
    pub finish_reason: String,
    pub usage: Usage,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LlmConfig {
        LlmConfig { model: "gpt-5".into(), temperature: 0.0, reasoning_effort: "high".into(), verbosity: "low".into(), timeout_seconds: 1800 }
    }

    #[test]
    fn ordinary_model_gets_temperature_zero_and_top_p_one() {
        let req = CompletionRequest::deterministic("gpt-4o", vec![], None, &config());
        assert_eq!(req.temperature, Some(0.0));
        assert_eq!(req.top_p, Some(1.0));
        assert!(req.reasoning_effort.is_none());
    }

    #[test]
    fn reasoning_model_omits_temperature_and_sets_effort_and_verbosity() {
        let req = CompletionRequest::deterministic("gpt-5", vec![], None, &config());
        assert!(req.temperature.is_none());
        assert!(req.top_p.is_none());
        assert_eq!(req.reasoning_effort.as_deref(), Some("high"));
        assert_eq!(req.verbosity.as_deref(), Some("low"));
    }

    #[test]
    fn o1_prefixed_model_is_detected_as_reasoning() {
        assert!(is_reasoning_model("o1-preview"));
        assert!(is_reasoning_model("o3-mini"));
        assert!(!is_reasoning_model("claude-3-5-sonnet"));
    }
}
