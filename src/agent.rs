//! Pipeline stage agents
//!
//! An [`AgentStage`] is one step of the generation pipeline: it takes a
//! prompt string and produces a structured payload (a single item or a list)
//! that the orchestrator fans out to the next stage. [`LlmAgent`] backs a
//! stage with an LLM [`Provider`] and a fixed system prompt.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::provider::{PromptRequest, Provider};

/// One step of the agent pipeline.
///
/// From the orchestrator's perspective the stage is synchronous: prompt in,
/// payload out. Suspension on network I/O happens under the hood.
#[async_trait]
pub trait AgentStage: Send + Sync {
    /// Stage name, used as the key of the results tree
    fn name(&self) -> &str;

    /// Run one invocation, returning the stage's data payload
    async fn run(&self, prompt: &str) -> anyhow::Result<Value>;
}

/// An LLM-backed stage: provider + model + system prompt.
pub struct LlmAgent {
    name: String,
    system_prompt: String,
    model: String,
    provider: Arc<dyn Provider>,
}

impl LlmAgent {
    pub fn new(
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            model: model.into(),
            provider,
        }
    }
}

#[async_trait]
impl AgentStage for LlmAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, prompt: &str) -> anyhow::Result<Value> {
        let request = PromptRequest::new(prompt, self.model.clone())
            .with_system_prompt(self.system_prompt.clone());

        let response = self.provider.execute(request).await?;
        if !response.success {
            anyhow::bail!("{}", response.content);
        }

        debug!(
            stage = %self.name,
            tokens = response.usage.total_tokens,
            "Stage response received"
        );
        Ok(parse_payload(&response.content))
    }
}

/// Parse a model response into a payload value.
///
/// Models frequently wrap JSON in markdown code fences; those are stripped
/// before parsing. Content that is not JSON becomes a plain string payload.
pub fn parse_payload(content: &str) -> Value {
    let stripped = strip_code_fences(content.trim());
    match serde_json::from_str(stripped) {
        Ok(value) => value,
        Err(_) => Value::String(stripped.to_string()),
    }
}

fn strip_code_fences(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json", "yaml", ...) on the opening fence line
    let body = match rest.split_once('\n') {
        Some((_info, body)) => body,
        None => rest,
    };
    body.rsplit_once("```").map(|(inner, _)| inner).unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockProvider;
    use serde_json::json;

    #[test]
    fn parses_plain_json_payload() {
        assert_eq!(parse_payload(r#"[1, 2, 3]"#), json!([1, 2, 3]));
        assert_eq!(parse_payload(r#"{"a": 1}"#), json!({"a": 1}));
    }

    #[test]
    fn parses_fenced_json_payload() {
        let content = "```json\n[{\"persona\": \"analyst\"}]\n```";
        assert_eq!(parse_payload(content), json!([{"persona": "analyst"}]));
    }

    #[test]
    fn non_json_content_becomes_string() {
        assert_eq!(
            parse_payload("no structured output"),
            Value::String("no structured output".to_string())
        );
    }

    #[tokio::test]
    async fn llm_agent_runs_provider_with_system_prompt() {
        let provider = Arc::new(MockProvider::with_responses(vec!["[1, 2]".to_string()]));
        let agent = LlmAgent::new(
            "persona_agent",
            "You are a strategic analyst",
            provider.clone(),
            "gpt-4o-mini",
        );

        let payload = agent.run("Generate personas for: /pets").await.unwrap();
        assert_eq!(payload, json!([1, 2]));

        let request = provider.last_request().unwrap();
        assert_eq!(
            request.system_prompt.as_deref(),
            Some("You are a strategic analyst")
        );
        assert!(request.prompt.contains("/pets"));
    }

    #[tokio::test]
    async fn llm_agent_propagates_provider_failure() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_failure("rate limited");
        let agent = LlmAgent::new("persona_agent", "sys", provider, "gpt-4o-mini");

        let err = agent.run("prompt").await.unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }
}
