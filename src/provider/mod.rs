//! LLM provider abstraction
//!
//! The pipeline stages talk to language models through the [`Provider`]
//! trait so the orchestrator never knows which backend is in use:
//!
//! - [`OpenAIProvider`] - Chat Completions API (`OPENAI_API_KEY`)
//! - [`MockProvider`] - configurable responses for tests
//!
//! Use [`create_provider`] to instantiate one by name.

mod mock;
mod openai;

pub use mock::MockProvider;
pub use openai::OpenAIProvider;

use anyhow::Result;
use async_trait::async_trait;

/// Average characters per token for mixed prose/JSON content
const CHARS_PER_TOKEN: f32 = 3.0;

// ============================================================================
// PROVIDER TRAIT
// ============================================================================

/// Core trait that all LLM providers must implement.
///
/// All methods are async to support HTTP-based API backends.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name (e.g. "openai", "mock")
    fn name(&self) -> &str;

    /// Execute a prompt and return the response
    async fn execute(&self, request: PromptRequest) -> Result<PromptResponse>;

    /// Whether this provider is usable (API key set, etc.)
    fn is_available(&self) -> bool {
        true
    }
}

// ============================================================================
// REQUEST/RESPONSE TYPES
// ============================================================================

/// Request to execute a prompt
#[derive(Debug, Clone)]
pub struct PromptRequest {
    /// The user prompt to execute
    pub prompt: String,
    /// Optional system prompt setting the stage's role
    pub system_prompt: Option<String>,
    /// Model to use (e.g. "gpt-4o-mini")
    pub model: String,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Sampling temperature (0.0 - 1.0)
    pub temperature: Option<f32>,
}

impl PromptRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            system_prompt: None,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// Response from a prompt execution
#[derive(Debug, Clone)]
pub struct PromptResponse {
    /// The generated content
    pub content: String,
    /// Whether the execution was successful
    pub success: bool,
    /// Token usage statistics
    pub usage: TokenUsage,
    /// Stop reason reported by the backend
    pub stop_reason: Option<String>,
}

impl PromptResponse {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            success: true,
            usage: TokenUsage::default(),
            stop_reason: Some("end_turn".to_string()),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            content: error.into(),
            success: false,
            usage: TokenUsage::default(),
            stop_reason: Some("error".to_string()),
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt: u32, completion: u32) -> Self {
        Self {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: prompt + completion,
        }
    }

    /// Estimate usage from text lengths when the backend reports none
    pub fn estimate(prompt_len: usize, response_len: usize) -> Self {
        let prompt_tokens = (prompt_len as f32 / CHARS_PER_TOKEN).ceil() as u32;
        let completion_tokens = (response_len as f32 / CHARS_PER_TOKEN).ceil() as u32;
        Self::new(prompt_tokens, completion_tokens)
    }
}

// ============================================================================
// PROVIDER FACTORY
// ============================================================================

/// Create a provider instance by name.
///
/// | Name | Requires |
/// |------|----------|
/// | `openai` | `OPENAI_API_KEY` env var |
/// | `mock` | Nothing |
pub fn create_provider(name: &str) -> Result<Box<dyn Provider>> {
    match name.to_lowercase().as_str() {
        "openai" => Ok(Box::new(OpenAIProvider::new()?)),
        "mock" => Ok(Box::new(MockProvider::new())),
        _ => anyhow::bail!("Unknown provider: '{}'. Available: openai, mock", name),
    }
}

// ============================================================================
// TESTS
// ============================================================================
