//! Mock provider for testing
//!
//! Returns configurable responses without making real API calls, and can
//! simulate backend failures for pipeline failure-isolation tests.

use super::{PromptRequest, PromptResponse, Provider, TokenUsage};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// One scripted mock outcome
#[derive(Debug, Clone)]
enum MockOutcome {
    Respond(String),
    Fail(String),
}

/// Mock provider that returns predefined responses (FIFO)
pub struct MockProvider {
    outcomes: Arc<Mutex<Vec<MockOutcome>>>,
    /// Default response when the queue is empty
    default_response: String,
    /// Track all requests made (for assertions)
    requests: Arc<Mutex<Vec<PromptRequest>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(vec![])),
            default_response: "Mock response".to_string(),
            requests: Arc::new(Mutex::new(vec![])),
        }
    }

    /// Create with a queue of successful responses
    pub fn with_responses(responses: Vec<String>) -> Self {
        let provider = Self::new();
        {
            let mut queue = provider.outcomes.lock().unwrap();
            *queue = responses.into_iter().map(MockOutcome::Respond).collect();
        }
        provider
    }

    /// Set the default response used when the queue is empty
    pub fn with_default(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: impl Into<String>) {
        self.outcomes
            .lock()
            .unwrap()
            .push(MockOutcome::Respond(response.into()));
    }

    /// Queue a simulated backend failure
    pub fn queue_failure(&self, error: impl Into<String>) {
        self.outcomes
            .lock()
            .unwrap()
            .push(MockOutcome::Fail(error.into()));
    }

    /// All requests made to this provider
    pub fn get_requests(&self) -> Vec<PromptRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The most recent request
    pub fn last_request(&self) -> Option<PromptRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, request: PromptRequest) -> Result<PromptResponse> {
        self.requests.lock().unwrap().push(request.clone());

        let outcome = {
            let mut queue = self.outcomes.lock().unwrap();
            if queue.is_empty() {
                MockOutcome::Respond(self.default_response.clone())
            } else {
                queue.remove(0)
            }
        };

        match outcome {
            MockOutcome::Respond(text) => {
                let usage = TokenUsage::estimate(request.prompt.len(), text.len());
                Ok(PromptResponse::success(text).with_usage(usage))
            }
            MockOutcome::Fail(error) => anyhow::bail!("{error}"),
        }
    }
}
