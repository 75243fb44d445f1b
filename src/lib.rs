//! Quiver - AI-driven API test case generation
//!
//! Acquires an OpenAPI/Swagger specification, extracts endpoint records,
//! fans them through a staged LLM agent pipeline (personas → test case
//! families → test cases), and can execute the generated cases against a
//! predictive model.

pub mod agent;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod prompts;
pub mod provider;
pub mod spec;
pub mod testcase;

pub use agent::{AgentStage, LlmAgent};
pub use error::{FixSuggestion, QuiverError};
pub use executor::{Executor, Predictable, Prediction};
pub use orchestrator::{FailedTask, Orchestrator, ResultsTree, Stage, StageResult, StageStatus};
pub use spec::{Endpoint, SchemaSource, SpecAcquirer, SpecExtractor, SpecScraper};
pub use testcase::{TestCase, TestCaseFamily};
