//! Generated test scenario models

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single test scenario generated for one endpoint.
///
/// `input_json` must conform to the target endpoint's request schema; it is
/// either one payload object or an ordered sequence of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub path: String,
    pub method: String,
    #[serde(default)]
    pub input_json: Option<Value>,
    #[serde(default)]
    pub expected_output_prompt: Option<String>,
    #[serde(default)]
    pub expected_output_json: Option<Value>,
    #[serde(default)]
    pub preconditions: Option<String>,
}

/// A group of related test cases for one user or service persona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseFamily {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub test_case_type: String,
    #[serde(default)]
    pub test_variations: Vec<String>,
}
