//! Test case execution against a predictive model
//!
//! Maps a test case's `input_json` fields onto a single-row numeric matrix
//! (field iteration order) and dispatches to the model's point or
//! probability prediction method.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::QuiverError;
use crate::orchestrator::{ResultsTree, StageStatus};
use crate::testcase::TestCase;

/// Capability set a predictive model must expose.
///
/// Both methods take a 2-D numeric matrix (rows of features) and return
/// prediction rows.
pub trait Predictable {
    fn predict(&self, inputs: &[Vec<f64>]) -> Result<Vec<f64>, QuiverError>;
    fn predict_proba(&self, inputs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, QuiverError>;
}

/// Output of one test case execution.
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    Point(Vec<f64>),
    Probabilities(Vec<Vec<f64>>),
}

/// Executes generated test cases against a [`Predictable`] model.
#[derive(Debug, Default)]
pub struct Executor;

impl Executor {
    pub fn new() -> Self {
        Self
    }

    /// Execute a single test case.
    ///
    /// `input_json` must be an object; its values are taken in iteration
    /// order and reshaped into a single-row matrix.
    pub fn execute(
        &self,
        case: &TestCase,
        model: &dyn Predictable,
        want_probabilities: bool,
    ) -> Result<Prediction, QuiverError> {
        let row = input_row(case)?;
        if want_probabilities {
            model.predict_proba(&[row]).map(Prediction::Probabilities)
        } else {
            model.predict(&[row]).map(Prediction::Point)
        }
    }

    /// Execute a list of test cases, keyed by stringified `input_json`.
    ///
    /// Test cases with identical inputs silently overwrite earlier entries;
    /// cases that cannot be executed are skipped with a warning.
    pub fn execute_all(
        &self,
        cases: &[TestCase],
        model: &dyn Predictable,
        want_probabilities: bool,
    ) -> HashMap<String, Prediction> {
        let mut output = HashMap::new();
        for case in cases {
            match self.execute(case, model, want_probabilities) {
                Ok(prediction) => {
                    output.insert(input_key(case), prediction);
                }
                Err(err) => warn!(case = %case.name, error = %err, "Skipping unexecutable test case"),
            }
        }
        output
    }

    /// Execute every test case found in an orchestrator results tree.
    ///
    /// Completed payloads are deserialized as test cases (single or list);
    /// payloads from earlier stages that are not test cases are skipped.
    pub fn execute_tree(
        &self,
        results: &ResultsTree,
        model: &dyn Predictable,
        want_probabilities: bool,
    ) -> HashMap<String, Prediction> {
        let mut output = HashMap::new();
        for (stage, tasks) in results {
            for result in tasks.values() {
                if result.status != StageStatus::Completed {
                    continue;
                }
                let Some(data) = &result.data else { continue };
                let cases = deserialize_cases(data);
                if cases.is_empty() {
                    debug!(stage = %stage, "Payload holds no test cases");
                    continue;
                }
                output.extend(self.execute_all(&cases, model, want_probabilities));
            }
        }
        output
    }
}

/// Deserialize a stage payload as test cases, tolerating single objects
/// and non-test-case payloads (which yield an empty vec).
fn deserialize_cases(data: &Value) -> Vec<TestCase> {
    match data {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        single => serde_json::from_value(single.clone()).into_iter().collect(),
    }
}

fn input_key(case: &TestCase) -> String {
    case.input_json
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_default()
}

/// Project `input_json` onto a numeric feature row, in field iteration order.
fn input_row(case: &TestCase) -> Result<Vec<f64>, QuiverError> {
    let Some(Value::Object(fields)) = &case.input_json else {
        return Err(QuiverError::MalformedInput {
            name: case.name.clone(),
        });
    };

    let mut row = Vec::with_capacity(fields.len());
    for (field, value) in fields {
        let numeric = match value {
            Value::Number(n) => n.as_f64(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        };
        match numeric {
            Some(x) => row.push(x),
            None => {
                return Err(QuiverError::NonNumericInput {
                    name: case.name.clone(),
                    field: field.clone(),
                })
            }
        }
    }
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::StageResult;
    use serde_json::json;

    /// Sums the feature row; probabilities split the unit interval.
    struct SumModel;

    impl Predictable for SumModel {
        fn predict(&self, inputs: &[Vec<f64>]) -> Result<Vec<f64>, QuiverError> {
            Ok(inputs.iter().map(|row| row.iter().sum()).collect())
        }

        fn predict_proba(&self, inputs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, QuiverError> {
            Ok(inputs.iter().map(|_| vec![0.25, 0.75]).collect())
        }
    }

    fn case(name: &str, input: Value) -> TestCase {
        TestCase {
            name: name.to_string(),
            description: String::new(),
            path: "/predict".to_string(),
            method: "POST".to_string(),
            input_json: Some(input),
            expected_output_prompt: None,
            expected_output_json: None,
            preconditions: None,
        }
    }

    #[test]
    fn executes_point_prediction_in_field_order() {
        let executor = Executor::new();
        let case = case("sum", json!({"followers": 10, "following": 2.5, "verified": true}));

        let prediction = executor.execute(&case, &SumModel, false).unwrap();
        assert_eq!(prediction, Prediction::Point(vec![13.5]));
    }

    #[test]
    fn executes_probability_prediction() {
        let executor = Executor::new();
        let case = case("proba", json!({"x": 1}));

        let prediction = executor.execute(&case, &SumModel, true).unwrap();
        assert_eq!(prediction, Prediction::Probabilities(vec![vec![0.25, 0.75]]));
    }

    #[test]
    fn non_numeric_field_is_an_error() {
        let executor = Executor::new();
        let case = case("bad", json!({"text": "hello"}));

        let err = executor.execute(&case, &SumModel, false).unwrap_err();
        match err {
            QuiverError::NonNumericInput { field, .. } => assert_eq!(field, "text"),
            other => panic!("expected NonNumericInput, got {other:?}"),
        }
    }

    #[test]
    fn list_shaped_input_is_malformed() {
        let executor = Executor::new();
        let case = case("listy", json!([{"x": 1}]));
        assert!(matches!(
            executor.execute(&case, &SumModel, false),
            Err(QuiverError::MalformedInput { .. })
        ));
    }

    #[test]
    fn batch_keys_by_input_and_overwrites_collisions() {
        let executor = Executor::new();
        let cases = vec![
            case("first", json!({"x": 1})),
            case("dup", json!({"x": 1})),
            case("other", json!({"x": 2})),
            case("skipped", json!("not an object")),
        ];

        let output = executor.execute_all(&cases, &SumModel, false);
        assert_eq!(output.len(), 2);
        assert_eq!(output[r#"{"x":1}"#], Prediction::Point(vec![1.0]));
        assert_eq!(output[r#"{"x":2}"#], Prediction::Point(vec![2.0]));
    }

    #[test]
    fn executes_cases_from_results_tree() {
        let mut tree = ResultsTree::new();
        let mut tasks = std::collections::BTreeMap::new();
        tasks.insert(
            "families_level_2_task_0_subtask_0".to_string(),
            StageResult::completed(json!([
                {"name": "a", "path": "/p", "method": "POST", "input_json": {"x": 3}},
                {"name": "b", "path": "/p", "method": "POST", "input_json": {"x": 4, "y": 1}}
            ])),
        );
        tasks.insert(
            "families_level_2_task_0_subtask_1".to_string(),
            StageResult::failed("provider outage"),
        );
        tree.insert("cases".to_string(), tasks);
        // Earlier stage payloads are not test cases and are skipped
        let mut persona_tasks = std::collections::BTreeMap::new();
        persona_tasks.insert(
            "personas_level_0_task_0".to_string(),
            StageResult::completed(json!([{"persona": "analyst"}])),
        );
        tree.insert("personas".to_string(), persona_tasks);

        let output = Executor::new().execute_tree(&tree, &SumModel, false);
        assert_eq!(output.len(), 2);
        assert_eq!(output[r#"{"x":3}"#], Prediction::Point(vec![3.0]));
        assert_eq!(output[r#"{"x":4,"y":1}"#], Prediction::Point(vec![5.0]));
    }
}
