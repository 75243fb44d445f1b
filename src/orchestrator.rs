//! Staged agent orchestration with fan-out
//!
//! Drives a sequence of [`AgentStage`]s: stage 0 runs once, and every stage
//! after it runs once per item produced by the level above, concurrently
//! within the level. Levels are separated by a strict barrier (level k+1
//! never starts before every task of level k has settled). Each invocation's
//! outcome lands in a results tree keyed by stage name and a task key that
//! encodes its upstream ancestry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::agent::AgentStage;
use crate::error::QuiverError;

// ============================================================================
// STAGE RESULTS
// ============================================================================

/// Lifecycle of one stage invocation: pending → running → terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// Outcome of one stage invocation.
///
/// `data` holds the stage payload (single item or list) once completed;
/// `msg` carries the error message once failed. A result transitions to a
/// terminal status exactly once and is then stored permanently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub status: StageStatus,
    pub data: Option<Value>,
    pub msg: Option<String>,
}

impl StageResult {
    pub fn pending() -> Self {
        Self {
            status: StageStatus::Pending,
            data: None,
            msg: None,
        }
    }

    pub fn running() -> Self {
        Self {
            status: StageStatus::Running,
            data: None,
            msg: None,
        }
    }

    pub fn completed(data: Value) -> Self {
        Self {
            status: StageStatus::Completed,
            data: Some(data),
            msg: None,
        }
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Failed,
            data: None,
            msg: Some(msg.into()),
        }
    }
}

/// Results tree: stage name → task key → result.
///
/// BTreeMap so exports are deterministic; sibling completion order within a
/// level is not.
pub type ResultsTree = BTreeMap<String, BTreeMap<String, StageResult>>;

/// One failed invocation, for aggregate reporting.
#[derive(Debug, Clone)]
pub struct FailedTask {
    pub stage: String,
    pub key: String,
    pub msg: String,
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

/// One configured pipeline stage: the agent plus its base prompt.
///
/// For fanned-out invocations the upstream item's string form is appended
/// to the base prompt.
pub struct Stage {
    pub agent: Arc<dyn AgentStage>,
    pub prompt: String,
}

impl Stage {
    pub fn new(agent: Arc<dyn AgentStage>, prompt: impl Into<String>) -> Self {
        Self {
            agent,
            prompt: prompt.into(),
        }
    }
}

/// Drives the stage pipeline and owns the results tree.
pub struct Orchestrator {
    stages: Vec<Stage>,
    results: ResultsTree,
}

impl Orchestrator {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self {
            stages,
            results: ResultsTree::new(),
        }
    }

    pub fn results(&self) -> &ResultsTree {
        &self.results
    }

    /// Execute the stage sequence, fanning out list outputs.
    ///
    /// Per-task failures are recorded in the tree and excluded from the next
    /// level's fan-out; they never abort siblings or the run. Cancellation is
    /// a caller-level timeout around this future.
    pub async fn run_parallel(&mut self) -> &ResultsTree {
        info!("Starting parallel execution of agents");

        let mut upstream: Option<Vec<(String, Value)>> = None;
        for level in 0..self.stages.len() {
            let completed = match upstream {
                None => self.run_root_stage().await,
                Some(pairs) => self.run_fanned_stage(level, pairs).await,
            };
            let expanded = expand_results(completed);
            info!(level, tasks = expanded.len(), "Level completed");
            upstream = Some(expanded);
        }

        info!("All levels completed");
        &self.results
    }

    /// Level 0: a single invocation with the stage's own prompt.
    async fn run_root_stage(&mut self) -> Vec<(String, Value)> {
        let stage_name = self.stages[0].agent.name().to_string();
        let key = format!("{stage_name}_level_0_task_0");

        self.record(&stage_name, &key, StageResult::running());
        info!(stage = %stage_name, "Executing first agent");

        let agent = Arc::clone(&self.stages[0].agent);
        let prompt = self.stages[0].prompt.clone();
        match agent.run(&prompt).await {
            Ok(data) => {
                let pair = ("task_0".to_string(), data.clone());
                self.record(&stage_name, &key, StageResult::completed(data));
                vec![pair]
            }
            Err(err) => {
                error!(stage = %stage_name, error = %err, "Error executing agent");
                self.record(&stage_name, &key, StageResult::failed(err.to_string()));
                Vec::new()
            }
        }
    }

    /// Level k>0: one concurrent invocation per upstream pair, collected
    /// behind a barrier before the next level may start.
    async fn run_fanned_stage(
        &mut self,
        level: usize,
        upstream: Vec<(String, Value)>,
    ) -> Vec<(String, Value)> {
        let stage_name = self.stages[level].agent.name().to_string();
        let previous_name = self.stages[level - 1].agent.name().to_string();
        info!(
            stage = %stage_name,
            tasks = upstream.len(),
            "Processing previous results"
        );

        let mut join_set = JoinSet::new();
        for (task_id, item) in upstream {
            let key = format!("{previous_name}_level_{level}_{task_id}");
            self.record(&stage_name, &key, StageResult::pending());

            let agent = Arc::clone(&self.stages[level].agent);
            let prompt = format!("{}{}", self.stages[level].prompt, stringify_item(&item));

            self.record(&stage_name, &key, StageResult::running());
            join_set.spawn(async move {
                let outcome = agent.run(&prompt).await;
                (task_id, key, outcome)
            });
        }

        let mut completed = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((task_id, key, Ok(data))) => {
                    self.record(&stage_name, &key, StageResult::completed(data.clone()));
                    completed.push((task_id, data));
                }
                Ok((task_id, key, Err(err))) => {
                    error!(stage = %stage_name, task = %task_id, error = %err, "Error in task");
                    self.record(&stage_name, &key, StageResult::failed(err.to_string()));
                }
                Err(join_err) => {
                    // A panicked task has no key to store under; log only.
                    error!(stage = %stage_name, error = %join_err, "Stage task panicked");
                }
            }
        }
        completed
    }

    fn record(&mut self, stage: &str, key: &str, result: StageResult) {
        self.results
            .entry(stage.to_string())
            .or_default()
            .insert(key.to_string(), result);
    }

    /// All failed invocations, for callers that want an aggregate view
    /// instead of walking the tree.
    pub fn failure_summary(&self) -> Vec<FailedTask> {
        let mut failed = Vec::new();
        for (stage, tasks) in &self.results {
            for (key, result) in tasks {
                if result.status == StageStatus::Failed {
                    failed.push(FailedTask {
                        stage: stage.clone(),
                        key: key.clone(),
                        msg: result.msg.clone().unwrap_or_default(),
                    });
                }
            }
        }
        failed
    }

    /// Write the results tree to `tmp_test_cases_<YYYYMMDD_HHMMSS>.json`
    /// under `dir`, returning the file path.
    pub fn export_results(&self, dir: &Path) -> Result<PathBuf, QuiverError> {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("tmp_test_cases_{timestamp}.json"));
        let json = serde_json::to_string_pretty(&self.results)?;
        std::fs::write(&path, json)?;
        info!(path = %path.display(), "Results exported");
        Ok(path)
    }
}

/// Flatten completed results into `(task_id, item)` pairs for the next
/// level: list payloads expand item-wise, anything else is a singleton.
fn expand_results(completed: Vec<(String, Value)>) -> Vec<(String, Value)> {
    let mut expanded = Vec::new();
    for (task_id, data) in completed {
        let items = match data {
            Value::Array(items) => items,
            single => vec![single],
        };
        for (i, item) in items.into_iter().enumerate() {
            expanded.push((format!("{task_id}_subtask_{i}"), item));
        }
    }
    expanded
}

/// String form of an upstream item for prompt concatenation.
fn stringify_item(item: &Value) -> String {
    match item {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Deterministic stage: derives its output from the prompt so sibling
    /// scheduling order cannot affect assertions.
    struct FanStage {
        name: String,
        fan: usize,
        prompts: Mutex<Vec<String>>,
    }

    impl FanStage {
        fn new(name: &str, fan: usize) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                fan,
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AgentStage for FanStage {
        fn name(&self) -> &str {
            &self.name
        }

        async fn run(&self, prompt: &str) -> anyhow::Result<Value> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if prompt.contains("poison") {
                anyhow::bail!("poisoned input");
            }
            let items: Vec<Value> = (0..self.fan)
                .map(|i| Value::String(format!("{prompt}|out{i}")))
                .collect();
            Ok(Value::Array(items))
        }
    }

    #[tokio::test]
    async fn three_stage_fan_out_counts() {
        // Stage 1 yields 2 items; stage 2 yields 2 per input (4 total);
        // stage 3 runs once per stage-2 item.
        let s1 = FanStage::new("personas", 2);
        let s2 = FanStage::new("families", 2);
        let s3 = FanStage::new("cases", 1);

        let mut orchestrator = Orchestrator::new(vec![
            Stage::new(s1.clone(), "spec: "),
            Stage::new(s2.clone(), "persona: "),
            Stage::new(s3.clone(), "family: "),
        ]);
        orchestrator.run_parallel().await;

        assert_eq!(s1.calls(), 1);
        assert_eq!(s2.calls(), 2);
        assert_eq!(s3.calls(), 4);

        let results = orchestrator.results();
        assert_eq!(results["personas"].len(), 1);
        assert_eq!(results["families"].len(), 2);
        assert_eq!(results["cases"].len(), 4);
        assert!(orchestrator.failure_summary().is_empty());
    }

    #[tokio::test]
    async fn keys_trace_ancestry_across_levels() {
        let s1 = FanStage::new("personas", 2);
        let s2 = FanStage::new("families", 1);

        let mut orchestrator = Orchestrator::new(vec![
            Stage::new(s1, "spec: "),
            Stage::new(s2, "persona: "),
        ]);
        orchestrator.run_parallel().await;

        let results = orchestrator.results();
        assert!(results["personas"].contains_key("personas_level_0_task_0"));
        assert!(results["families"].contains_key("personas_level_1_task_0_subtask_0"));
        assert!(results["families"].contains_key("personas_level_1_task_0_subtask_1"));
    }

    #[tokio::test]
    async fn single_item_data_fans_out_as_singleton() {
        struct Singleton;
        #[async_trait]
        impl AgentStage for Singleton {
            fn name(&self) -> &str {
                "single"
            }
            async fn run(&self, _prompt: &str) -> anyhow::Result<Value> {
                Ok(json!({"only": true}))
            }
        }

        let downstream = FanStage::new("next", 1);
        let mut orchestrator = Orchestrator::new(vec![
            Stage::new(Arc::new(Singleton), "root "),
            Stage::new(downstream.clone(), "item "),
        ]);
        orchestrator.run_parallel().await;

        assert_eq!(downstream.calls(), 1);
        assert!(orchestrator.results()["next"].contains_key("single_level_1_task_0_subtask_0"));
    }

    #[tokio::test]
    async fn failed_task_is_recorded_and_excluded_from_fan_out() {
        struct Splitter;
        #[async_trait]
        impl AgentStage for Splitter {
            fn name(&self) -> &str {
                "splitter"
            }
            async fn run(&self, _prompt: &str) -> anyhow::Result<Value> {
                Ok(json!(["fine", "poison"]))
            }
        }

        let middle = FanStage::new("middle", 1);
        let last = FanStage::new("last", 1);
        let mut orchestrator = Orchestrator::new(vec![
            Stage::new(Arc::new(Splitter), ""),
            Stage::new(middle.clone(), ""),
            Stage::new(last.clone(), ""),
        ]);
        orchestrator.run_parallel().await;

        // Both siblings ran; the poisoned one failed without blocking the other
        assert_eq!(middle.calls(), 2);
        assert_eq!(last.calls(), 1);

        let failures = orchestrator.failure_summary();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].stage, "middle");
        assert!(failures[0].msg.contains("poisoned input"));

        let failed = &orchestrator.results()["middle"]["splitter_level_1_task_0_subtask_1"];
        assert_eq!(failed.status, StageStatus::Failed);
        assert!(failed.data.is_none());
    }

    #[tokio::test]
    async fn root_failure_leaves_later_levels_empty() {
        struct Broken;
        #[async_trait]
        impl AgentStage for Broken {
            fn name(&self) -> &str {
                "broken"
            }
            async fn run(&self, _prompt: &str) -> anyhow::Result<Value> {
                anyhow::bail!("no spec")
            }
        }

        let downstream = FanStage::new("next", 1);
        let mut orchestrator = Orchestrator::new(vec![
            Stage::new(Arc::new(Broken), ""),
            Stage::new(downstream.clone(), ""),
        ]);
        orchestrator.run_parallel().await;

        assert_eq!(downstream.calls(), 0);
        let root = &orchestrator.results()["broken"]["broken_level_0_task_0"];
        assert_eq!(root.status, StageStatus::Failed);
        assert_eq!(orchestrator.failure_summary().len(), 1);
    }

    #[tokio::test]
    async fn export_writes_timestamped_file() {
        let s1 = FanStage::new("personas", 1);
        let mut orchestrator = Orchestrator::new(vec![Stage::new(s1, "spec: ")]);
        orchestrator.run_parallel().await;

        let dir = tempfile::tempdir().unwrap();
        let path = orchestrator.export_results(dir.path()).unwrap();

        let file_name = path.file_name().unwrap().to_str().unwrap();
        assert!(file_name.starts_with("tmp_test_cases_"));
        assert!(file_name.ends_with(".json"));

        let text = std::fs::read_to_string(&path).unwrap();
        let tree: ResultsTree = serde_json::from_str(&text).unwrap();
        assert_eq!(
            tree["personas"]["personas_level_0_task_0"].status,
            StageStatus::Completed
        );
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(StageStatus::Completed).unwrap(),
            json!("completed")
        );
        assert_eq!(
            serde_json::to_value(StageStatus::Failed).unwrap(),
            json!("failed")
        );
    }

    #[test]
    fn stringify_item_uses_raw_strings() {
        assert_eq!(stringify_item(&json!("plain")), "plain");
        assert_eq!(stringify_item(&json!({"a": 1})), r#"{"a":1}"#);
    }
}
