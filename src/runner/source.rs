//! Where predictions come from: a precomputed JSON file, or the analyzer
//! under test run as a subprocess per case.

use crate::case::{Case, MethodSignature, Outcome, format_arguments, parse_arguments};
use crate::config::AnalyzerConfig;
use crate::error::{Error, EvaluationError, Result};
use crate::oracle::{Distribution, Prediction};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

pub enum PredictionSource {
    Table(PredictionTable),
    Analyzer(AnalyzerCommand),
}

impl PredictionSource {
    pub async fn predict(&self, case: &Case) -> std::result::Result<Prediction, EvaluationError> {
        match self {
            Self::Table(table) => table.lookup(case),
            Self::Analyzer(analyzer) => analyzer.run(case).await,
        }
    }

    /// Short human label for reports.
    pub fn label(&self) -> String {
        match self {
            Self::Table(table) => format!("predictions file ({} entries)", table.len()),
            Self::Analyzer(analyzer) => analyzer.program.clone(),
        }
    }
}

/// Prediction as written in a predictions file: an outcome phrase or a map
/// of outcome phrase to weight.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPrediction {
    Label(String),
    Weights(BTreeMap<String, f64>),
}

#[derive(Debug, Deserialize)]
struct PredictionEntry {
    method: MethodSignature,
    args: String,
    prediction: RawPrediction,
}

type CaseKey = (MethodSignature, String);

/// Predictions keyed by method and canonical argument text.
#[derive(Debug, Default)]
pub struct PredictionTable {
    entries: HashMap<CaseKey, std::result::Result<Prediction, EvaluationError>>,
}

impl PredictionTable {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
            .map_err(|e| Error::fixture(path.display().to_string(), e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Vec<PredictionEntry> = serde_json::from_str(json)?;
        let mut entries = HashMap::with_capacity(raw.len());
        for entry in raw {
            // Same spelling the registry prints, so whitespace in the file
            // does not matter.
            let args = match parse_arguments(&entry.args) {
                Ok(literals) => format_arguments(&literals),
                Err(e) => {
                    warn!(
                        method = %entry.method,
                        args = %entry.args,
                        error = %e,
                        "unreadable prediction arguments"
                    );
                    continue;
                }
            };
            let prediction = match entry.prediction {
                RawPrediction::Label(label) => Outcome::from_phrase(&label)
                    .map(Prediction::Deterministic)
                    .ok_or_else(|| {
                        EvaluationError::invalid(format!("unknown outcome {label:?}"))
                    }),
                RawPrediction::Weights(weights) => {
                    Ok(Prediction::Distribution(Distribution::new(weights)))
                }
            };
            entries.insert((entry.method, args), prediction);
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, case: &Case) -> std::result::Result<Prediction, EvaluationError> {
        let key = (case.signature().clone(), case.argument_text());
        self.entries.get(&key).cloned().unwrap_or_else(|| {
            Err(EvaluationError::unavailable(format!(
                "no prediction for {} {}",
                key.0, key.1
            )))
        })
    }
}

/// The analyzer under test, invoked as `program args.. <method id> <arguments>`.
#[derive(Debug, Clone)]
pub struct AnalyzerCommand {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl AnalyzerCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &AnalyzerConfig) -> Result<Self> {
        let program = config
            .command
            .clone()
            .ok_or_else(|| Error::analyzer("analyzer.command is not set"))?;
        Ok(Self::new(
            program,
            config.args.clone(),
            Duration::from_secs(config.timeout_secs),
        ))
    }

    async fn run(&self, case: &Case) -> std::result::Result<Prediction, EvaluationError> {
        let method = case.signature().to_string();
        let arguments = case.argument_text();
        debug!(program = %self.program, %method, %arguments, "running analyzer");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(&method)
            .arg(&arguments)
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                EvaluationError::unavailable(format!(
                    "analyzer timed out after {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| EvaluationError::unavailable(format!("could not run analyzer: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let first = stderr.lines().next().unwrap_or("").trim();
            return Err(EvaluationError::unavailable(format!(
                "analyzer exited with {}: {first}",
                output.status
            )));
        }

        parse_report(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Read analyzer output lines of the form `<outcome>;<weight>`, where weight
/// is a percentage (`80%`) or a fraction (`0.8`). Other lines are ignored.
/// The result is checked like any distribution, never renormalised.
pub fn parse_report(stdout: &str) -> std::result::Result<Prediction, EvaluationError> {
    let mut weights = Vec::new();
    for line in stdout.lines() {
        let Some((label, value)) = line.split_once(';') else {
            continue;
        };
        let value = value.trim();
        let weight = match value.strip_suffix('%') {
            Some(pct) => pct.trim().parse::<f64>().map(|p| p / 100.0),
            None => value.parse::<f64>(),
        }
        .map_err(|_| EvaluationError::invalid(format!("bad weight {value:?} in line {line:?}")))?;
        weights.push((label.trim().to_string(), weight));
    }

    if weights.is_empty() {
        return Err(EvaluationError::invalid("analyzer printed no predictions"));
    }
    Ok(Prediction::Distribution(Distribution::new(weights)))
}
