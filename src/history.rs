use crate::error::Result;
use crate::oracle::{AggregateReport, ScoringRule};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One saved evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunHistory {
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub rule: ScoringRule,
    pub report: AggregateReport,
}

impl RunHistory {
    pub fn new(source: impl Into<String>, rule: ScoringRule, report: AggregateReport) -> Self {
        Self {
            timestamp: Utc::now(),
            source: source.into(),
            rule,
            report,
        }
    }

    /// Write to `dir/<timestamp>.json`, creating `dir` if needed.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let filename = format!("{}.json", self.timestamp.format("%Y%m%dT%H%M%S%.3f"));
        let path = dir.join(filename);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        debug!(path = %path.display(), "saved run history");
        Ok(path)
    }

    /// Most recent readable run in `dir`. Missing directory or unreadable
    /// files just mean no history.
    pub fn load_latest(dir: &Path) -> Option<Self> {
        let entries = std::fs::read_dir(dir).ok()?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        // Timestamped names sort chronologically.
        paths.sort();
        paths.iter().rev().find_map(|p| {
            std::fs::read_to_string(p)
                .ok()
                .and_then(|s| serde_json::from_str(&s).ok())
        })
    }

    /// Change in overall average score against `previous`, when both runs
    /// used the same rule and both measured something.
    pub fn score_delta(&self, previous: &Self) -> Option<f64> {
        if self.rule != previous.rule {
            return None;
        }
        let now = self.report.overall.average_score()?;
        let before = previous.report.overall.average_score()?;
        Some(now - before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::Outcome;
    use crate::error::EvaluationError;
    use crate::oracle::{EvaluationResult, score};

    fn report(scores: &[f64]) -> AggregateReport {
        let results: Vec<std::result::Result<EvaluationResult, EvaluationError>> = scores
            .iter()
            .map(|&s| {
                Ok(EvaluationResult::Scored {
                    truth: Outcome::Ok,
                    score: s,
                    hit: s > 0.5,
                })
            })
            .collect();
        score(&results)
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("case-oracle-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn save_then_load_latest() {
        let dir = temp_dir("history");
        let mut older = RunHistory::new("a", ScoringRule::ProbabilityMass, report(&[0.5]));
        older.timestamp = Utc::now() - chrono::Duration::hours(1);
        older.save(&dir).unwrap();
        let newer = RunHistory::new("b", ScoringRule::ProbabilityMass, report(&[1.0]));
        newer.save(&dir).unwrap();
        std::fs::write(dir.join("junk.json"), "not json").unwrap();

        let latest = RunHistory::load_latest(&dir).unwrap();
        assert_eq!(latest.source, "b");
        assert_eq!(newer.score_delta(&older), Some(0.5));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn no_history_is_none() {
        assert!(RunHistory::load_latest(&temp_dir("empty")).is_none());
    }

    #[test]
    fn delta_needs_same_rule_and_data() {
        let a = RunHistory::new("a", ScoringRule::ProbabilityMass, report(&[0.5]));
        let b = RunHistory::new("b", ScoringRule::Brier, report(&[0.5]));
        let empty = RunHistory::new("c", ScoringRule::ProbabilityMass, report(&[]));
        assert_eq!(a.score_delta(&b), None);
        assert_eq!(a.score_delta(&empty), None);
    }
}
