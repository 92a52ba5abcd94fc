//! Suite runner: one prediction and one verdict per registered case.

pub mod source;

pub use source::{AnalyzerCommand, PredictionSource, PredictionTable, parse_report};

use crate::case::Case;
use crate::error::EvaluationError;
use crate::oracle::{AggregateReport, EvaluationResult, Oracle, Tally};
use crate::registry::CaseRegistry;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct CaseRecord {
    pub case: Case,
    pub result: Result<EvaluationResult, EvaluationError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuiteRun {
    /// In registry order.
    pub records: Vec<CaseRecord>,
    pub report: AggregateReport,
}

/// Evaluate every case in `registry`, at most `jobs` predictions in flight.
///
/// Each task tallies its own case; the tallies are merged as tasks finish,
/// in whatever order that happens to be.
pub async fn run(
    registry: &CaseRegistry,
    source: Arc<PredictionSource>,
    oracle: Oracle,
    jobs: usize,
) -> SuiteRun {
    let cases: Vec<Case> = registry.iter().cloned().collect();
    info!(
        cases = cases.len(),
        jobs,
        source = %source.label(),
        rule = %oracle.rule(),
        "suite run: starting"
    );

    let permits = Arc::new(Semaphore::new(jobs.max(1)));
    let mut tasks = JoinSet::new();

    for (idx, case) in cases.iter().cloned().enumerate() {
        let source = Arc::clone(&source);
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            let result = match source.predict(&case).await {
                Ok(prediction) => oracle.evaluate(case.outcome(), &prediction),
                Err(e) => Err(e),
            };
            let mut tally = Tally::new();
            tally.record(&result);
            (idx, CaseRecord { case, result }, tally)
        });
    }

    let mut slots: Vec<Option<CaseRecord>> = (0..cases.len()).map(|_| None).collect();
    let mut tally = Tally::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((idx, record, partial)) => {
                if let Err(e) = &record.result {
                    warn!(
                        method = %record.case.signature(),
                        case = %record.case,
                        error = %e,
                        "case excluded"
                    );
                } else {
                    debug!(
                        method = %record.case.signature(),
                        case = %record.case,
                        "case evaluated"
                    );
                }
                tally = tally.merge(partial);
                slots[idx] = Some(record);
            }
            Err(e) => warn!(error = %e, "evaluation task failed"),
        }
    }

    // A task that died still owes its case a record.
    let records: Vec<CaseRecord> = slots
        .into_iter()
        .zip(cases)
        .map(|(slot, case)| {
            slot.unwrap_or_else(|| {
                let result = Err(EvaluationError::unavailable("evaluation task failed"));
                tally.record(&result);
                CaseRecord { case, result }
            })
        })
        .collect();

    let report = tally.report();
    info!(
        evaluated = report.overall.cases(),
        excluded = report.excluded,
        "suite run complete"
    );
    SuiteRun { records, report }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{MethodSignature, Outcome, ParamType};
    use crate::oracle::Summary;
    use crate::registry;

    fn registry() -> CaseRegistry {
        let sig = MethodSignature::new("jpamb.cases.SignOps", "sub", vec![ParamType::Int; 2]);
        registry::load([
            (sig.clone(), "(5, -7) -> ok"),
            (sig.clone(), "(0, 0) -> divide by zero"),
            (sig, "(1, 2) -> ok"),
        ])
        .registry
    }

    fn table(json: &str) -> Arc<PredictionSource> {
        Arc::new(PredictionSource::Table(PredictionTable::from_json(json).unwrap()))
    }

    #[tokio::test]
    async fn records_follow_registry_order() {
        let source = table(
            r#"[
            {"method": "jpamb.cases.SignOps.sub:(II)", "args": "(5, -7)", "prediction": "ok"},
            {"method": "jpamb.cases.SignOps.sub:(II)", "args": "(0, 0)", "prediction": "ok"},
            {"method": "jpamb.cases.SignOps.sub:(II)", "args": "(1, 2)",
             "prediction": {"ok": 0.5, "vulnerable": 0.5}}
        ]"#,
        );
        let run = run(&registry(), source, Oracle::default(), 2).await;

        let texts: Vec<String> = run.records.iter().map(|r| r.case.to_string()).collect();
        assert_eq!(
            texts,
            vec!["(5, -7) -> ok", "(0, 0) -> divide by zero", "(1, 2) -> ok"]
        );
        assert_eq!(
            run.records[1].result,
            Ok(EvaluationResult::Incorrect {
                truth: Outcome::DivideByZero,
                predicted: Outcome::Ok
            })
        );
        assert_eq!(
            run.report.overall,
            Summary::Measured {
                cases: 3,
                accuracy: 1.0 / 3.0,
                average_score: 0.5,
            }
        );
        assert_eq!(run.report.excluded, 0);
    }

    #[tokio::test]
    async fn missing_and_invalid_predictions_are_excluded() {
        let source = table(
            r#"[
            {"method": "jpamb.cases.SignOps.sub:(II)", "args": "(5, -7)", "prediction": {"ok": 0.9}}
        ]"#,
        );
        let run = run(&registry(), source, Oracle::default(), 1).await;
        assert_eq!(run.records.len(), 3);
        assert!(run.records.iter().all(|r| r.result.is_err()));
        assert_eq!(run.report.overall, Summary::NoData);
        assert_eq!(run.report.excluded, 3);
    }

    #[tokio::test]
    async fn empty_registry_reports_no_data() {
        let run = run(&CaseRegistry::new(), table("[]"), Oracle::default(), 4).await;
        assert!(run.records.is_empty());
        assert_eq!(run.report.overall, Summary::NoData);
    }
}
