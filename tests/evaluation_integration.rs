use case_oracle::case::Outcome;
use case_oracle::error::EvaluationError;
use case_oracle::loader;
use case_oracle::oracle::{EvaluationResult, Oracle, ScoringRule, Summary};
use case_oracle::output::{self, RunDocument};
use case_oracle::registry::{self, CaseRegistry};
use case_oracle::runner::{self, AnalyzerCommand, PredictionSource, PredictionTable};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

fn fixture_registry() -> CaseRegistry {
    let scan = loader::scan_sources(&[PathBuf::from("tests/fixtures/java")]);
    registry::load(scan.pairs()).registry
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn table_source() -> Arc<PredictionSource> {
    let table = PredictionTable::load(Path::new("tests/fixtures/predictions.json")).unwrap();
    Arc::new(PredictionSource::Table(table))
}

#[tokio::test]
async fn predictions_file_scores_suite() {
    let registry = fixture_registry();
    let run = runner::run(&registry, table_source(), Oracle::default(), 4).await;

    assert_eq!(run.records.len(), 11);
    assert_eq!(run.report.excluded, 5);

    let overall = run.report.overall;
    assert_eq!(overall.cases(), 6);
    assert!(approx(overall.accuracy().unwrap(), 4.0 / 6.0));
    assert!(approx(overall.average_score().unwrap(), 4.3 / 6.0));

    let by = |o: Outcome| {
        run.report
            .per_outcome
            .iter()
            .find(|s| s.outcome == o)
            .map(|s| s.summary)
            .unwrap()
    };
    assert_eq!(by(Outcome::Ok).cases(), 2);
    assert!(approx(by(Outcome::DivideByZero).average_score().unwrap(), 0.8));
    assert_eq!(by(Outcome::AssertionError).accuracy(), Some(0.0));
    // Tie between ok and out of bounds: half the mass, not a hit.
    assert_eq!(by(Outcome::OutOfBounds).accuracy(), Some(0.0));
    assert!(approx(by(Outcome::OutOfBounds).average_score().unwrap(), 0.5));
    assert_eq!(by(Outcome::InfiniteLoop).accuracy(), Some(1.0));
    assert_eq!(by(Outcome::Vulnerable), Summary::NoData);
    assert_eq!(by(Outcome::NullPointer), Summary::NoData);
}

#[tokio::test]
async fn rejected_predictions_carry_their_reason() {
    let registry = fixture_registry();
    let run = runner::run(&registry, table_source(), Oracle::default(), 2).await;

    let square = run
        .records
        .iter()
        .find(|r| r.case.signature().name() == "square")
        .unwrap();
    assert!(matches!(
        square.result,
        Err(EvaluationError::InvalidPrediction(_))
    ));

    let unavailable = run
        .records
        .iter()
        .filter(|r| matches!(r.result, Err(EvaluationError::Unavailable(_))))
        .count();
    assert_eq!(unavailable, 4);
}

#[tokio::test]
async fn brier_rule_changes_scores_not_verdicts() {
    let registry = fixture_registry();
    let oracle = Oracle::new(ScoringRule::Brier, 1e-6);
    let run = runner::run(&registry, table_source(), oracle, 4).await;

    let divide_by_zero = run
        .records
        .iter()
        .find(|r| r.case.outcome() == Outcome::DivideByZero)
        .unwrap();
    match &divide_by_zero.result {
        Ok(EvaluationResult::Scored { score, hit, .. }) => {
            // 1 - ((0.2)^2 + (0.8 - 1)^2) / 2
            assert!(approx(*score, 0.96));
            assert!(*hit);
        }
        other => panic!("unexpected result {other:?}"),
    }
    assert!(approx(run.report.overall.accuracy().unwrap(), 4.0 / 6.0));
}

#[tokio::test]
async fn analyzer_subprocess_is_scored() {
    let registry = fixture_registry();
    let analyzer = AnalyzerCommand::new(
        "sh",
        vec!["tests/fixtures/analyzer.sh".into()],
        Duration::from_secs(10),
    );
    let run = runner::run(
        &registry,
        Arc::new(PredictionSource::Analyzer(analyzer)),
        Oracle::default(),
        3,
    )
    .await;

    assert_eq!(run.records.len(), 11);
    assert_eq!(run.report.excluded, 1);
    let overall = run.report.overall;
    assert_eq!(overall.cases(), 10);
    assert!(approx(overall.accuracy().unwrap(), 0.4));
    assert!(approx(overall.average_score().unwrap(), 0.4));

    let square = run
        .records
        .iter()
        .find(|r| r.case.signature().name() == "square")
        .unwrap();
    match &square.result {
        Err(EvaluationError::Unavailable(msg)) => assert!(msg.contains("unsupported method")),
        other => panic!("unexpected result {other:?}"),
    }
}

#[tokio::test]
async fn missing_analyzer_binary_excludes_every_case() {
    let registry = fixture_registry();
    let analyzer = AnalyzerCommand::new(
        "/nonexistent/analyzer",
        Vec::new(),
        Duration::from_secs(5),
    );
    let run = runner::run(
        &registry,
        Arc::new(PredictionSource::Analyzer(analyzer)),
        Oracle::default(),
        2,
    )
    .await;
    assert_eq!(run.report.overall, Summary::NoData);
    assert_eq!(run.report.excluded, 11);
}

#[tokio::test]
async fn saved_run_renders_to_html() {
    let registry = fixture_registry();
    let source = table_source();
    let label = source.label();
    let run = runner::run(&registry, source, Oracle::default(), 4).await;

    let doc = RunDocument::new(&run, label, ScoringRule::ProbabilityMass);
    let json = doc.to_json().unwrap();
    let back = RunDocument::from_json(&json).unwrap();
    assert_eq!(back.records.len(), 11);

    let html = output::render_html(&back).unwrap();
    assert!(html.contains("jpamb.cases.Arith.divide:(II)"));
    assert!(html.contains("predictions file (7 entries)"));

    let text = output::render_text(&back);
    assert!(text.contains("Overall: 6 cases"));
    assert!(text.contains("Excluded: 5"));
}
