use crate::error::{Error, EvaluationError, Result};
use crate::oracle::{AggregateReport, EvaluationResult, ScoringRule, Summary};
use crate::runner::SuiteRun;
use askama::Template;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// A finished run as written to disk with `--format json`, and read back by
/// `render`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDocument {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub rule: ScoringRule,
    pub report: AggregateReport,
    pub records: Vec<RecordRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordRow {
    pub method: String,
    pub case: String,
    pub result: std::result::Result<EvaluationResult, EvaluationError>,
}

impl RunDocument {
    pub fn new(run: &SuiteRun, source: impl Into<String>, rule: ScoringRule) -> Self {
        let records = run
            .records
            .iter()
            .map(|r| RecordRow {
                method: r.case.signature().to_string(),
                case: r.case.to_string(),
                result: r.result.clone(),
            })
            .collect();
        Self {
            generated_at: Utc::now(),
            source: source.into(),
            rule,
            report: run.report.clone(),
            records,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn pct(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".into(), |v| format!("{:.1}%", v * 100.0))
}

fn fmt_score(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".into(), |v| format!("{v:.3}"))
}

/// Terminal table: the overall line, one row per outcome, then excluded cases.
pub fn render_text(doc: &RunDocument) -> String {
    let mut out = String::new();
    let report = &doc.report;
    let _ = writeln!(out, "Source:  {}", doc.source);
    let _ = writeln!(out, "Rule:    {}", doc.rule);
    let _ = writeln!(
        out,
        "Overall: {} cases, accuracy {}, average score {}",
        report.overall.cases(),
        pct(report.overall.accuracy()),
        fmt_score(report.overall.average_score())
    );
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:<18} {:>6} {:>9} {:>9}",
        "outcome", "cases", "accuracy", "score"
    );
    for row in &report.per_outcome {
        let _ = writeln!(
            out,
            "{:<18} {:>6} {:>9} {:>9}",
            row.outcome.phrase(),
            row.summary.cases(),
            pct(row.summary.accuracy()),
            fmt_score(row.summary.average_score())
        );
    }

    if report.excluded > 0 {
        let _ = writeln!(out);
        let _ = writeln!(out, "Excluded: {}", report.excluded);
        for row in &doc.records {
            if let Err(e) = &row.result {
                let _ = writeln!(out, "  {} {}: {e}", row.method, row.case);
            }
        }
    }
    out
}

#[derive(Template)]
#[template(path = "oracle_report.html")]
struct OracleReport {
    generated_at: String,
    source: String,
    rule: String,
    overall_cases: usize,
    overall_accuracy: String,
    overall_score: String,
    excluded: usize,
    outcomes: Vec<OutcomeView>,
    records: Vec<RecordView>,
}

#[allow(dead_code)] // fields used by Askama template
struct OutcomeView {
    outcome: String,
    cases: usize,
    accuracy: String,
    score: String,
    no_data: bool,
}

#[allow(dead_code)] // fields used by Askama template
struct RecordView {
    method: String,
    case: String,
    verdict: String,
    verdict_class: String,
    score: String,
    detail: String,
}

fn record_view(row: &RecordRow) -> RecordView {
    let (verdict, verdict_class, score, detail) = match &row.result {
        Ok(EvaluationResult::Correct { .. }) => {
            ("correct", "text-green-400", "1.000".to_string(), String::new())
        }
        Ok(EvaluationResult::Incorrect { predicted, .. }) => (
            "incorrect",
            "text-red-400",
            "0.000".to_string(),
            format!("predicted {predicted}"),
        ),
        Ok(EvaluationResult::Scored { score, hit, .. }) => (
            if *hit { "hit" } else { "miss" },
            if *hit { "text-green-400" } else { "text-yellow-400" },
            format!("{score:.3}"),
            String::new(),
        ),
        Err(e) => ("excluded", "text-gray-400", "-".to_string(), e.to_string()),
    };
    RecordView {
        method: row.method.clone(),
        case: row.case.clone(),
        verdict: verdict.into(),
        verdict_class: verdict_class.into(),
        score,
        detail,
    }
}

pub fn render_html(doc: &RunDocument) -> Result<String> {
    let report = &doc.report;
    let outcomes = report
        .per_outcome
        .iter()
        .map(|row| OutcomeView {
            outcome: row.outcome.phrase().to_string(),
            cases: row.summary.cases(),
            accuracy: pct(row.summary.accuracy()),
            score: fmt_score(row.summary.average_score()),
            no_data: row.summary == Summary::NoData,
        })
        .collect();

    let page = OracleReport {
        generated_at: doc.generated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        source: doc.source.clone(),
        rule: doc.rule.to_string(),
        overall_cases: report.overall.cases(),
        overall_accuracy: pct(report.overall.accuracy()),
        overall_score: fmt_score(report.overall.average_score()),
        excluded: report.excluded,
        outcomes,
        records: doc.records.iter().map(record_view).collect(),
    };

    page.render()
        .map_err(|e| Error::template(format!("template render: {e}")))
}
