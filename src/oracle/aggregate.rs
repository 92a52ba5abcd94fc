use super::{EvaluationResult, OUTCOMES};
use crate::case::Outcome;
use crate::error::EvaluationError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Bucket {
    cases: usize,
    hits: usize,
    score_sum: f64,
}

impl Bucket {
    fn merge(self, other: Self) -> Self {
        Self {
            cases: self.cases + other.cases,
            hits: self.hits + other.hits,
            score_sum: self.score_sum + other.score_sum,
        }
    }

    fn summary(self) -> Summary {
        if self.cases == 0 {
            return Summary::NoData;
        }
        let n = self.cases as f64;
        Summary::Measured {
            cases: self.cases,
            accuracy: self.hits as f64 / n,
            average_score: self.score_sum / n,
        }
    }
}

/// Running sums per true outcome. Division happens only in `report`, so
/// partial tallies from independent workers merge in any order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tally {
    buckets: [Bucket; OUTCOMES],
    excluded: usize,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: &Result<EvaluationResult, EvaluationError>) {
        match result {
            Ok(r) => {
                let bucket = &mut self.buckets[r.truth().index()];
                bucket.cases += 1;
                bucket.hits += usize::from(r.is_hit());
                bucket.score_sum += r.score();
            }
            Err(_) => self.excluded += 1,
        }
    }

    pub fn merge(self, other: Self) -> Self {
        let mut buckets = self.buckets;
        for (mine, theirs) in buckets.iter_mut().zip(other.buckets) {
            *mine = mine.merge(theirs);
        }
        Self {
            buckets,
            excluded: self.excluded + other.excluded,
        }
    }

    pub fn report(&self) -> AggregateReport {
        let overall = self
            .buckets
            .iter()
            .fold(Bucket::default(), |acc, b| acc.merge(*b));
        AggregateReport {
            overall: overall.summary(),
            per_outcome: Outcome::ALL
                .iter()
                .map(|o| OutcomeSummary {
                    outcome: *o,
                    summary: self.buckets[o.index()].summary(),
                })
                .collect(),
            excluded: self.excluded,
        }
    }
}

/// Accuracy and mean score over a group of cases, or an explicit absence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Summary {
    NoData,
    Measured {
        cases: usize,
        accuracy: f64,
        average_score: f64,
    },
}

impl Summary {
    pub fn cases(&self) -> usize {
        match self {
            Self::NoData => 0,
            Self::Measured { cases, .. } => *cases,
        }
    }

    pub fn average_score(&self) -> Option<f64> {
        match self {
            Self::NoData => None,
            Self::Measured { average_score, .. } => Some(*average_score),
        }
    }

    pub fn accuracy(&self) -> Option<f64> {
        match self {
            Self::NoData => None,
            Self::Measured { accuracy, .. } => Some(*accuracy),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    pub outcome: Outcome,
    pub summary: Summary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub overall: Summary,
    /// One entry per outcome kind, keyed by the true outcome.
    pub per_outcome: Vec<OutcomeSummary>,
    /// Cases whose prediction was rejected or missing.
    pub excluded: usize,
}

/// Aggregate a suite's evaluation results.
pub fn score<'a, I>(results: I) -> AggregateReport
where
    I: IntoIterator<Item = &'a Result<EvaluationResult, EvaluationError>>,
{
    let mut tally = Tally::new();
    for r in results {
        tally.record(r);
    }
    tally.report()
}
