//! Judges an analyzer's prediction against a case's ground-truth outcome.

pub mod aggregate;

pub use aggregate::{AggregateReport, OutcomeSummary, Summary, Tally, score};

use crate::case::Outcome;
use crate::error::EvaluationError;
use serde::{Deserialize, Serialize};

const OUTCOMES: usize = Outcome::ALL.len();

/// Default tolerance for a distribution's total mass.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// What an analyzer says will happen for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    Deterministic(Outcome),
    Distribution(Distribution),
}

impl From<Outcome> for Prediction {
    fn from(o: Outcome) -> Self {
        Self::Deterministic(o)
    }
}

impl From<Distribution> for Prediction {
    fn from(d: Distribution) -> Self {
        Self::Distribution(d)
    }
}

/// Weights over outcome labels, exactly as the analyzer reported them.
///
/// Labels stay raw text until evaluation so that a label outside the
/// vocabulary is reported as an invalid prediction, not lost on the way in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Distribution {
    weights: Vec<(String, f64)>,
}

impl Distribution {
    pub fn new<L: Into<String>>(weights: impl IntoIterator<Item = (L, f64)>) -> Self {
        Self {
            weights: weights.into_iter().map(|(l, w)| (l.into(), w)).collect(),
        }
    }

    /// Equal mass on every outcome.
    pub fn uniform() -> Self {
        let w = 1.0 / OUTCOMES as f64;
        Self::new(Outcome::ALL.iter().map(|o| (o.phrase(), w)))
    }

    pub fn weights(&self) -> &[(String, f64)] {
        &self.weights
    }

    /// Dense probabilities indexed like `Outcome::ALL`; absent outcomes get 0.
    pub fn validate(&self, tolerance: f64) -> Result<[f64; OUTCOMES], EvaluationError> {
        if self.weights.is_empty() {
            return Err(EvaluationError::invalid("empty distribution"));
        }

        let mut probs = [0.0; OUTCOMES];
        let mut seen = [false; OUTCOMES];
        for (label, weight) in &self.weights {
            let outcome = Outcome::from_phrase(label)
                .ok_or_else(|| EvaluationError::invalid(format!("unknown outcome {label:?}")))?;
            if !weight.is_finite() || *weight < 0.0 {
                return Err(EvaluationError::invalid(format!(
                    "weight {weight} for {outcome} is not a non-negative number"
                )));
            }
            let i = outcome.index();
            if std::mem::replace(&mut seen[i], true) {
                return Err(EvaluationError::invalid(format!(
                    "{outcome} appears more than once"
                )));
            }
            probs[i] = *weight;
        }

        let total: f64 = probs.iter().sum();
        if (total - 1.0).abs() > tolerance {
            return Err(EvaluationError::invalid(format!(
                "weights sum to {total}, expected 1"
            )));
        }
        Ok(probs)
    }
}

/// How a distribution is turned into a score in [0, 1].
///
/// Both rules give a uniform distribution the same score whatever the true
/// outcome is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringRule {
    /// Mass placed on the true outcome.
    #[default]
    ProbabilityMass,
    /// `1 - ½·Σ(pₖ - yₖ)²`, the Brier score rescaled to [0, 1].
    Brier,
}

impl ScoringRule {
    fn apply(self, probs: &[f64; OUTCOMES], truth: Outcome) -> f64 {
        let t = truth.index();
        let raw = match self {
            Self::ProbabilityMass => probs[t],
            Self::Brier => {
                let squared: f64 = probs
                    .iter()
                    .enumerate()
                    .map(|(i, p)| {
                        let y = if i == t { 1.0 } else { 0.0 };
                        (p - y).powi(2)
                    })
                    .sum();
                1.0 - squared / 2.0
            }
        };
        raw.clamp(0.0, 1.0)
    }
}

impl std::fmt::Display for ScoringRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProbabilityMass => write!(f, "probability mass"),
            Self::Brier => write!(f, "brier"),
        }
    }
}

/// Verdict for one case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum EvaluationResult {
    Correct {
        truth: Outcome,
    },
    Incorrect {
        truth: Outcome,
        predicted: Outcome,
    },
    /// Distribution prediction. `hit` means the true outcome carried strictly
    /// more mass than any other.
    Scored {
        truth: Outcome,
        score: f64,
        hit: bool,
    },
}

impl EvaluationResult {
    pub fn truth(&self) -> Outcome {
        match self {
            Self::Correct { truth } | Self::Incorrect { truth, .. } | Self::Scored { truth, .. } => {
                *truth
            }
        }
    }

    pub fn score(&self) -> f64 {
        match self {
            Self::Correct { .. } => 1.0,
            Self::Incorrect { .. } => 0.0,
            Self::Scored { score, .. } => *score,
        }
    }

    pub fn is_hit(&self) -> bool {
        match self {
            Self::Correct { .. } => true,
            Self::Incorrect { .. } => false,
            Self::Scored { hit, .. } => *hit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Oracle {
    rule: ScoringRule,
    tolerance: f64,
}

impl Default for Oracle {
    fn default() -> Self {
        Self::new(ScoringRule::default(), DEFAULT_TOLERANCE)
    }
}

impl Oracle {
    pub fn new(rule: ScoringRule, tolerance: f64) -> Self {
        Self { rule, tolerance }
    }

    pub fn rule(&self) -> ScoringRule {
        self.rule
    }

    /// Pure, one-shot judgement of `prediction` against `truth`.
    pub fn evaluate(
        &self,
        truth: Outcome,
        prediction: &Prediction,
    ) -> Result<EvaluationResult, EvaluationError> {
        match prediction {
            Prediction::Deterministic(predicted) if *predicted == truth => {
                Ok(EvaluationResult::Correct { truth })
            }
            Prediction::Deterministic(predicted) => Ok(EvaluationResult::Incorrect {
                truth,
                predicted: *predicted,
            }),
            Prediction::Distribution(dist) => {
                let probs = dist.validate(self.tolerance)?;
                let t = truth.index();
                let hit = probs
                    .iter()
                    .enumerate()
                    .all(|(i, p)| i == t || *p < probs[t]);
                Ok(EvaluationResult::Scored {
                    truth,
                    score: self.rule.apply(&probs, truth),
                    hit,
                })
            }
        }
    }
}

/// `Oracle::default().evaluate(..)`.
pub fn evaluate(
    truth: Outcome,
    prediction: &Prediction,
) -> Result<EvaluationResult, EvaluationError> {
    Oracle::default().evaluate(truth, prediction)
}
