use crate::case::ParamType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Fixture error ({path}): {message}")]
    Fixture { path: String, message: String },

    #[error("Analyzer error: {0}")]
    Analyzer(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn fixture(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fixture {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn analyzer(msg: impl Into<String>) -> Self {
        Self::Analyzer(msg.into())
    }

    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a single case string could not become a `Case`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("expected {expected} argument(s), found {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("argument {position}: {found} literal is not compatible with parameter type {expected}")]
    TypeMismatch {
        position: usize,
        expected: ParamType,
        found: &'static str,
    },

    #[error("unrecognized outcome: {0:?}")]
    UnrecognizedOutcome(String),

    #[error("malformed literal at offset {offset}: {reason}")]
    MalformedLiteral { offset: usize, reason: String },

    #[error("malformed case at offset {offset}: {reason}")]
    MalformedCase { offset: usize, reason: String },
}

impl ParseError {
    pub(crate) fn literal(offset: usize, reason: impl Into<String>) -> Self {
        Self::MalformedLiteral {
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn case(offset: usize, reason: impl Into<String>) -> Self {
        Self::MalformedCase {
            offset,
            reason: reason.into(),
        }
    }
}

/// Why a single prediction could not be scored. Never fatal to a suite run.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum EvaluationError {
    #[error("invalid prediction: {0}")]
    InvalidPrediction(String),

    #[error("prediction unavailable: {0}")]
    Unavailable(String),
}

impl EvaluationError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidPrediction(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}
