//! Case specification language: `(args) -> outcome` strings and the typed
//! values they parse into.

mod literal;
mod outcome;
mod parser;
mod signature;

pub use literal::{Literal, format_arguments, parse_arguments};
pub use outcome::Outcome;
pub use parser::parse;
pub use signature::{MethodSignature, ParamType};

use serde::Serialize;

/// One annotated sample: call arguments, the ground-truth outcome, and the
/// method they belong to.
///
/// Only `parse` builds a `Case`, and nothing mutates one afterwards.
/// Equality is structural over all three parts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Case {
    arguments: Vec<Literal>,
    outcome: Outcome,
    signature: MethodSignature,
}

impl Case {
    pub(crate) fn new(arguments: Vec<Literal>, outcome: Outcome, signature: MethodSignature) -> Self {
        Self {
            arguments,
            outcome,
            signature,
        }
    }

    pub fn arguments(&self) -> &[Literal] {
        &self.arguments
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    /// Canonical argument text, e.g. `(5, -7)`. Prediction sources key on this.
    pub fn argument_text(&self) -> String {
        format_arguments(&self.arguments)
    }

    /// True when some argument only parsed as a raw identifier.
    pub fn has_legacy_arguments(&self) -> bool {
        self.arguments.iter().any(Literal::is_legacy)
    }
}

impl std::fmt::Display for Case {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.argument_text(), self.outcome)
    }
}
