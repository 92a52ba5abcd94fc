use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Terminal classification of one invocation's behavior.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(into = "String", try_from = "String")]
pub enum Outcome {
    Ok,
    OutOfBounds,
    AssertionError,
    DivideByZero,
    Vulnerable,
    InfiniteLoop,
    NullPointer,
}

/// Alias analyzers print for `infinite loop`.
const INFINITE_LOOP_ALIAS: &str = "*";

impl Outcome {
    pub const ALL: [Outcome; 7] = [
        Self::Ok,
        Self::OutOfBounds,
        Self::AssertionError,
        Self::DivideByZero,
        Self::Vulnerable,
        Self::InfiniteLoop,
        Self::NullPointer,
    ];

    pub fn phrase(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::OutOfBounds => "out of bounds",
            Self::AssertionError => "assertion error",
            Self::DivideByZero => "divide by zero",
            Self::Vulnerable => "vulnerable",
            Self::InfiniteLoop => "infinite loop",
            Self::NullPointer => "null pointer",
        }
    }

    /// Exact, case-sensitive lookup of a whole outcome phrase.
    pub fn from_phrase(text: &str) -> Option<Self> {
        if text == INFINITE_LOOP_ALIAS {
            return Some(Self::InfiniteLoop);
        }
        Self::ALL.into_iter().find(|o| o.phrase() == text)
    }

    /// Position in `ALL`, used for dense per-outcome arrays.
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.phrase())
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_phrase(s).ok_or_else(|| format!("unknown outcome {s:?}"))
    }
}

impl From<Outcome> for String {
    fn from(o: Outcome) -> Self {
        o.phrase().to_string()
    }
}

impl TryFrom<String> for Outcome {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
