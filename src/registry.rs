use crate::case::{self, Case, MethodSignature};
use crate::error::ParseError;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Cases per method, in registration order.
///
/// Built once per suite load, then only read. Duplicate cases are kept:
/// each annotation is its own sample.
#[derive(Debug, Clone, Default)]
pub struct CaseRegistry {
    cases: HashMap<MethodSignature, Vec<Case>>,
    /// First-registration order of signatures.
    order: Vec<MethodSignature>,
}

impl CaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, signature: MethodSignature, case: Case) {
        match self.cases.get_mut(&signature) {
            Some(cases) => cases.push(case),
            None => {
                self.order.push(signature.clone());
                self.cases.insert(signature, vec![case]);
            }
        }
    }

    /// Registered cases for `signature`; empty for methods without any.
    pub fn cases_for(&self, signature: &MethodSignature) -> &[Case] {
        self.cases.get(signature).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every signature with at least one case, in first-registration order.
    pub fn all_signatures(&self) -> &[MethodSignature] {
        &self.order
    }

    /// All cases, grouped by signature in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Case> {
        self.order
            .iter()
            .flat_map(|sig| self.cases_for(sig).iter())
    }

    pub fn case_count(&self) -> usize {
        self.cases.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Serialize for CaseRegistry {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.order.len()))?;
        for sig in &self.order {
            let cases: Vec<String> = self.cases_for(sig).iter().map(Case::to_string).collect();
            map.serialize_entry(&sig.to_string(), &cases)?;
        }
        map.end()
    }
}

/// A case string that failed to parse, with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseLoadError {
    pub signature: MethodSignature,
    pub text: String,
    pub error: ParseError,
}

impl std::fmt::Display for CaseLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:?}: {}", self.signature, self.text, self.error)
    }
}

/// Result of loading a suite: what parsed, and what did not.
#[derive(Debug, Default)]
pub struct SuiteLoad {
    pub registry: CaseRegistry,
    pub errors: Vec<CaseLoadError>,
}

/// Parse every `(signature, raw case text)` pair. A bad case is recorded and
/// skipped; it never stops the remaining pairs from loading.
pub fn load<I, S>(pairs: I) -> SuiteLoad
where
    I: IntoIterator<Item = (MethodSignature, S)>,
    S: AsRef<str>,
{
    let mut suite = SuiteLoad::default();

    for (signature, text) in pairs {
        let text = text.as_ref();
        match case::parse(text, &signature) {
            Ok(case) => {
                if case.has_legacy_arguments() {
                    debug!(method = %signature, case = text, "case uses unquoted argument literals");
                }
                suite.registry.register(signature, case);
            }
            Err(error) => {
                warn!(method = %signature, case = text, error = %error, "skipping malformed case");
                suite.errors.push(CaseLoadError {
                    signature,
                    text: text.to_string(),
                    error,
                });
            }
        }
    }

    info!(
        methods = suite.registry.all_signatures().len(),
        cases = suite.registry.case_count(),
        errors = suite.errors.len(),
        "suite loaded"
    );
    suite
}
