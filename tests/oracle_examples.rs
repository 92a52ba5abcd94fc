use case_oracle::case::{self, Literal, MethodSignature, Outcome, ParamType};
use case_oracle::error::ParseError;
use case_oracle::oracle::{Distribution, EvaluationResult, Prediction, evaluate};
use case_oracle::registry;

fn two_ints(name: &str) -> MethodSignature {
    MethodSignature::new("jpamb.cases.Test", name, vec![ParamType::Int, ParamType::Int])
}

#[test]
fn sub_case_scores_deterministic_and_distribution() {
    let case = case::parse("(5, -7) -> ok", &two_ints("sub")).unwrap();
    assert_eq!(case.arguments(), &[Literal::Integer(5), Literal::Integer(-7)]);
    assert_eq!(case.outcome(), Outcome::Ok);

    assert_eq!(
        evaluate(case.outcome(), &Prediction::Deterministic(Outcome::Ok)).unwrap(),
        EvaluationResult::Correct { truth: Outcome::Ok }
    );

    let dist = Distribution::new([("ok", 0.2), ("assertion error", 0.8)]);
    let result = evaluate(case.outcome(), &dist.into()).unwrap();
    assert!((result.score() - 0.2).abs() < 1e-9);
    assert!(!result.is_hit());
}

#[test]
fn out_of_bounds_case_is_correct_when_predicted() {
    let case = case::parse("(0, 0) -> out of bounds", &two_ints("lengthFromParam")).unwrap();
    assert_eq!(
        evaluate(case.outcome(), &Outcome::OutOfBounds.into()).unwrap(),
        EvaluationResult::Correct {
            truth: Outcome::OutOfBounds
        }
    );
}

#[test]
fn arity_error_does_not_stop_suite() {
    let sig = two_ints("add");
    let suite = registry::load([
        (sig.clone(), "(1, 2) -> ok"),
        (sig.clone(), "(1,2,3) -> ok"),
        (sig.clone(), "(0, 0) -> ok"),
    ]);
    assert_eq!(suite.registry.cases_for(&sig).len(), 2);
    assert_eq!(
        suite.errors[0].error,
        ParseError::ArityMismatch {
            expected: 2,
            found: 3
        }
    );
}
