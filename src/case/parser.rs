use super::literal::{Cursor, lex_arguments};
use super::{Case, Literal, MethodSignature, Outcome, ParamType};
use crate::error::ParseError;

/// Parse one case string for the method it annotates.
///
/// Grammar: `"(" literal ("," literal)* ")" "->" outcome-phrase`. Whitespace
/// around `->` and after commas is insignificant. Checks run in order:
/// syntax, outcome, arity, then per-argument type shape, so a failed case
/// never yields a partial value.
pub fn parse(text: &str, signature: &MethodSignature) -> Result<Case, ParseError> {
    let (arguments, outcome) = parse_parts(text, signature.params())?;
    Ok(Case::new(arguments, outcome, signature.clone()))
}

fn parse_parts(text: &str, params: &[ParamType]) -> Result<(Vec<Literal>, Outcome), ParseError> {
    let mut cur = Cursor::new(text);
    let args = lex_arguments(&mut cur)?;

    cur.skip_ws();
    if !cur.eat("->") {
        return Err(ParseError::case(cur.pos(), "expected '->' after arguments"));
    }

    let phrase = cur.rest().trim();
    let outcome = Outcome::from_phrase(phrase)
        .ok_or_else(|| ParseError::UnrecognizedOutcome(phrase.to_string()))?;

    if args.len() != params.len() {
        return Err(ParseError::ArityMismatch {
            expected: params.len(),
            found: args.len(),
        });
    }

    for (position, (arg, ty)) in args.iter().zip(params).enumerate() {
        if !arg.fits(ty) {
            return Err(ParseError::TypeMismatch {
                position,
                expected: ty.clone(),
                found: arg.kind(),
            });
        }
    }

    Ok((args, outcome))
}
