use super::ParamType;
use crate::error::ParseError;
use serde::Serialize;

/// One parsed call argument.
///
/// `Display` is the canonical text form: for canonical inputs,
/// `lex(text).to_string() == text`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Literal {
    Integer(i64),
    Float(f64),
    Str(String),
    Char(char),
    Boolean(bool),
    /// Unquoted token that is not a number or boolean. Kept verbatim; some
    /// fixtures spell string payloads this way (`admin' OR 1=1--`).
    Identifier(String),
}

impl Literal {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Float(_) => "floating-point",
            Self::Str(_) => "string",
            Self::Char(_) => "character",
            Self::Boolean(_) => "boolean",
            Self::Identifier(_) => "identifier",
        }
    }

    /// Whether this literal may be passed for a parameter of type `ty`.
    pub fn fits(&self, ty: &ParamType) -> bool {
        use ParamType as T;
        match self {
            Self::Integer(_) => matches!(
                ty,
                T::Int | T::Long | T::Short | T::Byte | T::Float | T::Double
            ),
            Self::Float(_) => matches!(ty, T::Float | T::Double),
            Self::Str(_) | Self::Identifier(_) => matches!(ty, T::String),
            Self::Char(_) => matches!(ty, T::Char),
            Self::Boolean(_) => matches!(ty, T::Boolean),
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Identifier(_))
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            // Plain decimal, never exponent form, and always with a point so
            // the text lexes back as a float.
            Self::Float(v) => {
                let text = v.to_string();
                f.write_str(&text)?;
                if text.contains('.') {
                    Ok(())
                } else {
                    f.write_str(".0")
                }
            }
            Self::Str(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("\"")
            }
            Self::Char(c) => match c {
                '\'' => f.write_str("'\\''"),
                '\\' => f.write_str("'\\\\'"),
                c => write!(f, "'{c}'"),
            },
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Identifier(raw) => f.write_str(raw),
        }
    }
}

/// Format an argument list the way case strings spell it: `(5, -7)`.
pub fn format_arguments(args: &[Literal]) -> String {
    let inner: Vec<String> = args.iter().map(Literal::to_string).collect();
    format!("({})", inner.join(", "))
}

/// Parse a bare argument list such as `(5, -7)`, with nothing after it.
pub fn parse_arguments(text: &str) -> Result<Vec<Literal>, ParseError> {
    let mut cur = Cursor::new(text);
    let args = lex_arguments(&mut cur)?;
    cur.skip_ws();
    if cur.peek().is_some() {
        return Err(ParseError::case(cur.pos(), "unexpected text after arguments"));
    }
    Ok(args)
}

/// Byte-offset cursor over a case string.
pub(crate) struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub(crate) fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub(crate) fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    pub(crate) fn eat(&mut self, prefix: &str) -> bool {
        if self.rest().starts_with(prefix) {
            self.pos += prefix.len();
            true
        } else {
            false
        }
    }
}

/// Lex `"(" literal ("," literal)* ")"` or `"()"`, leaving the cursor just
/// past the closing parenthesis.
pub(crate) fn lex_arguments(cur: &mut Cursor<'_>) -> Result<Vec<Literal>, ParseError> {
    cur.skip_ws();
    if !cur.eat("(") {
        return Err(ParseError::case(cur.pos(), "expected '('"));
    }
    cur.skip_ws();
    if cur.eat(")") {
        return Ok(Vec::new());
    }

    let mut args = Vec::new();
    loop {
        cur.skip_ws();
        args.push(lex_literal(cur)?);
        cur.skip_ws();
        let at = cur.pos();
        match cur.bump() {
            Some(',') => continue,
            Some(')') => return Ok(args),
            Some(c) => {
                return Err(ParseError::literal(
                    at,
                    format!("unexpected {c:?} after literal"),
                ));
            }
            None => return Err(ParseError::case(at, "missing ')'")),
        }
    }
}

fn lex_literal(cur: &mut Cursor<'_>) -> Result<Literal, ParseError> {
    match cur.peek() {
        Some('"') => lex_string(cur),
        Some('\'') => match try_lex_char(cur) {
            Some(c) => Ok(Literal::Char(c)),
            None => match try_lex_quoted_word(cur) {
                Some(word) => Ok(Literal::Identifier(word)),
                None => lex_bare(cur),
            },
        },
        _ => lex_bare(cur),
    }
}

fn lex_string(cur: &mut Cursor<'_>) -> Result<Literal, ParseError> {
    let start = cur.pos();
    cur.bump();
    let mut value = String::new();
    loop {
        match cur.bump() {
            None => return Err(ParseError::literal(start, "unterminated string")),
            Some('"') => return Ok(Literal::Str(value)),
            Some('\\') => match cur.bump() {
                Some(c @ ('"' | '\\')) => value.push(c),
                Some(c) => {
                    return Err(ParseError::literal(
                        cur.pos() - c.len_utf8() - 1,
                        format!("unsupported escape '\\{c}'"),
                    ));
                }
                None => return Err(ParseError::literal(start, "unterminated string")),
            },
            Some(c) => value.push(c),
        }
    }
}

/// A single quoted character followed by a delimiter. Anything else
/// (`'john'`, `''`) rewinds and is lexed as a bare token.
fn try_lex_char(cur: &mut Cursor<'_>) -> Option<char> {
    let mut probe = Cursor {
        src: cur.src,
        pos: cur.pos,
    };
    probe.bump();
    let c = match probe.bump()? {
        '\\' => match probe.bump()? {
            c @ ('\'' | '\\') => c,
            _ => return None,
        },
        '\'' => return None,
        c => c,
    };
    if probe.bump()? != '\'' {
        return None;
    }
    probe.skip_ws();
    if !matches!(probe.peek(), Some(',' | ')')) {
        return None;
    }
    cur.pos = probe.pos;
    Some(c)
}

/// A legacy single-quoted word such as `'john'` or `'a, b'`, kept verbatim
/// with its quotes. Only taken when the closing quote ends the argument;
/// `'admin' OR 1=1` rewinds and is lexed as a bare token.
fn try_lex_quoted_word(cur: &mut Cursor<'_>) -> Option<String> {
    let mut probe = Cursor {
        src: cur.src,
        pos: cur.pos,
    };
    let start = probe.pos();
    probe.bump();
    while probe.bump()? != '\'' {}
    let end = probe.pos();
    probe.skip_ws();
    if !matches!(probe.peek(), Some(',' | ')')) {
        return None;
    }
    cur.pos = end;
    Some(cur.src[start..end].to_string())
}

/// Everything up to the next `,` or `)`.
fn lex_bare(cur: &mut Cursor<'_>) -> Result<Literal, ParseError> {
    let start = cur.pos();
    while cur.peek().is_some_and(|c| c != ',' && c != ')') {
        cur.bump();
    }
    let token = cur.src[start..cur.pos()].trim_end();
    if token.is_empty() {
        return Err(ParseError::literal(start, "empty argument"));
    }
    classify_bare(token, start)
}

fn classify_bare(token: &str, offset: usize) -> Result<Literal, ParseError> {
    match token {
        "true" => return Ok(Literal::Boolean(true)),
        "false" => return Ok(Literal::Boolean(false)),
        _ => {}
    }

    let digits = token.strip_prefix('-').unwrap_or(token);
    let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    if is_digits(digits) {
        return token
            .parse::<i64>()
            .map(Literal::Integer)
            .map_err(|_| ParseError::literal(offset, format!("integer {token} out of range")));
    }
    if let Some((whole, frac)) = digits.split_once('.')
        && is_digits(whole)
        && is_digits(frac)
    {
        return token
            .parse::<f64>()
            .map(Literal::Float)
            .map_err(|e| ParseError::literal(offset, format!("bad number {token}: {e}")));
    }

    Ok(Literal::Identifier(token.to_string()))
}
