//! Fixture loader: pulls `@Case("...")` annotations out of Java sources and
//! pairs each with the method it decorates.

use crate::case::{MethodSignature, ParamType};
use crate::error::{Error, Result};
use fancy_regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// One annotation as written in source.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCase {
    pub signature: MethodSignature,
    pub text: String,
    pub file: PathBuf,
    pub line: usize,
}

/// Everything found under the source roots. Files that could not be read or
/// understood are reported in `errors` and do not stop the scan.
#[derive(Debug, Default)]
pub struct SourceScan {
    pub cases: Vec<RawCase>,
    pub errors: Vec<Error>,
}

impl SourceScan {
    /// `(signature, text)` pairs in source order, ready for `registry::load`.
    pub fn pairs(&self) -> impl Iterator<Item = (MethodSignature, &str)> {
        self.cases
            .iter()
            .map(|c| (c.signature.clone(), c.text.as_str()))
    }
}

/// Build output and VCS metadata, never fixture sources.
const EXCLUDED_DIRS: &[&str] = &["/target/", "/build/", "/.git/", "/out/"];

struct Patterns {
    package: Regex,
    class: Regex,
    case: Regex,
    method: Regex,
}

static PATTERNS: LazyLock<std::result::Result<Patterns, String>> =
    LazyLock::new(|| -> std::result::Result<Patterns, String> {
        let compile = |p: &str| Regex::new(p).map_err(|e| format!("bad pattern {p}: {e}"));
        Ok(Patterns {
            package: compile(r"^\s*package\s+([\w.]+)\s*;")?,
            class: compile(
                r"^\s*(?:(?:public|protected|private|final|abstract|static)\s+)*(?:class|interface|enum|record)\s+(\w+)",
            )?,
            case: compile(r#"@Case\(\s*"((?:[^"\\]|\\.)*)"\s*\)"#)?,
            method: compile(
                r"^\s*(?:@\w+(?:\([^)]*\))?\s+)*(?:(?:public|protected|private|static|final|synchronized|abstract|native)\s+)*(?:<[^>]+>\s+)?(?!return\b|new\b|else\b)[\w.$]+(?:<[^()]*>)?(?:\[\])*\s+(\w+)\s*\(([^)]*)\)",
            )?,
        })
    });

fn patterns() -> Result<&'static Patterns> {
    PATTERNS.as_ref().map_err(|e| Error::fixture("<patterns>", e.clone()))
}

/// Walk every root and scan each `.java` file, in path order.
pub fn scan_sources(roots: &[PathBuf]) -> SourceScan {
    let mut scan = SourceScan::default();

    for root in roots {
        if !root.exists() {
            warn!(path = %root.display(), "fixture source root does not exist");
            scan.errors.push(Error::fixture(
                root.display().to_string(),
                "source root does not exist",
            ));
            continue;
        }

        let files = collect_java_files(root);
        info!(root = %root.display(), count = files.len(), "found Java source files");

        for path in files {
            let content = match std::fs::read_to_string(&path) {
                Ok(c) => c,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "could not read fixture source");
                    scan.errors
                        .push(Error::fixture(path.display().to_string(), e.to_string()));
                    continue;
                }
            };
            match scan_file(&content, &path) {
                Ok(cases) => {
                    debug!(file = %path.display(), cases = cases.len(), "scanned");
                    scan.cases.extend(cases);
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping fixture source");
                    scan.errors.push(e);
                }
            }
        }
    }

    info!(
        cases = scan.cases.len(),
        errors = scan.errors.len(),
        "fixture scan complete"
    );
    scan
}

fn collect_java_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|path| {
            let path_str = path.to_string_lossy();
            path.extension().is_some_and(|ext| ext == "java")
                && !EXCLUDED_DIRS.iter().any(|d| path_str.contains(d))
        })
        .collect()
}

/// Scan one source file.
///
/// Annotations bind to the next method declaration, which may sit on the
/// same line after them. Annotations left over at the end of the file, or on
/// a method whose parameter types cannot be read, fail the whole file: their
/// cases would otherwise vanish without a trace.
pub fn scan_file(content: &str, path: &Path) -> Result<Vec<RawCase>> {
    let p = patterns()?;
    let file_err =
        |line: usize, msg: String| Error::fixture(format!("{}:{line}", path.display()), msg);

    let mut package: Option<String> = None;
    let mut class: Option<String> = None;
    let mut pending: Vec<(String, usize)> = Vec::new();
    let mut cases = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_number = idx + 1;
        let trimmed = line.trim_start();
        if trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('*') {
            continue;
        }

        if package.is_none()
            && let Some(name) = capture(&p.package, line, 1)
        {
            package = Some(name.to_string());
            continue;
        }
        if class.is_none()
            && let Some(name) = capture(&p.class, line, 1)
        {
            class = Some(name.to_string());
            continue;
        }

        // A declaration may share the line with its annotations.
        let mut declaration = line;
        for caps in p.case.captures_iter(line).filter_map(|c| c.ok()) {
            if let Some(m) = caps.get(1) {
                pending.push((unescape_java(m.as_str()), line_number));
            }
            if let Some(whole) = caps.get(0) {
                declaration = &line[whole.end()..];
            }
        }
        if pending.is_empty() {
            continue;
        }

        let Ok(Some(caps)) = p.method.captures(declaration) else {
            continue;
        };
        let (Some(name), Some(param_list)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let Some(class_name) = class.as_deref() else {
            return Err(file_err(line_number, "method declared before any class".into()));
        };
        let params = parse_params(param_list.as_str())
            .map_err(|msg| file_err(line_number, format!("method {}: {msg}", name.as_str())))?;
        let declaring_type = match &package {
            Some(pkg) => format!("{pkg}.{class_name}"),
            None => class_name.to_string(),
        };
        let signature = MethodSignature::new(declaring_type, name.as_str(), params);

        for (text, at) in pending.drain(..) {
            cases.push(RawCase {
                signature: signature.clone(),
                text,
                file: path.to_path_buf(),
                line: at,
            });
        }
    }

    if let Some((text, line)) = pending.first() {
        return Err(file_err(
            *line,
            format!("case {text:?} is not followed by a method declaration"),
        ));
    }
    Ok(cases)
}

fn capture<'t>(re: &Regex, line: &'t str, group: usize) -> Option<&'t str> {
    re.captures(line)
        .ok()
        .flatten()
        .and_then(|c| c.get(group))
        .map(|m| m.as_str())
}

/// Parse a declared parameter list such as `final String s, int[] xs, Map<K, V> m`.
fn parse_params(list: &str) -> std::result::Result<Vec<ParamType>, String> {
    split_top_level(list)
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .map(|param| {
            let words: Vec<&str> = param
                .split_whitespace()
                .filter(|w| *w != "final" && !w.starts_with('@'))
                .collect();
            let (name, ty_words) = words
                .split_last()
                .ok_or_else(|| format!("empty parameter in ({list})"))?;
            let mut spelling = ty_words.join(" ");
            // C-style array declarators: `int a[]`
            let mut name = *name;
            while let Some(stripped) = name.strip_suffix("[]") {
                spelling.push_str("[]");
                name = stripped;
            }
            ParamType::from_java(&spelling)
                .ok_or_else(|| format!("unsupported parameter type {spelling:?}"))
        })
        .collect()
}

/// Split on commas that are not inside generic brackets.
fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
}

/// Undo Java string-literal escaping.
fn unescape_java(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRINGS: &str = r#"package jpamb.cases;

public class Strings {

    @Case("(\"Hello World!\") -> ok")
    @Case("(\"Hello World\") -> assertion error")
    public static void assertEqualDirectly(String s) {
        String t = "Hello World!";
        assert t.equals(s);
    }

    public static String concatA(String s) {
        return s + "A";
    }

    @Case("(0, 5) -> ok")      // 0 / +  -> 0
    // @Case("(9, 9) -> ok")
    public static int div(int a, int b) {
        return a / b;
    }
}
"#;

    #[test]
    fn binds_annotations_to_next_method() {
        let cases = scan_file(STRINGS, Path::new("Strings.java")).unwrap();
        assert_eq!(cases.len(), 3);

        let sig = &cases[0].signature;
        assert_eq!(sig.declaring_type(), "jpamb.cases.Strings");
        assert_eq!(sig.name(), "assertEqualDirectly");
        assert_eq!(sig.params(), &[ParamType::String]);
        assert_eq!(cases[0].text, r#"("Hello World!") -> ok"#);
        assert_eq!(cases[0].line, 5);
        assert_eq!(cases[1].text, r#"("Hello World") -> assertion error"#);

        assert_eq!(cases[2].signature.name(), "div");
        assert_eq!(
            cases[2].signature.params(),
            &[ParamType::Int, ParamType::Int]
        );
        assert_eq!(cases[2].text, "(0, 5) -> ok");
    }

    #[test]
    fn annotation_on_declaration_line_binds_to_that_method() {
        let src = r#"package p;
public class C {
    @Case("(1) -> ok") public static int f(int x) {
        return x;
    }

    @Case("('a', 'b') -> vulnerable")
    @Case("(\"x\", \"y\") -> ok") public void g(String a, String b) {
    }
}
"#;
        let cases = scan_file(src, Path::new("C.java")).unwrap();
        assert_eq!(cases.len(), 3);
        assert_eq!(cases[0].text, "(1) -> ok");
        assert_eq!(cases[0].signature.to_string(), "p.C.f:(I)");
        assert_eq!(cases[0].line, 3);
        assert_eq!(
            cases[1].signature.to_string(),
            "p.C.g:(Ljava/lang/String;Ljava/lang/String;)"
        );
        assert_eq!(cases[2].text, r#"("x", "y") -> ok"#);
        assert_eq!(cases[2].signature.name(), "g");
    }

    #[test]
    fn dangling_annotation_fails_file() {
        let src = "package p;\nclass C {\n  @Case(\"() -> ok\")\n}\n";
        let err = scan_file(src, Path::new("C.java")).unwrap_err();
        assert!(err.to_string().contains("C.java:3"), "{err}");
    }

    #[test]
    fn instance_methods_and_no_package() {
        let src = r#"public class Vulnerable {
  @Case("('john', 'password') -> vulnerable")
  public void simpleTainted(String username, String password) {
  }
}"#;
        let cases = scan_file(src, Path::new("Vulnerable.java")).unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].signature.declaring_type(), "Vulnerable");
        assert_eq!(cases[0].signature.name(), "simpleTainted");
        assert_eq!(cases[0].text, "('john', 'password') -> vulnerable");
    }

    #[test]
    fn param_lists() {
        assert_eq!(parse_params("").unwrap(), vec![]);
        assert_eq!(
            parse_params("final int[] xs, char c[], Map<String, Integer> m").unwrap(),
            vec![
                ParamType::Array(Box::new(ParamType::Int)),
                ParamType::Array(Box::new(ParamType::Char)),
                ParamType::Object("Map".into()),
            ]
        );
        assert!(parse_params("int").is_err());
    }

    #[test]
    fn java_unescaping() {
        assert_eq!(unescape_java(r#"(\"a\\b\") -> ok"#), r#"("a\b") -> ok"#);
        assert_eq!(unescape_java(r"\'x\'"), "'x'");
    }
}
