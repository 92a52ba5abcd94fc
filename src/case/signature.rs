use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Declared type of one method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamType {
    Int,
    Long,
    Short,
    Byte,
    Boolean,
    Char,
    Float,
    Double,
    String,
    Array(Box<ParamType>),
    /// Any other reference type, by dotted class name.
    Object(String),
}

impl ParamType {
    /// Parse a source-level type spelling: `int`, `String`, `int[]`, `char...`.
    pub fn from_java(spelling: &str) -> Option<Self> {
        let spelling = spelling.trim();
        if let Some(inner) = spelling
            .strip_suffix("[]")
            .or_else(|| spelling.strip_suffix("..."))
        {
            return Self::from_java(inner).map(|t| Self::Array(Box::new(t)));
        }
        let ty = match spelling {
            "" => return None,
            "int" => Self::Int,
            "long" => Self::Long,
            "short" => Self::Short,
            "byte" => Self::Byte,
            "boolean" => Self::Boolean,
            "char" => Self::Char,
            "float" => Self::Float,
            "double" => Self::Double,
            "String" | "java.lang.String" => Self::String,
            other => {
                // Generic arguments do not change the erased type.
                let erased = other.split('<').next().unwrap_or(other).trim();
                if erased.is_empty()
                    || !erased
                        .chars()
                        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '_' | '$'))
                {
                    return None;
                }
                Self::Object(erased.to_string())
            }
        };
        Some(ty)
    }

    pub fn descriptor(&self) -> String {
        match self {
            Self::Int => "I".into(),
            Self::Long => "J".into(),
            Self::Short => "S".into(),
            Self::Byte => "B".into(),
            Self::Boolean => "Z".into(),
            Self::Char => "C".into(),
            Self::Float => "F".into(),
            Self::Double => "D".into(),
            Self::String => "Ljava/lang/String;".into(),
            Self::Array(inner) => format!("[{}", inner.descriptor()),
            Self::Object(name) => format!("L{};", name.replace('.', "/")),
        }
    }

    /// Parse a concatenated JVM descriptor list such as `I[CLjava/lang/String;`.
    pub fn parse_descriptors(mut text: &str) -> Result<Vec<Self>, String> {
        let mut params = Vec::new();
        while !text.is_empty() {
            let (ty, rest) = Self::parse_one_descriptor(text)?;
            params.push(ty);
            text = rest;
        }
        Ok(params)
    }

    fn parse_one_descriptor(text: &str) -> Result<(Self, &str), String> {
        let mut chars = text.chars();
        let head = chars.next().ok_or("empty descriptor")?;
        let rest = chars.as_str();
        let ty = match head {
            'I' => Self::Int,
            'J' => Self::Long,
            'S' => Self::Short,
            'B' => Self::Byte,
            'Z' => Self::Boolean,
            'C' => Self::Char,
            'F' => Self::Float,
            'D' => Self::Double,
            '[' => {
                let (inner, rest) = Self::parse_one_descriptor(rest)?;
                return Ok((Self::Array(Box::new(inner)), rest));
            }
            'L' => {
                let (name, rest) = rest
                    .split_once(';')
                    .ok_or_else(|| format!("unterminated class descriptor in {text:?}"))?;
                let dotted = name.replace('/', ".");
                let ty = if dotted == "java.lang.String" {
                    Self::String
                } else {
                    Self::Object(dotted)
                };
                return Ok((ty, rest));
            }
            other => return Err(format!("unknown descriptor {other:?}")),
        };
        Ok((ty, rest))
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int => write!(f, "int"),
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
            Self::Byte => write!(f, "byte"),
            Self::Boolean => write!(f, "boolean"),
            Self::Char => write!(f, "char"),
            Self::Float => write!(f, "float"),
            Self::Double => write!(f, "double"),
            Self::String => write!(f, "String"),
            Self::Array(inner) => write!(f, "{inner}[]"),
            Self::Object(name) => write!(f, "{name}"),
        }
    }
}

/// Identity of a target method. Used only as a key; bodies are never modeled.
///
/// Prints as the JVM method id `pkg.Class.method:(II)`. Parsing also accepts
/// a trailing return descriptor (`:(II)V`), which is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct MethodSignature {
    declaring_type: String,
    name: String,
    params: Vec<ParamType>,
}

impl MethodSignature {
    pub fn new(
        declaring_type: impl Into<String>,
        name: impl Into<String>,
        params: Vec<ParamType>,
    ) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            params,
        }
    }

    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ParamType] {
        &self.params
    }
}

impl std::fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}:(", self.declaring_type, self.name)?;
        for p in &self.params {
            f.write_str(&p.descriptor())?;
        }
        f.write_str(")")
    }
}

impl FromStr for MethodSignature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (qualified, descriptor) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("method id {s:?} has no ':' separator"))?;
        let (declaring_type, name) = qualified
            .rsplit_once('.')
            .ok_or_else(|| format!("method id {s:?} has no declaring type"))?;
        if declaring_type.is_empty() || name.is_empty() {
            return Err(format!("method id {s:?} has an empty type or method name"));
        }
        let inner = descriptor
            .strip_prefix('(')
            .and_then(|d| d.split_once(')'))
            .map(|(params, _return)| params)
            .ok_or_else(|| format!("method id {s:?} has no parameter list"))?;
        let params = ParamType::parse_descriptors(inner)?;
        Ok(Self::new(declaring_type, name, params))
    }
}

impl From<MethodSignature> for String {
    fn from(sig: MethodSignature) -> Self {
        sig.to_string()
    }
}

impl TryFrom<String> for MethodSignature {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn java_spellings() {
        assert_eq!(ParamType::from_java("int"), Some(ParamType::Int));
        assert_eq!(ParamType::from_java(" String "), Some(ParamType::String));
        assert_eq!(
            ParamType::from_java("java.lang.String"),
            Some(ParamType::String)
        );
        assert_eq!(
            ParamType::from_java("char[]"),
            Some(ParamType::Array(Box::new(ParamType::Char)))
        );
        assert_eq!(
            ParamType::from_java("int..."),
            Some(ParamType::Array(Box::new(ParamType::Int)))
        );
        assert_eq!(
            ParamType::from_java("List<String>"),
            Some(ParamType::Object("List".into()))
        );
        assert_eq!(ParamType::from_java(""), None);
        assert_eq!(ParamType::from_java("a b"), None);
    }

    #[test]
    fn descriptor_list_parses() {
        let params = ParamType::parse_descriptors("I[CLjava/lang/String;Ljava/util/List;").unwrap();
        assert_eq!(
            params,
            vec![
                ParamType::Int,
                ParamType::Array(Box::new(ParamType::Char)),
                ParamType::String,
                ParamType::Object("java.util.List".into()),
            ]
        );
        assert!(ParamType::parse_descriptors("Q").is_err());
        assert!(ParamType::parse_descriptors("Ljava/lang/String").is_err());
    }

    #[test]
    fn method_id_display() {
        let sig = MethodSignature::new(
            "jpamb.cases.Strings",
            "assertIndexOfChar",
            vec![ParamType::String, ParamType::Char, ParamType::Int],
        );
        assert_eq!(
            sig.to_string(),
            "jpamb.cases.Strings.assertIndexOfChar:(Ljava/lang/String;CI)"
        );
        assert_eq!(sig.to_string().parse::<MethodSignature>().unwrap(), sig);
    }

    #[test]
    fn method_id_ignores_return_descriptor() {
        let sig: MethodSignature = "jpamb.cases.LengthAbstraction.lengthFromParam:(II)V"
            .parse()
            .unwrap();
        assert_eq!(sig.declaring_type(), "jpamb.cases.LengthAbstraction");
        assert_eq!(sig.name(), "lengthFromParam");
        assert_eq!(sig.params(), &[ParamType::Int, ParamType::Int]);
    }

    #[test]
    fn method_id_rejects_garbage() {
        assert!("noColon".parse::<MethodSignature>().is_err());
        assert!("method:(I)V".parse::<MethodSignature>().is_err());
        assert!("a.b:I".parse::<MethodSignature>().is_err());
    }

    #[test]
    fn signature_serializes_as_method_id() {
        let sig = MethodSignature::new("a.B", "f", vec![]);
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(json, "\"a.B.f:()\"");
        let back: MethodSignature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sig);
    }
}
