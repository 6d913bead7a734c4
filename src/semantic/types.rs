use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Semantic types of the language plus the internal tags used while
/// checking: `string` for string literals, `error` for poisoned subtrees,
/// `void`/`structural` for statement and structure nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemType {
    Int,
    Float,
    Bool,
    String,
    Error,
    Void,
    Structural,
}

impl SemType {
    /// The declarable subset, from a type keyword.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" => Some(SemType::Int),
            "float" => Some(SemType::Float),
            "bool" => Some(SemType::Bool),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, SemType::Int | SemType::Float)
    }

    pub fn is_printable(&self) -> bool {
        matches!(
            self,
            SemType::Int | SemType::Float | SemType::Bool | SemType::String | SemType::Error
        )
    }
}

impl Display for SemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SemType::Int => "int",
            SemType::Float => "float",
            SemType::Bool => "bool",
            SemType::String => "string",
            SemType::Error => "error",
            SemType::Void => "void",
            SemType::Structural => "structural",
        };
        f.write_str(name)
    }
}

/// A statically computed value attached to an AST node during checking.
///
/// Serialized untagged so the annotated AST carries plain JSON scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SemValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl SemValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SemValue::Int(v) => Some(*v as f64),
            SemValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SemValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}
