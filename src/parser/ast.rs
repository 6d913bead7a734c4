use serde::{Deserialize, Serialize};

use crate::semantic::{SemType, SemValue};

/// Closed set of AST node tags: grammar non-terminals, terminal leaves, and
/// the keyword/structure siblings the parser keeps in its output.
///
/// The serialized names are the artifact vocabulary every downstream stage
/// matches on, so they are pinned here rather than derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    #[serde(rename = "programa")]
    Programa,
    #[serde(rename = "main")]
    Main,
    #[serde(rename = "{")]
    LBrace,
    #[serde(rename = "}")]
    RBrace,
    #[serde(rename = "lista_declaracion")]
    ListaDeclaracion,
    #[serde(rename = "declaracion_variable")]
    DeclaracionVariable,
    #[serde(rename = "lista_sentencias")]
    ListaSentencias,
    #[serde(rename = "sent_expresion")]
    SentExpresion,
    #[serde(rename = "seleccion")]
    Seleccion,
    #[serde(rename = "if")]
    If,
    #[serde(rename = "then")]
    Then,
    #[serde(rename = "else")]
    Else,
    #[serde(rename = "end")]
    End,
    #[serde(rename = "then_block")]
    ThenBlock,
    #[serde(rename = "else_block")]
    ElseBlock,
    #[serde(rename = "iteracion")]
    Iteracion,
    #[serde(rename = "while")]
    While,
    #[serde(rename = "condicion")]
    Condicion,
    #[serde(rename = "cuerpo")]
    Cuerpo,
    #[serde(rename = "repeticion")]
    Repeticion,
    #[serde(rename = "do")]
    Do,
    #[serde(rename = "until")]
    Until,
    #[serde(rename = "sent_in")]
    SentIn,
    #[serde(rename = "cin")]
    Cin,
    #[serde(rename = ">>")]
    StreamRead,
    #[serde(rename = "sent_out")]
    SentOut,
    #[serde(rename = "cout")]
    Cout,
    #[serde(rename = "<<")]
    StreamWrite,
    #[serde(rename = "asignacion")]
    Asignacion,
    #[serde(rename = "expresion_simple")]
    ExpresionSimple,
    #[serde(rename = "termino")]
    Termino,
    #[serde(rename = "factor")]
    Factor,
    #[serde(rename = "expresion_relacional")]
    ExpresionRelacional,
    #[serde(rename = "expresion_logica")]
    ExpresionLogica,
    #[serde(rename = "id")]
    Id,
    #[serde(rename = "numero")]
    Numero,
    #[serde(rename = "bool")]
    Bool,
    #[serde(rename = "cadena")]
    Cadena,
    #[serde(rename = "error")]
    Error,
}

/// A node of the (possibly annotated) syntax tree.
///
/// The parser builds the tree; the semantic stage annotates nodes in place
/// (never restructures them) by filling `semantic_type`/`semantic_value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AstNode {
    #[serde(rename = "node_type")]
    pub kind: NodeKind,
    pub value: Option<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
    #[serde(default)]
    pub children: Vec<AstNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_type: Option<SemType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_value: Option<SemValue>,
}

impl AstNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            value: None,
            line: None,
            column: None,
            children: vec![],
            semantic_type: None,
            semantic_value: None,
        }
    }

    pub fn positioned(kind: NodeKind, line: usize, column: usize) -> Self {
        Self {
            line: Some(line),
            column: Some(column),
            ..Self::new(kind)
        }
    }

    pub fn leaf(kind: NodeKind, value: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::positioned(kind, line, column)
        }
    }

    pub fn add_child(&mut self, child: AstNode) {
        self.children.push(child);
    }

    /// First child of the given kind, if any.
    pub fn find_child(&self, kind: NodeKind) -> Option<&AstNode> {
        self.children.iter().find(|child| child.kind == kind)
    }

    pub fn find_child_mut(&mut self, kind: NodeKind) -> Option<&mut AstNode> {
        self.children.iter_mut().find(|child| child.kind == kind)
    }

    pub fn value_str(&self) -> &str {
        self.value.as_deref().unwrap_or_default()
    }

    pub fn position(&self) -> (usize, usize) {
        (self.line.unwrap_or(0), self.column.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_kind_serializes_to_artifact_names() {
        let json = serde_json::to_string(&NodeKind::DeclaracionVariable).unwrap();
        assert_eq!(json, "\"declaracion_variable\"");

        let json = serde_json::to_string(&NodeKind::StreamWrite).unwrap();
        assert_eq!(json, "\"<<\"");
    }

    #[test]
    fn test_unannotated_node_omits_semantic_fields() {
        let node = AstNode::leaf(NodeKind::Numero, "42", 1, 1);
        let json = serde_json::to_value(&node).unwrap();

        assert_eq!(json["node_type"], "numero");
        assert_eq!(json["value"], "42");
        assert!(json.get("semantic_type").is_none());
        assert!(json.get("semantic_value").is_none());
    }

    #[test]
    fn test_json_round_trip_is_structural_identity() {
        let mut tree = AstNode::positioned(NodeKind::Programa, 1, 1);
        tree.add_child(AstNode::leaf(NodeKind::Main, "main", 1, 1));
        let mut list = AstNode::new(NodeKind::ListaDeclaracion);
        list.add_child(AstNode::leaf(NodeKind::Id, "x", 2, 3));
        tree.add_child(list);

        let json = serde_json::to_string(&tree).unwrap();
        let back: AstNode = serde_json::from_str(&json).unwrap();

        assert_eq!(tree, back);
    }
}
