use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::types::{SemType, SemValue};

/// One declared variable. The whole program shares a single flat scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub ty: SemType,
    pub declared_line: usize,
    pub declared_column: usize,
    pub is_initialized: bool,
    /// Present only while every assignment so far had a statically known
    /// value and the variable was never the target of a `cin`.
    pub const_value: Option<SemValue>,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn insert(&mut self, symbol: Symbol) {
        self.symbols.insert(symbol.name.clone(), symbol);
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        self.symbols.get_mut(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Per-name usage record, serialized as the symbol-table artifact:
/// `{ "<name>": { "type": …, "lines": […], "address": … } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossReference {
    #[serde(rename = "type")]
    pub ty: SemType,
    pub lines: BTreeSet<usize>,
    pub address: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrossReferenceTable {
    entries: BTreeMap<String, CrossReference>,
    #[serde(skip)]
    next_address: usize,
}

impl CrossReferenceTable {
    /// Register a declaration, assigning the next address (addresses start
    /// at 1).
    pub fn declare(&mut self, name: &str, ty: SemType, line: usize) {
        self.next_address += 1;
        self.entries.insert(
            name.to_string(),
            CrossReference {
                ty,
                lines: BTreeSet::from([line]),
                address: self.next_address,
            },
        );
    }

    /// Record a use of `name` at `line`; unknown names are ignored.
    pub fn record_use(&mut self, name: &str, line: usize) {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.lines.insert(line);
        }
    }

    pub fn get(&self, name: &str) -> Option<&CrossReference> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CrossReference)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addresses_are_assigned_in_declaration_order() {
        let mut table = CrossReferenceTable::default();
        table.declare("b", SemType::Int, 2);
        table.declare("a", SemType::Float, 3);

        assert_eq!(table.get("b").unwrap().address, 1);
        assert_eq!(table.get("a").unwrap().address, 2);
    }

    #[test]
    fn test_lines_are_a_sorted_set() {
        let mut table = CrossReferenceTable::default();
        table.declare("x", SemType::Int, 5);
        table.record_use("x", 9);
        table.record_use("x", 7);
        table.record_use("x", 9);

        let lines: Vec<usize> = table.get("x").unwrap().lines.iter().copied().collect();
        assert_eq!(lines, vec![5, 7, 9]);
    }

    #[test]
    fn test_artifact_shape() {
        let mut table = CrossReferenceTable::default();
        table.declare("x", SemType::Bool, 1);

        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["x"]["type"], "bool");
        assert_eq!(json["x"]["address"], 1);
        assert_eq!(json["x"]["lines"][0], 1);
    }
}
