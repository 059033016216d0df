//! Search compilation and evaluation.
//!
//! A search is a JSON object whose keys are either connectives (`and`,
//! `or`) mapping to a nested object, or index keys mapping to the request
//! value. Sibling conditions are joined with `and`:
//!
//! ```json
//! {"or": {"status": "open", "and": {"priority": 3, "title": "*bug*"}}}
//! ```
//!
//! The operator of each condition is the one declared for the key; requests
//! cannot choose it. Compilation yields a [`Predicate`] tree whose leaves
//! point into an ordered parameter list.

use crate::error::{StorageError, StorageResult};
use crate::index::{load_definition, load_entries};
use crate::store::active_documents;
use crate::Store;
use depot_types::{IndexDefinition, IndexValue, Operand, Operator};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// A compiled search condition over one document.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Every child holds; vacuously true when empty.
    All(Vec<Predicate>),
    /// At least one child holds; false when empty.
    Any(Vec<Predicate>),
    /// At least one entry of `key` satisfies `operator` against
    /// parameter `param`.
    Leaf {
        key: String,
        operator: Operator,
        param: usize,
    },
}

/// A predicate tree with its parameter list.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    predicate: Predicate,
    params: Vec<Operand>,
}

impl CompiledQuery {
    /// Compiles `tree` against the keys declared in `def`.
    pub fn compile(tree: &Value, def: &IndexDefinition) -> StorageResult<Self> {
        let map = tree
            .as_object()
            .ok_or_else(|| StorageError::InvalidSearch(format!("expected an object, got {tree}")))?;
        if map.is_empty() {
            return Err(StorageError::EmptySearch);
        }
        let mut params = Vec::new();
        let predicate = Predicate::All(compile_children(map, def, &mut params)?);
        Ok(Self { predicate, params })
    }

    #[must_use]
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    #[must_use]
    pub fn params(&self) -> &[Operand] {
        &self.params
    }

    /// Index keys the predicate reads.
    #[must_use]
    pub fn keys(&self) -> BTreeSet<&str> {
        let mut keys = BTreeSet::new();
        collect_keys(&self.predicate, &mut keys);
        keys
    }

    /// Evaluates the predicate against one document's entries, keyed by
    /// index key.
    #[must_use]
    pub fn matches(&self, entries: &HashMap<String, Vec<IndexValue>>) -> bool {
        self.eval(&self.predicate, entries)
    }

    fn eval(&self, predicate: &Predicate, entries: &HashMap<String, Vec<IndexValue>>) -> bool {
        match predicate {
            Predicate::All(children) => children.iter().all(|c| self.eval(c, entries)),
            Predicate::Any(children) => children.iter().any(|c| self.eval(c, entries)),
            Predicate::Leaf { key, operator, param } => {
                let Some(operand) = self.params.get(*param) else {
                    return false;
                };
                entries
                    .get(key)
                    .is_some_and(|values| values.iter().any(|v| operator.matches(v, operand)))
            }
        }
    }
}

fn compile_children(
    map: &Map<String, Value>,
    def: &IndexDefinition,
    params: &mut Vec<Operand>,
) -> StorageResult<Vec<Predicate>> {
    map.iter()
        .map(|(name, value)| compile_node(name, value, def, params))
        .collect()
}

fn compile_node(
    name: &str,
    value: &Value,
    def: &IndexDefinition,
    params: &mut Vec<Operand>,
) -> StorageResult<Predicate> {
    match name {
        "and" | "or" => {
            let children = value.as_object().ok_or_else(|| {
                StorageError::InvalidSearch(format!("{name} must map to an object, got {value}"))
            })?;
            if children.is_empty() {
                return Err(StorageError::EmptySearch);
            }
            let children = compile_children(children, def, params)?;
            Ok(if name == "and" {
                Predicate::All(children)
            } else {
                Predicate::Any(children)
            })
        }
        key => {
            let declared = def
                .get(key)
                .ok_or_else(|| StorageError::InvalidSearchKey(key.to_string()))?;
            params.push(Operand::for_operator(declared.operator, value));
            Ok(Predicate::Leaf {
                key: key.to_string(),
                operator: declared.operator,
                param: params.len() - 1,
            })
        }
    }
}

fn collect_keys<'a>(predicate: &'a Predicate, keys: &mut BTreeSet<&'a str>) {
    match predicate {
        Predicate::All(children) | Predicate::Any(children) => {
            for child in children {
                collect_keys(child, keys);
            }
        }
        Predicate::Leaf { key, .. } => {
            keys.insert(key);
        }
    }
}

/// Builds a search tree from query-string pairs: each pair is a string
/// condition, all joined with `and`.
#[must_use]
pub fn tree_from_pairs<I, K, V>(pairs: I) -> Value
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let map: Map<String, Value> = pairs
        .into_iter()
        .map(|(k, v)| (k.into(), Value::String(v.into())))
        .collect();
    Value::Object(map)
}

impl Store {
    /// Runs a search over `bin`, returning matching documents by id.
    pub fn search(&self, bin: &str, tree: &Value) -> StorageResult<BTreeMap<String, Value>> {
        let conn = self.conn()?;
        let def = load_definition(&conn, bin)?;
        let query = CompiledQuery::compile(tree, &def)?;
        let cfg = self.config_with(&conn, bin)?;

        let entries = load_entries(&conn, bin, &query.keys())?;
        let empty = HashMap::new();
        let mut hits = BTreeMap::new();
        for (id, content) in active_documents(&conn, bin)? {
            let doc_entries = entries.get(&id).unwrap_or(&empty);
            if query.matches(doc_entries) {
                let content = cfg.apply(&id, content);
                hits.insert(id, content);
            }
        }

        debug!(bin, params = query.params().len(), hits = hits.len(), "search");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn def() -> IndexDefinition {
        IndexDefinition::new()
            .with_key("name", "/name", Operator::Eq)
            .with_key("age", "/age", Operator::Gt)
            .with_key("tags", "/tags", Operator::InList)
            .with_key("title", "/title", Operator::Glob)
    }

    fn entries(pairs: &[(&str, Value)]) -> HashMap<String, Vec<IndexValue>> {
        let mut map: HashMap<String, Vec<IndexValue>> = HashMap::new();
        for (k, v) in pairs {
            map.entry((*k).to_string()).or_default().push(IndexValue::encode(Some(v)));
        }
        map
    }

    #[test]
    fn siblings_compile_to_all() {
        let q = CompiledQuery::compile(&json!({"name": "bob", "age": 30}), &def()).unwrap();
        let Predicate::All(children) = q.predicate() else {
            panic!("expected All, got {:?}", q.predicate());
        };
        assert_eq!(children.len(), 2);
        assert_eq!(q.params().len(), 2);
    }

    #[test]
    fn nested_connectives() {
        let q = CompiledQuery::compile(
            &json!({"or": {"name": "bob", "and": {"age": 30, "title": "R*"}}}),
            &def(),
        )
        .unwrap();
        assert_eq!(q.keys().into_iter().collect::<Vec<_>>(), vec!["age", "name", "title"]);

        assert!(q.matches(&entries(&[("name", json!("bob"))])));
        assert!(q.matches(&entries(&[("age", json!(40)), ("title", json!("Rust"))])));
        assert!(!q.matches(&entries(&[("age", json!(20)), ("title", json!("Rust"))])));
        assert!(!q.matches(&entries(&[("age", json!(40)), ("title", json!("Go"))])));
    }

    #[test]
    fn in_list_matches_any_element() {
        let q = CompiledQuery::compile(&json!({"tags": "b"}), &def()).unwrap();
        assert!(q.matches(&entries(&[("tags", json!("a")), ("tags", json!("b"))])));
        assert!(!q.matches(&entries(&[("tags", json!("c"))])));
        assert!(!q.matches(&HashMap::new()));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = CompiledQuery::compile(&json!({"and": {"nope": 1}}), &def()).unwrap_err();
        assert!(matches!(err, StorageError::InvalidSearchKey(ref k) if k == "nope"));
        assert_eq!(err.to_string(), "Not a search key: nope");
    }

    #[test]
    fn empty_tree_is_rejected() {
        assert!(matches!(
            CompiledQuery::compile(&json!({}), &def()),
            Err(StorageError::EmptySearch)
        ));
    }

    #[test]
    fn connective_requires_object() {
        assert!(matches!(
            CompiledQuery::compile(&json!({"or": [1, 2]}), &def()),
            Err(StorageError::InvalidSearch(_))
        ));
        assert!(matches!(
            CompiledQuery::compile(&json!("name"), &def()),
            Err(StorageError::InvalidSearch(_))
        ));
    }

    #[test]
    fn empty_connectives_are_rejected() {
        for tree in [
            json!({"or": {}}),
            json!({"and": {}}),
            json!({"name": "bob", "or": {"age": 3, "and": {}}}),
        ] {
            assert!(
                matches!(CompiledQuery::compile(&tree, &def()), Err(StorageError::EmptySearch)),
                "{tree}"
            );
        }
    }

    #[test]
    fn tree_from_pairs_builds_string_conditions() {
        let tree = tree_from_pairs([("name", "bob"), ("age", "3")]);
        assert_eq!(tree, json!({"name": "bob", "age": "3"}));
    }
}
