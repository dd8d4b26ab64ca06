use indexmap::{IndexMap, IndexSet};

use crate::data::PreparedRecord;
use crate::encode::Cell;
use crate::types::AttributeName;

/// Union of attribute names observed in one build, in first-seen order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttributeSchema {
    names: IndexSet<AttributeName>,
}

impl AttributeSchema {
    /// Collect the attribute union across `records`.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a IndexMap<AttributeName, Cell>>,
    {
        let mut names = IndexSet::new();
        for record in records {
            for name in record.keys() {
                if !names.contains(name) {
                    names.insert(name.clone());
                }
            }
        }
        Self { names }
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True for an empty schema.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// True when `name` is part of the schema.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Names in first-seen order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Rebuild `cells` so it holds exactly the schema keys in schema order.
    ///
    /// Absent keys become `Cell::Missing`; keys outside the schema are dropped.
    pub fn reconcile(&self, cells: &IndexMap<AttributeName, Cell>) -> IndexMap<AttributeName, Cell> {
        self.names
            .iter()
            .map(|name| {
                let cell = cells.get(name).cloned().unwrap_or(Cell::Missing);
                (name.clone(), cell)
            })
            .collect()
    }
}

/// Reconcile every record against the union schema of the batch.
pub fn reconcile_records(records: &mut [PreparedRecord]) -> AttributeSchema {
    let schema = AttributeSchema::from_records(records.iter().map(|record| &record.cells));
    for record in records.iter_mut() {
        record.cells = schema.reconcile(&record.cells);
    }
    schema
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::tokens::MISSING_VALUE_TOKEN;
    use serde_json::json;

    fn record(pairs: &[(&str, serde_json::Value)]) -> PreparedRecord {
        PreparedRecord {
            cells: pairs
                .iter()
                .map(|(name, value)| (name.to_string(), Cell::from_value(value)))
                .collect(),
            derived: None,
        }
    }

    #[test]
    fn gaps_are_filled_with_sentinel() {
        let mut records = vec![
            record(&[("a", json!(1)), ("b", json!(2))]),
            record(&[("a", json!(3))]),
        ];
        let schema = reconcile_records(&mut records);
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["a", "b"]);

        let first: Vec<(String, serde_json::Value)> = records[0]
            .cells
            .iter()
            .map(|(k, v)| (k.clone(), v.decode()))
            .collect();
        assert_eq!(
            first,
            vec![("a".to_string(), json!(1)), ("b".to_string(), json!(2))]
        );
        assert_eq!(records[1].cells["a"].decode(), json!(3));
        assert_eq!(records[1].cells["b"].to_wire(), MISSING_VALUE_TOKEN);

        let left: Vec<&String> = records[0].cells.keys().collect();
        let right: Vec<&String> = records[1].cells.keys().collect();
        assert_eq!(left, right);
    }

    #[test]
    fn schema_order_is_first_seen_and_stable() {
        let mut records = vec![
            record(&[("c", json!("x"))]),
            record(&[("a", json!("y")), ("c", json!("z"))]),
            record(&[("b", json!(null))]),
        ];
        let schema = reconcile_records(&mut records);
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["c", "a", "b"]);
        for record in &records {
            assert_eq!(record.cells.keys().collect::<Vec<_>>(), vec!["c", "a", "b"]);
        }
        assert!(records[2].cells.values().all(Cell::is_missing));
    }

    #[test]
    fn empty_batch_yields_empty_schema() {
        let mut records: Vec<PreparedRecord> = Vec::new();
        let schema = reconcile_records(&mut records);
        assert!(schema.is_empty());
        assert!(!schema.contains("a"));
    }
}
