//! Accumulated output: cells, rows, and the table.
//!
//! A run produces a [`Table`]: the declared value names (in declaration
//! order) plus rows in emission order. Insertion order is the only order —
//! the table never reorders or deduplicates. Equality is value-for-value
//! across the full schema.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::sync::Arc;

/// One cell of a record: a scalar, or an ordered sequence for `List` values.
///
/// Unset scalars normalize to `""` and unset lists to `[]` at emission time,
/// so every record carries the full declared schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    Scalar(String),
    List(Vec<String>),
}

impl CellValue {
    /// The scalar content, or `None` for a list cell.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Scalar(s) => Some(s),
            CellValue::List(_) => None,
        }
    }

    /// The list content, or `None` for a scalar cell.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            CellValue::Scalar(_) => None,
            CellValue::List(items) => Some(items),
        }
    }

    /// True for an empty scalar or an empty list.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Scalar(s) => s.is_empty(),
            CellValue::List(items) => items.is_empty(),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Scalar(s) => serializer.serialize_str(s),
            CellValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

/// Borrowed view of one emitted record: value names zipped with cells.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    header: &'a [String],
    cells: &'a [CellValue],
}

impl<'a> Record<'a> {
    /// Look up a cell by value name.
    pub fn get(&self, name: &str) -> Option<&'a CellValue> {
        let idx = self.header.iter().position(|h| h == name)?;
        self.cells.get(idx)
    }

    /// Iterate `(name, cell)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a CellValue)> {
        self.header.iter().map(String::as_str).zip(self.cells.iter())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, cell) in self.iter() {
            map.serialize_entry(name, cell)?;
        }
        map.end()
    }
}

/// Ordered sequence of records sharing one schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    header: Arc<[String]>,
    /// Names of `Key` values (informational grouping identity).
    keys: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub(crate) fn new(header: Vec<String>, keys: Vec<String>) -> Self {
        Table { header: header.into(), keys, rows: Vec::new() }
    }

    /// Append a schema-complete row. Rows are only ever appended.
    pub(crate) fn push(&mut self, row: Vec<CellValue>) {
        debug_assert_eq!(row.len(), self.header.len());
        self.rows.push(row);
    }

    /// Value names in declaration order.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Names of values declared with the `Key` option.
    pub fn key_columns(&self) -> &[String] {
        &self.keys
    }

    /// Raw rows in emission order.
    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// The record at `idx`, if any.
    pub fn get(&self, idx: usize) -> Option<Record<'_>> {
        self.rows.get(idx).map(|cells| Record { header: &self.header, cells })
    }

    /// Iterate records in emission order.
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(|cells| Record { header: &self.header, cells })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for record in self.records() {
            seq.serialize_element(&record)?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut table = Table::new(
            vec!["NAME".to_string(), "ADDRS".to_string()],
            vec!["NAME".to_string()],
        );
        table.push(vec![
            CellValue::Scalar("eth0".to_string()),
            CellValue::List(vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()]),
        ]);
        table.push(vec![CellValue::Scalar(String::new()), CellValue::List(Vec::new())]);
        table
    }

    #[test]
    fn records_preserve_emission_order_and_schema() {
        let table = sample();
        assert_eq!(table.len(), 2);
        assert_eq!(table.header(), ["NAME", "ADDRS"]);
        assert_eq!(table.key_columns(), ["NAME"]);

        let first = table.get(0).unwrap();
        assert_eq!(first.get("NAME").unwrap().as_str(), Some("eth0"));
        assert_eq!(first.get("ADDRS").unwrap().as_list().unwrap().len(), 2);
        assert!(first.get("MISSING").is_none());

        let second = table.get(1).unwrap();
        assert!(second.get("NAME").unwrap().is_empty());
        assert!(second.get("ADDRS").unwrap().is_empty());
    }

    #[test]
    fn equality_is_value_for_value() {
        assert_eq!(sample(), sample());

        let mut other = sample();
        other.push(vec![CellValue::Scalar("eth1".to_string()), CellValue::List(Vec::new())]);
        assert_ne!(sample(), other);
    }

    #[test]
    fn serializes_as_array_of_objects() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"NAME": "eth0", "ADDRS": ["10.0.0.1", "10.0.0.2"]},
                {"NAME": "", "ADDRS": []},
            ])
        );
    }
}
