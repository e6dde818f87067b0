use std::{collections::BTreeMap, path::Path};

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

use super::{Table, TableAdapter};
use crate::{
    assemble::TableResult,
    error::{Error, Result},
    io_utils,
    tree::{Node, Scalar, ScalarFormat},
};

/// Pretty-printed JSON documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonAdapter;

impl TableAdapter for JsonAdapter {
    fn read(&self, path: &Path) -> Result<Table> {
        let text = io_utils::read_to_string(path)?;
        let value: Value = serde_json::from_str(&text).map_err(|err| Error::adapter(path, err))?;
        document_from_json(value).map(Table::Document)
    }

    fn write(&self, path: &Path, table: Table) -> Result<()> {
        let value = document_to_json(&table.into_document()?)?;
        let mut text =
            serde_json::to_string_pretty(&value).map_err(|err| Error::adapter(path, err))?;
        text.push('\n');
        io_utils::write_file(path, text.as_bytes())
    }
}

/// An array of objects reads as a sequence, an object of objects as a keyed
/// table. Anything else is rejected.
pub fn document_from_json(value: Value) -> Result<TableResult> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| row_from_json(&(idx + 1).to_string(), item))
            .collect::<Result<Vec<_>>>()
            .map(TableResult::Sequence),
        Value::Object(entries) => entries
            .into_iter()
            .map(|(key, item)| row_from_json(&key, item).map(|row| (key, row)))
            .collect::<Result<IndexMap<_, _>>>()
            .map(TableResult::Keyed),
        other => Err(Error::value(format!(
            "top-level JSON value must be an array or an object of records, found {}",
            json_kind(&other)
        ))),
    }
}

pub fn document_to_json(document: &TableResult) -> Result<Value> {
    Ok(match document {
        TableResult::Sequence(rows) => {
            Value::Array(rows.iter().map(node_to_json).collect::<Result<_>>()?)
        }
        TableResult::Keyed(rows) => Value::Object(
            rows.iter()
                .map(|(key, row)| Ok((key.clone(), node_to_json(row)?)))
                .collect::<Result<Map<_, _>>>()?,
        ),
    })
}

fn row_from_json(address: &str, item: Value) -> Result<Node> {
    match item {
        Value::Object(_) => Ok(node_from_json(item).unwrap_or_else(Node::record)),
        other => Err(Error::value(format!(
            "entry {address} is {}, expected an object",
            json_kind(&other)
        ))),
    }
}

/// `None` for `null`, which stands for an absent value.
fn node_from_json(value: Value) -> Option<Node> {
    match value {
        Value::Null => None,
        Value::Bool(flag) => Some(Node::scalar(flag.to_string(), ScalarFormat::Bool)),
        Value::Number(number) => Some(Node::scalar(number.to_string(), ScalarFormat::Number)),
        Value::String(text) => Some(Node::scalar(text, ScalarFormat::String)),
        Value::Array(items) => Some(Node::Array(
            items
                .into_iter()
                .enumerate()
                .filter_map(|(idx, item)| node_from_json(item).map(|node| (idx, node)))
                .collect(),
        )),
        Value::Object(entries) => Some(Node::Record(
            entries
                .into_iter()
                .filter_map(|(key, item)| node_from_json(item).map(|node| (key, node)))
                .collect(),
        )),
    }
}

fn node_to_json(node: &Node) -> Result<Value> {
    match node {
        Node::Scalar(scalar) => scalar_to_json(scalar),
        Node::Array(slots) => array_to_json(slots),
        Node::Record(fields) => Ok(Value::Object(
            fields
                .iter()
                .map(|(key, child)| Ok((key.clone(), node_to_json(child)?)))
                .collect::<Result<Map<_, _>>>()?,
        )),
    }
}

fn array_to_json(slots: &BTreeMap<usize, Node>) -> Result<Value> {
    let len = slots.keys().next_back().map_or(0, |last| last + 1);
    let mut items = vec![Value::Null; len];
    for (idx, child) in slots {
        items[*idx] = node_to_json(child)?;
    }
    Ok(Value::Array(items))
}

fn scalar_to_json(scalar: &Scalar) -> Result<Value> {
    let raw = scalar.raw.as_str();
    match scalar.format {
        ScalarFormat::String => Ok(Value::String(raw.to_string())),
        ScalarFormat::Number => raw
            .trim()
            .parse::<Number>()
            .map(Value::Number)
            .map_err(|_| Error::value(format!("'{raw}' is not a valid JSON number"))),
        ScalarFormat::Bool => match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(Error::value(format!("'{raw}' is not a boolean"))),
        },
        ScalarFormat::Raw => serde_json::from_str(raw)
            .map_err(|_| Error::value(format!("raw value '{raw}' is not valid JSON"))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::assemble::parse_table;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    #[test]
    fn sequence_renders_as_array_with_unquoted_numbers() {
        let document =
            parse_table(&rows(&[&["ID_KN", "x_N"], &["1", "10"], &["2", "20"]])).unwrap();
        assert_eq!(
            document_to_json(&document).unwrap(),
            json!([{ "x": 10 }, { "x": 20 }])
        );
    }

    #[test]
    fn keyed_table_renders_as_object() {
        let document = parse_table(&rows(&[
            &["name_KS", "score_N", "alive_B"],
            &["alice", "5", "true"],
            &["bob", "9", ""],
        ]))
        .unwrap();
        assert_eq!(
            document_to_json(&document).unwrap(),
            json!({ "alice": { "score": 5, "alive": true }, "bob": { "score": 9 } })
        );
    }

    #[test]
    fn sparse_arrays_are_padded_with_null() {
        let document =
            parse_table(&rows(&[&["items_A_0", "items_A_2"], &["a", "c"]])).unwrap();
        assert_eq!(
            document_to_json(&document).unwrap(),
            json!([{ "items": ["a", null, "c"] }])
        );
    }

    #[test]
    fn invalid_literals_are_value_errors() {
        let document = parse_table(&rows(&[&["x_N"], &["ten"]])).unwrap();
        let err = document_to_json(&document).unwrap_err();
        assert!(matches!(err, Error::Value(_)), "unexpected error {err:?}");

        let document = parse_table(&rows(&[&["fx_L"], &["{1,2}"]])).unwrap();
        assert!(document_to_json(&document).is_err());

        let document = parse_table(&rows(&[&["fx_L"], &["[1,2]"]])).unwrap();
        assert_eq!(
            document_to_json(&document).unwrap(),
            json!([{ "fx": [1, 2] }])
        );
    }

    #[test]
    fn reading_maps_null_to_absent_and_arrays_by_position() {
        let document =
            document_from_json(json!([{ "a": null, "b": [1, null, "x"], "c": { "d": false } }]))
                .unwrap();
        let TableResult::Sequence(rows) = document else {
            panic!("expected a sequence");
        };
        let record = rows[0].as_record().unwrap();
        assert!(!record.contains_key("a"));
        let slots = record["b"].as_array().unwrap();
        assert_eq!(slots.keys().copied().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(slots[&2], Node::scalar("x", ScalarFormat::String));
        assert_eq!(
            record["c"].as_record().unwrap()["d"],
            Node::scalar("false", ScalarFormat::Bool)
        );
    }

    #[test]
    fn reading_rejects_unsupported_shapes() {
        assert!(document_from_json(json!(5)).is_err());
        assert!(document_from_json(json!([1, 2])).is_err());
        assert!(document_from_json(json!({ "a": "b" })).is_err());
        assert!(matches!(
            document_from_json(json!({})).unwrap(),
            TableResult::Keyed(_)
        ));
    }
}
