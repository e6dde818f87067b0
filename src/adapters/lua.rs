//! Lua table documents.
//!
//! Writing needs nothing but string building. Reading executes the file in a
//! Lua state limited to the `table`, `string` and `math` libraries and converts
//! the global named after the file stem.

#[cfg(feature = "lua")]
use std::collections::BTreeMap;
use std::{fmt::Write as _, path::Path};

use itertools::Itertools;

use super::{Table, TableAdapter};
use crate::{
    assemble::TableResult,
    error::{AdapterError, Error, Result},
    io_utils,
    tree::{Node, quote},
};

const RESERVED_WORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct LuaAdapter;

impl TableAdapter for LuaAdapter {
    fn read(&self, path: &Path) -> Result<Table> {
        let source = io_utils::read_to_string(path)?;
        read_document(path, &source).map(Table::Document)
    }

    fn write(&self, path: &Path, table: Table) -> Result<()> {
        let document = table.into_document()?;
        let text = render_document(&io_utils::document_name(path), &document);
        io_utils::write_file(path, text.as_bytes())
    }
}

/// Renders `document` as an assignment to the global `name`.
///
/// ```text
/// items = {
/// 	{
/// 		x = 10,
/// 		tags = {"a", "b"},
/// 	},
/// }
/// ```
pub fn render_document(name: &str, document: &TableResult) -> String {
    let mut out = String::new();
    if is_lua_name(name) {
        out.push_str(name);
    } else {
        let _ = write!(out, "_G[{}]", quote(name));
    }
    out.push_str(" = {\n");
    match document {
        TableResult::Sequence(rows) => {
            for row in rows {
                out.push('\t');
                render_row(row, &mut out);
                out.push_str(",\n");
            }
        }
        TableResult::Keyed(rows) => {
            for (key, row) in rows {
                let _ = write!(out, "\t{} = ", table_key(key));
                render_row(row, &mut out);
                out.push_str(",\n");
            }
        }
    }
    out.push_str("}\n");
    out
}

/// One row per block, one field per line.
fn render_row(row: &Node, out: &mut String) {
    match row {
        Node::Record(fields) if !fields.is_empty() => {
            out.push_str("{\n");
            for (name, value) in fields {
                let _ = writeln!(out, "\t\t{} = {},", table_key(name), render_inline(value));
            }
            out.push_str("\t}");
        }
        other => out.push_str(&render_inline(other)),
    }
}

fn render_inline(node: &Node) -> String {
    match node {
        Node::Scalar(scalar) => scalar.render().into_owned(),
        Node::Array(slots) => {
            let dense = slots.keys().copied().eq(1..=slots.len());
            let items = slots
                .iter()
                .map(|(idx, child)| {
                    if dense {
                        render_inline(child)
                    } else {
                        format!("[{idx}] = {}", render_inline(child))
                    }
                })
                .join(", ");
            format!("{{{items}}}")
        }
        Node::Record(fields) => {
            let items = fields
                .iter()
                .map(|(name, child)| format!("{} = {}", table_key(name), render_inline(child)))
                .join(", ");
            format!("{{{items}}}")
        }
    }
}

fn table_key(name: &str) -> String {
    if is_lua_name(name) {
        name.to_string()
    } else {
        format!("[{}]", quote(name))
    }
}

pub(crate) fn is_lua_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !RESERVED_WORDS.contains(&name)
}

#[cfg(feature = "lua")]
fn read_document(path: &Path, source: &str) -> Result<TableResult> {
    evaluate_document(&io_utils::document_name(path), source)
        .map_err(|err| match err {
            Error::Adapter { source, .. } => Error::adapter(path, source),
            other => other,
        })
}

#[cfg(not(feature = "lua"))]
fn read_document(path: &Path, _source: &str) -> Result<TableResult> {
    Err(Error::adapter(
        path,
        AdapterError::Lua("reading Lua requires the `lua` feature".to_string()),
    ))
}

/// Runs `source` and converts the table left in the global `name`.
///
/// Integer keys become array slots, string keys record fields; records are
/// ordered by key. A table mixing both kinds of key is rejected.
#[cfg(feature = "lua")]
pub fn evaluate_document(name: &str, source: &str) -> Result<TableResult> {
    use mlua::{Lua, LuaOptions, StdLib, Value};

    let lua_error =
        |err: mlua::Error| Error::adapter(Path::new(name), AdapterError::Lua(err.to_string()));
    let lua = Lua::new_with(StdLib::TABLE | StdLib::STRING | StdLib::MATH, LuaOptions::new())
        .map_err(lua_error)?;
    lua.load(source).set_name(name).exec().map_err(lua_error)?;

    let global: Value = lua.globals().get(name).map_err(lua_error)?;
    let table = match global {
        Value::Table(table) => table,
        other => {
            return Err(Error::value(format!(
                "global '{name}' is {}, expected a table",
                other.type_name()
            )));
        }
    };
    match entries(&table)? {
        Entries::Empty => Ok(TableResult::Sequence(Vec::new())),
        Entries::Indexed(rows) => rows
            .into_iter()
            .map(|(idx, row)| row_from_lua(&idx.to_string(), row))
            .collect::<Result<Vec<_>>>()
            .map(TableResult::Sequence),
        Entries::Named(rows) => rows
            .into_iter()
            .map(|(key, row)| row_from_lua(&key, row).map(|node| (key, node)))
            .collect::<Result<_>>()
            .map(TableResult::Keyed),
    }
}

#[cfg(feature = "lua")]
enum Entries {
    Empty,
    Indexed(BTreeMap<usize, mlua::Value>),
    Named(BTreeMap<String, mlua::Value>),
}

#[cfg(feature = "lua")]
fn entries(table: &mlua::Table) -> Result<Entries> {
    use mlua::Value;

    let mut indexed = BTreeMap::new();
    let mut named = BTreeMap::new();
    for pair in table.pairs::<Value, Value>() {
        let (key, value) =
            pair.map_err(|err| Error::value(format!("cannot iterate table: {err}")))?;
        match key {
            Value::Integer(idx) if idx >= 0 => {
                indexed.insert(idx as usize, value);
            }
            Value::Number(idx) if idx >= 0.0 && idx.fract() == 0.0 => {
                indexed.insert(idx as usize, value);
            }
            Value::String(text) => {
                named.insert(text.to_string_lossy().to_string(), value);
            }
            other => {
                return Err(Error::value(format!(
                    "unsupported table key of type {}",
                    other.type_name()
                )));
            }
        }
    }
    match (indexed.is_empty(), named.is_empty()) {
        (true, true) => Ok(Entries::Empty),
        (false, true) => Ok(Entries::Indexed(indexed)),
        (true, false) => Ok(Entries::Named(named)),
        (false, false) => Err(Error::value("table mixes integer and string keys")),
    }
}

#[cfg(feature = "lua")]
fn row_from_lua(address: &str, value: mlua::Value) -> Result<Node> {
    match value {
        mlua::Value::Table(_) => Ok(node_from_lua(value)?.unwrap_or_else(Node::record)),
        other => Err(Error::value(format!(
            "entry {address} is {}, expected a table",
            other.type_name()
        ))),
    }
}

#[cfg(feature = "lua")]
fn node_from_lua(value: mlua::Value) -> Result<Option<Node>> {
    use crate::tree::ScalarFormat;
    use mlua::Value;

    Ok(Some(match value {
        Value::Nil => return Ok(None),
        Value::Boolean(flag) => Node::scalar(flag.to_string(), ScalarFormat::Bool),
        Value::Integer(number) => Node::scalar(number.to_string(), ScalarFormat::Number),
        Value::Number(number) => Node::scalar(number.to_string(), ScalarFormat::Number),
        Value::String(text) => {
            Node::scalar(text.to_string_lossy().to_string(), ScalarFormat::String)
        }
        Value::Table(table) => match entries(&table)? {
            Entries::Empty => Node::record(),
            Entries::Indexed(slots) => {
                let mut array = BTreeMap::new();
                for (idx, child) in slots {
                    if let Some(node) = node_from_lua(child)? {
                        array.insert(idx, node);
                    }
                }
                Node::Array(array)
            }
            Entries::Named(fields) => {
                let mut record = indexmap::IndexMap::new();
                for (name, child) in fields {
                    if let Some(node) = node_from_lua(child)? {
                        record.insert(name, node);
                    }
                }
                Node::Record(record)
            }
        },
        other => {
            return Err(Error::value(format!(
                "unsupported Lua value of type {}",
                other.type_name()
            )));
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::parse_table;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    #[test]
    fn render_sequence_with_positional_rows() {
        let document =
            parse_table(&rows(&[&["ID_KN", "x_N"], &["1", "10"], &["2", "20"]])).unwrap();
        assert_eq!(
            render_document("items", &document),
            "items = {\n\t{\n\t\tx = 10,\n\t},\n\t{\n\t\tx = 20,\n\t},\n}\n"
        );
    }

    #[test]
    fn render_keyed_rows_and_escaped_strings() {
        let document = parse_table(&rows(&[
            &["name_KS", "quote_S", "end_N"],
            &["alice", "He said \"hi\"", "1"],
            &["two words", "", ""],
        ]))
        .unwrap();
        let text = render_document("npc", &document);
        assert!(text.contains(
            "\talice = {\n\t\tquote = \"He said \\\"hi\\\"\",\n\t\t[\"end\"] = 1,\n\t},"
        ));
        assert!(text.contains("\t[\"two words\"] = {},"));
    }

    #[test]
    fn render_arrays_dense_or_indexed() {
        let document = parse_table(&rows(&[
            &["a_A_1", "a_A_2", "b_A_0", "b_A_3", "c_T_d_1"],
            &["x", "y", "1", "2", "true"],
        ]))
        .unwrap();
        let text = render_document("t", &document);
        assert!(text.contains("a = {\"x\", \"y\"},"), "{text}");
        assert!(text.contains("b = {[0] = 1, [3] = 2},"), "{text}");
        assert!(text.contains("c = {d = {true}},"), "{text}");
    }

    #[test]
    fn render_uses_global_table_for_odd_names() {
        let document = TableResult::Sequence(Vec::new());
        assert_eq!(render_document("my-table", &document), "_G[\"my-table\"] = {\n}\n");
        assert!(is_lua_name("_private"));
        assert!(!is_lua_name("while"));
        assert!(!is_lua_name("1st"));
    }

    #[cfg(feature = "lua")]
    #[test]
    fn evaluate_converts_sequences_and_records() {
        use crate::tree::ScalarFormat;

        let document = evaluate_document(
            "items",
            "items = {\n\t{ x = 10, tags = {\"a\", nil, \"c\"}, ok = true },\n\t{ x = 2.5 },\n}\n",
        )
        .unwrap();
        let TableResult::Sequence(rows) = document else {
            panic!("expected a sequence");
        };
        assert_eq!(rows.len(), 2);
        let first = rows[0].as_record().unwrap();
        assert_eq!(first.keys().collect::<Vec<_>>(), vec!["ok", "tags", "x"]);
        assert_eq!(first["x"], Node::scalar("10", ScalarFormat::Number));
        assert_eq!(first["ok"], Node::scalar("true", ScalarFormat::Bool));
        assert_eq!(
            first["tags"].as_array().unwrap().keys().copied().collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert_eq!(
            rows[1].as_record().unwrap()["x"],
            Node::scalar("2.5", ScalarFormat::Number)
        );
    }

    #[cfg(feature = "lua")]
    #[test]
    fn evaluate_round_trips_rendered_documents() {
        let document = parse_table(&rows(&[
            &["name_KS", "hp_N", "loot_A_1", "loot_A_2", "stats_T_res_0"],
            &["orc", "10", "axe", "club", "0.5"],
            &["elf", "8", "bow", "", ""],
        ]))
        .unwrap();
        let text = render_document("npc", &document);
        let TableResult::Keyed(read) = evaluate_document("npc", &text).unwrap() else {
            panic!("expected a keyed table");
        };
        let TableResult::Keyed(written) = document else {
            panic!("expected a keyed table");
        };
        assert_eq!(read.keys().collect::<Vec<_>>(), vec!["elf", "orc"]);
        assert_eq!(read["orc"], written["orc"]);
        assert_eq!(read["elf"], written["elf"]);
    }

    #[cfg(feature = "lua")]
    #[test]
    fn evaluate_rejects_mixed_keys_and_missing_globals() {
        let err = evaluate_document("t", "t = { { 1, a = 2 } }").unwrap_err();
        assert!(err.to_string().contains("mixes integer and string keys"), "{err}");
        assert!(evaluate_document("t", "other = {}").is_err());
        assert!(evaluate_document("t", "t = {").is_err());
        assert!(evaluate_document("t", "t = { os.exit() }").is_err());
    }
}
