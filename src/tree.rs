//! In-memory hierarchical value tree produced per table row.
//!
//! A [`Node`] is a closed union of scalars, sparse index-addressed arrays and
//! insertion-ordered records. Arrays keep absent slots absent instead of
//! filling gaps, so writers can tell "missing" apart from "empty".

use std::{borrow::Cow, collections::BTreeMap, fmt};

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{Error, Result};

/// How a scalar leaf is emitted by document writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarFormat {
    Number,
    String,
    Bool,
    Raw,
}

impl ScalarFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarFormat::Number => "number",
            ScalarFormat::String => "string",
            ScalarFormat::Bool => "bool",
            ScalarFormat::Raw => "raw",
        }
    }

    /// Format chosen for a nested leaf whose header carries no annotation.
    pub fn infer(raw: &str) -> Self {
        if raw == "true" || raw == "false" {
            ScalarFormat::Bool
        } else if looks_numeric(raw) {
            ScalarFormat::Number
        } else {
            ScalarFormat::String
        }
    }
}

impl fmt::Display for ScalarFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric literals both writers emit verbatim: JSON number syntax, which is
/// also valid Lua. Rejects `+5`, `.5`, `5.` and `007`.
fn looks_numeric(raw: &str) -> bool {
    raw.parse::<serde_json::Number>().is_ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar {
    pub raw: String,
    pub format: ScalarFormat,
}

impl Scalar {
    pub fn new(raw: impl Into<String>, format: ScalarFormat) -> Self {
        Self {
            raw: raw.into(),
            format,
        }
    }

    /// Renders the leaf as target-syntax text. Only strings are quoted and
    /// escaped; numbers, booleans and raw expressions pass through untouched.
    pub fn render(&self) -> Cow<'_, str> {
        match self.format {
            ScalarFormat::String => Cow::Owned(quote(&self.raw)),
            ScalarFormat::Number | ScalarFormat::Bool | ScalarFormat::Raw => {
                Cow::Borrowed(&self.raw)
            }
        }
    }
}

/// Double-quotes `value`, escaping the characters both Lua and JSON require.
pub fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        match ch {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}

/// One step on the route from a row's root record to a leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PathSegment {
    Index(usize),
    Field(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Index(idx) => write!(f, "[{idx}]"),
            PathSegment::Field(name) => write!(f, ".{name}"),
        }
    }
}

/// Renders a path as `.items[2].name` for diagnostics.
pub fn display_path(path: &[PathSegment]) -> String {
    path.iter().map(ToString::to_string).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Scalar(Scalar),
    Array(BTreeMap<usize, Node>),
    Record(IndexMap<String, Node>),
}

impl Node {
    pub fn record() -> Self {
        Node::Record(IndexMap::new())
    }

    pub fn array() -> Self {
        Node::Array(BTreeMap::new())
    }

    pub fn scalar(raw: impl Into<String>, format: ScalarFormat) -> Self {
        Node::Scalar(Scalar::new(raw, format))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Scalar(_) => "scalar",
            Node::Array(_) => "array",
            Node::Record(_) => "record",
        }
    }

    pub fn as_record(&self) -> Option<&IndexMap<String, Node>> {
        match self {
            Node::Record(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&BTreeMap<usize, Node>> {
        match self {
            Node::Array(slots) => Some(slots),
            _ => None,
        }
    }

    pub fn get(&self, path: &[PathSegment]) -> Option<&Node> {
        path.iter().try_fold(self, |node, segment| match (node, segment) {
            (Node::Array(slots), PathSegment::Index(idx)) => slots.get(idx),
            (Node::Record(fields), PathSegment::Field(name)) => fields.get(name),
            _ => None,
        })
    }

    /// Places `leaf` at `path`, creating intervening arrays and records as
    /// the following segment demands. Writing over an existing node, or
    /// stepping through a node of the wrong shape, is a value error.
    pub fn insert(&mut self, path: &[PathSegment], leaf: Node) -> Result<()> {
        let Some((last, parents)) = path.split_last() else {
            return Err(Error::value("cannot insert a value at an empty path"));
        };
        let mut current = self;
        for (depth, segment) in parents.iter().enumerate() {
            let container: fn() -> Node = match path[depth + 1] {
                PathSegment::Index(_) => Node::array,
                PathSegment::Field(_) => Node::record,
            };
            current = current
                .child_or_insert_with(segment, container)
                .map_err(|node| shape_error(&path[..=depth], node))?;
        }
        let occupied = match (current, last) {
            (Node::Array(slots), PathSegment::Index(idx)) => slots.insert(*idx, leaf),
            (Node::Record(fields), PathSegment::Field(name)) => {
                fields.insert(name.clone(), leaf)
            }
            (node, _) => return Err(shape_error(path, node.kind_name())),
        };
        match occupied {
            Some(_) => Err(Error::value(format!(
                "value at {} written twice",
                display_path(path)
            ))),
            None => Ok(()),
        }
    }

    fn child_or_insert_with(
        &mut self,
        segment: &PathSegment,
        make: fn() -> Node,
    ) -> std::result::Result<&mut Node, &'static str> {
        match (self, segment) {
            (Node::Array(slots), PathSegment::Index(idx)) => {
                Ok(slots.entry(*idx).or_insert_with(make))
            }
            (Node::Record(fields), PathSegment::Field(name)) => {
                Ok(fields.entry(name.clone()).or_insert_with(make))
            }
            (node, _) => Err(node.kind_name()),
        }
    }
}

fn shape_error(path: &[PathSegment], found: &str) -> Error {
    Error::value(format!(
        "cannot address {} inside a {found}",
        display_path(path)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str) -> PathSegment {
        PathSegment::Field(name.to_string())
    }

    #[test]
    fn insert_creates_sparse_arrays_and_records() {
        let mut root = Node::record();
        root.insert(
            &[field("items"), PathSegment::Index(2), field("hp")],
            Node::scalar("10", ScalarFormat::Number),
        )
        .unwrap();
        root.insert(
            &[field("items"), PathSegment::Index(0), field("hp")],
            Node::scalar("5", ScalarFormat::Number),
        )
        .unwrap();

        let items = root.get(&[field("items")]).unwrap().as_array().unwrap();
        assert_eq!(items.keys().copied().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(
            root.get(&[field("items"), PathSegment::Index(2), field("hp")]),
            Some(&Node::scalar("10", ScalarFormat::Number))
        );
    }

    #[test]
    fn insert_rejects_mismatched_shapes() {
        let mut root = Node::record();
        root.insert(&[field("x")], Node::scalar("1", ScalarFormat::Number))
            .unwrap();
        let err = root
            .insert(
                &[field("x"), PathSegment::Index(0)],
                Node::scalar("2", ScalarFormat::Number),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Value(_)), "unexpected error {err:?}");
    }

    #[test]
    fn insert_rejects_overwrites() {
        let mut root = Node::record();
        let path = [field("a"), PathSegment::Index(1)];
        root.insert(&path, Node::scalar("1", ScalarFormat::Number))
            .unwrap();
        assert!(
            root.insert(&path, Node::scalar("2", ScalarFormat::Number))
                .is_err()
        );
    }

    #[test]
    fn render_escapes_only_strings() {
        let text = r#"He said "hi""#;
        assert_eq!(
            Scalar::new(text, ScalarFormat::String).render(),
            r#""He said \"hi\"""#
        );
        for format in [ScalarFormat::Number, ScalarFormat::Bool, ScalarFormat::Raw] {
            assert_eq!(Scalar::new(text, format).render(), text);
        }
    }

    #[test]
    fn infer_recognizes_numbers_and_booleans() {
        assert_eq!(ScalarFormat::infer("42"), ScalarFormat::Number);
        assert_eq!(ScalarFormat::infer("-1.5e3"), ScalarFormat::Number);
        assert_eq!(ScalarFormat::infer("true"), ScalarFormat::Bool);
        assert_eq!(ScalarFormat::infer("inf"), ScalarFormat::String);
        assert_eq!(ScalarFormat::infer("1-2"), ScalarFormat::String);
        assert_eq!(ScalarFormat::infer("sword"), ScalarFormat::String);
        for text in ["+5", "5.", ".5", "007", " 5", ""] {
            assert_eq!(ScalarFormat::infer(text), ScalarFormat::String, "{text:?}");
        }
    }

    #[test]
    fn inferred_numbers_render_as_valid_literals() {
        for text in ["0", "-0.5", "12e3", "7"] {
            assert_eq!(ScalarFormat::infer(text), ScalarFormat::Number);
            let value: serde_json::Value = serde_json::from_str(text).unwrap();
            assert!(value.is_number(), "{text}");
        }
    }
}
