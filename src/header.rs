//! Column header grammar.
//!
//! Designers declare the shape of the output document through column names.
//! Each header is matched against an ordered list of patterns; the first
//! match wins and yields a [`ColumnDescriptor`]. Headers that match nothing
//! (comment columns, scratch columns) are not part of the schema.
//!
//! | Header                  | Kind                   | Path below the field       |
//! |-------------------------|------------------------|----------------------------|
//! | `name_A_N_T_name2_N2`   | array/table/array      | `[N].name2[N2]`            |
//! | `name_A_N_T_name2`      | array/table            | `[N].name2`                |
//! | `name_A_N`              | array element          | `[N]`                      |
//! | `name_T_name2`          | table field            | `.name2`                   |
//! | `name_T_name2_N`        | table/array            | `.name2[N]`                |
//! | `name_KN`, `name_KS`    | key (number / string)  |                            |
//! | `name_L/S/N/B`          | list, string, number, bool |                        |
//!
//! All but the key forms accept a trailing `@type[.subtype]` annotation that
//! overrides how the leaf value is rendered.

use std::{fmt, sync::OnceLock};

use regex::{Captures, Regex};
use serde::{Serialize, Serializer};

use crate::{
    error::{Error, Result},
    tree::{PathSegment, Scalar, ScalarFormat},
};

const IDENT: &str = "[A-Za-z][A-Za-z0-9]*";
const ANNOTATION: &str = r"(?:@(?P<type>\w+)(?:\.(?P<subtype>\w*))?)?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    Number,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    String,
    Number,
    Bool,
}

impl ScalarType {
    pub fn format(self) -> ScalarFormat {
        match self {
            ScalarType::String => ScalarFormat::String,
            ScalarType::Number => ScalarFormat::Number,
            ScalarType::Bool => ScalarFormat::Bool,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Key(KeyType),
    Scalar(ScalarType),
    /// Raw target-syntax value, emitted verbatim.
    List,
    ArrayElement,
    ArrayTableField,
    TableField,
    TableArrayField,
    ArrayTableArrayField,
}

/// Kinds that may cooperate on one field share a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindFamily {
    Key(KeyType),
    Scalar(ScalarType),
    List,
    ArrayRooted,
    RecordRooted,
}

impl ColumnKind {
    /// Simple kinds own their field outright; only one column may use the name.
    pub fn is_simple(&self) -> bool {
        matches!(
            self,
            ColumnKind::Key(_) | ColumnKind::Scalar(_) | ColumnKind::List
        )
    }

    pub fn family(&self) -> KindFamily {
        match self {
            ColumnKind::Key(key) => KindFamily::Key(*key),
            ColumnKind::Scalar(ty) => KindFamily::Scalar(*ty),
            ColumnKind::List => KindFamily::List,
            ColumnKind::ArrayElement
            | ColumnKind::ArrayTableField
            | ColumnKind::ArrayTableArrayField => KindFamily::ArrayRooted,
            ColumnKind::TableField | ColumnKind::TableArrayField => KindFamily::RecordRooted,
        }
    }

    /// Nested kinds infer their leaf format from the cell when unannotated.
    pub fn default_format(&self) -> Option<ScalarFormat> {
        match self {
            ColumnKind::Key(KeyType::Number) => Some(ScalarFormat::Number),
            ColumnKind::Key(KeyType::String) => Some(ScalarFormat::String),
            ColumnKind::Scalar(ty) => Some(ty.format()),
            ColumnKind::List => Some(ScalarFormat::Raw),
            _ => None,
        }
    }

    /// Nested kind implied by the shape of a path below the field.
    pub fn for_path(path: &[PathSegment]) -> Option<Self> {
        use PathSegment::{Field, Index};
        match path {
            [Index(_)] => Some(ColumnKind::ArrayElement),
            [Index(_), Field(_)] => Some(ColumnKind::ArrayTableField),
            [Index(_), Field(_), Index(_)] => Some(ColumnKind::ArrayTableArrayField),
            [Field(_)] => Some(ColumnKind::TableField),
            [Field(_), Index(_)] => Some(ColumnKind::TableArrayField),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ColumnKind::Key(KeyType::Number) => "key (number)",
            ColumnKind::Key(KeyType::String) => "key (string)",
            ColumnKind::Scalar(ScalarType::String) => "string",
            ColumnKind::Scalar(ScalarType::Number) => "number",
            ColumnKind::Scalar(ScalarType::Bool) => "bool",
            ColumnKind::List => "list",
            ColumnKind::ArrayElement => "array element",
            ColumnKind::ArrayTableField => "array table field",
            ColumnKind::TableField => "table field",
            ColumnKind::TableArrayField => "table array field",
            ColumnKind::ArrayTableArrayField => "array table array field",
        };
        f.write_str(label)
    }
}

impl Serialize for ColumnKind {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Rendering override carried by a `@type[.subtype]` annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueFormat {
    Number,
    String,
    Bool,
    Raw,
    /// Raw `Prefix.cell` expression; the prefix defaults to the field name.
    Ref(Option<String>),
}

impl ValueFormat {
    pub fn parse(kind: &str, subtype: Option<&str>, header: &str) -> Result<Self> {
        let subtype = subtype.filter(|s| !s.is_empty());
        let format = match kind.to_ascii_lowercase().as_str() {
            "number" | "num" | "n" => ValueFormat::Number,
            "string" | "str" | "s" => ValueFormat::String,
            "bool" | "boolean" | "b" => ValueFormat::Bool,
            "raw" | "lua" | "l" => ValueFormat::Raw,
            "ref" => return Ok(ValueFormat::Ref(subtype.map(str::to_string))),
            other => {
                return Err(Error::value(format!(
                    "unknown annotation '@{other}' in column '{header}'"
                )));
            }
        };
        if let Some(extra) = subtype {
            return Err(Error::value(format!(
                "annotation '@{kind}' does not take a subtype ('.{extra}') in column '{header}'"
            )));
        }
        Ok(format)
    }

    pub fn scalar_format(&self) -> ScalarFormat {
        match self {
            ValueFormat::Number => ScalarFormat::Number,
            ValueFormat::String => ScalarFormat::String,
            ValueFormat::Bool => ScalarFormat::Bool,
            ValueFormat::Raw | ValueFormat::Ref(_) => ScalarFormat::Raw,
        }
    }

    pub fn from_scalar_format(format: ScalarFormat) -> Self {
        match format {
            ScalarFormat::Number => ValueFormat::Number,
            ScalarFormat::String => ValueFormat::String,
            ScalarFormat::Bool => ValueFormat::Bool,
            ScalarFormat::Raw => ValueFormat::Raw,
        }
    }
}

impl fmt::Display for ValueFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueFormat::Number => f.write_str("number"),
            ValueFormat::String => f.write_str("string"),
            ValueFormat::Bool => f.write_str("bool"),
            ValueFormat::Raw => f.write_str("raw"),
            ValueFormat::Ref(None) => f.write_str("ref"),
            ValueFormat::Ref(Some(prefix)) => write!(f, "ref.{prefix}"),
        }
    }
}

impl Serialize for ValueFormat {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// One classified column of a table's header row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub source_index: usize,
    pub header: String,
    pub kind: ColumnKind,
    pub field_name: String,
    /// Route below the field; empty for key, scalar and list columns.
    pub path: Vec<PathSegment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_format: Option<ValueFormat>,
}

impl ColumnDescriptor {
    /// Route from the row record to the leaf, starting with the field itself.
    pub fn full_path(&self) -> Vec<PathSegment> {
        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.push(PathSegment::Field(self.field_name.clone()));
        path.extend(self.path.iter().cloned());
        path
    }

    /// Builds the leaf scalar for a non-empty cell.
    pub fn leaf(&self, cell: &str) -> Scalar {
        match &self.value_format {
            Some(ValueFormat::Ref(prefix)) => {
                let prefix = prefix.as_deref().unwrap_or(&self.field_name);
                Scalar::new(format!("{prefix}.{cell}"), ScalarFormat::Raw)
            }
            Some(format) => Scalar::new(cell, format.scalar_format()),
            None => {
                let format = self
                    .kind
                    .default_format()
                    .unwrap_or_else(|| ScalarFormat::infer(cell));
                Scalar::new(cell, format)
            }
        }
    }
}

/// Writes the header that [`classify`] maps back to this field, kind, path
/// and format.
pub fn render_header(
    field_name: &str,
    kind: ColumnKind,
    path: &[PathSegment],
    value_format: Option<&ValueFormat>,
) -> String {
    let mut header = field_name.to_string();
    match kind {
        ColumnKind::Key(KeyType::Number) => return format!("{field_name}_KN"),
        ColumnKind::Key(KeyType::String) => return format!("{field_name}_KS"),
        ColumnKind::Scalar(ScalarType::String) => header.push_str("_S"),
        ColumnKind::Scalar(ScalarType::Number) => header.push_str("_N"),
        ColumnKind::Scalar(ScalarType::Bool) => header.push_str("_B"),
        ColumnKind::List => header.push_str("_L"),
        _ => {
            for (position, segment) in path.iter().enumerate() {
                match segment {
                    PathSegment::Index(idx) if position == 0 => {
                        header.push_str(&format!("_A_{idx}"));
                    }
                    PathSegment::Index(idx) => header.push_str(&format!("_{idx}")),
                    PathSegment::Field(name) => header.push_str(&format!("_T_{name}")),
                }
            }
        }
    }
    if let Some(format) = value_format {
        header.push('@');
        header.push_str(&format.to_string());
    }
    header
}

/// True when `name` can stand as a field name inside a header.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric())
}

#[derive(Debug, Clone, Copy)]
enum Shape {
    ArrayTableArray,
    ArrayTable,
    Array,
    Table,
    TableArray,
    Key,
    Simple,
}

struct Pattern {
    shape: Shape,
    regex: Regex,
}

fn patterns() -> &'static [Pattern] {
    static PATTERNS: OnceLock<Vec<Pattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let name = format!("(?P<name>{IDENT})");
        let sub = format!("(?P<sub>{IDENT})");
        [
            (
                Shape::ArrayTableArray,
                format!(r"^{name}_A_(?P<index>\d+)_T_{sub}_(?P<subindex>\d+){ANNOTATION}$"),
            ),
            (
                Shape::ArrayTable,
                format!(r"^{name}_A_(?P<index>\d+)_T_{sub}{ANNOTATION}$"),
            ),
            (
                Shape::Array,
                format!(r"^{name}_A_(?P<index>\d+){ANNOTATION}$"),
            ),
            (Shape::Table, format!(r"^{name}_T_{sub}{ANNOTATION}$")),
            (
                Shape::TableArray,
                format!(r"^{name}_T_{sub}_(?P<subindex>\d+){ANNOTATION}$"),
            ),
            (Shape::Key, format!(r"^{name}_K(?P<code>[NS])$")),
            (Shape::Simple, format!(r"^{name}_(?P<code>[LSNB]){ANNOTATION}$")),
        ]
        .into_iter()
        .map(|(shape, source)| Pattern {
            shape,
            regex: Regex::new(&source).expect("header grammar pattern compiles"),
        })
        .collect()
    })
}

/// Classifies one header cell. `Ok(None)` means the column is not part of
/// the schema.
pub fn classify(source_index: usize, header: &str) -> Result<Option<ColumnDescriptor>> {
    let header = header.trim();
    for pattern in patterns() {
        if let Some(caps) = pattern.regex.captures(header) {
            return describe(pattern.shape, source_index, header, &caps).map(Some);
        }
    }
    Ok(None)
}

fn describe(
    shape: Shape,
    source_index: usize,
    header: &str,
    caps: &Captures<'_>,
) -> Result<ColumnDescriptor> {
    let index = |group: &str| -> Result<PathSegment> {
        let digits = &caps[group];
        digits.parse::<usize>().map(PathSegment::Index).map_err(|_| {
            Error::value(format!(
                "index '{digits}' in column '{header}' is not a valid array index"
            ))
        })
    };
    let sub = || PathSegment::Field(caps["sub"].to_string());

    let (kind, path) = match shape {
        Shape::ArrayTableArray => (
            ColumnKind::ArrayTableArrayField,
            vec![index("index")?, sub(), index("subindex")?],
        ),
        Shape::ArrayTable => (ColumnKind::ArrayTableField, vec![index("index")?, sub()]),
        Shape::Array => (ColumnKind::ArrayElement, vec![index("index")?]),
        Shape::Table => (ColumnKind::TableField, vec![sub()]),
        Shape::TableArray => (ColumnKind::TableArrayField, vec![sub(), index("subindex")?]),
        Shape::Key => {
            let key = if &caps["code"] == "N" {
                KeyType::Number
            } else {
                KeyType::String
            };
            (ColumnKind::Key(key), Vec::new())
        }
        Shape::Simple => {
            let kind = match &caps["code"] {
                "L" => ColumnKind::List,
                "S" => ColumnKind::Scalar(ScalarType::String),
                "N" => ColumnKind::Scalar(ScalarType::Number),
                _ => ColumnKind::Scalar(ScalarType::Bool),
            };
            (kind, Vec::new())
        }
    };

    let value_format = caps
        .name("type")
        .map(|ty| {
            ValueFormat::parse(
                ty.as_str(),
                caps.name("subtype").map(|m| m.as_str()),
                header,
            )
        })
        .transpose()?;

    Ok(ColumnDescriptor {
        source_index,
        header: header.to_string(),
        kind,
        field_name: caps["name"].to_string(),
        path,
        value_format,
    })
}
