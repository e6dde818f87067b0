//! Row transcoder: one data row in, one value tree out.

use log::trace;

use crate::{
    error::Result,
    schema::TableSchema,
    tree::Node,
};

impl TableSchema {
    /// Builds the record for one data row.
    ///
    /// Fields are visited in first-seen column order and descriptors in
    /// column order. Empty or missing cells create nothing. The key field is
    /// left out because the assembled table already addresses the row by it.
    pub fn transcode<S: AsRef<str>>(&self, row: &[S]) -> Result<Node> {
        let mut record = Node::record();
        let key_field = self.key_field();
        for (name, columns) in &self.fields {
            if key_field == Some(name.as_str()) {
                continue;
            }
            for column in columns {
                let cell = row
                    .get(column.source_index)
                    .map(|cell| cell.as_ref())
                    .unwrap_or("");
                if cell.is_empty() {
                    continue;
                }
                let leaf = column.leaf(cell);
                trace!("{} <- {:?}", column.header, leaf);
                record.insert(&column.full_path(), Node::Scalar(leaf))?;
            }
        }
        Ok(record)
    }
}

/// The key cell of `row`, if the schema declares a key column.
pub fn key_cell<'a, S: AsRef<str>>(schema: &TableSchema, row: &'a [S]) -> Option<&'a str> {
    schema
        .key
        .as_ref()
        .map(|key| row.get(key.source_index).map(|cell| cell.as_ref()).unwrap_or(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{PathSegment, ScalarFormat};

    fn schema(headers: &[&str]) -> TableSchema {
        TableSchema::build(headers).expect("schema builds")
    }

    fn field(name: &str) -> PathSegment {
        PathSegment::Field(name.to_string())
    }

    fn number(raw: &str) -> Node {
        Node::scalar(raw, ScalarFormat::Number)
    }

    #[test]
    fn transcode_leaves_array_gaps_absent() {
        let schema = schema(&["items_A_0", "items_A_2"]);
        let record = schema.transcode(&["7", "9"]).unwrap();
        let items = record.get(&[field("items")]).unwrap().as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items.get(&0), Some(&number("7")));
        assert_eq!(items.get(&1), None);
        assert_eq!(items.get(&2), Some(&number("9")));
    }

    #[test]
    fn transcode_skips_empty_and_missing_cells() {
        let schema = schema(&["hp_N", "name_S", "items_A_0", "items_A_1"]);
        let record = schema.transcode(&["", "orc"]).unwrap();
        let fields = record.as_record().unwrap();
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["name"]);
    }

    #[test]
    fn transcode_builds_nested_records_and_arrays() {
        let schema = schema(&[
            "ID_KN",
            "loot_A_1_T_item",
            "loot_A_1_T_count@string",
            "loot_A_1_T_tags_2",
            "stats_T_hp",
            "stats_T_res_0",
            "fx_L",
            "boss_B",
        ]);
        let record = schema
            .transcode(&["1", "sword", "3", "rare", "100", "0.5", "{1,2}", "true"])
            .unwrap();

        let loot = |rest: &[PathSegment]| {
            let mut path = vec![field("loot"), PathSegment::Index(1)];
            path.extend_from_slice(rest);
            path
        };
        assert_eq!(
            record.get(&loot(&[field("item")])),
            Some(&Node::scalar("sword", ScalarFormat::String))
        );
        assert_eq!(
            record.get(&loot(&[field("count")])),
            Some(&Node::scalar("3", ScalarFormat::String))
        );
        assert_eq!(
            record.get(&loot(&[field("tags"), PathSegment::Index(2)])),
            Some(&Node::scalar("rare", ScalarFormat::String))
        );
        assert_eq!(
            record.get(&[field("stats"), field("res"), PathSegment::Index(0)]),
            Some(&number("0.5"))
        );
        assert_eq!(
            record.get(&[field("fx")]),
            Some(&Node::scalar("{1,2}", ScalarFormat::Raw))
        );
        assert_eq!(
            record.get(&[field("boss")]),
            Some(&Node::scalar("true", ScalarFormat::Bool))
        );
        assert_eq!(record.get(&[field("ID")]), None);
    }

    #[test]
    fn transcode_keeps_first_seen_field_order() {
        let schema = schema(&["b_N", "a_A_0", "c_S", "a_A_1"]);
        let record = schema.transcode(&["1", "2", "x", "3"]).unwrap();
        let order = record.as_record().unwrap().keys().cloned().collect::<Vec<_>>();
        assert_eq!(order, vec!["b", "a", "c"]);
    }

    #[test]
    fn key_cell_reads_the_key_column() {
        let schema = schema(&["x_N", "name_KS"]);
        assert_eq!(key_cell(&schema, &["1", "alice"]), Some("alice"));
        assert_eq!(key_cell(&schema, &["1"]), Some(""));
        assert_eq!(key_cell(&self::schema(&["x_N"]), &["1"]), None);
    }
}
