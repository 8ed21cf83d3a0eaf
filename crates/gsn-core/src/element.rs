use serde::Serialize;

use crate::storage::FieldValue;

/// One element produced by a wrapper: a millisecond timestamp plus named
/// field values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamElement {
    pub timed: i64,
    pub fields: Vec<(String, FieldValue)>,
}

impl StreamElement {
    pub fn new(timed: i64, fields: Vec<(String, FieldValue)>) -> Self {
        Self { timed, fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// INSERT persisting this element in a wrapper table. The table's `pk`
    /// column is left to the backend.
    pub fn insert_sql(&self, table: &str) -> String {
        let mut columns = String::from("timed");
        let mut values = self.timed.to_string();
        for (name, value) in &self.fields {
            columns.push_str(", ");
            columns.push_str(name);
            values.push_str(", ");
            values.push_str(&value.to_sql_literal());
        }
        format!("insert into {table} ({columns}) values ({values})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_statement() {
        let e = StreamElement::new(
            1_000,
            vec![
                ("temperature".into(), FieldValue::Double(21.5)),
                ("room".into(), "o'hara".into()),
                ("door".into(), FieldValue::Null),
            ],
        );
        assert_eq!(
            e.insert_sql("wrapper_1"),
            "insert into wrapper_1 (timed, temperature, room, door) values (1000, 21.5, 'o''hara', null)"
        );
    }

    #[test]
    fn field_lookup_ignores_case() {
        let e = StreamElement::new(0, vec![("Temp".into(), FieldValue::Integer(3))]);
        assert_eq!(e.field("temp"), Some(&FieldValue::Integer(3)));
        assert_eq!(e.field("humidity"), None);
    }
}
