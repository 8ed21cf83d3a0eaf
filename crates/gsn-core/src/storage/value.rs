use serde::Serialize;

// ---------------------------------------------------------------------------
// FieldValue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Double(f64),
    Text(String),
}

impl FieldValue {
    /// Render as a SQL literal. Text is single-quoted with embedded quotes
    /// doubled.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Integer(n) => n.to_string(),
            Self::Double(d) if d.is_finite() => d.to_string(),
            Self::Double(_) => "null".to_string(),
            Self::Text(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::Double(d) if d.is_finite() => Some(*d as i64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<f64> for FieldValue {
    fn from(d: f64) -> Self {
        Self::Double(d)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

// ---------------------------------------------------------------------------
// Row
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Row {
    pub values: Vec<FieldValue>,
}

impl Row {
    pub fn new(values: Vec<FieldValue>) -> Self {
        Self { values }
    }

    pub fn first_i64(&self) -> Option<i64> {
        self.values.first().and_then(FieldValue::as_i64)
    }
}
