//! Cell values and per-column type tags.

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize, Serializer};

/// Cell contents treated as missing at load time.
pub const NULL_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "NULL", "null", "None", "#N/A", "<NA>",
];

/// Formats tried, in order, when a cell is read as a date/time.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y", "%Y%m%d"];

// ─────────────────────────────────────────────────────────────────────────────
// Value
// ─────────────────────────────────────────────────────────────────────────────

/// A typed cell.
///
/// Equality is exact and typed: `Int(1)` differs from `Float(1.0)` and from
/// `Str("1")`, while `Null` equals `Null`. Floats compare by bit pattern
/// with `-0.0` folded onto `0.0`, which keeps `Eq` and `Hash` consistent
/// for grouping and join keys.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view used by strategy logic. Text is parsed, anything else
    /// unparseable is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        let number = match self {
            Value::Null => return None,
            Value::Int(i) => *i as f64,
            Value::Float(f) => *f,
            Value::Str(s) => s.trim().parse::<f64>().ok()?,
        };
        if number.is_nan() {
            None
        } else {
            Some(number)
        }
    }

    /// Date/time view used by strategy logic.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Null | Value::Float(_) => None,
            Value::Int(i) => parse_datetime(&i.to_string()),
            Value::Str(s) => parse_datetime(s),
        }
    }

    /// Int promoted to Float, for comparing keys across numeric columns.
    pub(crate) fn widened(&self) -> Value {
        match self {
            Value::Int(i) => Value::Float(*i as f64),
            other => other.clone(),
        }
    }

    /// Type tag of this single value.
    fn column_type(&self) -> ColumnType {
        match self {
            Value::Null => ColumnType::Empty,
            Value::Int(_) => ColumnType::Integer,
            Value::Float(_) => ColumnType::Float,
            Value::Str(_) => ColumnType::Text,
        }
    }
}

fn canonical_bits(f: f64) -> u64 {
    if f == 0.0 {
        0.0f64.to_bits()
    } else {
        f.to_bits()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => canonical_bits(*a) == canonical_bits(*b),
            (Value::Str(a), Value::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Int(i) => i.hash(state),
            Value::Float(f) => canonical_bits(*f).hash(state),
            Value::Str(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => f.write_str(&format_float(*x)),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Value::Float(f) => serializer.serialize_str(&format_float(*f)),
            Value::Str(s) => serializer.serialize_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

/// Whole floats keep a trailing `.0` so they reload as floats.
fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

/// Parses a date or date/time using the fixed format list.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

// ─────────────────────────────────────────────────────────────────────────────
// ColumnType
// ─────────────────────────────────────────────────────────────────────────────

/// Type tag inferred once per column at load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Every cell is missing.
    Empty,
    Integer,
    Float,
    Text,
}

impl ColumnType {
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::Empty => "empty",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Text => "text",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }

    /// Smallest type able to hold values of both `self` and `other`.
    pub fn unify(self, other: ColumnType) -> ColumnType {
        use ColumnType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Empty, x) | (x, Empty) => x,
            (Integer, Float) | (Float, Integer) => Float,
            _ => Text,
        }
    }

    /// Infers the type of a column of raw cells (`None` is missing).
    pub fn infer<'a, I>(cells: I) -> ColumnType
    where
        I: IntoIterator<Item = &'a Option<String>>,
    {
        let mut inferred = ColumnType::Empty;
        for cell in cells {
            let Some(raw) = cell else { continue };
            let raw = raw.trim();
            let cell_type = if raw.parse::<i64>().is_ok() {
                ColumnType::Integer
            } else if raw.parse::<f64>().is_ok() {
                ColumnType::Float
            } else {
                ColumnType::Text
            };
            inferred = inferred.unify(cell_type);
            if inferred == ColumnType::Text {
                break;
            }
        }
        inferred
    }

    /// Type of a column of already typed values.
    pub fn of_values<'a, I>(values: I) -> ColumnType
    where
        I: IntoIterator<Item = &'a Value>,
    {
        values
            .into_iter()
            .fold(ColumnType::Empty, |acc, v| acc.unify(v.column_type()))
    }

    /// Converts a raw cell under this column type.
    pub fn parse(self, cell: Option<String>) -> Value {
        let Some(raw) = cell else {
            return Value::Null;
        };
        match self {
            ColumnType::Integer => raw
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .unwrap_or(Value::Str(raw)),
            ColumnType::Float => raw
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .unwrap_or(Value::Str(raw)),
            ColumnType::Empty | ColumnType::Text => Value::Str(raw),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True when `raw` is one of the recognised missing-value tokens.
pub fn is_null_token(raw: &str) -> bool {
    NULL_TOKENS.contains(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn cells(raw: &[Option<&str>]) -> Vec<Option<String>> {
        raw.iter().map(|c| c.map(str::to_string)).collect()
    }

    #[test]
    fn test_infer_integer_column() {
        let column = cells(&[Some("1"), None, Some(" 42 ")]);
        assert_eq!(ColumnType::infer(&column), ColumnType::Integer);
    }

    #[test]
    fn test_infer_float_beats_integer() {
        let column = cells(&[Some("1"), Some("2.5")]);
        assert_eq!(ColumnType::infer(&column), ColumnType::Float);
    }

    #[test]
    fn test_infer_text_on_any_word() {
        let column = cells(&[Some("1"), Some("two")]);
        assert_eq!(ColumnType::infer(&column), ColumnType::Text);
    }

    #[test]
    fn test_infer_all_missing_is_empty() {
        let column = cells(&[None, None]);
        assert_eq!(ColumnType::infer(&column), ColumnType::Empty);
    }

    #[test]
    fn test_text_column_keeps_numeric_looking_cells_as_text() {
        assert_eq!(
            ColumnType::Text.parse(Some("7".into())),
            Value::Str("7".into())
        );
    }

    #[test]
    fn test_typed_equality() {
        assert_eq!(Value::Null, Value::Null);
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Int(1), Value::Str("1".into()));
        assert_eq!(Value::Float(0.0), Value::Float(-0.0));
    }

    #[test]
    fn test_hash_consistent_with_eq() {
        let mut set = HashSet::new();
        set.insert(Value::Float(0.0));
        set.insert(Value::Float(-0.0));
        set.insert(Value::Null);
        set.insert(Value::Null);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_unify() {
        assert_eq!(ColumnType::Integer.unify(ColumnType::Float), ColumnType::Float);
        assert_eq!(ColumnType::Empty.unify(ColumnType::Text), ColumnType::Text);
        assert_eq!(ColumnType::Integer.unify(ColumnType::Text), ColumnType::Text);
    }

    #[test]
    fn test_float_display_keeps_decimal_point() {
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(2.25).to_string(), "2.25");
        assert_eq!(Value::Null.to_string(), "");
    }

    #[test]
    fn test_as_f64_parses_text_and_rejects_words() {
        assert_eq!(Value::Str(" 3.5 ".into()).as_f64(), Some(3.5));
        assert_eq!(Value::Str("n/a-ish".into()).as_f64(), None);
        assert_eq!(Value::Int(4).as_f64(), Some(4.0));
    }

    #[test]
    fn test_parse_datetime_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_datetime("2024-03-05"), Some(expected));
        assert_eq!(parse_datetime("03/05/2024"), Some(expected));
        assert_eq!(parse_datetime("20240305"), Some(expected));
        assert!(parse_datetime("2024-03-05T10:30:00Z").is_some());
        assert!(parse_datetime("2024-03-05 10:30:00").is_some());
        assert_eq!(parse_datetime("last tuesday"), None);
    }

    #[test]
    fn test_null_tokens() {
        assert!(is_null_token(""));
        assert!(is_null_token("NaN"));
        assert!(!is_null_token("0"));
    }

    #[test]
    fn test_serialize_as_plain_json() {
        let json = serde_json::to_string(&vec![
            Value::Null,
            Value::Int(3),
            Value::Float(1.5),
            Value::Str("x".into()),
        ])
        .unwrap();
        assert_eq!(json, r#"[null,3,1.5,"x"]"#);
    }
}
