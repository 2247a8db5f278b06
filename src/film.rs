use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One attribute of a film record as found in the dataset.
///
/// Absent attributes are kept apart from explicit `null`s because they
/// coerce differently, both to text and to numbers.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Field {
    #[default]
    Missing,
    Value(Value),
}

/// A single film entry. Nothing is validated; every attribute may hold any JSON value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Film {
    #[serde(default, deserialize_with = "present")]
    pub title: Field,
    #[serde(default, deserialize_with = "present")]
    pub year: Field,
    #[serde(default, deserialize_with = "present")]
    pub country: Field,
    #[serde(default, deserialize_with = "present")]
    pub director: Field,
    #[serde(default, deserialize_with = "present")]
    pub revenue: Field,
}

// Only called for attributes that exist in the object, `null` included.
fn present<'de, D>(deserializer: D) -> Result<Field, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Field::Value)
}

impl Field {
    pub fn display_text(&self) -> String {
        match self {
            Field::Missing => "undefined".to_string(),
            Field::Value(v) => value_text(v),
        }
    }

    /// Numeric coercion, `NaN` for anything that has no numeric reading.
    pub fn to_number(&self) -> f64 {
        match self {
            Field::Missing => f64::NAN,
            Field::Value(Value::Null) => 0.0,
            Field::Value(Value::Bool(b)) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Field::Value(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
            Field::Value(Value::String(s)) => parse_number(s),
            Field::Value(Value::Array(_)) | Field::Value(Value::Object(_)) => f64::NAN,
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                n.to_string()
            } else {
                n.as_f64().map(number_text).unwrap_or_else(|| n.to_string())
            }
        }
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => value_text(other),
            })
            .collect::<Vec<String>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Shortest round-trip text of a float, switching to exponent form below 1e-6 and from 1e21 on.
fn number_text(f: f64) -> String {
    let magnitude = f.abs();
    if f == 0.0 {
        // Covers -0 as well
        "0".to_string()
    } else if !f.is_finite() || (1e-6..1e21).contains(&magnitude) {
        // f64 Display drops the fraction for integral values: 2001.0 -> "2001"
        f.to_string()
    } else {
        let text = format!("{f:e}");
        match text.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => text,
        }
    }
}

fn parse_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }

    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    let radix = match s.get(..2).map(|p| p.to_ascii_lowercase()).as_deref() {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return u64::from_str_radix(&s[2..], radix)
            .map(|v| v as f64)
            .unwrap_or(f64::NAN);
    }

    // The float parser also accepts spellings like "inf" or "nan".
    if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return f64::NAN;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}
