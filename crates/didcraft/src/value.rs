//! Values exchanged with the codec: physical scalars for encoding and the
//! decoded shape of a whole DID.

use std::{collections::BTreeMap, fmt};

/// A physical (or raw, when scaling is disabled) field value.
///
/// Encoding accepts any numeric variant. Decoded integers follow the field's
/// encoding instead: unsigned fields yield [Value::Unsigned] unless scaling
/// makes the result negative, signed fields always yield [Value::Signed]. So
/// `Signed(5)` encoded into an unsigned field decodes as `Unsigned(5)`; compare
/// with [Value::as_f64] when the variant does not matter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    /// Contents of an ASCII field.
    Text(String),
    /// Label substituted from a field's choice table.
    Choice(String),
}

impl Value {
    /// Numeric view of the value; `None` for text and labels.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Unsigned(v) => Some(*v as f64),
            Value::Signed(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Text(_) | Value::Choice(_) => None,
        }
    }

    /// String view of text values and labels.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Choice(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unsigned(v) => write!(f, "{v}"),
            Value::Signed(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) | Value::Choice(s) => f.write_str(s),
        }
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Unsigned(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Unsigned(value as u64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Signed(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Signed(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

/// Field name to decoded value, for a DID or one item of a structured field.
pub type DecodedDid = BTreeMap<String, DecodedValue>;

/// Decoded value of one field.
///
/// A structured field whose item bounds are both 1 decodes to [DecodedValue::Struct];
/// any other repeating field decodes to [DecodedValue::Sequence]. `None` marks an
/// item that was cut short by the end of the input.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    Scalar(Value),
    Struct(Option<DecodedDid>),
    Sequence(Vec<Option<DecodedDid>>),
}

impl DecodedValue {
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            DecodedValue::Scalar(value) => Some(value),
            _ => None,
        }
    }
}

impl From<Value> for DecodedValue {
    fn from(value: Value) -> Self {
        DecodedValue::Scalar(value)
    }
}
