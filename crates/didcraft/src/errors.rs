//! Error types for layout compilation, encoding, decoding and field lookup.

use thiserror::Error;

/// Errors produced while building or compiling a field layout into a [crate::plan::Plan].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// Byte order tag is neither little nor big endian.
    #[error("unknown byte order '{0}'")]
    UnknownByteOrder(String),
    /// Encoding tag is not one of the supported raw interpretations.
    #[error("unknown encoding '{0}'")]
    UnknownEncoding(String),
    #[error("unknown display format '{0}'")]
    UnknownDisplayFormat(String),
    #[error("unknown quantity '{0}'")]
    UnknownQuantity(String),
    /// Field name is empty or duplicated among its siblings.
    #[error("invalid field name '{0}'")]
    InvalidFieldName(String),
    /// Field is 0 bits wide, or wider than 64 bits for a numeric leaf.
    #[error("field '{field}' has invalid size of {bits} bits")]
    InvalidFieldSize { field: String, bits: usize },
    #[error("floating point field '{field}' must be 32 or 64 bits, got {bits}")]
    InvalidFloatLength { field: String, bits: usize },
    /// ASCII fields must start on a byte boundary and span whole bytes.
    #[error("text field '{field}' is not byte aligned")]
    MisalignedText { field: String },
    #[error("field '{field}' has invalid item bounds {min}..={max}")]
    InvalidItemBounds {
        field: String,
        min: usize,
        max: usize,
    },
    /// The per-item byte size of a structured field computes to zero.
    #[error("structured field '{field}' has an empty item size")]
    EmptyItem { field: String },
}

/// Errors produced by [crate::did::Did::encode].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("no value given for field '{0}'")]
    MissingField(String),
    #[error("choice '{label}' not found in field '{field}'")]
    UnknownChoice { field: String, label: String },
    /// Structured and repeating fields can only be decoded.
    #[error("encoding structured field '{field}' is not supported")]
    Unsupported { field: String },
    #[error("invalid value for field '{field}': {reason}")]
    InvalidValue { field: String, reason: &'static str },
    /// The raw value does not fit in the field's bit width.
    #[error("raw value {raw} does not fit in field '{field}'")]
    ValueOutOfRange { field: String, raw: String },
}

/// Errors produced by [crate::did::Did::decode].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Input ends before a leaf field and truncation is disallowed.
    #[error("field '{field}' needs {expected} bytes, got {actual}")]
    PacketTooShort {
        field: String,
        expected: usize,
        actual: usize,
    },
    /// Input ends before the minimum item count of a repeating field.
    #[error("data buffer too short to read {min_items} items of field '{field}'")]
    BufferTooShort { field: String, min_items: usize },
    #[error("text field '{field}' contains non-ASCII bytes")]
    InvalidText { field: String },
}

/// Lookup of a field name that does not exist.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("field '{0}' not found")]
pub struct FieldNotFound(pub String);
