//! Field descriptors: the declarative description of one component of a DID payload.

use std::{collections::BTreeMap, fmt, str::FromStr};

use crate::{
    errors::{EncodeError, LayoutError},
    value::Value,
};

/// Mapping from a raw integer value to its display label.
pub type Choices = BTreeMap<i64, String>;

/// Byte order used when a field spans more than one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
}

impl FromStr for ByteOrder {
    type Err = LayoutError;

    /// Accepts the long names as well as the CDD codes `12` (little) and `21` (big).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "little_endian" | "12" => Ok(ByteOrder::LittleEndian),
            "big_endian" | "21" => Ok(ByteOrder::BigEndian),
            other => Err(LayoutError::UnknownByteOrder(other.to_string())),
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::LittleEndian => f.write_str("little_endian"),
            ByteOrder::BigEndian => f.write_str("big_endian"),
        }
    }
}

/// How the raw bits of a field are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    /// Byte string of 7-bit characters.
    Ascii,
    #[default]
    Unsigned,
    /// Two's complement integer.
    Signed,
    /// IEEE 754, 32 or 64 bits depending on the field length.
    Float,
    /// IEEE 754 double, always 64 bits.
    Double,
}

impl FromStr for Encoding {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" | "ascii" => Ok(Encoding::Ascii),
            "uns" | "unsigned" => Ok(Encoding::Unsigned),
            "sgn" | "signed" => Ok(Encoding::Signed),
            "flt" | "float" => Ok(Encoding::Float),
            "dbl" | "double" => Ok(Encoding::Double),
            other => Err(LayoutError::UnknownEncoding(other.to_string())),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Encoding::Ascii => "asc",
            Encoding::Unsigned => "uns",
            Encoding::Signed => "sgn",
            Encoding::Float => "flt",
            Encoding::Double => "dbl",
        };
        f.write_str(tag)
    }
}

/// How a physical value is presented. Does not affect bit packing, except that
/// [DisplayFormat::Float] makes numeric decode produce floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DisplayFormat {
    Hex,
    Text,
    Float,
    #[default]
    Decimal,
}

impl FromStr for DisplayFormat {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hex" => Ok(DisplayFormat::Hex),
            "text" => Ok(DisplayFormat::Text),
            "flt" | "float" => Ok(DisplayFormat::Float),
            "dec" | "decimal" => Ok(DisplayFormat::Decimal),
            other => Err(LayoutError::UnknownDisplayFormat(other.to_string())),
        }
    }
}

impl fmt::Display for DisplayFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            DisplayFormat::Hex => "hex",
            DisplayFormat::Text => "text",
            DisplayFormat::Float => "flt",
            DisplayFormat::Decimal => "dec",
        };
        f.write_str(tag)
    }
}

/// Whether a field is a single atom or a byte field whose size comes from `maximum`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Quantity {
    #[default]
    Atom,
    Field,
}

impl FromStr for Quantity {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "atom" => Ok(Quantity::Atom),
            "field" => Ok(Quantity::Field),
            other => Err(LayoutError::UnknownQuantity(other.to_string())),
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Atom => f.write_str("atom"),
            Quantity::Field => f.write_str("field"),
        }
    }
}

/// Shape of a field: plain scalar, enumerated scalar, nested structure or
/// repeating structure.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Scalar,
    /// Scalar whose raw values may be shown as labels.
    Enum(Choices),
    /// A single nested sub-record.
    Struct(Vec<Field>),
    /// A sub-record repeated between `min_items` and `max_items` times.
    Repeating(Repeat),
}

/// Item bounds and layout of a repeating structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Repeat {
    /// Layout of one item, addressed relative to the item's first byte.
    pub sub_fields: Vec<Field>,
    pub min_items: usize,
    pub max_items: usize,
}

/// A named, bit-addressed component of a DID payload.
///
/// `start` uses the internal numbering: bit 0 is the least significant bit of
/// byte 0 and byte 1 begins at bit 8. Use [crate::translate] to derive it from
/// a document-order offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub start: usize,
    /// Declared width in bits. See [Field::bit_length] for the effective width.
    pub length: usize,
    pub byte_order: ByteOrder,
    /// `physical = raw * scale + offset`
    pub scale: f64,
    pub offset: f64,
    /// Lower physical bound. For structured byte fields, the per-item byte size.
    pub minimum: Option<f64>,
    /// Upper physical bound. For byte fields, the total capacity in bytes.
    pub maximum: Option<f64>,
    pub unit: Option<String>,
    pub encoding: Encoding,
    pub display: DisplayFormat,
    pub quantity: Quantity,
    pub kind: FieldKind,
}

impl Default for Field {
    fn default() -> Self {
        Field {
            name: String::new(),
            start: 0,
            length: 0,
            byte_order: Default::default(),
            scale: 1.0,
            offset: 0.0,
            minimum: None,
            maximum: None,
            unit: None,
            encoding: Default::default(),
            display: Default::default(),
            quantity: Default::default(),
            kind: FieldKind::Scalar,
        }
    }
}

impl Field {
    /// Creates an unsigned, unscaled scalar field.
    pub fn new(name: impl Into<String>, start: usize, length: usize) -> Self {
        Field {
            name: name.into(),
            start,
            length,
            ..Default::default()
        }
    }

    pub fn set_byte_order(&mut self, byte_order: ByteOrder) -> &mut Self {
        self.byte_order = byte_order;
        self
    }

    pub fn set_scale(&mut self, scale: f64) -> &mut Self {
        self.scale = scale;
        self
    }

    pub fn set_offset(&mut self, offset: f64) -> &mut Self {
        self.offset = offset;
        self
    }

    pub fn set_minimum(&mut self, minimum: f64) -> &mut Self {
        self.minimum = Some(minimum);
        self
    }

    pub fn set_maximum(&mut self, maximum: f64) -> &mut Self {
        self.maximum = Some(maximum);
        self
    }

    pub fn set_unit(&mut self, unit: impl Into<String>) -> &mut Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn set_encoding(&mut self, encoding: Encoding) -> &mut Self {
        self.encoding = encoding;
        self
    }

    pub fn set_display(&mut self, display: DisplayFormat) -> &mut Self {
        self.display = display;
        self
    }

    pub fn set_quantity(&mut self, quantity: Quantity) -> &mut Self {
        self.quantity = quantity;
        self
    }

    /// Turns the field into an enumerated scalar.
    pub fn set_choices(&mut self, choices: Choices) -> &mut Self {
        self.kind = FieldKind::Enum(choices);
        self
    }

    pub fn set_kind(&mut self, kind: FieldKind) -> &mut Self {
        self.kind = kind;
        self
    }

    /// Effective width in bits. A byte field with a positive `maximum` spans
    /// its whole capacity of `maximum` bytes. Saturates at `usize::MAX`; see
    /// [Field::checked_bit_length].
    pub fn bit_length(&self) -> usize {
        self.checked_bit_length().unwrap_or(usize::MAX)
    }

    /// Like [Field::bit_length], but `None` when the capacity in bits does not
    /// fit a `usize`.
    pub fn checked_bit_length(&self) -> Option<usize> {
        match (self.quantity, self.maximum) {
            (Quantity::Field, Some(maximum)) if maximum > 0.0 => (maximum as usize).checked_mul(8),
            _ => Some(self.length),
        }
    }

    /// True if either the encoding or the display format is floating point.
    pub fn is_float(&self) -> bool {
        matches!(self.encoding, Encoding::Float | Encoding::Double)
            || self.display == DisplayFormat::Float
    }

    pub fn choices(&self) -> Option<&Choices> {
        match &self.kind {
            FieldKind::Enum(choices) => Some(choices),
            _ => None,
        }
    }

    /// Nested fields of a structured field; empty for leaves.
    pub fn sub_fields(&self) -> &[Field] {
        match &self.kind {
            FieldKind::Struct(fields) => fields,
            FieldKind::Repeating(repeat) => &repeat.sub_fields,
            _ => &[],
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self.kind, FieldKind::Struct(_) | FieldKind::Repeating(_))
    }

    /// `(min_items, max_items)`; `(1, 1)` for anything that does not repeat.
    pub fn item_bounds(&self) -> (usize, usize) {
        match &self.kind {
            FieldKind::Repeating(repeat) => (repeat.min_items, repeat.max_items),
            _ => (1, 1),
        }
    }

    /// Looks up the raw value for a choice label.
    pub fn choice_to_number(&self, label: &str) -> Result<i64, EncodeError> {
        let Some(choices) = self.choices() else {
            return Err(EncodeError::InvalidValue {
                field: self.name.clone(),
                reason: "field has no choices",
            });
        };

        choices
            .iter()
            .find(|(_, text)| text.as_str() == label)
            .map(|(number, _)| *number)
            .ok_or_else(|| EncodeError::UnknownChoice {
                field: self.name.clone(),
                label: label.to_string(),
            })
    }

    /// Renders a decoded physical value according to the display format,
    /// followed by the unit if there is one.
    pub fn format_value(&self, value: &Value) -> String {
        let text = match (self.display, value) {
            (_, Value::Text(s)) | (_, Value::Choice(s)) => s.clone(),
            (DisplayFormat::Hex, Value::Unsigned(v)) => {
                let width = self.bit_length().div_ceil(4).clamp(1, 16);
                format!("0x{v:0width$x}")
            }
            (DisplayFormat::Hex, Value::Signed(v)) if *v < 0 => format!("-0x{:x}", v.unsigned_abs()),
            (DisplayFormat::Hex, Value::Signed(v)) => format!("0x{v:x}"),
            (DisplayFormat::Float, v) => match v.as_f64() {
                Some(f) => format!("{f:?}"),
                None => v.to_string(),
            },
            (_, v) => v.to_string(),
        };

        match &self.unit {
            Some(unit) if !unit.is_empty() => format!("{text} {unit}"),
            _ => text,
        }
    }
}

fn fmt_bound(bound: Option<f64>) -> String {
    bound.map_or_else(|| "None".to_string(), |b| b.to_string())
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let choices = match self.choices() {
            Some(choices) => format!(
                "{{{}}}",
                choices
                    .iter()
                    .map(|(value, text)| format!("{value}: '{text}'"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            None => "None".to_string(),
        };

        write!(
            f,
            "field('{}', {}, {}, '{}', {}, {}, {}, {}, '{}', {}, '{}', '{}', '{}')",
            self.name,
            self.start,
            self.bit_length(),
            self.byte_order,
            self.scale,
            self.offset,
            fmt_bound(self.minimum),
            fmt_bound(self.maximum),
            self.unit.as_deref().unwrap_or("None"),
            choices,
            self.display,
            self.encoding,
            self.quantity,
        )
    }
}
