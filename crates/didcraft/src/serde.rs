//! Deserializable DID layout description.
//!
//! These types describe a DID the way layout documents do: fields listed in
//! order, byte by byte from the first byte of the payload, most significant
//! bit first. Positions are not given explicitly; each field starts where the
//! previous one ended. Converting a [DidDef] into a [crate::did::Did] derives
//! every internal start bit with [crate::translate].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    errors::LayoutError,
    field::{ByteOrder, DisplayFormat, Encoding, Field, FieldKind, Quantity, Repeat},
    translate::document_offset_to_start_bit,
};

/// Top-level DID definition.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DidDef {
    /// Numeric identifier, e.g. `0xF190`.
    pub identifier: u32,
    pub name: String,
    /// Wire size in bytes. Derived from the summed field widths when absent.
    #[serde(default)]
    pub length: Option<usize>,
    /// Fields in document order.
    pub fields: Vec<FieldDef>,
    /// Service identifiers that carry this DID.
    #[serde(default)]
    pub protocol_services: Vec<u8>,
}

/// Description of a single field.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    /// Declared width in bits. Byte fields with a positive `maximum` span
    /// `maximum * 8` bits instead.
    pub bit_length: usize,
    /// `little_endian`, `big_endian`, or the codes `12` and `21`.
    #[serde(default = "default_byte_order")]
    pub byte_order: String,
    /// `asc`, `uns`, `sgn`, `flt` or `dbl`. Unknown tags decode as unsigned.
    #[serde(default)]
    pub encoding: Option<String>,
    /// `hex`, `text`, `flt` or `dec`.
    #[serde(default)]
    pub display: Option<String>,
    /// `atom` or `field`.
    #[serde(default)]
    pub quantity: Option<String>,
    /// Numerator of the scale.
    #[serde(default = "one")]
    pub factor: f64,
    /// Denominator of the scale.
    #[serde(default = "one")]
    pub divisor: f64,
    #[serde(default)]
    pub offset: f64,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    /// Raw value to label.
    #[serde(default)]
    pub choices: Option<BTreeMap<i64, String>>,
    #[serde(default)]
    pub min_items: Option<usize>,
    #[serde(default)]
    pub max_items: Option<usize>,
    /// Layout of one item, in document order relative to the item's first byte.
    #[serde(default)]
    pub sub_fields: Vec<FieldDef>,
}

fn default_byte_order() -> String {
    "big_endian".to_string()
}

fn one() -> f64 {
    1.0
}

fn parse_encoding(def: &FieldDef) -> Encoding {
    let Some(tag) = def.encoding.as_deref() else {
        return Encoding::default();
    };

    tag.parse().unwrap_or_else(|_| {
        tracing::debug!(field = %def.name, encoding = tag, "unknown encoding, using unsigned");
        Encoding::Unsigned
    })
}

fn field_kind(def: &FieldDef, sub_fields: Vec<Field>) -> FieldKind {
    if sub_fields.is_empty() {
        return match &def.choices {
            Some(choices) => FieldKind::Enum(choices.clone()),
            None => FieldKind::Scalar,
        };
    }

    match (def.min_items, def.max_items) {
        (None, None) | (Some(1), Some(1)) => FieldKind::Struct(sub_fields),
        (min_items, max_items) => FieldKind::Repeating(Repeat {
            sub_fields,
            min_items: min_items.unwrap_or(1),
            max_items: max_items.unwrap_or(1),
        }),
    }
}

fn field_from_def(mut def: FieldDef, offset_bits: usize) -> Result<Field, LayoutError> {
    let byte_order: ByteOrder = def.byte_order.parse()?;
    let display = match def.display.as_deref() {
        Some(tag) => tag.parse()?,
        None => DisplayFormat::default(),
    };
    let quantity = match def.quantity.as_deref() {
        Some(tag) => tag.parse()?,
        None => Quantity::default(),
    };
    let encoding = parse_encoding(&def);
    let (sub_fields, _) = layout_fields(std::mem::take(&mut def.sub_fields))?;
    let kind = field_kind(&def, sub_fields);

    let mut field = Field {
        name: def.name,
        start: 0,
        length: def.bit_length,
        byte_order,
        scale: def.factor / def.divisor,
        offset: def.offset,
        minimum: def.minimum,
        maximum: def.maximum,
        unit: def.unit,
        encoding,
        display,
        quantity,
        kind,
    };

    let bits = match field.checked_bit_length() {
        Some(bits) if bits > 0 && offset_bits.checked_add(bits).is_some() => bits,
        _ => {
            return Err(LayoutError::InvalidFieldSize {
                bits: field.bit_length(),
                field: field.name,
            });
        }
    };

    field.start = document_offset_to_start_bit(offset_bits, bits, byte_order);
    Ok(field)
}

/// Places `defs` one after another from bit 0 and returns the fields together
/// with the total number of bits they cover.
pub(crate) fn layout_fields(defs: Vec<FieldDef>) -> Result<(Vec<Field>, usize), LayoutError> {
    let mut offset_bits = 0;
    let mut fields = Vec::with_capacity(defs.len());

    for def in defs {
        let field = field_from_def(def, offset_bits)?;
        offset_bits += field.bit_length();
        fields.push(field);
    }

    Ok((fields, offset_bits))
}
