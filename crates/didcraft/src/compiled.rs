use crate::{
    bits,
    conversion::{Conversion, decode_text, encode_text},
    errors::{DecodeError, EncodeError, LayoutError},
    field::{ByteOrder, Encoding, Field, Quantity},
    options::DecodeOptions,
    plan::Plan,
    value::{DecodedValue, Value},
};

#[derive(Debug, Clone)]
pub enum CompiledFieldKind {
    Leaf(CompiledLeaf),
    Struct(CompiledStruct),
}

#[derive(Debug, Clone)]
pub struct CompiledField {
    pub name: String,
    pub kind: CompiledFieldKind,
}

impl TryFrom<&Field> for CompiledField {
    type Error = LayoutError;

    fn try_from(value: &Field) -> Result<Self, Self::Error> {
        if value.name.trim().is_empty() {
            return Err(LayoutError::InvalidFieldName(value.name.clone()));
        }

        let kind = if value.sub_fields().is_empty() {
            CompiledFieldKind::Leaf(value.try_into()?)
        } else {
            CompiledFieldKind::Struct(value.try_into()?)
        };

        Ok(CompiledField {
            name: value.name.clone(),
            kind,
        })
    }
}

/// How a leaf's bytes become a value.
#[derive(Debug, Clone)]
pub enum LeafKind {
    /// Whole bytes of ASCII text.
    Text,
    Numeric(Conversion),
}

/// Extraction parameters of a scalar field.
#[derive(Debug, Clone)]
pub struct CompiledLeaf {
    pub start: usize,
    pub bits: usize,
    pub byte_order: ByteOrder,
    /// First byte touched, `start / 8`.
    pub first_byte: usize,
    /// Number of bytes touched from `first_byte`.
    pub span_bytes: usize,
    pub kind: LeafKind,
}

impl TryFrom<&Field> for CompiledLeaf {
    type Error = LayoutError;

    fn try_from(value: &Field) -> Result<Self, Self::Error> {
        // the last touched byte must be addressable
        let addressable = |bits: usize| {
            value
                .start
                .checked_add(bits)
                .and_then(|end| end.checked_add(7))
                .is_some()
        };
        let bits = match value.checked_bit_length() {
            Some(bits) if bits > 0 && addressable(bits) => bits,
            _ => {
                return Err(LayoutError::InvalidFieldSize {
                    field: value.name.clone(),
                    bits: value.bit_length(),
                });
            }
        };

        let kind = if value.encoding == Encoding::Ascii {
            if value.start % 8 != 0 || bits % 8 != 0 {
                return Err(LayoutError::MisalignedText {
                    field: value.name.clone(),
                });
            }
            LeafKind::Text
        } else {
            LeafKind::Numeric(Conversion::try_from(value)?)
        };

        Ok(CompiledLeaf {
            start: value.start,
            bits,
            byte_order: value.byte_order,
            first_byte: value.start / 8,
            span_bytes: bits::span_bytes(value.start, bits),
            kind,
        })
    }
}

impl CompiledLeaf {
    /// One past the last byte this leaf touches.
    pub fn end_byte(&self) -> usize {
        self.first_byte + self.span_bytes
    }

    /// True if all of the leaf's bytes are present in `data`.
    pub fn is_present(&self, data: &[u8]) -> bool {
        self.end_byte() <= data.len()
    }

    pub fn decode(
        &self,
        name: &str,
        data: &[u8],
        options: &DecodeOptions,
    ) -> Result<Value, DecodeError> {
        let too_short = || DecodeError::PacketTooShort {
            field: name.to_string(),
            expected: self.end_byte(),
            actual: data.len(),
        };

        match &self.kind {
            LeafKind::Text => {
                let bytes = data
                    .get(self.first_byte..self.end_byte())
                    .ok_or_else(too_short)?;
                decode_text(name, bytes)
            }
            LeafKind::Numeric(conversion) => {
                let raw = bits::read_raw(data, self.start, self.bits, self.byte_order)
                    .ok_or_else(too_short)?;
                Ok(conversion.decode(raw, options.decode_choices, options.scaling))
            }
        }
    }

    /// Writes `value` into `buf`. Bytes past the end of `buf` are dropped.
    pub fn encode(
        &self,
        name: &str,
        value: &Value,
        scaling: bool,
        buf: &mut [u8],
    ) -> Result<(), EncodeError> {
        match &self.kind {
            LeafKind::Text => {
                let bytes = encode_text(name, value, self.span_bytes)?;
                for (slot, byte) in buf.iter_mut().skip(self.first_byte).zip(bytes) {
                    *slot = byte;
                }
            }
            LeafKind::Numeric(conversion) => {
                let raw = conversion.encode(name, value, scaling)?;
                bits::write_raw(buf, self.start, self.bits, self.byte_order, raw);
            }
        }

        Ok(())
    }
}

/// A nested or repeating structure with its own compiled sub-plan.
#[derive(Debug, Clone)]
pub struct CompiledStruct {
    /// Byte where the first item starts.
    pub first_byte: usize,
    /// Bytes consumed per item.
    pub item_size: usize,
    pub min_items: usize,
    pub max_items: usize,
    /// Layout of one item, relative to the item's first byte.
    pub plan: Plan,
}

impl TryFrom<&Field> for CompiledStruct {
    type Error = LayoutError;

    fn try_from(value: &Field) -> Result<Self, Self::Error> {
        let (min_items, max_items) = value.item_bounds();
        if max_items == 0 || min_items > max_items {
            return Err(LayoutError::InvalidItemBounds {
                field: value.name.clone(),
                min: min_items,
                max: max_items,
            });
        }

        // `minimum` may be 0 for optional groups, so the capacity is split
        // evenly over the maximum item count instead.
        let item_size = match (value.quantity, value.maximum) {
            (Quantity::Field, Some(maximum)) if maximum > 0.0 => maximum as usize / max_items,
            _ => value.bit_length() / 8,
        };

        if item_size == 0 {
            return Err(LayoutError::EmptyItem {
                field: value.name.clone(),
            });
        }

        Ok(CompiledStruct {
            first_byte: value.start / 8,
            item_size,
            min_items,
            max_items,
            plan: Plan::compile(value.sub_fields(), item_size)?,
        })
    }
}

impl CompiledStruct {
    /// Decodes up to `max_items` consecutive items starting at `first_byte`.
    pub fn decode(
        &self,
        name: &str,
        data: &[u8],
        options: &DecodeOptions,
    ) -> Result<DecodedValue, DecodeError> {
        let mut items = Vec::with_capacity(self.max_items);

        for i in 0..self.max_items {
            let item_start = |n: usize| {
                self.first_byte
                    .saturating_add(n.saturating_mul(self.item_size))
                    .min(data.len())
            };
            let (from, to) = (item_start(i), item_start(i + 1));
            let window = &data[from..to];

            if window.len() < self.item_size {
                if i < self.min_items && !options.allow_truncated {
                    return Err(DecodeError::BufferTooShort {
                        field: name.to_string(),
                        min_items: self.min_items,
                    });
                }

                tracing::trace!(field = name, items = i, "repeating field truncated");
                items.push(None);
                break;
            }

            items.push(Some(self.plan.decode(window, options)?));
        }

        if self.min_items == 1 && self.max_items == 1 {
            Ok(DecodedValue::Struct(items.into_iter().next().flatten()))
        } else {
            Ok(DecodedValue::Sequence(items))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldKind, Repeat};

    fn byte_struct(
        name: &str,
        start: usize,
        min_items: usize,
        max_items: usize,
        capacity: f64,
    ) -> Field {
        let mut field = Field::new(name, start, 8);
        field
            .set_quantity(Quantity::Field)
            .set_maximum(capacity)
            .set_kind(FieldKind::Repeating(Repeat {
                sub_fields: vec![Field::new("Value", 0, 8)],
                min_items,
                max_items,
            }));
        field
    }

    #[test]
    fn test_leaf_parameters() {
        let mut field = Field::new("Speed", 12, 10);
        field.set_byte_order(ByteOrder::BigEndian);

        let leaf = CompiledLeaf::try_from(&field).unwrap();
        assert_eq!(leaf.first_byte, 1);
        assert_eq!(leaf.span_bytes, 2);
        assert_eq!(leaf.end_byte(), 3);
        assert!(leaf.is_present(&[0; 3]));
        assert!(!leaf.is_present(&[0; 2]));
    }

    #[test]
    fn test_leaf_rejects_invalid_sizes() {
        let field = Field::new("Empty", 0, 0);
        assert!(matches!(
            CompiledLeaf::try_from(&field),
            Err(LayoutError::InvalidFieldSize { bits: 0, .. })
        ));

        let field = Field::new("Huge", 0, 72);
        assert!(matches!(
            CompiledLeaf::try_from(&field),
            Err(LayoutError::InvalidFieldSize { bits: 72, .. })
        ));
    }

    #[test]
    fn test_oversized_byte_field() {
        let mut field = Field::new("Vin", 0, 8);
        field
            .set_encoding(Encoding::Ascii)
            .set_quantity(Quantity::Field)
            .set_maximum(1e19);
        assert_eq!(
            CompiledLeaf::try_from(&field).unwrap_err(),
            LayoutError::InvalidFieldSize {
                field: "Vin".to_string(),
                bits: usize::MAX
            }
        );
    }

    #[test]
    fn test_struct_with_huge_capacity() {
        let field = byte_struct("Items", 8, 0, 1, 1e19);
        let compiled = CompiledStruct::try_from(&field).unwrap();
        let decoded = compiled
            .decode("Items", &[1, 2], &DecodeOptions::default())
            .unwrap();
        assert_eq!(decoded, DecodedValue::Sequence(vec![None]));
    }

    #[test]
    fn test_text_leaf() {
        let mut field = Field::new("Vin", 8, 32);
        field.set_encoding(Encoding::Ascii);
        let leaf = CompiledLeaf::try_from(&field).unwrap();

        let mut buf = [0u8; 5];
        leaf.encode("Vin", &Value::from("WVW"), true, &mut buf).unwrap();
        assert_eq!(buf, [0, b'W', b'V', b'W', 0]);
        assert_eq!(
            leaf.decode("Vin", &buf, &DecodeOptions::default()),
            Ok(Value::from("WVW"))
        );

        field.start = 4;
        assert_eq!(
            CompiledLeaf::try_from(&field).unwrap_err(),
            LayoutError::MisalignedText {
                field: "Vin".to_string()
            }
        );
    }

    #[test]
    fn test_empty_name_rejected() {
        let field = Field::new(" ", 0, 8);
        assert!(matches!(
            CompiledField::try_from(&field),
            Err(LayoutError::InvalidFieldName(_))
        ));
    }

    #[test]
    fn test_struct_item_size_from_capacity() {
        let field = byte_struct("Items", 16, 0, 4, 8.0);
        let compiled = CompiledStruct::try_from(&field).unwrap();
        assert_eq!(compiled.first_byte, 2);
        assert_eq!(compiled.item_size, 2);
        assert_eq!(compiled.plan.total_bytes(), 2);
    }

    #[test]
    fn test_struct_item_size_from_length() {
        let mut field = Field::new("Pair", 0, 16);
        field.set_kind(FieldKind::Struct(vec![
            Field::new("Low", 0, 8),
            Field::new("High", 8, 8),
        ]));

        let compiled = CompiledStruct::try_from(&field).unwrap();
        assert_eq!(compiled.item_size, 2);
        assert_eq!((compiled.min_items, compiled.max_items), (1, 1));
    }

    #[test]
    fn test_struct_bounds_validation() {
        let field = byte_struct("Items", 0, 3, 2, 8.0);
        assert_eq!(
            CompiledStruct::try_from(&field).unwrap_err(),
            LayoutError::InvalidItemBounds {
                field: "Items".to_string(),
                min: 3,
                max: 2
            }
        );

        let field = byte_struct("Items", 0, 1, 16, 8.0);
        assert!(matches!(
            CompiledStruct::try_from(&field),
            Err(LayoutError::EmptyItem { .. })
        ));
    }

    #[test]
    fn test_struct_decode_full() {
        let field = byte_struct("Items", 0, 1, 3, 3.0);
        let compiled = CompiledStruct::try_from(&field).unwrap();
        let decoded = compiled
            .decode("Items", &[1, 2, 3], &DecodeOptions::default())
            .unwrap();

        let DecodedValue::Sequence(items) = decoded else {
            panic!("expected a sequence");
        };
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(Option::is_some));
    }
}
