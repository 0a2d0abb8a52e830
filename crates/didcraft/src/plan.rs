//! Plan: compiled set of fields used to encode values into a DID payload and
//! decode a payload back into named values.

use std::collections::{BTreeMap, HashSet};

use crate::{
    compiled::{CompiledField, CompiledFieldKind},
    errors::{DecodeError, EncodeError, LayoutError},
    field::Field,
    options::{DecodeOptions, EncodeOptions},
    value::{DecodedDid, DecodedValue, Value},
};

/// A compiled layout: [CompiledField]s plus the record size in bytes. Use
/// [Plan::compile] to build one from [Field]s, then [Plan::encode] and
/// [Plan::decode] as often as needed.
///
/// Compiling the same fields twice yields plans that behave identically.
#[derive(Debug, Clone)]
pub struct Plan {
    total_bytes: usize,
    /// Compiled fields in definition order.
    fields: Vec<CompiledField>,
}

impl Plan {
    /// Compiles `fields` for a record of `total_bytes`. Structured fields get
    /// their own sub-plans, compiled recursively.
    pub fn compile(fields: &[Field], total_bytes: usize) -> Result<Self, LayoutError> {
        let mut names = HashSet::with_capacity(fields.len());
        let mut compiled_fields = Vec::with_capacity(fields.len());

        for field in fields {
            if !names.insert(field.name.as_str()) {
                return Err(LayoutError::InvalidFieldName(field.name.clone()));
            }

            let compiled_field = CompiledField::try_from(field)?;

            if let CompiledFieldKind::Leaf(leaf) = &compiled_field.kind {
                if leaf.end_byte() > total_bytes {
                    tracing::warn!(
                        field = %field.name,
                        end_byte = leaf.end_byte(),
                        total_bytes,
                        "field extends past the end of the record"
                    );
                }
            }

            compiled_fields.push(compiled_field);
        }

        Ok(Self {
            total_bytes,
            fields: compiled_fields,
        })
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn fields(&self) -> &[CompiledField] {
        &self.fields
    }

    /// Encodes `values` into exactly `total_bytes` bytes. Every leaf needs a
    /// value; structured fields cannot be encoded.
    pub fn encode(
        &self,
        values: &BTreeMap<String, Value>,
        options: &EncodeOptions,
    ) -> Result<Vec<u8>, EncodeError> {
        let mut buf = vec![0u8; self.total_bytes];

        for field in &self.fields {
            match &field.kind {
                CompiledFieldKind::Leaf(leaf) => {
                    let value = values
                        .get(&field.name)
                        .ok_or_else(|| EncodeError::MissingField(field.name.clone()))?;
                    leaf.encode(&field.name, value, options.scaling, &mut buf)?;
                }
                CompiledFieldKind::Struct(_) => {
                    return Err(EncodeError::Unsupported {
                        field: field.name.clone(),
                    });
                }
            }
        }

        Ok(buf)
    }

    /// Decodes `data` into a map of field names to [DecodedValue]s. Extra
    /// trailing bytes are ignored.
    pub fn decode(&self, data: &[u8], options: &DecodeOptions) -> Result<DecodedDid, DecodeError> {
        let mut decoded = DecodedDid::new();

        for field in &self.fields {
            match &field.kind {
                CompiledFieldKind::Leaf(leaf) => {
                    if !leaf.is_present(data) {
                        if options.allow_truncated {
                            tracing::trace!(field = %field.name, "dropping truncated field");
                            continue;
                        }

                        return Err(DecodeError::PacketTooShort {
                            field: field.name.clone(),
                            expected: leaf.end_byte(),
                            actual: data.len(),
                        });
                    }

                    let value = leaf.decode(&field.name, data, options)?;
                    decoded.insert(field.name.clone(), DecodedValue::from(value));
                }
                CompiledFieldKind::Struct(structure) => {
                    let value = structure.decode(&field.name, data, options)?;
                    decoded.insert(field.name.clone(), value);
                }
            }
        }

        Ok(decoded)
    }
}
