//! Conversion between raw field bits and physical [Value]s.
//!
//! Decoding applies, in order:
//! 1. Base reinterpretation (unsigned, two's complement, IEEE float)
//! 2. Choice lookup on the raw value
//! 3. Numeric modifiers (`raw * scale + offset`)
//!
//! Encoding runs the same steps backwards. A choice label maps straight to its
//! raw code and is never scaled. Floating point fields store the code as an
//! IEEE value, and decode looks integral floats up in the choice table.

use crate::{
    bits::{fits_signed, fits_unsigned, sign_extend},
    errors::{DecodeError, EncodeError, LayoutError},
    field::{Choices, Encoding, Field},
    value::Value,
};

/// Base interpretation of a numeric field's raw bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericBase {
    Unsigned,
    Signed,
    /// Reinterpret 32 bits as an IEEE 754 float.
    Float32,
    /// Reinterpret 64 bits as an IEEE 754 double.
    Float64,
}

/// Compiled raw/physical conversion of a numeric leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub base: NumericBase,
    pub bits: usize,
    pub scale: f64,
    pub offset: f64,
    /// Physical values are always floats, even for integer bases.
    pub is_float: bool,
    pub choices: Option<Choices>,
}

impl TryFrom<&Field> for Conversion {
    type Error = LayoutError;

    fn try_from(field: &Field) -> Result<Self, Self::Error> {
        let bits = field.bit_length();
        let invalid_float = || LayoutError::InvalidFloatLength {
            field: field.name.clone(),
            bits,
        };

        let base = match field.encoding {
            // text leaves never reach here; see compiled::LeafKind
            Encoding::Unsigned | Encoding::Ascii => NumericBase::Unsigned,
            Encoding::Signed => NumericBase::Signed,
            Encoding::Float => match bits {
                32 => NumericBase::Float32,
                64 => NumericBase::Float64,
                _ => return Err(invalid_float()),
            },
            Encoding::Double if bits == 64 => NumericBase::Float64,
            Encoding::Double => return Err(invalid_float()),
        };

        if bits == 0 || bits > 64 {
            return Err(LayoutError::InvalidFieldSize {
                field: field.name.clone(),
                bits,
            });
        }

        Ok(Conversion {
            base,
            bits,
            scale: field.scale,
            offset: field.offset,
            is_float: field.is_float(),
            choices: field.choices().cloned(),
        })
    }
}

fn is_integral(x: f64) -> bool {
    x.is_finite() && x.fract() == 0.0 && x.abs() < i64::MAX as f64
}

/// Integer variant for `v`: unsigned fields prefer [Value::Unsigned], signed
/// fields always give [Value::Signed]. Falls back to a float when out of range.
fn int_value(v: i128, signed: bool) -> Value {
    if !signed {
        if let Ok(v) = u64::try_from(v) {
            return Value::Unsigned(v);
        }
    }
    match i64::try_from(v) {
        Ok(v) => Value::Signed(v),
        Err(_) => Value::Float(v as f64),
    }
}

impl Conversion {
    fn has_integral_modifiers(&self) -> bool {
        !self.is_float && is_integral(self.scale) && is_integral(self.offset)
    }

    /// Converts the raw bits of a field into a value.
    pub fn decode(&self, raw: u64, decode_choices: bool, scaling: bool) -> Value {
        let signed = self.base == NumericBase::Signed;
        let raw_int = match self.base {
            NumericBase::Float32 => {
                let v = f32::from_bits(raw as u32) as f64;
                return self.decode_float(v, decode_choices, scaling);
            }
            NumericBase::Float64 => {
                return self.decode_float(f64::from_bits(raw), decode_choices, scaling);
            }
            NumericBase::Signed => sign_extend(raw, self.bits) as i128,
            NumericBase::Unsigned => raw as i128,
        };

        if decode_choices {
            let label = self
                .choices
                .as_ref()
                .zip(i64::try_from(raw_int).ok())
                .and_then(|(choices, key)| choices.get(&key));
            if let Some(label) = label {
                return Value::Choice(label.clone());
            }
        }

        if !scaling {
            return int_value(raw_int, signed);
        }

        if self.has_integral_modifiers() {
            let physical = raw_int
                .checked_mul(self.scale as i128)
                .and_then(|v| v.checked_add(self.offset as i128));
            if let Some(physical) = physical {
                return int_value(physical, signed);
            }
        }

        Value::Float(raw_int as f64 * self.scale + self.offset)
    }

    fn decode_float(&self, v: f64, decode_choices: bool, scaling: bool) -> Value {
        if decode_choices && is_integral(v) {
            if let Some(label) = self.choices.as_ref().and_then(|c| c.get(&(v as i64))) {
                return Value::Choice(label.clone());
            }
        }

        if scaling {
            Value::Float(v * self.scale + self.offset)
        } else {
            Value::Float(v)
        }
    }

    /// Converts a value into the raw bits of the field named `field`.
    pub fn encode(&self, field: &str, value: &Value, scaling: bool) -> Result<u64, EncodeError> {
        if let Some(label) = value.as_str() {
            let Some(choices) = &self.choices else {
                return Err(EncodeError::InvalidValue {
                    field: field.to_string(),
                    reason: "expected a number",
                });
            };
            let code = choices
                .iter()
                .find(|(_, text)| text.as_str() == label)
                .map(|(code, _)| *code)
                .ok_or_else(|| EncodeError::UnknownChoice {
                    field: field.to_string(),
                    label: label.to_string(),
                })?;
            return match self.base {
                NumericBase::Float32 => Ok((code as f32).to_bits() as u64),
                NumericBase::Float64 => Ok((code as f64).to_bits()),
                NumericBase::Unsigned | NumericBase::Signed => self.check_range(field, code as i128),
            };
        }

        match self.base {
            NumericBase::Float32 => Ok((self.encode_float(value, scaling) as f32).to_bits() as u64),
            NumericBase::Float64 => Ok(self.encode_float(value, scaling).to_bits()),
            NumericBase::Unsigned | NumericBase::Signed => {
                let raw = self.physical_to_raw(field, value, scaling)?;
                self.check_range(field, raw)
            }
        }
    }

    fn encode_float(&self, value: &Value, scaling: bool) -> f64 {
        let v = value.as_f64().unwrap_or_default();
        if scaling {
            (v - self.offset) / self.scale
        } else {
            v
        }
    }

    fn physical_to_raw(&self, field: &str, value: &Value, scaling: bool) -> Result<i128, EncodeError> {
        let exact = match value {
            Value::Unsigned(v) => Some(*v as i128),
            Value::Signed(v) => Some(*v as i128),
            _ => None,
        };

        if let Some(v) = exact {
            if !scaling {
                return Ok(v);
            }
            if self.has_integral_modifiers() && self.scale != 0.0 {
                let numerator = v - self.offset as i128;
                let scale = self.scale as i128;
                if numerator % scale == 0 {
                    return Ok(numerator / scale);
                }
            }
        }

        let mut v = value.as_f64().unwrap_or_default();
        if scaling {
            v = (v - self.offset) / self.scale;
        } else if v.fract() != 0.0 {
            return Err(EncodeError::InvalidValue {
                field: field.to_string(),
                reason: "raw value is not an integer",
            });
        }

        if !v.is_finite() {
            return Err(EncodeError::InvalidValue {
                field: field.to_string(),
                reason: "value is not a finite number",
            });
        }

        Ok(v.round_ties_even() as i128)
    }

    fn check_range(&self, field: &str, raw: i128) -> Result<u64, EncodeError> {
        let fits = match self.base {
            NumericBase::Signed => fits_signed(raw, self.bits),
            _ => fits_unsigned(raw, self.bits),
        };

        if !fits {
            return Err(EncodeError::ValueOutOfRange {
                field: field.to_string(),
                raw: raw.to_string(),
            });
        }

        Ok(raw as u64)
    }
}

/// Decodes the bytes of an ASCII field, dropping trailing NUL padding.
pub fn decode_text(field: &str, bytes: &[u8]) -> Result<Value, DecodeError> {
    let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |pos| pos + 1);
    let invalid = || DecodeError::InvalidText {
        field: field.to_string(),
    };

    if !bytes[..end].is_ascii() {
        return Err(invalid());
    }

    String::from_utf8(bytes[..end].to_vec())
        .map(Value::Text)
        .map_err(|_| invalid())
}

/// Encodes text into an ASCII field of `width` bytes, padding with NULs.
pub fn encode_text(field: &str, value: &Value, width: usize) -> Result<Vec<u8>, EncodeError> {
    let Some(text) = value.as_str() else {
        return Err(EncodeError::InvalidValue {
            field: field.to_string(),
            reason: "expected text",
        });
    };

    if !text.is_ascii() {
        return Err(EncodeError::InvalidValue {
            field: field.to_string(),
            reason: "text is not ASCII",
        });
    }

    if text.len() > width {
        return Err(EncodeError::ValueOutOfRange {
            field: field.to_string(),
            raw: text.to_string(),
        });
    }

    let mut bytes = text.as_bytes().to_vec();
    bytes.resize(width, 0);
    Ok(bytes)
}
