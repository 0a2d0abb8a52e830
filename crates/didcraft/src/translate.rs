//! Conversion between document-order bit offsets and internal start bits.
//!
//! Layout sources list fields byte by byte from the first byte of the record,
//! most significant bit first, so a field's position is simply the number of
//! bits preceding it. The codec instead addresses bits the way frame signal
//! codecs do: bit 0 is the least significant bit of byte 0, bit 7 its most
//! significant bit, and byte 1 starts at bit 8.
//!
//! A field then occupies `ceil((start % 8 + length) / 8)` bytes from byte
//! `start / 8`, read as one integer in the field's byte order and shifted right
//! by `start % 8`.

use crate::field::ByteOrder;

/// Translates the document-order `offset_bits` of a field that is
/// `bit_length` bits wide into its internal start bit.
///
/// Little-endian fields map directly. For big-endian fields the last byte of
/// the span is the least significant one, so the start bit records where the
/// field's lowest bit sits within that byte.
///
/// No bounds checking is done against the record length.
pub fn document_offset_to_start_bit(
    offset_bits: usize,
    bit_length: usize,
    byte_order: ByteOrder,
) -> usize {
    debug_assert!(bit_length > 0, "field length must be positive");

    match byte_order {
        ByteOrder::LittleEndian => offset_bits,
        ByteOrder::BigEndian => {
            let last_bit = (offset_bits + bit_length).saturating_sub(1);
            8 * (offset_bits / 8) + (7 - last_bit % 8)
        }
    }
}
