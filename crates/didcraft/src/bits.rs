//! Low-level bit read and write utilities for byte slices.
//!
//! Bits are addressed with the internal start-bit numbering: bit 0 is the
//! least significant bit of byte 0. A field spans the bytes from `start / 8`
//! that are needed to hold `start % 8 + length` bits; they are combined into
//! one integer in the field's byte order.

use crate::field::ByteOrder;

/// Number of bytes touched by a field starting at `start` that is `length` bits wide.
pub fn span_bytes(start: usize, length: usize) -> usize {
    (start % 8 + length).div_ceil(8)
}

/// Mask covering the low `length` bits (up to 64).
pub fn mask(length: usize) -> u64 {
    if length >= 64 {
        u64::MAX
    } else {
        (1u64 << length) - 1
    }
}

fn span_value(bytes: &[u8], byte_order: ByteOrder) -> u128 {
    let fold = |acc: u128, b: &u8| (acc << 8) | *b as u128;
    match byte_order {
        ByteOrder::BigEndian => bytes.iter().fold(0, fold),
        ByteOrder::LittleEndian => bytes.iter().rev().fold(0, fold),
    }
}

/// Reads the `length`-bit raw value at `start` (max 64 bits). Returns `None`
/// when the field's bytes are not all present in `data`.
pub fn read_raw(data: &[u8], start: usize, length: usize, byte_order: ByteOrder) -> Option<u64> {
    debug_assert!(length <= 64);

    let first = start / 8;
    let bytes = data.get(first..first + span_bytes(start, length))?;
    let value = span_value(bytes, byte_order) >> (start % 8);

    Some(value as u64 & mask(length))
}

/// Writes the low `length` bits of `raw` at `start`, clearing the bits
/// previously held there. Bytes that fall outside `buf` are dropped.
pub fn write_raw(buf: &mut [u8], start: usize, length: usize, byte_order: ByteOrder, raw: u64) {
    debug_assert!(length <= 64);

    let first = start / 8;
    let span = span_bytes(start, length);
    let shift = start % 8;
    let field_mask = (mask(length) as u128) << shift;
    let bits = ((raw & mask(length)) as u128) << shift;

    for i in 0..span {
        let significance = match byte_order {
            ByteOrder::LittleEndian => i,
            ByteOrder::BigEndian => span - 1 - i,
        };
        let byte_mask = (field_mask >> (8 * significance)) as u8;
        let byte_bits = (bits >> (8 * significance)) as u8;

        if let Some(slot) = buf.get_mut(first + i) {
            *slot = (*slot & !byte_mask) | (byte_bits & byte_mask);
        }
    }
}

/// Sign-extends the low `bits` of `value` to a full `i64`.
pub fn sign_extend(value: u64, bits: usize) -> i64 {
    if bits == 0 || bits >= 64 {
        return value as i64;
    }
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}

/// Checks that `raw` fits an unsigned field of `bits` width.
pub fn fits_unsigned(raw: i128, bits: usize) -> bool {
    raw >= 0 && raw <= mask(bits) as i128
}

/// Checks that `raw` fits a two's complement field of `bits` width.
pub fn fits_signed(raw: i128, bits: usize) -> bool {
    if bits == 0 {
        return false;
    }
    let limit = 1i128 << (bits - 1);
    raw >= -limit && raw < limit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_bytes() {
        assert_eq!(span_bytes(0, 8), 1);
        assert_eq!(span_bytes(4, 8), 2);
        assert_eq!(span_bytes(7, 64), 9);
        assert_eq!(span_bytes(16, 1), 1);
    }

    #[test]
    fn test_read_raw_byte_orders() {
        let data = [0x12, 0x34];
        assert_eq!(read_raw(&data, 0, 16, ByteOrder::BigEndian), Some(0x1234));
        assert_eq!(read_raw(&data, 0, 16, ByteOrder::LittleEndian), Some(0x3412));
    }

    #[test]
    fn test_read_raw_sub_byte() {
        let data = [0b1010_0110];
        assert_eq!(read_raw(&data, 0, 4, ByteOrder::LittleEndian), Some(0b0110));
        assert_eq!(read_raw(&data, 4, 4, ByteOrder::LittleEndian), Some(0b1010));
        assert_eq!(read_raw(&data, 7, 1, ByteOrder::BigEndian), Some(1));
    }

    #[test]
    fn test_read_raw_out_of_bounds() {
        let data = [0xFF];
        assert_eq!(read_raw(&data, 0, 9, ByteOrder::LittleEndian), None);
        assert_eq!(read_raw(&data, 8, 1, ByteOrder::BigEndian), None);
    }

    #[test]
    fn test_read_raw_64_bits_unaligned() {
        let data = [0xF0, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x0F];
        assert_eq!(read_raw(&data, 4, 64, ByteOrder::LittleEndian), Some(u64::MAX));
    }

    #[test]
    fn test_write_raw_byte_orders() {
        let mut buf = [0u8; 2];
        write_raw(&mut buf, 0, 16, ByteOrder::BigEndian, 0x1234);
        assert_eq!(buf, [0x12, 0x34]);

        write_raw(&mut buf, 0, 16, ByteOrder::LittleEndian, 0x1234);
        assert_eq!(buf, [0x34, 0x12]);
    }

    #[test]
    fn test_write_raw_keeps_neighbours() {
        let mut buf = [0xFF];
        write_raw(&mut buf, 2, 3, ByteOrder::LittleEndian, 0);
        assert_eq!(buf, [0b1110_0011]);

        write_raw(&mut buf, 2, 3, ByteOrder::LittleEndian, 0b101);
        assert_eq!(buf, [0b1111_0111]);
    }

    #[test]
    fn test_write_raw_clips_outside_buffer() {
        let mut buf = [0u8; 1];
        write_raw(&mut buf, 0, 16, ByteOrder::LittleEndian, 0xABCD);
        assert_eq!(buf, [0xCD]);
    }

    #[test]
    fn test_write_then_read_straddling() {
        let mut buf = [0u8; 3];
        write_raw(&mut buf, 5, 13, ByteOrder::BigEndian, 0x1ABC);
        assert_eq!(read_raw(&buf, 5, 13, ByteOrder::BigEndian), Some(0x1ABC));
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0b11111111, 8), -1);
        assert_eq!(sign_extend(0b0111, 4), 7);
        assert_eq!(sign_extend(u64::MAX, 64), -1);
    }

    #[test]
    fn test_fits() {
        assert!(fits_unsigned(255, 8));
        assert!(!fits_unsigned(256, 8));
        assert!(!fits_unsigned(-1, 8));
        assert!(fits_unsigned(u64::MAX as i128, 64));
        assert!(fits_signed(-128, 8));
        assert!(!fits_signed(128, 8));
        assert!(fits_signed(i64::MIN as i128, 64));
    }
}
