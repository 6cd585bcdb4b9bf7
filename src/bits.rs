//! Two's-complement field helpers shared by the builders, the decoder and the runtime.
//!
//! Every immediate or offset field of an instruction goes through one of these functions.

/// CPU word. Registers, memory cells and instructions are all one word wide.
pub type Word = u16;

/// Whether the top bit of the full word is set.
#[inline]
pub const fn is_negative(value: Word) -> bool {
    value & 0x8000 != 0
}

/// Squeeze `value` into a `bits`-wide field, keeping its sign.
///
/// The sign is taken from bit 15 of the full word. Values which do not fit in the field are
/// truncated to their low bits, with the field's sign bit forced on for negative inputs. This
/// is not an error: oversized immediates silently lose their high bits.
#[inline]
pub const fn sign_compress(value: Word, bits: u32) -> Word {
    debug_assert!(bits > 0 && bits <= 16);
    let negative = is_negative(value);
    let mut field = value & low_mask(bits);
    if negative {
        field |= 1 << (bits - 1);
    }
    field
}

/// Extend the sign bit of a `bits`-wide field through bit 15.
///
/// Bits above the field are expected to be clear; they are left untouched for positive fields.
#[inline]
pub const fn sign_extend(value: Word, bits: u32) -> Word {
    debug_assert!(bits > 0 && bits <= 16);
    if value & (1 << (bits - 1)) != 0 {
        value | !low_mask(bits)
    } else {
        value
    }
}

/// Extract the `bits`-wide field starting at bit `from`.
#[inline]
pub const fn get_bits(value: Word, from: u32, bits: u32) -> Word {
    (value >> from) & low_mask(bits)
}

/// Extract the `bits`-wide field starting at bit `from` and sign extend it.
#[inline]
pub const fn get_bits_extended(value: Word, from: u32, bits: u32) -> Word {
    sign_extend(get_bits(value, from, bits), bits)
}

// Computed in u32 so that a 16 bit field does not overflow the shift
#[inline]
const fn low_mask(bits: u32) -> Word {
    ((1u32 << bits) - 1) as Word
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compress() {
        #[rustfmt::skip]
        let cases: &[(Word, u32, Word)] = &[
            // (value, bits, field)
            (42, 6, 42),
            // Overflowing positive values lose their high bits
            (42, 5, 10),
            (42, 4, 10),
            (-42i16 as Word, 16, 65494),
            (-42i16 as Word, 10, 982),
            // Overflowing negative value keeps its sign bit
            (-42i16 as Word, 5, 22),
            (-1i16 as Word, 9, 0x1ff),
            (-16i16 as Word, 5, 0b10000),
            (0x7fff, 16, 0x7fff),
        ];

        for &(value, bits, expected) in cases {
            let actual = sign_compress(value, bits);
            assert_eq!(
                actual, expected,
                "sign_compress(0x{value:04x}, {bits}) == 0x{actual:04x}"
            );
        }
    }

    #[test]
    fn extend() {
        #[rustfmt::skip]
        let cases: &[(_, &[_])] = &[
            // (input, [bits...])
            //           15      14      13      12      11      10      9       8       7       6       5       4       3       2       1
            (0x0000, &[0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000, 0x0000]),
            (0x0001, &[0x0001, 0x0001, 0x0001, 0x0001, 0x0001, 0x0001, 0x0001, 0x0001, 0x0001, 0x0001, 0x0001, 0x0001, 0x0001, 0x0001, 0xffff]),
            (0x00ff, &[0x00ff, 0x00ff, 0x00ff, 0x00ff, 0x00ff, 0x00ff, 0x00ff, 0xffff]),
            (0x0100, &[0x0100, 0x0100, 0x0100, 0x0100, 0x0100, 0x0100, 0xff00]),
            (0x01ff, &[0x01ff, 0x01ff, 0x01ff, 0x01ff, 0x01ff, 0x01ff, 0xffff]),
            (0x0400, &[0x0400, 0x0400, 0x0400, 0x0400, 0xfc00]),
            (0x07ff, &[0x07ff, 0x07ff, 0x07ff, 0x07ff, 0xffff]),
            (0x1000, &[0x1000, 0x1000, 0xf000]),
            (0x3fff, &[0x3fff, 0xffff]),
            (0x7000, &[0xf000]),
        ];

        for (input, expecteds) in cases {
            for (i, expected) in expecteds.iter().enumerate() {
                let bits = 15 - i as u32;
                let actual = sign_extend(*input, bits);
                assert_eq!(
                    actual, *expected,
                    "sign_extend(0x{input:04x}, {bits}) == 0x{actual:04x}"
                );
            }
        }
    }

    #[test]
    fn extend_small_fields() {
        assert_eq!(sign_extend(42, 8), 42);
        assert_eq!(sign_extend(42, 7), 42);
        assert_eq!(sign_extend(42, 6), 65514);
    }

    #[test]
    fn compress_then_extend_recovers_value() {
        for bits in 2..=16u32 {
            let min = -(1i32 << (bits - 1));
            let max = (1i32 << (bits - 1)) - 1;
            for value in [min, min + 1, -1, 0, 1, max - 1, max] {
                let word = value as i16 as Word;
                let field = sign_compress(word, bits);
                assert_eq!(
                    sign_extend(field, bits),
                    word,
                    "value {value} does not survive a {bits} bit field"
                );
            }
        }
    }

    #[test]
    fn field_extraction() {
        let word = 0b0001_101_110_1_11110;
        assert_eq!(get_bits(word, 12, 4), 0b0001);
        assert_eq!(get_bits(word, 9, 3), 0b101);
        assert_eq!(get_bits(word, 6, 3), 0b110);
        assert_eq!(get_bits(word, 5, 1), 1);
        assert_eq!(get_bits(word, 0, 5), 0b11110);
        assert_eq!(get_bits_extended(word, 0, 5), -2i16 as Word);
    }
}
