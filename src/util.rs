//! Bit twiddling over the variable-length masks XInput2 attaches to its events.

/// Whether bit `bit` is set in `mask`. Bit zero is the least significant bit of the
/// first byte, matching `XIMaskIsSet`.
///
/// Out of range bits (negative, or past the end of the mask) are reported as unset, with a
/// diagnostic, rather than being read.
#[must_use]
pub fn is_bit_set(mask: &[u8], bit: i32) -> bool {
    let Some(byte) = byte_of(mask, bit) else {
        log::warn!(
            "{}",
            crate::decode::DecodeError::InvalidBitOffset {
                bit,
                mask_len: mask.len(),
            }
        );
        return false;
    };
    // byte_of checked the sign.
    #[allow(clippy::cast_sign_loss)]
    let shift = bit as u32 % u8::BITS;
    byte & (1 << shift) != 0
}

/// Fetch the byte holding `bit`, or `None` if it's not in the mask.
fn byte_of(mask: &[u8], bit: i32) -> Option<u8> {
    let bit = u32::try_from(bit).ok()?;
    let byte_offset = usize::try_from(bit / u8::BITS).ok()?;
    mask.get(byte_offset).copied()
}

/// Count the bits set in `mask` strictly below `bit`.
///
/// Packed value lists only carry entries for set bits, so this is the index into such a
/// list of the value belonging to `bit`. Bits beyond the end of the mask count as unset.
#[must_use]
pub fn count_set_below(mask: &[u8], bit: u32) -> usize {
    let whole_bytes = usize::try_from(bit / u8::BITS).unwrap_or(usize::MAX);
    let partial = bit % u8::BITS;

    let whole: u32 = mask
        .iter()
        .take(whole_bytes)
        .map(|byte| byte.count_ones())
        .sum();
    let partial = mask.get(whole_bytes).map_or(0, |byte| {
        // Mask off `partial` low bits. partial < 8, so the shift never overflows.
        (byte & ((1u8 << partial) - 1)).count_ones()
    });

    // At most 8 * mask.len(), this always fits.
    (whole + partial) as usize
}

/// Round half away from zero, saturating at the bounds of `i32`. NaN becomes zero.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn round_saturating(value: f64) -> i32 {
    // `as` from float saturates.
    value.round() as i32
}

#[cfg(test)]
mod tests {
    use super::{count_set_below, is_bit_set, round_saturating};

    #[test]
    fn reads_lsb_first() {
        let mask = [0b0000_0101, 0b1000_0000];
        assert!(is_bit_set(&mask, 0));
        assert!(!is_bit_set(&mask, 1));
        assert!(is_bit_set(&mask, 2));
        assert!(!is_bit_set(&mask, 8));
        assert!(is_bit_set(&mask, 15));
    }

    #[test]
    fn out_of_range_is_unset() {
        let mask = [0xFF; 2];
        assert!(!is_bit_set(&mask, -1));
        assert!(!is_bit_set(&mask, 16));
        assert!(!is_bit_set(&mask, i32::MAX));
        assert!(!is_bit_set(&[], 0));
        assert!(!is_bit_set(&mask, i32::MIN));
    }

    #[test]
    fn agrees_with_shift_for_every_in_range_bit() {
        // Deterministic pseudo-random masks of several lengths.
        let mut seed = 0x2545_F491_u32;
        for len in 0..12 {
            let mask = (0..len)
                .map(|_| {
                    seed ^= seed << 13;
                    seed ^= seed >> 17;
                    seed ^= seed << 5;
                    seed.to_le_bytes()[0]
                })
                .collect::<Vec<u8>>();
            for bit in -8..(8 * len as i32 + 8) {
                let expected = bit >= 0
                    && (bit as usize) < 8 * mask.len()
                    && mask[bit as usize / 8] >> (bit % 8) & 1 == 1;
                assert_eq!(is_bit_set(&mask, bit), expected, "mask {mask:?} bit {bit}");
            }
        }
    }

    #[test]
    fn counts_lower_bits() {
        let mask = [0b0000_1011, 0b0000_0001];
        assert_eq!(count_set_below(&mask, 0), 0);
        assert_eq!(count_set_below(&mask, 1), 1);
        assert_eq!(count_set_below(&mask, 2), 2);
        assert_eq!(count_set_below(&mask, 3), 2);
        assert_eq!(count_set_below(&mask, 8), 3);
        assert_eq!(count_set_below(&mask, 9), 4);
        assert_eq!(count_set_below(&mask, 200), 4);
    }

    #[test]
    fn rounding() {
        assert_eq!(round_saturating(3.7), 4);
        assert_eq!(round_saturating(0.4), 0);
        assert_eq!(round_saturating(-1.2), -1);
        assert_eq!(round_saturating(-0.5), -1);
        assert_eq!(round_saturating(2.5), 3);
        assert_eq!(round_saturating(1e300), i32::MAX);
        assert_eq!(round_saturating(f64::NAN), 0);
    }
}
