/// Plain byte sum used by the legacy reader as an integrity tag. The sum is
/// unbounded; callers narrow it to the width of the field they fill.
pub fn checksum(bytes: &[u8]) -> u64 {
    bytes.iter().map(|&b| u64::from(b)).sum()
}

#[cfg(test)]
mod tests {
    use super::checksum;

    #[test]
    fn empty_input_sums_to_zero() {
        assert_eq!(checksum(&[]), 0);
    }

    #[test]
    fn appending_a_byte_adds_its_value() {
        let base = b"VER3.501".to_vec();
        let before = checksum(&base);
        for v in [0u8, 1, 26, 200, 255] {
            let mut extended = base.clone();
            extended.push(v);
            assert_eq!(checksum(&extended), before + u64::from(v));
        }
    }

    #[test]
    fn no_modulus_is_applied() {
        assert_eq!(checksum(&[0xFF; 1000]), 255_000);
        let past_u32 = vec![0xFF; 16_843_010];
        assert_eq!(checksum(&past_u32), 16_843_010 * 255);
        assert!(checksum(&past_u32) > u64::from(u32::MAX));
    }
}
