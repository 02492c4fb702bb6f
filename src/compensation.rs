//! Amplitude compensation for the MOTIMOVE output stage.
//!
//! The stimulator's output stage does not deliver amplitudes linearly over
//! the full 0..=170 mA range: a handful of codes produce one milliamp less
//! than requested, and two codes (49 and 50) are unreachable. This module
//! embeds the fixed 171-entry correction table that maps a requested
//! amplitude in mA to the byte the device must receive to deliver it.
//!
//! ## Table shape
//!
//! The mapping is the identity except for three irregularities:
//!
//! - requests 11..=33 are shifted down by one (10 appears twice at the
//!   boundary),
//! - 31 appears twice, so requests 34..=50 are shifted down by two,
//! - the output jumps from 48 to 51, after which the mapping is the
//!   identity up to 170.
//!
//! Because of the duplicated entries the table is not injective, and
//! re-applying it to its own output is only the identity outside the
//! shifted bands. The table is applied exactly once, immediately before an
//! amplitude byte is placed in the frame.

/// Amplitude correction table: requested mA (index) to device byte (value).
pub static AMPLITUDE_COMPENSATION: [u8; 171] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
    25, 26, 27, 28, 29, 30, 31, 31, 32, 33, 34, 35, 36, 37, 38, 39, 40, 41, 42, 43, 44, 45, 46,
    47, 48, 51, 52, 53, 54, 55, 56, 57, 58, 59, 60, 61, 62, 63, 64, 65, 66, 67, 68, 69, 70, 71,
    72, 73, 74, 75, 76, 77, 78, 79, 80, 81, 82, 83, 84, 85, 86, 87, 88, 89, 90, 91, 92, 93, 94,
    95, 96, 97, 98, 99, 100, 101, 102, 103, 104, 105, 106, 107, 108, 109, 110, 111, 112, 113, 114,
    115, 116, 117, 118, 119, 120, 121, 122, 123, 124, 125, 126, 127, 128, 129, 130, 131, 132, 133,
    134, 135, 136, 137, 138, 139, 140, 141, 142, 143, 144, 145, 146, 147, 148, 149, 150, 151, 152,
    153, 154, 155, 156, 157, 158, 159, 160, 161, 162, 163, 164, 165, 166, 167, 168, 169, 170,
];

/// Looks up the device byte for a requested amplitude in mA.
///
/// Indices beyond the table (over 170 mA) are clamped to the last entry;
/// the parameter store never produces them, but the lookup stays total.
pub fn compensate(requested_ma: u8) -> u8 {
    let idx = (requested_ma as usize).min(AMPLITUDE_COMPENSATION.len() - 1);
    AMPLITUDE_COMPENSATION[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_has_full_amplitude_range() {
        assert_eq!(AMPLITUDE_COMPENSATION.len(), 171);
        assert_eq!(AMPLITUDE_COMPENSATION[0], 0);
        assert_eq!(AMPLITUDE_COMPENSATION[170], 170);
    }

    #[test]
    fn test_boundary_duplicates() {
        assert_eq!(compensate(10), 10);
        assert_eq!(compensate(11), 10);
        assert_eq!(compensate(32), 31);
        assert_eq!(compensate(33), 31);
    }

    #[test]
    fn test_skipped_output_codes() {
        assert_eq!(compensate(50), 48);
        assert_eq!(compensate(51), 51);
        // 49 and 50 never appear as outputs
        assert!(!AMPLITUDE_COMPENSATION.contains(&49));
        assert!(!AMPLITUDE_COMPENSATION.contains(&50));
    }

    #[test]
    fn test_identity_outside_shifted_bands() {
        for ma in 0..=10u8 {
            assert_eq!(compensate(ma), ma);
        }
        for ma in 51..=170u8 {
            assert_eq!(compensate(ma), ma);
        }
    }

    #[test]
    fn test_shifted_bands() {
        for ma in 12..=33u8 {
            assert_eq!(compensate(ma), ma - 1);
        }
        for ma in 34..=50u8 {
            assert_eq!(compensate(ma), ma - 2);
        }
    }

    #[test]
    fn test_out_of_range_request_clamps() {
        assert_eq!(compensate(171), 170);
        assert_eq!(compensate(255), 170);
    }
}
