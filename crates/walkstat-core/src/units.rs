//! Binary size units used by every report.

/// Bytes in a kibibyte.
pub const KIB: u64 = 1024;
/// Bytes in a mebibyte.
pub const MIB: u64 = 1024 * KIB;
/// Bytes in a gibibyte.
pub const GIB: u64 = 1024 * MIB;
/// Bytes in a tebibyte.
pub const TIB: u64 = 1024 * GIB;

/// Seconds in one day.
pub const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// Convert bytes to fractional GiB.
pub fn as_gib(bytes: u64) -> f64 {
    bytes as f64 / GIB as f64
}

/// Convert bytes to fractional TiB.
pub fn as_tib(bytes: u64) -> f64 {
    bytes as f64 / TIB as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_ladder() {
        assert_eq!(MIB, 1_048_576);
        assert_eq!(GIB, 1_073_741_824);
        assert_eq!(TIB, 1_099_511_627_776);
    }

    #[test]
    fn test_fractional_conversions() {
        assert_eq!(as_gib(GIB * 3), 3.0);
        assert_eq!(as_tib(TIB / 2), 0.5);
    }
}
