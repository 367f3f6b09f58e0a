//! Human readable byte counts for `cache size`.

const UNITS: &[(u64, &str)] = &[
    (1 << 50, "PB"),
    (1 << 40, "TB"),
    (1 << 30, "GB"),
    (1 << 20, "MB"),
    (1 << 10, "kB"),
    (1, "bytes"),
];

/// Format `bytes` with `precision` decimals in the largest unit it reaches.
pub fn humanize(bytes: u64, precision: usize) -> String {
    if bytes == 1 {
        return "1 byte".to_string();
    }
    let (factor, unit) = UNITS
        .iter()
        .copied()
        .find(|(factor, _)| bytes >= *factor)
        .unwrap_or((1, "bytes"));
    format!("{:.*} {}", precision, bytes as f64 / factor as f64, unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singular_byte() {
        assert_eq!(humanize(1, 2), "1 byte");
    }

    #[test]
    fn small_counts_stay_in_bytes() {
        assert_eq!(humanize(0, 2), "0.00 bytes");
        assert_eq!(humanize(512, 2), "512.00 bytes");
        assert_eq!(humanize(1023, 0), "1023 bytes");
    }

    #[test]
    fn picks_largest_unit() {
        assert_eq!(humanize(1024, 2), "1.00 kB");
        assert_eq!(humanize(1536, 2), "1.50 kB");
        assert_eq!(humanize(5 * (1 << 20), 2), "5.00 MB");
        assert_eq!(humanize(3 * (1 << 30) / 2, 1), "1.5 GB");
        assert_eq!(humanize(1 << 40, 2), "1.00 TB");
        assert_eq!(humanize(2048 * (1 << 50), 2), "2048.00 PB");
    }
}
