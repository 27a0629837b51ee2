//! Human-readable counter magnitudes
//!
//! Packet and byte counters are shown scaled to the largest unit that keeps
//! the mantissa below one step, e.g. `1.5 M` (metric) or `1.4 Mi` (binary).

use crate::core::error::CounterError;

const METRIC_LABELS: [&str; 9] = ["", "K", "M", "G", "T", "P", "E", "Z", "Y"];
const BINARY_LABELS: [&str; 9] = ["", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "Zi", "Yi"];

/// Distance below the unit step at which a value would round up to the step.
const PRECISION_OFFSETS: [f64; 4] = [0.5, 0.05, 0.005, 0.0005];

/// Highest supported number of decimal digits
pub const MAX_PRECISION: u8 = 3;

/// Formats `num` scaled by 1000 (`metric`) or 1024, with `precision` decimals.
///
/// The base unit has an empty label and is always printed without decimals,
/// so `format_magnitude(0.0, true, 1)` is `"0 "`.
///
/// # Errors
///
/// Returns `Err` if `precision` is above [`MAX_PRECISION`] or `num` is NaN
/// or infinite.
///
/// # Example
///
/// ```
/// use nft_viewer::core::counters::format_magnitude;
///
/// assert_eq!(format_magnitude(1000.0, true, 1).unwrap(), "1.0 K");
/// assert_eq!(format_magnitude(4_318_498_233.0, false, 3).unwrap(), "4.022 Gi");
/// assert_eq!(format_magnitude(-2048.0, false, 0).unwrap(), "-2 Ki");
/// ```
pub fn format_magnitude(num: f64, metric: bool, precision: u8) -> Result<String, CounterError> {
    if precision > MAX_PRECISION {
        return Err(CounterError::InvalidPrecision(precision));
    }
    if !num.is_finite() {
        return Err(CounterError::NotFinite);
    }

    let labels = if metric { &METRIC_LABELS } else { &BINARY_LABELS };
    let step = if metric { 1000.0 } else { 1024.0 };
    let threshold = step - PRECISION_OFFSETS[usize::from(precision)];

    let negative = num < 0.0;
    let mut value = num.abs();
    let last = labels.len() - 1;

    let mut unit = labels[0];
    for (i, label) in labels.iter().enumerate() {
        unit = label;
        if value < threshold {
            break;
        }
        if i != last {
            value /= step;
        }
    }

    let precision = if unit.is_empty() {
        0
    } else {
        usize::from(precision)
    };
    let sign = if negative { "-" } else { "" };

    Ok(format!("{sign}{value:.precision$} {unit}"))
}

/// Counter display used in rule rows: metric scaling, one decimal.
pub fn format_counter(value: u64) -> Result<String, CounterError> {
    format_magnitude(value as f64, true, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_base_unit() {
        for metric in [true, false] {
            for precision in 0..=MAX_PRECISION {
                assert_eq!(format_magnitude(0.0, metric, precision).unwrap(), "0 ");
            }
        }
    }

    #[test]
    fn test_first_step() {
        assert_eq!(format_magnitude(1000.0, true, 1).unwrap(), "1.0 K");
        assert_eq!(format_magnitude(1024.0, false, 1).unwrap(), "1.0 Ki");
    }

    #[test]
    fn test_negative_keeps_sign() {
        assert_eq!(format_magnitude(-2048.0, false, 0).unwrap(), "-2 Ki");
    }

    #[test]
    fn test_below_step_is_unscaled() {
        assert_eq!(format_magnitude(999.0, true, 1).unwrap(), "999 ");
        assert_eq!(format_magnitude(1023.0, false, 2).unwrap(), "1023 ");
    }

    #[test]
    fn test_rounding_threshold_moves_to_next_unit() {
        // 999.96 would print as "1000.0" at one decimal, so it scales instead
        assert_eq!(format_magnitude(999.96, true, 1).unwrap(), "1.0 K");
        assert_eq!(format_magnitude(999_960.0, true, 1).unwrap(), "1.0 M");
    }

    #[test]
    fn test_larger_units() {
        assert_eq!(format_magnitude(2_000_000_000_000_000.0, true, 0).unwrap(), "2 P");
        assert_eq!(format_magnitude(1_099_511_627_776.0, false, 0).unwrap(), "1 Ti");
        assert_eq!(format_magnitude(4_318_498_233.0, true, 3).unwrap(), "4.318 G");
        assert_eq!(format_magnitude(-4_318_498_233.0, false, 2).unwrap(), "-4.02 Gi");
    }

    #[test]
    fn test_largest_unit_is_not_exceeded() {
        let huge = 1e30;
        let formatted = format_magnitude(huge, true, 0).unwrap();
        assert!(formatted.ends_with(" Y"));
        assert!(formatted.starts_with("1000000"));
    }

    #[test]
    fn test_invalid_precision() {
        assert_eq!(
            format_magnitude(1.0, true, 4),
            Err(CounterError::InvalidPrecision(4))
        );
    }

    #[test]
    fn test_non_finite() {
        assert_eq!(format_magnitude(f64::NAN, true, 1), Err(CounterError::NotFinite));
        assert_eq!(
            format_magnitude(f64::INFINITY, false, 1),
            Err(CounterError::NotFinite)
        );
    }

    #[test]
    fn test_format_counter() {
        assert_eq!(format_counter(1_234_567).unwrap(), "1.2 M");
        assert_eq!(format_counter(42).unwrap(), "42 ");
    }
}
