//! Lenient number handling shared by the sheet importer and the alert filter.
//!
//! Uploaded sheets and filter forms are typed by hand, so numbers are read the way a
//! spreadsheet user expects: the leading numeric part counts and trailing junk is ignored.

/// Reads the leading base-10 integer of `s` (after optional whitespace and sign).
/// `"12.7"` → 12, `"10abc"` → 10, `"abc"` → `None`.
pub fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, rest) = split_sign(s);
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let value: i64 = rest[..digits].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Reads the longest leading decimal literal of `s`: digits, optional fraction and optional
/// exponent. `"1.5kg"` → 1.5, `".5"` → 0.5, `"2e3x"` → 2000, `"x1"` → `None`.
pub fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let (negative, rest) = split_sign(s);

    if rest.starts_with("Infinity") {
        return Some(if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }

    let bytes = rest.as_bytes();
    let mut end = 0;
    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }

    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(&bytes[exp_end.min(bytes.len())..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    let value: f64 = rest[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Rounds to 2 decimals the way fixed-point formatting does: to the nearest representable
/// 2-decimal value, and toward the larger one when the binary value lies exactly halfway.
/// `0.125` → 0.13, while `1.005` (stored slightly below 1.005) → 1.00.
pub fn round_cents(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }

    // Exact halfway points at the third decimal are odd multiples of 1/8.
    let eighths = value * 8.0;
    if eighths.fract() == 0.0 && (eighths as i64) % 2 != 0 {
        return (value * 100.0 + 0.5).floor() / 100.0;
    }

    format!("{value:.2}").parse().unwrap_or(value)
}

/// Formats a rounded amount with exactly two decimals.
pub fn format_cents(value: f64) -> String {
    format!("{:.2}", round_cents(value))
}

fn split_sign(s: &str) -> (bool, &str) {
    if let Some(rest) = s.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = s.strip_prefix('+') {
        (false, rest)
    } else {
        (false, s)
    }
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_prefix_ignores_trailing_text() {
        assert_eq!(parse_int_prefix("42"), Some(42));
        assert_eq!(parse_int_prefix("  12.7"), Some(12));
        assert_eq!(parse_int_prefix("10abc"), Some(10));
        assert_eq!(parse_int_prefix("-3"), Some(-3));
        assert_eq!(parse_int_prefix("+8 u."), Some(8));
        assert_eq!(parse_int_prefix("abc"), None);
        assert_eq!(parse_int_prefix(""), None);
        assert_eq!(parse_int_prefix("   "), None);
        assert_eq!(parse_int_prefix("-"), None);
    }

    #[test]
    fn float_prefix_reads_longest_literal() {
        assert_eq!(parse_float_prefix("1.5kg"), Some(1.5));
        assert_eq!(parse_float_prefix(".5"), Some(0.5));
        assert_eq!(parse_float_prefix("5."), Some(5.0));
        assert_eq!(parse_float_prefix("2e3x"), Some(2000.0));
        assert_eq!(parse_float_prefix("2e"), Some(2.0));
        assert_eq!(parse_float_prefix("-0.25"), Some(-0.25));
        assert_eq!(parse_float_prefix("Infinity"), Some(f64::INFINITY));
        assert_eq!(parse_float_prefix("."), None);
        assert_eq!(parse_float_prefix("x1"), None);
        assert_eq!(parse_float_prefix(""), None);
    }

    #[test]
    fn round_cents_matches_fixed_point_formatting() {
        assert_eq!(round_cents(10.0), 10.0);
        assert_eq!(round_cents(3.14159), 3.14);
        assert_eq!(round_cents(0.125), 0.13);
        assert_eq!(round_cents(0.375), 0.38);
        assert_eq!(round_cents(1.005), 1.0);
        assert_eq!(round_cents(2.675), 2.67);
        assert_eq!(round_cents(0.005), 0.01);
        assert_eq!(round_cents(1.0 / 3.0), 0.33);
    }

    #[test]
    fn format_cents_pads_two_decimals() {
        assert_eq!(format_cents(0.0), "0.00");
        assert_eq!(format_cents(10.0), "10.00");
        assert_eq!(format_cents(0.125), "0.13");
    }
}
