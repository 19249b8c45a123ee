//! PHP type juggling primitives
//!
//! Pure conversion functions shared by the value model, the array key
//! normaliser and the comparison rules. Nothing here reports diagnostics;
//! callers receive enough information (see [`NumericKind`]) to decide
//! whether a warning is due.
//!
//! ### Numeric strings
//! - Leading whitespace (` \t\n\r\v\f`) is skipped, trailing whitespace is allowed
//! - Integer literals that overflow `i64` become doubles
//! - `"42abc"` is *leading numeric*: `(int)"42abc" == 42`, `is_numeric("42abc") == false`
//! - No hexadecimal, octal or binary forms
//!
//! ## References
//!
//! - Zend: `$PHP_SRC_PATH/Zend/zend_operators.c` - _is_numeric_string_ex, zend_dval_to_lval
//! - Zend: `$PHP_SRC_PATH/Zend/zend_strtod.c` - zend_gcvt

/// Default `precision` ini value used by string casts.
pub const DEFAULT_PRECISION: i32 = 14;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Long(i64),
    Double(f64),
}

impl Number {
    pub fn to_double(self) -> f64 {
        match self {
            Number::Long(i) => i as f64,
            Number::Double(d) => d,
        }
    }

    pub fn to_long(self) -> i64 {
        match self {
            Number::Long(i) => i,
            Number::Double(d) => double_to_long(d),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    /// The whole string (modulo surrounding whitespace) is a number.
    Numeric,
    /// A number followed by garbage, e.g. `"42abc"`.
    LeadingNumeric,
    /// No number at the start of the string.
    NonNumeric,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericParse {
    pub number: Number,
    pub kind: NumericKind,
}

impl NumericParse {
    fn non_numeric() -> Self {
        Self {
            number: Number::Long(0),
            kind: NumericKind::NonNumeric,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.kind == NumericKind::Numeric
    }
}

#[inline]
fn is_php_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

/// Parse the numeric prefix of a string.
/// Reference: $PHP_SRC_PATH/Zend/zend_operators.c - _is_numeric_string_ex
pub fn parse_numeric(s: &[u8]) -> NumericParse {
    let len = s.len();
    let mut i = 0;
    while i < len && is_php_whitespace(s[i]) {
        i += 1;
    }
    let start = i;

    if i < len && (s[i] == b'+' || s[i] == b'-') {
        i += 1;
    }
    let int_start = i;
    while i < len && s[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i - int_start;
    let mut is_double = false;

    if i < len && s[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < len && s[j].is_ascii_digit() {
            j += 1;
        }
        if int_digits > 0 || j > frac_start {
            i = j;
            is_double = true;
        }
    }

    if int_digits == 0 && !is_double {
        return NumericParse::non_numeric();
    }

    if i < len && (s[i] == b'e' || s[i] == b'E') {
        let mut j = i + 1;
        if j < len && (s[j] == b'+' || s[j] == b'-') {
            j += 1;
        }
        if j < len && s[j].is_ascii_digit() {
            while j < len && s[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
            is_double = true;
        }
    }

    let number_end = i;
    let mut k = number_end;
    while k < len && is_php_whitespace(s[k]) {
        k += 1;
    }
    let kind = if k == len {
        NumericKind::Numeric
    } else {
        NumericKind::LeadingNumeric
    };

    let literal = &s[start..number_end];
    let number = if is_double {
        Number::Double(parse_double_literal(literal))
    } else {
        match parse_long_literal(literal) {
            Some(v) => Number::Long(v),
            None => Number::Double(parse_double_literal(literal)),
        }
    };

    NumericParse { number, kind }
}

/// Parse an already validated `[+-]digits` literal, `None` on i64 overflow.
fn parse_long_literal(literal: &[u8]) -> Option<i64> {
    let (negative, digits) = match literal.first() {
        Some(b'-') => (true, &literal[1..]),
        Some(b'+') => (false, &literal[1..]),
        _ => (false, literal),
    };
    let mut magnitude: u64 = 0;
    for &d in digits {
        magnitude = magnitude
            .checked_mul(10)?
            .checked_add(u64::from(d - b'0'))?;
    }
    if negative {
        if magnitude == i64::MIN.unsigned_abs() {
            Some(i64::MIN)
        } else {
            i64::try_from(magnitude).ok().map(|v| -v)
        }
    } else {
        i64::try_from(magnitude).ok()
    }
}

fn parse_double_literal(literal: &[u8]) -> f64 {
    std::str::from_utf8(literal)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// `is_numeric()` semantics: the whole string must be numeric.
pub fn is_numeric(s: &[u8]) -> bool {
    parse_numeric(s).is_numeric()
}

/// `(int)$string` semantics: leading-numeric prefix, saturating on overflow.
/// Reference: $PHP_SRC_PATH/Zend/zend_operators.c - zendi_smart_str... ZEND_STRTOL / zend_dval_to_lval_cap
pub fn string_to_long(s: &[u8]) -> i64 {
    match parse_numeric(s).number {
        Number::Long(i) => i,
        Number::Double(d) => double_to_long_saturating(d),
    }
}

/// `(float)$string` semantics
pub fn string_to_double(s: &[u8]) -> f64 {
    parse_numeric(s).number.to_double()
}

fn double_to_long_saturating(d: f64) -> i64 {
    if !d.is_finite() {
        return 0;
    }
    if d >= 9.223_372_036_854_775_807e18 {
        i64::MAX
    } else if d < -9.223_372_036_854_775_808e18 {
        i64::MIN
    } else {
        d as i64
    }
}

/// `(int)$double` semantics: truncation toward zero, modular for out-of-range
/// finite values, zero for NaN and infinities.
/// Reference: $PHP_SRC_PATH/Zend/zend_operators.c - zend_dval_to_lval_slow
pub fn double_to_long(d: f64) -> i64 {
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
    const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

    if !d.is_finite() {
        return 0;
    }
    if (-TWO_POW_63..TWO_POW_63).contains(&d) {
        return d as i64;
    }

    let mut dmod = d % TWO_POW_64;
    if dmod < 0.0 {
        // -2^63 cannot be represented after the shift below
        if dmod == -TWO_POW_63 {
            return i64::MIN;
        }
        dmod += TWO_POW_64;
    }
    if dmod >= TWO_POW_63 {
        dmod -= TWO_POW_64;
    }
    dmod as i64
}

/// Format a double the way PHP prints it.
///
/// `precision` follows the ini directives: a positive value is the number of
/// significant digits (`precision`), `-1` selects the shortest representation
/// that round-trips (`serialize_precision`).
/// Reference: $PHP_SRC_PATH/Zend/zend_strtod.c - zend_gcvt
pub fn format_double(value: f64, precision: i32) -> String {
    if value.is_nan() {
        return "NAN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "INF" } else { "-INF" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let (threshold, repr) = if precision < 0 {
        (17, format!("{:e}", value))
    } else {
        let digits = precision.clamp(1, 40) as usize;
        (digits as i32, format!("{:.*e}", digits - 1, value))
    };

    let Some((mantissa, exponent)) = repr.split_once('e') else {
        return repr;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let negative = mantissa.starts_with('-');
    let mut digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    while digits.len() > 1 && digits.ends_with('0') {
        digits.pop();
    }

    let mut out = String::with_capacity(digits.len() + 8);
    if negative {
        out.push('-');
    }

    if exponent < -4 || exponent >= threshold {
        out.push_str(&digits[..1]);
        out.push('.');
        if digits.len() > 1 {
            out.push_str(&digits[1..]);
        } else {
            out.push('0');
        }
        out.push('E');
        out.push(if exponent < 0 { '-' } else { '+' });
        out.push_str(&exponent.unsigned_abs().to_string());
    } else if exponent < 0 {
        out.push_str("0.");
        for _ in 0..(-exponent - 1) {
            out.push('0');
        }
        out.push_str(&digits);
    } else {
        let int_len = exponent as usize + 1;
        if digits.len() <= int_len {
            out.push_str(&digits);
            for _ in digits.len()..int_len {
                out.push('0');
            }
        } else {
            out.push_str(&digits[..int_len]);
            out.push('.');
            out.push_str(&digits[int_len..]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_grammar() {
        assert!(is_numeric(b"42"));
        assert!(is_numeric(b"  42  "));
        assert!(is_numeric(b"-1.5e3"));
        assert!(is_numeric(b".5"));
        assert!(is_numeric(b"1."));
        assert!(!is_numeric(b"."));
        assert!(!is_numeric(b"42abc"));
        assert!(!is_numeric(b"0x1A"));
        assert!(!is_numeric(b""));
        assert!(!is_numeric(b"1e"));
    }

    #[test]
    fn leading_numeric_cast() {
        assert_eq!(string_to_long(b"42abc"), 42);
        assert_eq!(parse_numeric(b"42abc").kind, NumericKind::LeadingNumeric);
        assert_eq!(string_to_long(b"abc"), 0);
        assert_eq!(parse_numeric(b"abc").kind, NumericKind::NonNumeric);
        assert_eq!(string_to_long(b"1e3"), 1000);
        assert_eq!(string_to_long(b"  -7.9"), -7);
        assert_eq!(string_to_double(b"1e3xyz"), 1000.0);
    }

    #[test]
    fn long_overflow_falls_back_to_double() {
        assert_eq!(
            parse_numeric(b"9223372036854775807").number,
            Number::Long(i64::MAX)
        );
        assert_eq!(
            parse_numeric(b"-9223372036854775808").number,
            Number::Long(i64::MIN)
        );
        assert_eq!(
            parse_numeric(b"9223372036854775808").number,
            Number::Double(9.223_372_036_854_775_808e18)
        );
        assert_eq!(string_to_long(b"99999999999999999999"), i64::MAX);
        assert_eq!(string_to_long(b"-99999999999999999999"), i64::MIN);
    }

    #[test]
    fn double_to_long_is_modular() {
        assert_eq!(double_to_long(7.9), 7);
        assert_eq!(double_to_long(-7.9), -7);
        assert_eq!(double_to_long(f64::NAN), 0);
        assert_eq!(double_to_long(f64::INFINITY), 0);
        assert_eq!(double_to_long(1e19), -8_446_744_073_709_551_616);
    }

    #[test]
    fn double_formatting_with_precision() {
        assert_eq!(format_double(0.1 + 0.2, 14), "0.3");
        assert_eq!(format_double(1.0, 14), "1");
        assert_eq!(format_double(-1.5, 14), "-1.5");
        assert_eq!(format_double(1e25, 14), "1.0E+25");
        assert_eq!(format_double(1.5e-7, 14), "1.5E-7");
        assert_eq!(format_double(0.0001, 14), "0.0001");
        assert_eq!(format_double(1e14, 14), "1.0E+14");
        assert_eq!(format_double(1e13, 14), "10000000000000");
        assert_eq!(format_double(f64::INFINITY, 14), "INF");
        assert_eq!(format_double(-0.0, 14), "-0");
    }

    #[test]
    fn double_formatting_shortest() {
        assert_eq!(format_double(0.1 + 0.2, -1), "0.30000000000000004");
        assert_eq!(format_double(1e15, -1), "1000000000000000");
        assert_eq!(format_double(2.5, -1), "2.5");
    }
}
