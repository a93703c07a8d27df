//! Number text shared by the JSON and hash collectors.
//!
//! Integers print as-is. Floats print their shortest round-trip digits laid
//! out the way ECMAScript `Number.prototype.toString` does: plain decimals for
//! decimal exponents in `[-6, 21)`, exponent form otherwise. An integral float
//! therefore prints exactly like the equal integer.

use serde_json::Number;

/// Minimal decimal text for a finite number.
///
/// ```rust
/// use c5_canonical::canonical_number_text;
/// use serde_json::Number;
///
/// let two = Number::from_f64(2.0).unwrap();
/// assert_eq!(canonical_number_text(&two), "2");
/// assert_eq!(canonical_number_text(&Number::from(2)), "2");
/// ```
pub fn canonical_number_text(number: &Number) -> String {
    if let Some(v) = number.as_i64() {
        return v.to_string();
    }
    if let Some(v) = number.as_u64() {
        return v.to_string();
    }
    match number.as_f64() {
        Some(v) => float_text(v),
        None => number.to_string(),
    }
}

fn float_text(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let sign = if value < 0.0 { "-" } else { "" };

    // `{:e}` gives the shortest round-trip digits as `d[.ddd]e<exp>`.
    let sci = format!("{:e}", value.abs());
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    // value = 0.digits × 10^point
    let len = digits.len() as i32;
    let point = exponent + 1;

    let body = if len <= point && point <= 21 {
        format!("{}{}", digits, "0".repeat((point - len) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{int}.{frac}")
    } else if -6 < point && point <= 0 {
        format!("0.{}{}", "0".repeat(point.unsigned_abs() as usize), digits)
    } else {
        let (lead, rest) = digits.split_at(1);
        let exp = point - 1;
        let exp_sign = if exp < 0 { '-' } else { '+' };
        if rest.is_empty() {
            format!("{lead}e{exp_sign}{}", exp.abs())
        } else {
            format!("{lead}.{rest}e{exp_sign}{}", exp.abs())
        }
    };
    format!("{sign}{body}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float(v: f64) -> String {
        canonical_number_text(&Number::from_f64(v).unwrap())
    }

    #[test]
    fn integers_print_plain() {
        assert_eq!(canonical_number_text(&Number::from(0)), "0");
        assert_eq!(canonical_number_text(&Number::from(-123)), "-123");
        assert_eq!(canonical_number_text(&Number::from(u64::MAX)), "18446744073709551615");
    }

    #[test]
    fn integral_floats_match_integers() {
        assert_eq!(float(2.0), "2");
        assert_eq!(float(-0.0), "0");
        assert_eq!(float(-78.0), "-78");
        assert_eq!(float(1e20), "100000000000000000000");
        assert_eq!(float(123456789012.0), "123456789012");
    }

    #[test]
    fn fractions_use_shortest_digits() {
        assert_eq!(float(0.5), "0.5");
        assert_eq!(float(1.5), "1.5");
        assert_eq!(float(-12.25), "-12.25");
        assert_eq!(float(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(float(0.000001), "0.000001");
    }

    #[test]
    fn extreme_exponents_switch_to_exponent_form() {
        assert_eq!(float(1e21), "1e+21");
        assert_eq!(float(1.5e300), "1.5e+300");
        assert_eq!(float(1e-7), "1e-7");
        assert_eq!(float(-2.5e-10), "-2.5e-10");
    }
}
