//! Text forms shared by categorical values and class labels.
//!
//! The training pipeline stringified floats before fitting encoders, so
//! exponents carry a sign and at least two digits (`1e+20`, `1e-05`).

/// Shortest round-trip form of `x`, with the exponent written as `e+NN`/`e-NN`.
pub fn float_repr(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    let shortest = format!("{x:?}");
    let Some((mantissa, exponent)) = shortest.split_once('e') else {
        return shortest;
    };
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exponent),
    };
    format!("{mantissa}e{sign}{digits:0>2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_range_keeps_decimal_form() {
        assert_eq!(float_repr(3.0), "3.0");
        assert_eq!(float_repr(-2.5), "-2.5");
        assert_eq!(float_repr(0.0001), "0.0001");
        assert_eq!(float_repr(1e15), "1000000000000000.0");
    }

    #[test]
    fn exponents_are_signed_and_padded() {
        assert_eq!(float_repr(1e20), "1e+20");
        assert_eq!(float_repr(1.5e16), "1.5e+16");
        assert_eq!(float_repr(1e-5), "1e-05");
        assert_eq!(float_repr(-2.5e-7), "-2.5e-07");
        assert_eq!(float_repr(1e300), "1e+300");
    }

    #[test]
    fn non_finite_values() {
        assert_eq!(float_repr(f64::NAN), "nan");
        assert_eq!(float_repr(f64::INFINITY), "inf");
        assert_eq!(float_repr(f64::NEG_INFINITY), "-inf");
    }
}
