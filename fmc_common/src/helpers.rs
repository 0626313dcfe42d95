/// Checks that a delivery month string has the `YYYY-MM` shape used throughout the
/// community price tables. Only the shape is checked; callers decide how to handle
/// out-of-range months.
pub fn is_valid_delivery_month(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 7 || bytes[4] != b'-' {
        return false;
    }
    let year_ok = bytes[..4].iter().all(u8::is_ascii_digit);
    let month_ok = matches!(value[5..7].parse::<u8>(), Ok(m) if (1..=12).contains(&m));
    year_ok && month_ok
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn delivery_month_shapes() {
        assert!(is_valid_delivery_month("2024-01"));
        assert!(is_valid_delivery_month("2024-12"));
        assert!(!is_valid_delivery_month("2024-13"));
        assert!(!is_valid_delivery_month("2024-00"));
        assert!(!is_valid_delivery_month("24-01"));
        assert!(!is_valid_delivery_month("2024/01"));
        assert!(!is_valid_delivery_month("2024-1"));
    }
}
