/// Normalizes a raw ZIP entry to the fixed-width 5-digit form used for membership tests and
/// grouping. Non-digits are stripped (so `06611-1234` works), short entries are left-padded with
/// zeros (spreadsheet imports routinely drop the leading zero), and ZIP+4 tails are discarded.
/// Returns `None` when nothing usable remains.
pub fn normalize_zip(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() || digits.len() > 9 {
        return None;
    }
    let zip = if digits.len() > 5 { digits[..5].to_string() } else { format!("{digits:0>5}") };
    Some(zip)
}

/// The coarse 3-digit area key for a normalized ZIP.
pub fn zip_prefix(zip: &str) -> String {
    zip.chars().take(3).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn normalization_rules() {
        assert_eq!(normalize_zip("06611").as_deref(), Some("06611"));
        assert_eq!(normalize_zip("6611").as_deref(), Some("06611"));
        assert_eq!(normalize_zip("06611-1234").as_deref(), Some("06611"));
        assert_eq!(normalize_zip(" 06611 ").as_deref(), Some("06611"));
        assert_eq!(normalize_zip(""), None);
        assert_eq!(normalize_zip("not a zip"), None);
        assert_eq!(normalize_zip("123456789012"), None);
    }

    #[test]
    fn prefix_is_three_digits() {
        assert_eq!(zip_prefix("06611"), "066");
    }
}
