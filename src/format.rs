//! Pure display helpers for catalog and profile views.

/// Plans priced at or above this are shown as featured.
pub const FEATURED_PRICE_THRESHOLD: f64 = 20.0;

const GLOBE: &str = "\u{1F310}";
const REGIONAL_INDICATOR_A: u32 = 0x1F1E6;

/// Flag emoji for a two-letter ISO country code; a globe for anything else.
pub fn country_flag(code: &str) -> String {
    let bytes = code.as_bytes();
    if bytes.len() != 2 || !bytes.iter().all(u8::is_ascii_alphabetic) {
        return GLOBE.to_string();
    }

    bytes
        .iter()
        .filter_map(|b| char::from_u32(REGIONAL_INDICATOR_A + u32::from(b.to_ascii_uppercase() - b'A')))
        .collect()
}

/// Renders a data allowance given in GB.
///
/// Below 1 GB the value is shown in whole MB (`0.5` → `512 MB`); otherwise
/// the text is kept as sent (`"3"` → `3 GB`). Non-numeric input such as
/// `"Unlimited"` is returned unchanged.
pub fn format_data_size(value: &str) -> String {
    let trimmed = value.trim();
    match trimmed.parse::<f64>() {
        Ok(gb) if gb.is_finite() && gb < 1.0 => format!("{} MB", (gb * 1024.0).round() as i64),
        Ok(gb) if gb.is_finite() => format!("{} GB", trimmed),
        _ => value.to_string(),
    }
}

pub fn is_featured(price: f64) -> bool {
    price >= FEATURED_PRICE_THRESHOLD
}

/// Currency symbol and minor-unit digits for the currencies the storefront sells in.
fn currency_style(code: &str) -> Option<(&'static str, usize)> {
    match code.to_ascii_uppercase().as_str() {
        "USD" => Some(("$", 2)),
        "EUR" => Some(("\u{20AC}", 2)),
        "GBP" => Some(("\u{00A3}", 2)),
        "JPY" => Some(("\u{00A5}", 0)),
        _ => None,
    }
}

/// `$12.50`, `¥1200`, or `12.50 AED` for currencies without a known symbol.
pub fn format_price(amount: f64, currency: &str) -> String {
    match currency_style(currency) {
        Some((symbol, digits)) => format!("{}{:.*}", symbol, digits, amount),
        None => format!("{:.2} {}", amount, currency.to_ascii_uppercase()),
    }
}

/// Price divided over the validity period, for "per day" labels.
pub fn price_per_day(amount: f64, validity_days: u32) -> Option<f64> {
    (validity_days > 0).then(|| amount / f64::from(validity_days))
}

pub fn format_validity(days: u32) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_for_two_letter_codes() {
        assert_eq!(country_flag("US"), "\u{1F1FA}\u{1F1F8}");
        assert_eq!(country_flag("fr"), "\u{1F1EB}\u{1F1F7}");
        assert_eq!(country_flag("gB").chars().count(), 2);
    }

    #[test]
    fn globe_for_everything_else() {
        for code in ["", "U", "USA", "1A", "é1", "  "] {
            assert_eq!(country_flag(code), GLOBE, "input {:?}", code);
        }
    }

    #[test]
    fn data_size_switches_units_at_one_gb() {
        assert_eq!(format_data_size("0.5"), "512 MB");
        assert_eq!(format_data_size("0.1"), "102 MB");
        assert_eq!(format_data_size("1"), "1 GB");
        assert_eq!(format_data_size("1.0"), "1.0 GB");
        assert_eq!(format_data_size("20"), "20 GB");
        assert_eq!(format_data_size("Unlimited"), "Unlimited");
        assert_eq!(format_data_size(""), "");
    }

    #[test]
    fn featured_threshold_is_inclusive() {
        assert!(!is_featured(19.99));
        assert!(is_featured(20.0));
    }

    #[test]
    fn prices() {
        assert_eq!(format_price(12.5, "usd"), "$12.50");
        assert_eq!(format_price(1200.0, "JPY"), "\u{00A5}1200");
        assert_eq!(format_price(9.0, "aed"), "9.00 AED");
        assert_eq!(price_per_day(30.0, 15), Some(2.0));
        assert_eq!(price_per_day(30.0, 0), None);
    }

    #[test]
    fn validity_labels() {
        assert_eq!(format_validity(1), "1 day");
        assert_eq!(format_validity(30), "30 days");
    }
}
