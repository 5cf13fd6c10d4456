/// Currency utility functions for handling money conversions
///
/// All monetary values in the database are stored in cents (1 unit = 100 cents)
/// to avoid floating-point precision issues.

/// Convert major units to cents (multiply by 100)
pub fn units_to_cents(units: f64) -> i64 {
    (units * 100.0).round() as i64
}

/// Convert cents to major units (divide by 100)
pub fn cents_to_units(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Format cents as a currency string with 2 decimal places
pub fn format_cents(cents: i64) -> String {
    format!("${:.2}", cents_to_units(cents))
}

/// Compute a percentage fee in integer cents, rounding half-up.
///
/// `percent` is expressed in whole percent (10.0 == 10%). The computation goes
/// through basis points so common fee rates stay exact in integer math.
pub fn percentage_fee(amount_cents: i64, percent: f64) -> i64 {
    let basis_points = (percent * 100.0).round() as i64;
    (amount_cents * basis_points + 5_000) / 10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_to_cents() {
        assert_eq!(units_to_cents(100.0), 10000);
        assert_eq!(units_to_cents(0.50), 50);
        assert_eq!(units_to_cents(123.45), 12345);
    }

    #[test]
    fn test_cents_to_units() {
        assert_eq!(cents_to_units(10000), 100.0);
        assert_eq!(cents_to_units(50), 0.50);
        assert_eq!(cents_to_units(12345), 123.45);
    }

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(10000), "$100.00");
        assert_eq!(format_cents(50), "$0.50");
    }

    #[test]
    fn test_percentage_fee() {
        // order total 1000.00, 10% platform fee -> 100.00
        assert_eq!(percentage_fee(100_000, 10.0), 10_000);
        // withdrawal 100.00, 2% fee -> 2.00
        assert_eq!(percentage_fee(10_000, 2.0), 200);
        assert_eq!(percentage_fee(10_000, 0.0), 0);
        assert_eq!(percentage_fee(10_000, 100.0), 10_000);
        // half-up rounding: 2% of 0.25 = 0.005 -> 1 cent
        assert_eq!(percentage_fee(25, 2.0), 1);
    }
}
