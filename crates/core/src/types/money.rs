//! Money display helpers over decimal arithmetic.
//!
//! Prices and cart totals use [`rust_decimal::Decimal`] throughout so that
//! repeated derivations of the same total are byte-identical. Formatting is
//! the only place a price becomes a string.

use rust_decimal::Decimal;

/// Format a decimal amount as a USD display string (e.g., `"$19.99"`).
///
/// Always renders two fractional digits; negative amounts keep their sign
/// after the currency symbol (e.g., `"$-1.50"`), which only occurs for
/// display of corrections, never for catalog prices.
#[must_use]
pub fn format_usd(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_usd_whole() {
        assert_eq!(format_usd(Decimal::new(19, 0)), "$19.00");
    }

    #[test]
    fn test_format_usd_cents() {
        assert_eq!(format_usd(Decimal::new(1999, 2)), "$19.99");
    }

    #[test]
    fn test_format_usd_rounds_to_cents() {
        // 10.005 rounds bankers-style to 10.00
        assert_eq!(format_usd(Decimal::new(10_005, 3)), "$10.00");
        assert_eq!(format_usd(Decimal::new(10_015, 3)), "$10.02");
    }

    #[test]
    fn test_format_usd_zero() {
        assert_eq!(format_usd(Decimal::ZERO), "$0.00");
    }
}
