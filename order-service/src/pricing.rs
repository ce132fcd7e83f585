use bigdecimal::{BigDecimal, RoundingMode};
use num_traits::Zero;
use serde::Serialize;

use crate::models::PricedLine;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBreakdown {
    pub subtotal: BigDecimal,
    pub discount_amount: BigDecimal,
    pub shipping_cost: BigDecimal,
    pub taxes: BigDecimal,
    pub total_amount: BigDecimal,
}

/// Rounds half-up to cents.
pub fn round_money(amount: &BigDecimal) -> BigDecimal {
    amount.with_scale_round(2, RoundingMode::HalfUp)
}

pub fn subtotal(lines: &[PricedLine]) -> BigDecimal {
    let sum = lines
        .iter()
        .fold(BigDecimal::zero(), |acc, line| acc + line.line_total());
    round_money(&sum)
}

/// Taxes are a flat rate on the pre-discount subtotal; shipping is flat.
/// `total_amount == subtotal - discount_amount + shipping_cost + taxes` exactly.
pub fn price(
    subtotal: &BigDecimal,
    discount_amount: &BigDecimal,
    tax_rate: &BigDecimal,
    shipping_cost: &BigDecimal,
) -> PriceBreakdown {
    let subtotal = round_money(subtotal);
    let discount_amount = round_money(discount_amount);
    let shipping_cost = round_money(shipping_cost);
    let taxes = round_money(&(&subtotal * tax_rate));
    let total_amount = &subtotal - &discount_amount + &shipping_cost + &taxes;

    PriceBreakdown {
        subtotal,
        discount_amount,
        shipping_cost,
        taxes,
        total_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn line(price: &str, quantity: i32) -> PricedLine {
        PricedLine {
            product_id: Uuid::new_v4(),
            name: "Widget".to_string(),
            unit_price: dec(price),
            quantity,
        }
    }

    #[test]
    fn subtotal_sums_line_totals() {
        let lines = vec![line("12.50", 3), line("0.99", 2)];
        assert_eq!(subtotal(&lines), dec("39.48"));
    }

    #[test]
    fn taxes_round_half_up_to_cents() {
        let breakdown = price(&dec("10.05"), &dec("0"), &dec("0.05"), &dec("0"));
        // 10.05 * 0.05 = 0.5025
        assert_eq!(breakdown.taxes, dec("0.50"));
        let breakdown = price(&dec("10.10"), &dec("0"), &dec("0.05"), &dec("0"));
        // 10.10 * 0.05 = 0.505
        assert_eq!(breakdown.taxes, dec("0.51"));
    }

    #[test]
    fn total_combines_every_component() {
        let breakdown = price(&dec("100"), &dec("10"), &dec("0.13"), &dec("15"));
        assert_eq!(breakdown.taxes, dec("13.00"));
        assert_eq!(breakdown.total_amount, dec("118.00"));
    }

    proptest! {
        #[test]
        fn total_identity_holds(
            cents in 0i64..10_000_000,
            discount_pct in 0i64..=100,
            tax_bp in 0i64..3_000,
            shipping_cents in 0i64..10_000,
        ) {
            let subtotal = BigDecimal::new(cents.into(), 2);
            let discount = round_money(&(&subtotal * BigDecimal::new(discount_pct.into(), 2)));
            let tax_rate = BigDecimal::new(tax_bp.into(), 4);
            let shipping = BigDecimal::new(shipping_cents.into(), 2);

            let b = price(&subtotal, &discount, &tax_rate, &shipping);

            prop_assert_eq!(
                b.total_amount.clone(),
                &b.subtotal - &b.discount_amount + &b.shipping_cost + &b.taxes
            );
            prop_assert!(b.discount_amount <= b.subtotal);
            prop_assert!(b.total_amount >= BigDecimal::zero());
        }
    }
}
