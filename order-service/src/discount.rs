use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use num_traits::Zero;
use shared::DiscountType;
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::DiscountCode;
use crate::pricing::round_money;
use crate::store::CheckoutStore;

#[derive(Debug, Clone, PartialEq)]
pub struct AppliedDiscount {
    pub code: Option<String>,
    pub amount: BigDecimal,
}

impl AppliedDiscount {
    pub fn none() -> Self {
        Self {
            code: None,
            amount: BigDecimal::zero(),
        }
    }
}

/// Codes are matched trimmed and upper-cased. Blank input means no code.
pub fn normalize_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_ascii_uppercase();
    (!code.is_empty()).then_some(code)
}

/// Why a code does not apply, or `None` when it does.
pub fn ineligibility(discount: &DiscountCode, subtotal: &BigDecimal, now: DateTime<Utc>) -> Option<&'static str> {
    if !discount.is_active {
        return Some("inactive");
    }
    if now < discount.starts_at {
        return Some("not started");
    }
    if discount.ends_at.map_or(false, |ends_at| now > ends_at) {
        return Some("expired");
    }
    if discount.usage_limit.map_or(false, |limit| discount.times_used >= limit) {
        return Some("usage limit reached");
    }
    if subtotal < &discount.min_order_amount {
        return Some("below minimum order amount");
    }
    None
}

/// Monetary effect of an eligible code, never more than the subtotal.
pub fn discount_amount(discount: &DiscountCode, subtotal: &BigDecimal) -> BigDecimal {
    let amount = match discount.discount_type {
        DiscountType::Percentage => {
            let raw = round_money(&(subtotal * &discount.discount_value / BigDecimal::from(100)));
            match &discount.max_discount_amount {
                Some(max) if &raw > max => max.clone(),
                _ => raw,
            }
        }
        DiscountType::FixedAmount => discount.discount_value.clone(),
    };

    let amount = if &amount > subtotal { subtotal.clone() } else { amount };
    if amount < BigDecimal::zero() {
        BigDecimal::zero()
    } else {
        round_money(&amount)
    }
}

pub struct DiscountEngine {
    store: Arc<dyn CheckoutStore>,
}

impl DiscountEngine {
    pub fn new(store: Arc<dyn CheckoutStore>) -> Self {
        Self { store }
    }

    /// Unknown and ineligible codes are ignored and the order proceeds at
    /// full price. The redemption itself happens in the order transaction.
    pub async fn apply(&self, raw_code: Option<&str>, subtotal: &BigDecimal) -> anyhow::Result<AppliedDiscount> {
        let Some(code) = raw_code.and_then(normalize_code) else {
            return Ok(AppliedDiscount::none());
        };

        let Some(discount) = self.store.find_discount(&code).await? else {
            info!("Ignoring unknown discount code {}", code);
            return Ok(AppliedDiscount::none());
        };

        if let Some(reason) = ineligibility(&discount, subtotal, Utc::now()) {
            info!("Ignoring discount code {}: {}", code, reason);
            return Ok(AppliedDiscount::none());
        }

        let amount = discount_amount(&discount, subtotal);
        debug!("Discount code {} takes {} off {}", code, amount, subtotal);
        Ok(AppliedDiscount {
            code: Some(discount.code),
            amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn code(discount_type: DiscountType, value: &str) -> DiscountCode {
        DiscountCode {
            code: "SAVE10".to_string(),
            discount_type,
            discount_value: dec(value),
            min_order_amount: dec("0"),
            max_discount_amount: None,
            starts_at: Utc::now() - Duration::days(1),
            ends_at: None,
            usage_limit: None,
            times_used: 0,
            is_active: true,
        }
    }

    #[test]
    fn normalizes_codes() {
        assert_eq!(normalize_code("  save10 "), Some("SAVE10".to_string()));
        assert_eq!(normalize_code("   "), None);
    }

    #[test]
    fn percentage_of_subtotal() {
        let discount = code(DiscountType::Percentage, "10");
        assert_eq!(discount_amount(&discount, &dec("100.00")), dec("10.00"));
        assert_eq!(discount_amount(&discount, &dec("33.35")), dec("3.34"));
    }

    #[test]
    fn percentage_is_capped() {
        let mut discount = code(DiscountType::Percentage, "50");
        discount.max_discount_amount = Some(dec("20"));
        assert_eq!(discount_amount(&discount, &dec("100")), dec("20.00"));
    }

    #[test]
    fn fixed_amount_never_exceeds_subtotal() {
        let discount = code(DiscountType::FixedAmount, "25");
        assert_eq!(discount_amount(&discount, &dec("100")), dec("25.00"));
        assert_eq!(discount_amount(&discount, &dec("12.50")), dec("12.50"));
    }

    #[test]
    fn eligibility_window_and_limits() {
        let now = Utc::now();
        let subtotal = dec("100");

        let mut discount = code(DiscountType::Percentage, "10");
        assert_eq!(ineligibility(&discount, &subtotal, now), None);

        discount.ends_at = Some(now - Duration::hours(1));
        assert_eq!(ineligibility(&discount, &subtotal, now), Some("expired"));

        let mut discount = code(DiscountType::Percentage, "10");
        discount.starts_at = now + Duration::hours(1);
        assert_eq!(ineligibility(&discount, &subtotal, now), Some("not started"));

        let mut discount = code(DiscountType::Percentage, "10");
        discount.usage_limit = Some(3);
        discount.times_used = 3;
        assert_eq!(ineligibility(&discount, &subtotal, now), Some("usage limit reached"));

        let mut discount = code(DiscountType::Percentage, "10");
        discount.min_order_amount = dec("100.01");
        assert_eq!(ineligibility(&discount, &subtotal, now), Some("below minimum order amount"));

        let mut discount = code(DiscountType::Percentage, "10");
        discount.is_active = false;
        assert_eq!(ineligibility(&discount, &subtotal, now), Some("inactive"));
    }
}
