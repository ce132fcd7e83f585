use shared::UserRole;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::store::RuleStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WholesaleDecision {
    pub is_wholesale: bool,
    /// The account becomes wholesale-eligible when this order commits.
    pub upgrade_account: bool,
}

pub struct WholesaleEligibilityEvaluator {
    rules: Arc<dyn RuleStore>,
    default_min_quantity: i32,
}

impl WholesaleEligibilityEvaluator {
    pub fn new(rules: Arc<dyn RuleStore>, default_min_quantity: i32) -> Self {
        Self {
            rules,
            default_min_quantity,
        }
    }

    pub async fn evaluate(
        &self,
        user_id: Uuid,
        role: UserRole,
        total_quantity: i32,
    ) -> anyhow::Result<WholesaleDecision> {
        if role != UserRole::WholesaleBuyer {
            return Ok(WholesaleDecision::default());
        }

        if self.rules.is_wholesale_eligible(user_id).await? {
            return Ok(WholesaleDecision {
                is_wholesale: true,
                upgrade_account: false,
            });
        }

        let minimum = self
            .rules
            .wholesale_min_quantity()
            .await?
            .unwrap_or(self.default_min_quantity);

        if total_quantity >= minimum {
            debug!(
                "User {} qualifies for wholesale with {} units (minimum {})",
                user_id, total_quantity, minimum
            );
            Ok(WholesaleDecision {
                is_wholesale: true,
                upgrade_account: true,
            })
        } else {
            Ok(WholesaleDecision::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Rules {
        eligible: bool,
        minimum: Option<i32>,
    }

    #[async_trait]
    impl RuleStore for Rules {
        async fn requirement_for_scope(&self, _scope: &str) -> anyhow::Result<Option<i32>> {
            Ok(None)
        }

        async fn wholesale_min_quantity(&self) -> anyhow::Result<Option<i32>> {
            Ok(self.minimum)
        }

        async fn is_wholesale_eligible(&self, _user_id: Uuid) -> anyhow::Result<bool> {
            Ok(self.eligible)
        }
    }

    fn evaluator(eligible: bool, minimum: Option<i32>) -> WholesaleEligibilityEvaluator {
        WholesaleEligibilityEvaluator::new(Arc::new(Rules { eligible, minimum }), 100)
    }

    #[tokio::test]
    async fn other_roles_are_never_wholesale() {
        let decision = evaluator(true, Some(1))
            .evaluate(Uuid::new_v4(), UserRole::Customer, 10_000)
            .await
            .unwrap();
        assert_eq!(decision, WholesaleDecision::default());
    }

    #[tokio::test]
    async fn approved_buyer_is_wholesale_at_any_size() {
        let decision = evaluator(true, None)
            .evaluate(Uuid::new_v4(), UserRole::WholesaleBuyer, 1)
            .await
            .unwrap();
        assert!(decision.is_wholesale);
        assert!(!decision.upgrade_account);
    }

    #[tokio::test]
    async fn first_qualifying_order_upgrades_the_account() {
        let evaluator = evaluator(false, None);
        let below = evaluator
            .evaluate(Uuid::new_v4(), UserRole::WholesaleBuyer, 99)
            .await
            .unwrap();
        assert!(!below.is_wholesale);

        let at = evaluator
            .evaluate(Uuid::new_v4(), UserRole::WholesaleBuyer, 100)
            .await
            .unwrap();
        assert!(at.is_wholesale && at.upgrade_account);
    }

    #[tokio::test]
    async fn configured_rule_replaces_default_minimum() {
        let decision = evaluator(false, Some(20))
            .evaluate(Uuid::new_v4(), UserRole::WholesaleBuyer, 20)
            .await
            .unwrap();
        assert!(decision.upgrade_account);
    }
}
