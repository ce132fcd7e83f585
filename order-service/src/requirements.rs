use shared::UserRole;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::store::RuleStore;

pub const GLOBAL_SCOPE: &str = "ALL";

/// Resolves the minimum number of units an order must contain.
pub struct OrderRequirementsProvider {
    rules: Arc<dyn RuleStore>,
    default_min_quantity: i32,
    fallbacks: AtomicU64,
}

impl OrderRequirementsProvider {
    pub fn new(rules: Arc<dyn RuleStore>, default_min_quantity: i32) -> Self {
        Self {
            rules,
            default_min_quantity,
            fallbacks: AtomicU64::new(0),
        }
    }

    /// Role rule first, then the `ALL` rule, then the configured default.
    /// A failed lookup resolves to the default instead of blocking checkout.
    pub async fn min_quantity_for(&self, role: UserRole) -> i32 {
        for scope in [role.as_str(), GLOBAL_SCOPE] {
            match self.rules.requirement_for_scope(scope).await {
                Ok(Some(minimum)) => {
                    debug!("Minimum order quantity for {} is {} ({} rule)", role, minimum, scope);
                    return minimum;
                }
                Ok(None) => continue,
                Err(e) => {
                    self.fallbacks.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        "Order requirement lookup failed for {}: {}; using default of {}",
                        role, e, self.default_min_quantity
                    );
                    return self.default_min_quantity;
                }
            }
        }

        self.fallbacks.fetch_add(1, Ordering::Relaxed);
        warn!(
            "No active order requirement for {}, using default of {}",
            role, self.default_min_quantity
        );
        self.default_min_quantity
    }

    pub fn fallback_count(&self) -> u64 {
        self.fallbacks.load(Ordering::Relaxed)
    }
}
