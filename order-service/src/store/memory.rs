use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use inventory_service::MemoryInventoryLedger;
use shared::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{CheckoutStore, ProductCatalog, RuleStore};
use crate::error::CheckoutError;
use crate::models::*;

#[derive(Debug, Clone)]
struct MemoryUser {
    contact: CustomerContact,
    wholesale_eligibility: bool,
    wholesale_approved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    products: HashMap<Uuid, CatalogProduct>,
    users: HashMap<Uuid, MemoryUser>,
    requirements: HashMap<String, i32>,
    wholesale_min_quantity: Option<i32>,
    discounts: HashMap<String, DiscountCode>,
    orders: HashMap<Uuid, Order>,
    items: Vec<OrderItem>,
    status_history: Vec<NewStatusHistory>,
    outbox: Vec<OutboxEvent>,
}

/// Checkout store held in process memory.
///
/// Stock lives in a [`MemoryInventoryLedger`] so the same units can be
/// inspected or adjusted through the inventory API.
#[derive(Clone, Default)]
pub struct MemoryCheckoutStore {
    state: Arc<Mutex<MemoryState>>,
    ledger: MemoryInventoryLedger,
}

impl MemoryCheckoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ledger(&self) -> MemoryInventoryLedger {
        self.ledger.clone()
    }

    pub async fn add_product(&self, id: Uuid, name: &str, price: BigDecimal, is_active: bool) {
        self.state.lock().await.products.insert(
            id,
            CatalogProduct {
                id,
                name: name.to_string(),
                price,
                is_active,
            },
        );
    }

    pub async fn add_user(&self, id: Uuid, email: &str, name: &str, wholesale_eligibility: bool) {
        self.state.lock().await.users.insert(
            id,
            MemoryUser {
                contact: CustomerContact {
                    email: email.to_string(),
                    name: name.to_string(),
                },
                wholesale_eligibility,
                wholesale_approved_at: None,
            },
        );
    }

    pub async fn set_requirement(&self, scope: &str, min_quantity: i32) {
        self.state
            .lock()
            .await
            .requirements
            .insert(scope.to_string(), min_quantity);
    }

    pub async fn set_wholesale_min_quantity(&self, min_quantity: i32) {
        self.state.lock().await.wholesale_min_quantity = Some(min_quantity);
    }

    pub async fn add_discount(&self, discount: DiscountCode) {
        self.state
            .lock()
            .await
            .discounts
            .insert(discount.code.clone(), discount);
    }

    pub async fn stock(&self, product_id: Uuid, location_id: &str, quantity: i32) -> anyhow::Result<()> {
        self.ledger
            .with_book(|book| book.stock(product_id, location_id, quantity))
            .await?;
        Ok(())
    }

    pub async fn order(&self, order_id: Uuid) -> Option<Order> {
        self.state.lock().await.orders.get(&order_id).cloned()
    }

    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    pub async fn items_for(&self, order_id: Uuid) -> Vec<OrderItem> {
        self.state
            .lock()
            .await
            .items
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect()
    }

    pub async fn item_count(&self) -> usize {
        self.state.lock().await.items.len()
    }

    pub async fn status_history(&self, order_id: Uuid) -> Vec<String> {
        self.state
            .lock()
            .await
            .status_history
            .iter()
            .filter(|entry| entry.order_id == order_id)
            .map(|entry| entry.status.clone())
            .collect()
    }

    pub async fn discount(&self, code: &str) -> Option<DiscountCode> {
        self.state.lock().await.discounts.get(code).cloned()
    }

    pub async fn wholesale_approved_at(&self, user_id: Uuid) -> Option<DateTime<Utc>> {
        self.state
            .lock()
            .await
            .users
            .get(&user_id)
            .and_then(|user| user.wholesale_approved_at)
    }

    pub async fn outbox(&self) -> Vec<OutboxEvent> {
        self.state.lock().await.outbox.clone()
    }
}

#[async_trait]
impl RuleStore for MemoryCheckoutStore {
    async fn requirement_for_scope(&self, scope: &str) -> anyhow::Result<Option<i32>> {
        Ok(self.state.lock().await.requirements.get(scope).copied())
    }

    async fn wholesale_min_quantity(&self) -> anyhow::Result<Option<i32>> {
        Ok(self.state.lock().await.wholesale_min_quantity)
    }

    async fn is_wholesale_eligible(&self, user_id: Uuid) -> anyhow::Result<bool> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .get(&user_id)
            .map_or(false, |user| user.wholesale_eligibility))
    }
}

#[async_trait]
impl ProductCatalog for MemoryCheckoutStore {
    async fn products_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<CatalogProduct>> {
        let state = self.state.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl CheckoutStore for MemoryCheckoutStore {
    async fn available_stock(&self, product_id: Uuid, location_id: &str) -> anyhow::Result<i32> {
        Ok(self
            .ledger
            .with_book(|book| book.available(product_id, location_id))
            .await)
    }

    async fn find_discount(&self, code: &str) -> anyhow::Result<Option<DiscountCode>> {
        Ok(self.state.lock().await.discounts.get(code).cloned())
    }

    async fn customer_contact(&self, user_id: Uuid) -> anyhow::Result<Option<CustomerContact>> {
        Ok(self
            .state
            .lock()
            .await
            .users
            .get(&user_id)
            .map(|user| user.contact.clone()))
    }

    async fn commit_order(&self, draft: OrderDraft) -> Result<PersistedOrder, CheckoutError> {
        let mut state = self.state.lock().await;
        let mut staged = state.clone();

        let order = draft.to_order().map_err(anyhow::Error::from)?;
        staged.orders.insert(order.id, order);
        staged.items.extend(draft.to_items());

        if draft.upgrade_to_wholesale {
            if let Some(user) = staged.users.get_mut(&draft.user_id) {
                if !user.wholesale_eligibility {
                    user.wholesale_eligibility = true;
                    user.wholesale_approved_at = Some(Utc::now());
                }
            }
        }

        if let Some(code) = &draft.discount_code {
            let discount = staged
                .discounts
                .get_mut(code)
                .filter(|d| {
                    d.is_active
                        && d.ends_at.map_or(true, |ends_at| ends_at >= Utc::now())
                        && d.usage_limit.map_or(true, |limit| d.times_used < limit)
                })
                .ok_or_else(|| CheckoutError::DiscountExhausted(code.clone()))?;
            discount.times_used += 1;
        }

        staged
            .status_history
            .push(NewStatusHistory::new(draft.order_id, draft.status, Some("order placed")));
        staged
            .outbox
            .push(OutboxEvent::order_placed(&draft.placed_event()).map_err(anyhow::Error::from)?);

        let mut lines = draft.lines.clone();
        lines.sort_by_key(|line| line.product_id);
        self.ledger
            .with_book(|book| {
                let mut next = book.clone();
                for line in &lines {
                    next.decrement_for_order(
                        line.product_id,
                        &draft.location_id,
                        line.quantity,
                        draft.order_id,
                        Some(draft.user_id),
                    )
                    .map_err(|e| CheckoutError::from_ledger(e, &line.name))?;
                }
                *book = next;
                Ok::<_, CheckoutError>(())
            })
            .await?;

        *state = staged;

        Ok(PersistedOrder {
            order_id: draft.order_id,
            status: draft.status,
            payment_status: draft.payment_status,
        })
    }

    async fn record_payment(&self, order_id: Uuid, result: &PaymentResult) -> anyhow::Result<()> {
        let status = if result.success { result.status } else { PaymentStatus::Failed };
        let mut state = self.state.lock().await;
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| anyhow::anyhow!("order {} not found", order_id))?;
        order.payment_status = status.as_str().to_string();
        order.payment_transaction_id = result.transaction_id.clone();
        order.updated_at = Utc::now();

        let event = OutboxEvent::payment_recorded(&PaymentRecordedEvent {
            order_id,
            payment_status: status,
            transaction_id: result.transaction_id.clone(),
        })?;
        state.outbox.push(event);
        Ok(())
    }
}
