use payment_service::{PaymentGateway, PaymentRequest};
use shared::*;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::CheckoutConfig;
use crate::discount::DiscountEngine;
use crate::error::CheckoutError;
use crate::location::LocationResolver;
use crate::models::{CatalogProduct, OrderDraft, PricedLine};
use crate::notification::{ConfirmationDetails, EmailService, NotificationDispatcher};
use crate::payment::PaymentDispatcher;
use crate::pricing;
use crate::requirements::OrderRequirementsProvider;
use crate::store::{CheckoutStore, ProductCatalog, RuleStore};
use crate::wholesale::WholesaleEligibilityEvaluator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    PricingAndDiscount,
    StockCommit,
    Persisted,
    PaymentDispatched,
    Complete,
    Rejected,
    RolledBack,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validating => "validating",
            Stage::PricingAndDiscount => "pricing_and_discount",
            Stage::StockCommit => "stock_commit",
            Stage::Persisted => "persisted",
            Stage::PaymentDispatched => "payment_dispatched",
            Stage::Complete => "complete",
            Stage::Rejected => "rejected",
            Stage::RolledBack => "rolled_back",
        };
        f.write_str(name)
    }
}

/// A request that passed structural validation.
struct ValidatedOrder {
    lines: Vec<OrderItemRequest>,
    total_quantity: i32,
    shipping_address: Address,
    billing_address: Address,
    payment_method: PaymentMethod,
}

pub struct OrderOrchestrator {
    store: Arc<dyn CheckoutStore>,
    catalog: Arc<dyn ProductCatalog>,
    locations: LocationResolver,
    requirements: OrderRequirementsProvider,
    wholesale: WholesaleEligibilityEvaluator,
    discounts: DiscountEngine,
    payments: PaymentDispatcher,
    notifications: NotificationDispatcher,
    config: CheckoutConfig,
}

impl OrderOrchestrator {
    pub fn new<S>(
        config: CheckoutConfig,
        store: Arc<S>,
        gateway: Arc<dyn PaymentGateway>,
        email: Arc<dyn EmailService>,
    ) -> Self
    where
        S: RuleStore + CheckoutStore + ProductCatalog + 'static,
    {
        let rules: Arc<dyn RuleStore> = store.clone();
        let checkout: Arc<dyn CheckoutStore> = store.clone();
        let catalog: Arc<dyn ProductCatalog> = store;

        Self {
            locations: LocationResolver::new(config.locations.clone()),
            requirements: OrderRequirementsProvider::new(rules.clone(), config.default_min_quantity),
            wholesale: WholesaleEligibilityEvaluator::new(rules, config.default_wholesale_min_quantity),
            discounts: DiscountEngine::new(checkout.clone()),
            payments: PaymentDispatcher::new(gateway, checkout.clone(), config.payment_wait),
            notifications: NotificationDispatcher::new(email, checkout.clone()),
            store: checkout,
            catalog,
            config,
        }
    }

    pub fn locations(&self) -> &LocationResolver {
        &self.locations
    }

    pub fn requirements(&self) -> &OrderRequirementsProvider {
        &self.requirements
    }

    /// Places an order. Every error is returned before anything durable
    /// exists or after the order transaction rolled back; once the order
    /// commits, payment and notification problems are reported on the
    /// response instead.
    pub async fn place_order(
        &self,
        identity: Identity,
        request: PlaceOrderRequest,
    ) -> Result<PlaceOrderResponse, CheckoutError> {
        let order_id = Uuid::new_v4();
        let mut stage = Stage::Validating;
        debug!("Order {} entered stage {}", order_id, stage);

        match self.place(order_id, identity, request, &mut stage).await {
            Ok(response) => {
                debug!("Order {} entered stage {}", order_id, Stage::Complete);
                Ok(response)
            }
            Err(e) => {
                let exit = if stage == Stage::StockCommit {
                    Stage::RolledBack
                } else {
                    Stage::Rejected
                };
                if e.is_client_error() {
                    info!("Order {} {} during {}: {}", order_id, exit, stage, e);
                } else {
                    error!("Order {} {} during {}: {:?}", order_id, exit, stage, e);
                }
                Err(e)
            }
        }
    }

    async fn place(
        &self,
        order_id: Uuid,
        identity: Identity,
        request: PlaceOrderRequest,
        stage: &mut Stage,
    ) -> Result<PlaceOrderResponse, CheckoutError> {
        let discount_code = request.discount_code.clone();
        let order = validate(request)?;
        let location_id = self.locations.resolve(&order.shipping_address);

        let minimum = self.requirements.min_quantity_for(identity.role).await;
        if order.total_quantity < minimum {
            return Err(CheckoutError::BelowMinimum {
                minimum,
                actual: order.total_quantity,
            });
        }

        let wholesale = self
            .wholesale
            .evaluate(identity.user_id, identity.role, order.total_quantity)
            .await?;

        let lines = self.price_lines(&order.lines).await?;

        for line in &lines {
            let available = self.store.available_stock(line.product_id, &location_id).await?;
            if available < line.quantity {
                return Err(CheckoutError::InsufficientStock {
                    product: line.name.clone(),
                    available,
                });
            }
        }

        advance(order_id, stage, Stage::PricingAndDiscount);
        let subtotal = pricing::subtotal(&lines);
        let discount = self
            .discounts
            .apply(discount_code.as_deref(), &subtotal)
            .await?;
        let breakdown = pricing::price(
            &subtotal,
            &discount.amount,
            &self.config.tax_rate,
            &self.config.shipping_cost,
        );

        advance(order_id, stage, Stage::StockCommit);
        let draft = OrderDraft {
            order_id,
            user_id: identity.user_id,
            location_id,
            lines,
            pricing: breakdown,
            total_quantity: order.total_quantity,
            is_wholesale: wholesale.is_wholesale,
            upgrade_to_wholesale: wholesale.upgrade_account,
            discount_code: discount.code,
            shipping_address: order.shipping_address,
            billing_address: order.billing_address,
            payment_method: order.payment_method,
            payment_status: order.payment_method.initial_payment_status(),
            status: OrderStatus::AwaitingApproval,
        };
        let details = ConfirmationDetails {
            order_id,
            user_id: identity.user_id,
            total: draft.pricing.total_amount.clone(),
            items: draft.lines.iter().map(PricedLine::summary).collect(),
            shipping_address: draft.shipping_address.clone(),
        };
        let payment = PaymentRequest {
            order_id,
            amount: draft.pricing.total_amount.clone(),
            method: draft.payment_method,
            user_id: identity.user_id,
        };

        let persisted = self.store.commit_order(draft).await?;
        advance(order_id, stage, Stage::Persisted);
        info!(
            "Order {} committed for user {} ({} units, total {})",
            order_id, identity.user_id, order.total_quantity, payment.amount
        );

        advance(order_id, stage, Stage::PaymentDispatched);
        let payment_result = self.payments.dispatch(payment).await;
        self.notifications.dispatch(details);

        let (payment_status, message) = match &payment_result {
            Some(result) if result.success => (result.status, "Order placed successfully".to_string()),
            Some(result) => (
                PaymentStatus::Failed,
                format!(
                    "Order placed, but payment failed: {}. The payment needs manual follow-up.",
                    result.message
                ),
            ),
            None => (
                persisted.payment_status,
                "Order placed; payment is still being processed".to_string(),
            ),
        };

        Ok(PlaceOrderResponse {
            success: true,
            message,
            order_id: persisted.order_id,
            status: persisted.status,
            payment_status,
            payment_result,
        })
    }

    /// Resolves every line against the catalog in one lookup. A single missing
    /// or inactive product rejects the whole order.
    async fn price_lines(&self, lines: &[OrderItemRequest]) -> Result<Vec<PricedLine>, CheckoutError> {
        let ids: Vec<Uuid> = lines.iter().map(|line| line.product_id).collect();
        let products: HashMap<Uuid, CatalogProduct> = self
            .catalog
            .products_by_ids(&ids)
            .await?
            .into_iter()
            .map(|product| (product.id, product))
            .collect();

        lines
            .iter()
            .map(|line| match products.get(&line.product_id) {
                Some(product) if product.is_active => Ok(PricedLine {
                    product_id: product.id,
                    name: product.name.clone(),
                    unit_price: product.price.clone(),
                    quantity: line.quantity,
                }),
                _ => Err(CheckoutError::ProductUnavailable(line.product_id)),
            })
            .collect()
    }
}

fn advance(order_id: Uuid, stage: &mut Stage, next: Stage) {
    debug!("Order {} moved from {} to {}", order_id, stage, next);
    *stage = next;
}

/// Structural checks only; nothing here touches storage.
fn validate(request: PlaceOrderRequest) -> Result<ValidatedOrder, CheckoutError> {
    if request.items.is_empty() {
        return Err(CheckoutError::InvalidRequest(
            "order must contain at least one item".to_string(),
        ));
    }

    let mut lines: Vec<OrderItemRequest> = Vec::with_capacity(request.items.len());
    let mut total_quantity: i32 = 0;
    for item in request.items {
        if item.quantity <= 0 {
            return Err(CheckoutError::InvalidRequest(format!(
                "quantity for product {} must be a positive integer",
                item.product_id
            )));
        }
        total_quantity = total_quantity
            .checked_add(item.quantity)
            .ok_or_else(|| CheckoutError::InvalidRequest("order quantity is too large".to_string()))?;

        match lines.iter_mut().find(|line| line.product_id == item.product_id) {
            Some(line) => line.quantity += item.quantity,
            None => lines.push(item),
        }
    }

    let shipping_address = request
        .shipping_address
        .ok_or_else(|| CheckoutError::InvalidRequest("shipping address is required".to_string()))?;
    let missing = shipping_address.missing_fields();
    if !missing.is_empty() {
        return Err(CheckoutError::InvalidRequest(format!(
            "shipping address is missing {}",
            missing.join(", ")
        )));
    }

    let raw_method = request
        .payment_method
        .filter(|method| !method.trim().is_empty())
        .ok_or_else(|| CheckoutError::InvalidRequest("payment method is required".to_string()))?;
    let payment_method = PaymentMethod::normalize(&raw_method).ok_or_else(|| {
        CheckoutError::InvalidRequest(format!("unsupported payment method: {}", raw_method))
    })?;

    let billing_address = request
        .billing_address
        .filter(|address| address.missing_fields().is_empty())
        .unwrap_or_else(|| shipping_address.clone());

    Ok(ValidatedOrder {
        lines,
        total_quantity,
        shipping_address,
        billing_address,
        payment_method,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Address {
        Address {
            street: "100 King St W".to_string(),
            city: "Toronto".to_string(),
            province: "ON".to_string(),
            postal_code: "M5X 1A9".to_string(),
            country: Some("CA".to_string()),
        }
    }

    fn request(items: Vec<OrderItemRequest>) -> PlaceOrderRequest {
        PlaceOrderRequest {
            items,
            shipping_address: Some(address()),
            billing_address: None,
            payment_method: Some("credit card".to_string()),
            discount_code: None,
        }
    }

    fn item(product_id: Uuid, quantity: i32) -> OrderItemRequest {
        OrderItemRequest { product_id, quantity }
    }

    fn message(result: Result<ValidatedOrder, CheckoutError>) -> String {
        match result {
            Err(e) => e.to_string(),
            Ok(_) => panic!("expected validation to fail"),
        }
    }

    #[test]
    fn empty_cart_is_rejected() {
        assert!(message(validate(request(vec![]))).contains("at least one item"));
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let id = Uuid::new_v4();
        assert!(message(validate(request(vec![item(id, 0)]))).contains("positive integer"));
    }

    #[test]
    fn incomplete_address_names_the_missing_fields() {
        let mut req = request(vec![item(Uuid::new_v4(), 1)]);
        req.shipping_address = Some(Address {
            city: String::new(),
            postal_code: " ".to_string(),
            ..address()
        });
        assert_eq!(
            message(validate(req)),
            "shipping address is missing city, postalCode"
        );
    }

    #[test]
    fn payment_method_is_required_and_normalized() {
        let mut req = request(vec![item(Uuid::new_v4(), 1)]);
        req.payment_method = None;
        assert!(message(validate(req)).contains("payment method is required"));

        let mut req = request(vec![item(Uuid::new_v4(), 1)]);
        req.payment_method = Some("cheque".to_string());
        assert!(message(validate(req)).contains("unsupported payment method"));
    }

    #[test]
    fn repeated_products_are_merged() {
        let id = Uuid::new_v4();
        let other = Uuid::new_v4();
        let order = validate(request(vec![item(id, 2), item(other, 1), item(id, 3)])).unwrap();
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.lines[0].quantity, 5);
        assert_eq!(order.total_quantity, 6);
        assert_eq!(order.billing_address, address());
        assert_eq!(order.payment_method, PaymentMethod::CreditCard);
    }

    #[test]
    fn overflowing_quantity_is_rejected() {
        let req = request(vec![item(Uuid::new_v4(), i32::MAX), item(Uuid::new_v4(), 1)]);
        assert!(message(validate(req)).contains("too large"));
    }
}
