use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Customer,
    WholesaleBuyer,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Customer => "customer",
            UserRole::WholesaleBuyer => "wholesale_buyer",
            UserRole::Admin => "admin",
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "customer" => Ok(UserRole::Customer),
            "wholesale_buyer" | "wholesale" => Ok(UserRole::WholesaleBuyer),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated caller, as resolved by the upstream auth gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: UserRole,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: Option<String>,
}

impl Address {
    /// Names of the required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("street", &self.street),
            ("city", &self.city),
            ("province", &self.province),
            ("postalCode", &self.postal_code),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub payment_method: Option<String>,
    pub discount_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Paypal,
    BankTransfer,
    Crypto,
}

impl PaymentMethod {
    /// Maps a free-form method tag onto a supported method.
    pub fn normalize(raw: &str) -> Option<Self> {
        let tag = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match tag.as_str() {
            "credit_card" | "credit" | "card" | "visa" | "mastercard" | "amex" => {
                Some(PaymentMethod::CreditCard)
            }
            "debit_card" | "debit" => Some(PaymentMethod::DebitCard),
            "paypal" => Some(PaymentMethod::Paypal),
            "bank_transfer" | "wire" | "wire_transfer" | "e_transfer" | "etransfer" | "interac" => {
                Some(PaymentMethod::BankTransfer)
            }
            "crypto" | "cryptocurrency" | "bitcoin" | "btc" => Some(PaymentMethod::Crypto),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Crypto => "crypto",
        }
    }

    /// Methods settled out of band; funds are confirmed later by an operator.
    pub fn requires_confirmation(&self) -> bool {
        matches!(self, PaymentMethod::BankTransfer | PaymentMethod::Crypto)
    }

    pub fn initial_payment_status(&self) -> PaymentStatus {
        if self.requires_confirmation() {
            PaymentStatus::AwaitingConfirmation
        } else {
            PaymentStatus::Pending
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    AwaitingApproval,
    Approved,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::AwaitingApproval => "awaiting_approval",
            OrderStatus::Approved => "approved",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awaiting_approval" => Ok(OrderStatus::AwaitingApproval),
            "approved" => Ok(OrderStatus::Approved),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    AwaitingConfirmation,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::AwaitingConfirmation => "awaiting_confirmation",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "awaiting_confirmation" => Ok(PaymentStatus::AwaitingConfirmation),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(format!("unknown payment status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    FixedAmount,
}

impl FromStr for DiscountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(DiscountType::Percentage),
            "fixed_amount" | "fixed" => Ok(DiscountType::FixedAmount),
            other => Err(format!("unknown discount type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    pub success: bool,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    pub success: bool,
    pub message: String,
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_result: Option<PaymentResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineSummary {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub price_per_item: BigDecimal,
}

/// Payload handed to the email service after an order commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub customer_email: String,
    pub customer_name: String,
    pub order_id: Uuid,
    pub total: BigDecimal,
    pub items: Vec<OrderLineSummary>,
    pub shipping_address: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlacedEvent {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub location_id: String,
    pub total_amount: BigDecimal,
    pub is_wholesale: bool,
    pub discount_code: Option<String>,
    pub lines: Vec<OrderLineSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecordedEvent {
    pub order_id: Uuid,
    pub payment_status: PaymentStatus,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub event_data: serde_json::Value,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
}

impl OutboxEvent {
    pub const ORDER_PLACED: &'static str = "OrderPlaced";
    pub const PAYMENT_RECORDED: &'static str = "PaymentRecorded";

    pub fn new(aggregate_id: Uuid, event_type: &str, event_data: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            aggregate_id,
            event_type: event_type.to_string(),
            event_data,
            processed: false,
            created_at: Utc::now(),
        }
    }

    pub fn order_placed(event: &OrderPlacedEvent) -> serde_json::Result<Self> {
        Ok(Self::new(event.order_id, Self::ORDER_PLACED, serde_json::to_value(event)?))
    }

    pub fn payment_recorded(event: &PaymentRecordedEvent) -> serde_json::Result<Self> {
        Ok(Self::new(event.order_id, Self::PAYMENT_RECORDED, serde_json::to_value(event)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_method_tags_are_normalized() {
        assert_eq!(PaymentMethod::normalize("Credit Card"), Some(PaymentMethod::CreditCard));
        assert_eq!(PaymentMethod::normalize(" e-transfer "), Some(PaymentMethod::BankTransfer));
        assert_eq!(PaymentMethod::normalize("BTC"), Some(PaymentMethod::Crypto));
        assert_eq!(PaymentMethod::normalize("cheque"), None);
    }

    #[test]
    fn delayed_methods_start_awaiting_confirmation() {
        assert_eq!(
            PaymentMethod::BankTransfer.initial_payment_status(),
            PaymentStatus::AwaitingConfirmation
        );
        assert_eq!(PaymentMethod::Crypto.initial_payment_status(), PaymentStatus::AwaitingConfirmation);
        assert_eq!(PaymentMethod::CreditCard.initial_payment_status(), PaymentStatus::Pending);
    }

    #[test]
    fn blank_address_fields_are_reported() {
        let address = Address {
            street: "1 King St".to_string(),
            city: "  ".to_string(),
            province: "ON".to_string(),
            postal_code: String::new(),
            country: None,
        };
        assert_eq!(address.missing_fields(), vec!["city", "postalCode"]);
    }

    #[test]
    fn roles_parse_from_header_values() {
        assert_eq!("Wholesale-Buyer".parse::<UserRole>(), Ok(UserRole::WholesaleBuyer));
        assert_eq!("customer".parse::<UserRole>(), Ok(UserRole::Customer));
        assert!("guest".parse::<UserRole>().is_err());
    }

    #[test]
    fn request_uses_camel_case_fields() {
        let json = serde_json::json!({
            "items": [{"productId": Uuid::nil(), "quantity": 2}],
            "shippingAddress": {"street": "1 King St", "city": "Toronto", "province": "ON", "postalCode": "M5H 1A1"},
            "paymentMethod": "paypal",
            "discountCode": "SAVE10"
        });
        let request: PlaceOrderRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.items.len(), 1);
        assert_eq!(request.shipping_address.unwrap().postal_code, "M5H 1A1");
        assert!(request.billing_address.is_none());
        assert_eq!(request.discount_code.as_deref(), Some("SAVE10"));
    }
}
