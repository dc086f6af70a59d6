use crate::domain::ids::{BuyerId, OrderId, PaymentRef, ProductId, StoreId};
use crate::domain::money::{Amount, Balance};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Failed,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Failed)
    }

    /// Position in the forward fulfillment chain. Terminal failure states are off it.
    fn forward_rank(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Paid => Some(1),
            Self::Processing => Some(2),
            Self::Shipped => Some(3),
            Self::Delivered => Some(4),
            Self::Cancelled | Self::Failed => None,
        }
    }

    /// Legal single-step transitions. Skipping an intermediate state or leaving a
    /// terminal state is never legal.
    pub fn can_transition(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Paid)
                | (Self::Pending, Self::Failed)
                | (Self::Paid, Self::Processing)
                | (Self::Processing, Self::Shipped)
                | (Self::Shipped, Self::Delivered)
                | (
                    Self::Pending | Self::Paid | Self::Processing | Self::Shipped,
                    Self::Cancelled
                )
        )
    }

    /// Whether `target` has already been reached through the forward chain.
    pub fn has_reached(self, target: OrderStatus) -> bool {
        match (self.forward_rank(), target.forward_rank()) {
            (Some(current), Some(target)) => current >= target,
            _ => self == target,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A line item with the unit price captured at order time. Live product prices
/// never flow back into an existing order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Amount,
}

impl OrderLine {
    pub fn subtotal(&self) -> Decimal {
        self.unit_price.value() * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: BuyerId,
    pub store_id: StoreId,
    /// Attached out of band after creation; empty until item persistence lands.
    pub lines: Vec<OrderLine>,
    pub shipping_address: String,
    pub billing_address: String,
    pub delivery_charge: Balance,
    /// VAT-inclusive total, fixed at creation.
    pub total_amount: Amount,
    pub status: OrderStatus,
    pub payment_ref: PaymentRef,
    pub created_at: DateTime<Utc>,
}
