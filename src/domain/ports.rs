use crate::domain::account::{BalanceDelta, OrderFinancial, SellerAccount};
use crate::domain::ids::{OrderId, PaymentRef, StoreId, WithdrawalId};
use crate::domain::order::{Order, OrderLine, OrderStatus};
use crate::domain::withdrawal::{Withdrawal, WithdrawalStatus};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Outcome of an atomic status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied { from: OrderStatus },
    /// The order had already reached the target through the forward chain.
    Duplicate(OrderStatus),
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create_order(&self, order: Order) -> Result<()>;
    /// Attaches line items after creation. Callers treat this as best-effort.
    async fn create_order_items(&self, order_id: &OrderId, lines: Vec<OrderLine>) -> Result<()>;
    async fn get(&self, order_id: &OrderId) -> Result<Option<Order>>;
    async fn find_by_payment_ref(&self, payment_ref: &PaymentRef) -> Result<Option<Order>>;
    /// Validates against the state machine and applies the change as one
    /// check-then-set. Illegal transitions fail with `TransitionRejected`.
    async fn transition_status(&self, order_id: &OrderId, next: OrderStatus)
    -> Result<Transition>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_or_create_account(&self, store_id: &StoreId) -> Result<SellerAccount>;
    /// Applies the delta as an atomic read-modify-write against current balances.
    async fn apply_delta(&self, store_id: &StoreId, delta: BalanceDelta) -> Result<SellerAccount>;
    async fn all_accounts(&self) -> Result<Vec<SellerAccount>>;
    /// Write-once: returns `false` when a row for the order already exists.
    async fn insert_financial(&self, row: OrderFinancial) -> Result<bool>;
    async fn financial_for_order(&self, order_id: &OrderId) -> Result<Option<OrderFinancial>>;
    async fn insert_withdrawal(&self, withdrawal: Withdrawal) -> Result<()>;
    async fn get_withdrawal(&self, id: &WithdrawalId) -> Result<Option<Withdrawal>>;
    async fn update_withdrawal_status(
        &self,
        id: &WithdrawalId,
        status: WithdrawalStatus,
        processed_at: Option<DateTime<Utc>>,
    ) -> Result<()>;
}

/// External mail/SMS collaborator. Invoked fire-and-forget; a failure is logged
/// by the caller and never rolls back the financial change that triggered it.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn settlement_completed(&self, order: &Order, financial: &OrderFinancial) -> Result<()>;
    async fn withdrawal_requested(
        &self,
        withdrawal: &Withdrawal,
        account: &SellerAccount,
    ) -> Result<()>;
}

pub type OrderStoreRef = Arc<dyn OrderStore>;
pub type LedgerStoreRef = Arc<dyn LedgerStore>;
pub type NotifierRef = Arc<dyn Notifier>;
