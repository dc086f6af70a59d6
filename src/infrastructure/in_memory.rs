use crate::domain::account::{BalanceDelta, OrderFinancial, SellerAccount};
use crate::domain::ids::{OrderId, PaymentRef, StoreId, WithdrawalId};
use crate::domain::order::{Order, OrderLine, OrderStatus};
use crate::domain::ports::{LedgerStore, OrderStore, Transition};
use crate::domain::withdrawal::{Withdrawal, WithdrawalStatus};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// A thread-safe in-memory order store.
///
/// The status transition runs entirely under the write lock, which makes the
/// duplicate check and the state change one atomic step.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create_order(&self, order: Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(EngineError::OrderCreation(format!(
                "order {} already exists",
                order.id
            )));
        }
        orders.insert(order.id.clone(), order);
        Ok(())
    }

    async fn create_order_items(&self, order_id: &OrderId, lines: Vec<OrderLine>) -> Result<()> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| EngineError::NotFound(format!("order {order_id}")))?;
        order.lines = lines;
        Ok(())
    }

    async fn get(&self, order_id: &OrderId) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(order_id).cloned())
    }

    async fn find_by_payment_ref(&self, payment_ref: &PaymentRef) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .find(|order| &order.payment_ref == payment_ref)
            .cloned())
    }

    async fn transition_status(
        &self,
        order_id: &OrderId,
        next: OrderStatus,
    ) -> Result<Transition> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| EngineError::NotFound(format!("order {order_id}")))?;
        let current = order.status;

        if current.has_reached(next) {
            return Ok(Transition::Duplicate(current));
        }
        if !current.can_transition(next) {
            warn!(order_id = %order_id, %current, %next, "illegal order status transition");
            return Err(EngineError::TransitionRejected {
                from: current.to_string(),
                to: next.to_string(),
            });
        }
        order.status = next;
        Ok(Transition::Applied { from: current })
    }
}

#[derive(Default)]
struct LedgerState {
    accounts: HashMap<StoreId, SellerAccount>,
    financials: HashMap<OrderId, OrderFinancial>,
    withdrawals: HashMap<WithdrawalId, Withdrawal>,
}

/// A thread-safe in-memory seller ledger.
///
/// One lock covers accounts, financial rows and withdrawals, so a delta and
/// its invariant check commit as a single read-modify-write.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    inner: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn get_or_create_account(&self, store_id: &StoreId) -> Result<SellerAccount> {
        let mut state = self.inner.write().await;
        Ok(state
            .accounts
            .entry(store_id.clone())
            .or_insert_with(|| SellerAccount::new(store_id.clone()))
            .clone())
    }

    async fn apply_delta(&self, store_id: &StoreId, delta: BalanceDelta) -> Result<SellerAccount> {
        let mut state = self.inner.write().await;
        let account = state
            .accounts
            .entry(store_id.clone())
            .or_insert_with(|| SellerAccount::new(store_id.clone()));
        // `apply` leaves the account untouched when it fails, so a rejected
        // delta never leaks a partial update.
        account.apply(&delta)?;
        Ok(account.clone())
    }

    async fn all_accounts(&self) -> Result<Vec<SellerAccount>> {
        let state = self.inner.read().await;
        Ok(state.accounts.values().cloned().collect())
    }

    async fn insert_financial(&self, row: OrderFinancial) -> Result<bool> {
        let mut state = self.inner.write().await;
        if state.financials.contains_key(&row.order_id) {
            return Ok(false);
        }
        state.financials.insert(row.order_id.clone(), row);
        Ok(true)
    }

    async fn financial_for_order(&self, order_id: &OrderId) -> Result<Option<OrderFinancial>> {
        let state = self.inner.read().await;
        Ok(state.financials.get(order_id).cloned())
    }

    async fn insert_withdrawal(&self, withdrawal: Withdrawal) -> Result<()> {
        let mut state = self.inner.write().await;
        if state.withdrawals.contains_key(&withdrawal.id) {
            return Err(EngineError::Validation(format!(
                "withdrawal {} already exists",
                withdrawal.id
            )));
        }
        state.withdrawals.insert(withdrawal.id.clone(), withdrawal);
        Ok(())
    }

    async fn get_withdrawal(&self, id: &WithdrawalId) -> Result<Option<Withdrawal>> {
        let state = self.inner.read().await;
        Ok(state.withdrawals.get(id).cloned())
    }

    async fn update_withdrawal_status(
        &self,
        id: &WithdrawalId,
        status: WithdrawalStatus,
        processed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut state = self.inner.write().await;
        let withdrawal = state
            .withdrawals
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(format!("withdrawal {id}")))?;
        withdrawal.status = status;
        if processed_at.is_some() {
            withdrawal.processed_at = processed_at;
        }
        Ok(())
    }
}
