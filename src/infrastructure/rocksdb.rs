use crate::domain::account::{BalanceDelta, OrderFinancial, SellerAccount};
use crate::domain::ids::{OrderId, PaymentRef, StoreId, WithdrawalId};
use crate::domain::order::{Order, OrderLine, OrderStatus};
use crate::domain::ports::{LedgerStore, OrderStore, Transition};
use crate::domain::withdrawal::{Withdrawal, WithdrawalStatus};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

/// Column Family for storing orders.
pub const CF_ORDERS: &str = "orders";
/// Column Family for storing seller account states.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family for storing per-order financial rows.
pub const CF_FINANCIALS: &str = "financials";
/// Column Family for storing withdrawal requests.
pub const CF_WITHDRAWALS: &str = "withdrawals";

/// A persistent store implementation using RocksDB.
///
/// Serves both the order store and the seller ledger, each entity type in its
/// own Column Family. Read-modify-write sections (status transitions, balance
/// deltas, write-once inserts) serialize on an internal mutex, since RocksDB
/// point writes alone do not give us check-then-set semantics.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring the
    /// required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_ORDERS, CF_ACCOUNTS, CF_FINANCIALS, CF_WITHDRAWALS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            EngineError::Internal(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn put<T: serde::Serialize>(&self, cf_name: &str, key: &str, value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = serde_json::to_vec(value).map_err(|e| EngineError::Internal(Box::new(e)))?;
        self.db.put_cf(&cf, key.as_bytes(), bytes)?;
        Ok(())
    }

    fn fetch<T: serde::de::DeserializeOwned>(&self, cf_name: &str, key: &str) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(&cf, key.as_bytes())? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| EngineError::Internal(Box::new(e)))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn create_order(&self, order: Order) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self.fetch::<Order>(CF_ORDERS, order.id.as_str())?.is_some() {
            return Err(EngineError::OrderCreation(format!(
                "order {} already exists",
                order.id
            )));
        }
        self.put(CF_ORDERS, order.id.as_str(), &order)
    }

    async fn create_order_items(&self, order_id: &OrderId, lines: Vec<OrderLine>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut order = self
            .fetch::<Order>(CF_ORDERS, order_id.as_str())?
            .ok_or_else(|| EngineError::NotFound(format!("order {order_id}")))?;
        order.lines = lines;
        self.put(CF_ORDERS, order_id.as_str(), &order)
    }

    async fn get(&self, order_id: &OrderId) -> Result<Option<Order>> {
        self.fetch(CF_ORDERS, order_id.as_str())
    }

    async fn find_by_payment_ref(&self, payment_ref: &PaymentRef) -> Result<Option<Order>> {
        let cf = self.cf(CF_ORDERS)?;
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            let order: Order = serde_json::from_slice(&value)
                .map_err(|e| EngineError::Internal(Box::new(e)))?;
            if &order.payment_ref == payment_ref {
                return Ok(Some(order));
            }
        }
        Ok(None)
    }

    async fn transition_status(
        &self,
        order_id: &OrderId,
        next: OrderStatus,
    ) -> Result<Transition> {
        let _guard = self.write_lock.lock().await;
        let mut order = self
            .fetch::<Order>(CF_ORDERS, order_id.as_str())?
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
        self.put(CF_ORDERS, order_id.as_str(), &order)?;
        Ok(Transition::Applied { from: current })
    }
}

#[async_trait]
impl LedgerStore for RocksDBStore {
    async fn get_or_create_account(&self, store_id: &StoreId) -> Result<SellerAccount> {
        let _guard = self.write_lock.lock().await;
        match self.fetch::<SellerAccount>(CF_ACCOUNTS, store_id.as_str())? {
            Some(account) => Ok(account),
            None => {
                let account = SellerAccount::new(store_id.clone());
                self.put(CF_ACCOUNTS, store_id.as_str(), &account)?;
                Ok(account)
            }
        }
    }

    async fn apply_delta(&self, store_id: &StoreId, delta: BalanceDelta) -> Result<SellerAccount> {
        let _guard = self.write_lock.lock().await;
        let mut account = self
            .fetch::<SellerAccount>(CF_ACCOUNTS, store_id.as_str())?
            .unwrap_or_else(|| SellerAccount::new(store_id.clone()));
        account.apply(&delta)?;
        self.put(CF_ACCOUNTS, store_id.as_str(), &account)?;
        Ok(account)
    }

    async fn all_accounts(&self) -> Result<Vec<SellerAccount>> {
        let cf = self.cf(CF_ACCOUNTS)?;
        let mut accounts = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            let account: SellerAccount = serde_json::from_slice(&value)
                .map_err(|e| EngineError::Internal(Box::new(e)))?;
            accounts.push(account);
        }
        Ok(accounts)
    }

    async fn insert_financial(&self, row: OrderFinancial) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        if self
            .fetch::<OrderFinancial>(CF_FINANCIALS, row.order_id.as_str())?
            .is_some()
        {
            return Ok(false);
        }
        let key = row.order_id.to_string();
        self.put(CF_FINANCIALS, &key, &row)?;
        Ok(true)
    }

    async fn financial_for_order(&self, order_id: &OrderId) -> Result<Option<OrderFinancial>> {
        self.fetch(CF_FINANCIALS, order_id.as_str())
    }

    async fn insert_withdrawal(&self, withdrawal: Withdrawal) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self
            .fetch::<Withdrawal>(CF_WITHDRAWALS, withdrawal.id.as_str())?
            .is_some()
        {
            return Err(EngineError::Validation(format!(
                "withdrawal {} already exists",
                withdrawal.id
            )));
        }
        self.put(CF_WITHDRAWALS, withdrawal.id.as_str(), &withdrawal)
    }

    async fn get_withdrawal(&self, id: &WithdrawalId) -> Result<Option<Withdrawal>> {
        self.fetch(CF_WITHDRAWALS, id.as_str())
    }

    async fn update_withdrawal_status(
        &self,
        id: &WithdrawalId,
        status: WithdrawalStatus,
        processed_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut withdrawal = self
            .fetch::<Withdrawal>(CF_WITHDRAWALS, id.as_str())?
            .ok_or_else(|| EngineError::NotFound(format!("withdrawal {id}")))?;
        withdrawal.status = status;
        if processed_at.is_some() {
            withdrawal.processed_at = processed_at;
        }
        self.put(CF_WITHDRAWALS, id.as_str(), &withdrawal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::BuyerId;
    use crate::domain::money::{Amount, Balance};
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn sample_order(id: &str) -> Order {
        Order {
            id: OrderId::from(id),
            buyer_id: BuyerId::from("buyer-1"),
            store_id: StoreId::from("store-1"),
            lines: Vec::new(),
            shipping_address: "addr".to_string(),
            billing_address: "addr".to_string(),
            delivery_charge: Balance::ZERO,
            total_amount: Amount::new(dec!(115.00)).unwrap(),
            status: OrderStatus::Pending,
            payment_ref: PaymentRef::from("ref-1"),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_open_creates_column_families() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).expect("Failed to open RocksDB");

        for cf in [CF_ORDERS, CF_ACCOUNTS, CF_FINANCIALS, CF_WITHDRAWALS] {
            assert!(store.db.cf_handle(cf).is_some());
        }
    }

    #[tokio::test]
    async fn test_order_roundtrip_and_transition() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();

        store.create_order(sample_order("order-1")).await.unwrap();
        let id = OrderId::from("order-1");

        let transition = store.transition_status(&id, OrderStatus::Paid).await.unwrap();
        assert_eq!(
            transition,
            Transition::Applied {
                from: OrderStatus::Pending
            }
        );

        let order = OrderStore::get(&store, &id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);

        let duplicate = store.transition_status(&id, OrderStatus::Paid).await.unwrap();
        assert_eq!(duplicate, Transition::Duplicate(OrderStatus::Paid));
    }

    #[tokio::test]
    async fn test_account_delta_persists() {
        let dir = tempdir().unwrap();
        let store = RocksDBStore::open(dir.path()).unwrap();
        let store_id = StoreId::from("store-1");

        store
            .apply_delta(&store_id, BalanceDelta::credit(dec!(91.0)))
            .await
            .unwrap();

        let account = store.get_or_create_account(&store_id).await.unwrap();
        assert_eq!(account.available_balance, Balance::new(dec!(91.0)));
        assert!(account.invariant_holds());
    }

    #[tokio::test]
    async fn test_financial_write_once_survives_reopen() {
        let dir = tempdir().unwrap();
        let row = OrderFinancial::compute(
            OrderId::from("order-1"),
            StoreId::from("store-1"),
            dec!(115.00),
        );

        {
            let store = RocksDBStore::open(dir.path()).unwrap();
            assert!(store.insert_financial(row.clone()).await.unwrap());
        }

        let store = RocksDBStore::open(dir.path()).unwrap();
        assert!(!store.insert_financial(row).await.unwrap());
    }
}
