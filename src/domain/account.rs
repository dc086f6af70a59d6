use crate::domain::ids::{OrderId, StoreId};
use crate::domain::money::Balance;
use crate::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Order totals are VAT-inclusive at 15%; the marketplace commission is 9% of net.
const VAT_DIVISOR: Decimal = dec!(1.15);
const MARKETPLACE_FEE_RATE: Decimal = dec!(0.09);

/// Per-store balance state.
///
/// Invariant after every mutation:
/// `total_earnings == available_balance + pending_balance + total_withdrawn`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct SellerAccount {
    pub store_id: StoreId,
    pub total_earnings: Balance,
    /// Funds the seller may withdraw.
    pub available_balance: Balance,
    /// Funds held by an unresolved withdrawal request.
    pub pending_balance: Balance,
    /// Funds that have left the platform through approved withdrawals.
    pub total_withdrawn: Balance,
}

impl SellerAccount {
    pub fn new(store_id: StoreId) -> Self {
        Self {
            store_id,
            total_earnings: Balance::ZERO,
            available_balance: Balance::ZERO,
            pending_balance: Balance::ZERO,
            total_withdrawn: Balance::ZERO,
        }
    }

    pub fn invariant_holds(&self) -> bool {
        self.total_earnings
            == self.available_balance + self.pending_balance + self.total_withdrawn
    }

    /// Applies a delta as one read-modify-write. Fails without mutating when a
    /// bucket would go negative or the sum-of-parts invariant would break.
    pub fn apply(&mut self, delta: &BalanceDelta) -> Result<()> {
        let available = self.available_balance + delta.available;
        let pending = self.pending_balance + delta.pending;
        let withdrawn = self.total_withdrawn + delta.withdrawn;
        let earnings = self.total_earnings + delta.earnings;

        if available.is_negative() || pending.is_negative() {
            return Err(EngineError::Validation(format!(
                "insufficient funds for store {}",
                self.store_id
            )));
        }
        if earnings != available + pending + withdrawn {
            return Err(EngineError::BalanceInvariant(self.store_id.to_string()));
        }

        self.available_balance = available;
        self.pending_balance = pending;
        self.total_withdrawn = withdrawn;
        self.total_earnings = earnings;
        Ok(())
    }
}

/// A signed movement across the balance buckets. Accounts are only ever mutated
/// through deltas, never by direct field assignment.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BalanceDelta {
    pub available: Balance,
    pub pending: Balance,
    pub withdrawn: Balance,
    pub earnings: Balance,
}

impl BalanceDelta {
    /// Settlement credit: new earnings land in the available bucket.
    pub fn credit(amount: Decimal) -> Self {
        Self {
            available: Balance::new(amount),
            earnings: Balance::new(amount),
            ..Self::default()
        }
    }

    /// Withdrawal hold: reserves funds without finalizing their disposition.
    pub fn hold(amount: Decimal) -> Self {
        Self {
            available: Balance::new(-amount),
            pending: Balance::new(amount),
            ..Self::default()
        }
    }

    /// Rejected withdrawal: held funds return to the available bucket.
    pub fn release(amount: Decimal) -> Self {
        Self {
            pending: Balance::new(-amount),
            available: Balance::new(amount),
            ..Self::default()
        }
    }

    /// Approved withdrawal: held funds leave the platform.
    pub fn payout(amount: Decimal) -> Self {
        Self {
            pending: Balance::new(-amount),
            withdrawn: Balance::new(amount),
            ..Self::default()
        }
    }
}

/// Write-once financial breakdown of a settled order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFinancial {
    pub order_id: OrderId,
    pub store_id: StoreId,
    pub gross_amount: Decimal,
    pub vat_amount: Decimal,
    pub net_amount: Decimal,
    pub marketplace_fee: Decimal,
    pub seller_profit: Decimal,
    pub created_at: DateTime<Utc>,
}

impl OrderFinancial {
    /// Splits a VAT-inclusive gross into the ledger components.
    ///
    /// VAT and fee are rounded to the ledger precision; net and profit are derived
    /// by subtraction so the parts always sum back to the gross.
    pub fn compute(order_id: OrderId, store_id: StoreId, gross: Decimal) -> Self {
        let vat_amount = (gross - gross / VAT_DIVISOR).round_dp(4);
        let net_amount = gross - vat_amount;
        let marketplace_fee = (net_amount * MARKETPLACE_FEE_RATE).round_dp(4);
        let seller_profit = net_amount - marketplace_fee;
        Self {
            order_id,
            store_id,
            gross_amount: gross,
            vat_amount,
            net_amount,
            marketplace_fee,
            seller_profit,
            created_at: Utc::now(),
        }
    }
}
