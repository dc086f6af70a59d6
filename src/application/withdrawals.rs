use crate::config::EngineConfig;
use crate::domain::account::BalanceDelta;
use crate::domain::ids::{SellerId, StoreId, WithdrawalId};
use crate::domain::money::Amount;
use crate::domain::ports::{LedgerStoreRef, NotifierRef};
use crate::domain::withdrawal::{BankDetails, Withdrawal, WithdrawalStatus};
use crate::error::{EngineError, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

/// The seller-facing withdrawal workflow: hold on request, release or pay out
/// on reviewer resolution.
pub struct WithdrawalService {
    config: EngineConfig,
    ledger: LedgerStoreRef,
    notifier: NotifierRef,
}

impl WithdrawalService {
    pub fn new(config: EngineConfig, ledger: LedgerStoreRef, notifier: NotifierRef) -> Self {
        Self {
            config,
            ledger,
            notifier,
        }
    }

    /// Places a hold and records the pending withdrawal.
    ///
    /// The hold itself is the availability check: it is applied atomically
    /// against current balances, so a racing settlement or second request can
    /// never overdraw the account.
    pub async fn request(
        &self,
        store_id: StoreId,
        seller_id: SellerId,
        amount: Decimal,
        bank_details: BankDetails,
    ) -> Result<Withdrawal> {
        let amount = Amount::new(amount)?;
        if amount.value() < self.config.minimum_withdrawal {
            return Err(EngineError::Validation(format!(
                "withdrawal amount {} is below the minimum of {}",
                amount.value(),
                self.config.minimum_withdrawal
            )));
        }

        let account = self
            .ledger
            .apply_delta(&store_id, BalanceDelta::hold(amount.value()))
            .await?;

        let withdrawal = Withdrawal::new(store_id.clone(), seller_id, amount, bank_details);
        if let Err(e) = self.ledger.insert_withdrawal(withdrawal.clone()).await {
            // The request never happened; give the funds back.
            self.ledger
                .apply_delta(&store_id, BalanceDelta::release(amount.value()))
                .await?;
            return Err(e);
        }
        info!(
            withdrawal_id = %withdrawal.id,
            store_id = %store_id,
            amount = %amount.value(),
            "withdrawal requested; funds held"
        );

        let notifier = Arc::clone(&self.notifier);
        let pending = withdrawal.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.withdrawal_requested(&pending, &account).await {
                warn!(withdrawal_id = %pending.id, error = %e, "reviewer notification failed");
            }
        });

        Ok(withdrawal)
    }

    /// Reviewer approval: the held funds leave the platform.
    pub async fn approve(&self, id: &WithdrawalId) -> Result<Withdrawal> {
        self.resolve(id, WithdrawalStatus::Completed).await
    }

    /// Reviewer rejection: the held funds return to the available balance.
    pub async fn reject(&self, id: &WithdrawalId) -> Result<Withdrawal> {
        self.resolve(id, WithdrawalStatus::Rejected).await
    }

    /// Marks a payout as in flight at the bank. No funds move.
    pub async fn mark_processing(&self, id: &WithdrawalId) -> Result<Withdrawal> {
        let withdrawal = self.load_resolvable(id).await?;
        self.ledger
            .update_withdrawal_status(id, WithdrawalStatus::Processing, None)
            .await?;
        Ok(Withdrawal {
            status: WithdrawalStatus::Processing,
            ..withdrawal
        })
    }

    async fn resolve(&self, id: &WithdrawalId, terminal: WithdrawalStatus) -> Result<Withdrawal> {
        let withdrawal = self.load_resolvable(id).await?;
        let delta = match terminal {
            WithdrawalStatus::Completed => BalanceDelta::payout(withdrawal.amount.value()),
            WithdrawalStatus::Rejected => BalanceDelta::release(withdrawal.amount.value()),
            other => {
                return Err(EngineError::TransitionRejected {
                    from: withdrawal.status.to_string(),
                    to: other.to_string(),
                });
            }
        };

        self.ledger.apply_delta(&withdrawal.store_id, delta).await?;
        let processed_at = Utc::now();
        self.ledger
            .update_withdrawal_status(id, terminal, Some(processed_at))
            .await?;
        info!(withdrawal_id = %id, status = %terminal, "withdrawal resolved");

        Ok(Withdrawal {
            status: terminal,
            processed_at: Some(processed_at),
            ..withdrawal
        })
    }

    async fn load_resolvable(&self, id: &WithdrawalId) -> Result<Withdrawal> {
        let withdrawal = self
            .ledger
            .get_withdrawal(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("withdrawal {id}")))?;
        if !withdrawal.status.resolvable() {
            warn!(withdrawal_id = %id, status = %withdrawal.status, "withdrawal already resolved");
            return Err(EngineError::TransitionRejected {
                from: withdrawal.status.to_string(),
                to: "resolved".to_string(),
            });
        }
        Ok(withdrawal)
    }
}
