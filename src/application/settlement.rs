use crate::config::EngineConfig;
use crate::domain::account::{BalanceDelta, OrderFinancial};
use crate::domain::ids::OrderId;
use crate::domain::order::{Order, OrderStatus};
use crate::domain::ports::{LedgerStoreRef, NotifierRef, OrderStoreRef, Transition};
use crate::error::{EngineError, Result};
use crate::gateway::notification::{PaymentNotification, STATUS_COMPLETE};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// The order moved to `paid`.
    Applied,
    /// The notification was a redelivery; nothing changed.
    Duplicate,
    /// The declared payment status was not a successful capture.
    Ignored,
}

/// Applies verified gateway notifications and recognizes revenue on delivery.
pub struct SettlementProcessor {
    config: EngineConfig,
    orders: OrderStoreRef,
    ledger: LedgerStoreRef,
    notifier: NotifierRef,
}

impl SettlementProcessor {
    pub fn new(
        config: EngineConfig,
        orders: OrderStoreRef,
        ledger: LedgerStoreRef,
        notifier: NotifierRef,
    ) -> Self {
        Self {
            config,
            orders,
            ledger,
            notifier,
        }
    }

    /// Applies one gateway notification.
    ///
    /// Failures here are never payer-facing: the webhook caller acknowledges the
    /// delivery regardless and acts only on the returned outcome. Every rejection
    /// is logged with enough context to investigate a forged or corrupted
    /// notification.
    pub async fn handle_notification(
        &self,
        notification: &PaymentNotification,
    ) -> Result<SettlementOutcome> {
        if let Err(e) = notification.verify(&self.config.gateway.passphrase) {
            warn!(
                txn_id = notification.transaction_id(),
                error = %e,
                "rejected payment notification with an invalid signature"
            );
            return Err(e);
        }

        match notification.payment_status() {
            Some(STATUS_COMPLETE) => {}
            status => {
                info!(?status, "ignoring non-complete payment notification");
                return Ok(SettlementOutcome::Ignored);
            }
        }

        let Some(order) = self.locate_order(notification).await? else {
            warn!(
                txn_id = notification.transaction_id(),
                "payment notification references an unknown order"
            );
            return Err(EngineError::NotFound("order for notification".to_string()));
        };
        let order_id = order.id.clone();

        // Zero tolerance: a signature can be valid for a forged payload, so the
        // declared amount must equal what the buyer actually owed.
        let declared = notification.amount_gross()?;
        if declared != order.total_amount.value() {
            warn!(
                order_id = %order_id,
                %declared,
                expected = %order.total_amount.value(),
                "payment notification amount does not match the stored order total"
            );
            return Err(EngineError::Validation(
                "notification amount does not match the order total".to_string(),
            ));
        }

        match self
            .orders
            .transition_status(&order_id, OrderStatus::Paid)
            .await?
        {
            Transition::Applied { from } => {
                info!(order_id = %order_id, %from, "order marked as paid");
                Ok(SettlementOutcome::Applied)
            }
            Transition::Duplicate(current) => {
                info!(order_id = %order_id, %current, "duplicate payment notification");
                Ok(SettlementOutcome::Duplicate)
            }
        }
    }

    /// Looks the order up by its custom order reference, falling back to the
    /// payment identifier when the reference was not echoed back.
    async fn locate_order(&self, notification: &PaymentNotification) -> Result<Option<Order>> {
        if let Ok(order_id) = notification.order_id() {
            return self.orders.get(&order_id).await;
        }
        match notification.payment_ref() {
            Some(payment_ref) => self.orders.find_by_payment_ref(&payment_ref).await,
            None => Ok(None),
        }
    }

    /// Fulfillment-driven transition (`processing`, `shipped`, `delivered`,
    /// `cancelled`). Authorization happens upstream. Entering `delivered`
    /// recognizes revenue exactly once.
    pub async fn advance_order(&self, order_id: &OrderId, next: OrderStatus) -> Result<Transition> {
        let transition = self.orders.transition_status(order_id, next).await?;
        if next == OrderStatus::Delivered && matches!(transition, Transition::Applied { .. }) {
            let order = self
                .orders
                .get(order_id)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("order {order_id}")))?;
            self.settle(&order).await?;
        }
        Ok(transition)
    }

    /// Writes the financial row and credits the seller in one logical operation.
    /// The write-once row is the idempotency gate for the credit.
    async fn settle(&self, order: &Order) -> Result<()> {
        let financial = OrderFinancial::compute(
            order.id.clone(),
            order.store_id.clone(),
            order.total_amount.value(),
        );
        if !self.ledger.insert_financial(financial.clone()).await? {
            warn!(order_id = %order.id, "order already settled; skipping credit");
            return Ok(());
        }

        let profit = financial.seller_profit;
        if let Err(e) = self
            .ledger
            .apply_delta(&order.store_id, BalanceDelta::credit(profit))
            .await
        {
            // The financial row exists but the credit did not land. This needs
            // manual reconciliation, not a guess at which side is right.
            error!(order_id = %order.id, store_id = %order.store_id, error = %e,
                "seller credit failed after ledger row insert");
            return Err(e);
        }
        info!(order_id = %order.id, store_id = %order.store_id, %profit,
            "seller credited for settled order");

        let notifier = Arc::clone(&self.notifier);
        let order = order.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.settlement_completed(&order, &financial).await {
                warn!(order_id = %order.id, error = %e, "settlement notification failed");
            }
        });
        Ok(())
    }
}
