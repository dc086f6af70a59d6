use crate::domain::account::{OrderFinancial, SellerAccount};
use crate::domain::order::Order;
use crate::domain::ports::Notifier;
use crate::domain::withdrawal::Withdrawal;
use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

/// Stand-in for the external mail collaborator: records each dispatch in the
/// log instead of sending anything.
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn settlement_completed(&self, order: &Order, financial: &OrderFinancial) -> Result<()> {
        info!(
            order_id = %order.id,
            store_id = %order.store_id,
            seller_profit = %financial.seller_profit,
            "settlement mail dispatched"
        );
        Ok(())
    }

    async fn withdrawal_requested(
        &self,
        withdrawal: &Withdrawal,
        account: &SellerAccount,
    ) -> Result<()> {
        info!(
            withdrawal_id = %withdrawal.id,
            store_id = %withdrawal.store_id,
            amount = %withdrawal.amount.value(),
            available = %account.available_balance.0,
            pending = %account.pending_balance.0,
            "reviewer mail dispatched"
        );
        Ok(())
    }
}
