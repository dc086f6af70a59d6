use crate::domain::ids::{SellerId, StoreId, WithdrawalId};
use crate::domain::money::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    /// Payout in flight at the bank; still resolvable by the reviewer.
    Processing,
    Completed,
    Rejected,
}

impl WithdrawalStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }

    /// Whether a reviewer may still resolve the request.
    pub fn resolvable(self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Destination bank account for a payout.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BankDetails {
    pub account_holder: String,
    pub bank_name: String,
    pub account_number: String,
    pub branch_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: WithdrawalId,
    pub store_id: StoreId,
    pub seller_id: SellerId,
    pub amount: Amount,
    pub bank_details: BankDetails,
    pub status: WithdrawalStatus,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Withdrawal {
    pub fn new(
        store_id: StoreId,
        seller_id: SellerId,
        amount: Amount,
        bank_details: BankDetails,
    ) -> Self {
        Self {
            id: WithdrawalId::generate(),
            store_id,
            seller_id,
            amount,
            bank_details,
            status: WithdrawalStatus::Pending,
            requested_at: Utc::now(),
            processed_at: None,
        }
    }
}
