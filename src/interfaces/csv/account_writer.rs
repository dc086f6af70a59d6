use crate::domain::account::SellerAccount;
use crate::domain::money::Balance;
use crate::error::Result;
use std::io::Write;

/// Writes final seller account balances as CSV.
pub struct AccountWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AccountWriter<W> {
    pub fn new(dest: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(dest),
        }
    }

    /// Emits one row per account, sorted by store id for stable output.
    pub fn write_accounts(&mut self, mut accounts: Vec<SellerAccount>) -> Result<()> {
        accounts.sort_by(|a, b| a.store_id.as_str().cmp(b.store_id.as_str()));

        self.writer
            .write_record(["store", "earnings", "available", "pending", "withdrawn"])?;
        for account in accounts {
            let earnings = render(account.total_earnings);
            let available = render(account.available_balance);
            let pending = render(account.pending_balance);
            let withdrawn = render(account.total_withdrawn);
            self.writer.write_record([
                account.store_id.as_str(),
                earnings.as_str(),
                available.as_str(),
                pending.as_str(),
                withdrawn.as_str(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Strips insignificant trailing zeros so `15.00` prints as `15`.
fn render(balance: Balance) -> String {
    balance.0.normalize().to_string()
}
