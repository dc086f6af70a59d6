use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LedgerEventType {
    /// Settlement credit to a store's available balance.
    Credit,
    /// Withdrawal request: places a hold.
    Request,
    /// Reviewer approval of an earlier request.
    Approve,
    /// Reviewer rejection of an earlier request.
    Reject,
}

/// One row of a ledger replay file.
///
/// `reference` is a caller-chosen handle linking an `approve`/`reject` row back
/// to the `request` row it resolves.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct LedgerEvent {
    pub r#type: LedgerEventType,
    pub store: String,
    #[serde(default)]
    pub seller: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub reference: Option<String>,
}

/// Reads ledger events from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over
/// `Result<LedgerEvent>`. It handles whitespace trimming and flexible record
/// lengths automatically.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    /// Creates a new `EventReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes events, so large
    /// exports stream without loading fully into memory.
    pub fn events(self) -> impl Iterator<Item = Result<LedgerEvent>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(EngineError::from))
    }
}
