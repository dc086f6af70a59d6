//! Text-format adapters for the replay/reporting binary.

pub mod csv;
