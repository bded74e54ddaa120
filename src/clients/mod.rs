pub mod quote;
pub mod transfer;

pub use quote::{ClobQuoteClient, QuoteSource};
pub use transfer::{MockTransfer, RelayTransferClient, TokenTransfer};
