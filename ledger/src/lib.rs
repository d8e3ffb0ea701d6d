pub mod client;
pub mod error;
pub mod signer;
pub mod types;

pub use client::{AlloyLedgerClient, LedgerClient};
pub use error::LedgerError;
