//! Ferry Chains Information
//!
//! This crate contains the information about the chains and currencies that
//! are supported by the relayer, and the amount conversion between them.

pub mod chains;
pub mod currency;

pub use chains::{chain_info_by_name, is_multisig_transfer, ChainInfo, MULTISIG_LIMIT};
pub use currency::{AmountConverter, CurrencyEntry, CurrencyTable, Direction};
