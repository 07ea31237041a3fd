//! Trade ledger accounting: cost bases, realized/unrealized P&L,
//! valuations and what-if projections over a crypto trade history.

pub mod accounting;
pub mod app;
pub mod config;
pub mod error;
pub mod ledger;
pub mod prices;

pub use error::{Error, Result};
