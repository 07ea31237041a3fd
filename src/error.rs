use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the tracker library.
///
/// The accounting core itself never fails on valid input; these variants
/// cover the I/O edges (config, ledger file, CSV) and trade entry
/// validation. Price lookups degrade to `None` instead of erroring.
#[derive(Error, Debug)]
pub enum Error {
    #[error("i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file is invalid: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("ledger file is invalid: {0}")]
    Ledger(#[from] serde_json::Error),

    #[error("csv processing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid trade: {0}")]
    Validation(String),
}
