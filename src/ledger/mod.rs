pub mod entry;
pub mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Symbol that marks fiat cash events; every other symbol is a crypto asset.
pub const USD: &str = "USD";

/// What a ledger event does.
///
/// `Deposit`/`Withdrawal` move fiat and are only valid for [`USD`];
/// the other four move crypto. `Holding` parks units outside the
/// sellable pool, `Transfer` brings units in like a buy.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeType {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
    Holding,
    Transfer,
    Deposit,
    Withdrawal,
}

impl TradeType {
    pub fn is_fiat(self) -> bool {
        matches!(self, TradeType::Deposit | TradeType::Withdrawal)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Maker,
    Taker,
}

impl Default for OrderType {
    fn default() -> OrderType {
        OrderType::Maker
    }
}

/// One immutable ledger event.
///
/// Quantity is always non-negative; direction comes from the type.
/// Numeric fields default to zero when absent so partially-filled
/// records still value cleanly.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub asset: String,
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub fee: f64,
    #[serde(default)]
    pub total_value: f64,
    #[serde(default)]
    pub exchange: String,
    #[serde(default)]
    pub order_type: OrderType,
    #[serde(default)]
    pub account_id: Option<Uuid>,
}

/// Clone and stable-sort by date; equal timestamps keep insertion order.
pub fn sorted_by_date(trades: &[Trade]) -> Vec<Trade> {
    let mut sorted = trades.to_vec();
    sorted.sort_by_key(|t| t.date);
    sorted
}

/// Sellable/withdrawable balance for an asset, floored at zero.
///
/// USD counts deposits minus withdrawals; crypto counts buys and
/// transfers minus sells. Holding units are parked and not available.
pub fn available_quantity(trades: &[Trade], asset: &str) -> f64 {
    let mut qty = 0.0;
    for t in trades.iter().filter(|t| t.asset == asset) {
        if asset == USD {
            match t.trade_type {
                TradeType::Deposit => qty += t.quantity,
                TradeType::Withdrawal => qty -= t.quantity,
                _ => {}
            }
        } else {
            match t.trade_type {
                TradeType::Buy | TradeType::Transfer => qty += t.quantity,
                TradeType::Sell => qty -= t.quantity,
                _ => {}
            }
        }
    }
    qty.max(0.0)
}
