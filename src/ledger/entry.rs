use chrono::Utc;
use uuid::Uuid;

use super::{available_quantity, OrderType, Trade, TradeType, USD};
use crate::config::Config;
use crate::error::{Error, Result};

/// User-supplied parameters for one new ledger entry.
#[derive(Clone, Debug)]
pub struct TradeInput {
    pub asset: String,
    pub trade_type: TradeType,
    /// Unit price for crypto trades; the USD amount for fiat events.
    pub amount: f64,
    pub quantity: f64,
    pub exchange: String,
    pub order_type: OrderType,
    pub account_id: Option<Uuid>,
}

/// Validate and build a persisted trade.
///
/// Fiat deposits/withdrawals book the USD amount as quantity at price 1
/// with no fee. Crypto buys and sells pay the exchange fee schedule;
/// transfers and holdings carry no fee. Sells and withdrawals beyond
/// the available balance are rejected here: the accounting core
/// tolerates oversold history, but the entry path does not create it.
pub fn build_trade(existing: &[Trade], config: &Config, input: &TradeInput) -> Result<Trade> {
    let asset = input.asset.trim().to_ascii_uppercase();
    if asset.is_empty() {
        return Err(Error::Validation("asset is required".to_string()));
    }
    if (asset == USD) != input.trade_type.is_fiat() {
        return Err(Error::Validation(format!(
            "{:?} is not valid for asset {}",
            input.trade_type, asset
        )));
    }

    let is_fiat = input.trade_type.is_fiat();
    let (price, quantity, fee, total_value) = if is_fiat {
        if input.amount <= 0.0 {
            return Err(Error::Validation("amount must be greater than 0".to_string()));
        }
        (1.0, input.amount, 0.0, input.amount)
    } else {
        if input.amount <= 0.0 {
            return Err(Error::Validation("price must be greater than 0".to_string()));
        }
        if input.quantity <= 0.0 {
            return Err(Error::Validation("quantity must be greater than 0".to_string()));
        }
        let rates = config.fee_structure.get(&input.exchange).ok_or_else(|| {
            Error::Validation(format!("unknown exchange {:?}", input.exchange))
        })?;
        let rate = match input.order_type {
            OrderType::Maker => rates.maker,
            OrderType::Taker => rates.taker,
        };
        let notional = input.amount * input.quantity;
        let fee = match input.trade_type {
            TradeType::Buy | TradeType::Sell => notional * (rate / 100.0),
            // transfers and holdings move units, not orders
            _ => 0.0,
        };
        (input.amount, input.quantity, fee, notional)
    };

    if matches!(input.trade_type, TradeType::Sell | TradeType::Withdrawal) {
        let available = available_quantity(existing, &asset);
        if quantity > available {
            return Err(Error::Validation(format!(
                "insufficient {}: available {:.8}, requested {:.8}",
                asset, available, quantity
            )));
        }
    }

    Ok(Trade {
        id: Uuid::new_v4(),
        date: Utc::now(),
        asset,
        trade_type: input.trade_type,
        price: round8(price),
        quantity,
        fee: round8(fee),
        total_value: round8(total_value),
        exchange: if is_fiat { String::new() } else { input.exchange.clone() },
        order_type: input.order_type,
        account_id: input.account_id,
    })
}

fn round8(value: f64) -> f64 {
    (value * 1e8).round() / 1e8
}
