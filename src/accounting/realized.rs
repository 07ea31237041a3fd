use std::collections::HashMap;

use uuid::Uuid;

use crate::ledger::{sorted_by_date, Trade, TradeType, USD};

/// Realized P&L attributed to each individual SELL, under average cost.
///
/// Attribution is deliberately average-only: these sale-level figures
/// feed an informational report column, while the method-aware realized
/// total comes from the portfolio aggregator. Entries exist only for
/// non-USD sells; a sell with no tracked basis attributes zero.
pub fn realized_pnl_per_trade(trades: &[Trade]) -> HashMap<Uuid, f64> {
    let sorted = sorted_by_date(trades);
    let mut units: HashMap<String, f64> = HashMap::new();
    let mut cost_basis: HashMap<String, f64> = HashMap::new();
    let mut result = HashMap::new();

    for trade in &sorted {
        if trade.asset == USD {
            continue;
        }
        match trade.trade_type {
            TradeType::Buy | TradeType::Transfer => {
                *units.entry(trade.asset.clone()).or_insert(0.0) += trade.quantity;
                *cost_basis.entry(trade.asset.clone()).or_insert(0.0) +=
                    trade.total_value + trade.fee;
            }
            TradeType::Sell => {
                let held = units.get(&trade.asset).copied().unwrap_or(0.0);
                let basis = cost_basis.get(&trade.asset).copied().unwrap_or(0.0);
                if held <= 0.0 {
                    result.insert(trade.id, 0.0);
                    continue;
                }
                let sold = trade.quantity.min(held);
                let cost_of_sold = basis / held * sold;
                let proceeds = trade.price * sold;
                result.insert(trade.id, proceeds - cost_of_sold - trade.fee);
                units.insert(trade.asset.clone(), held - sold);
                cost_basis.insert(trade.asset.clone(), basis - cost_of_sold);
            }
            _ => {}
        }
    }

    result
}

/// Price-differential profit for buys that follow a sell of the same
/// asset: `(last sell price - buy price) * quantity`. Display-only and
/// not part of realized or unrealized P&L; buys with no prior sell get
/// no entry.
pub fn buy_profit_per_trade(trades: &[Trade]) -> HashMap<Uuid, f64> {
    let sorted = sorted_by_date(trades);
    let mut last_sell_price: HashMap<String, f64> = HashMap::new();
    let mut result = HashMap::new();

    for trade in &sorted {
        if trade.asset == USD {
            continue;
        }
        match trade.trade_type {
            TradeType::Sell => {
                if trade.price > 0.0 {
                    last_sell_price.insert(trade.asset.clone(), trade.price);
                }
            }
            TradeType::Buy => {
                if let Some(&sell_price) = last_sell_price.get(&trade.asset) {
                    if trade.price > 0.0 && trade.quantity > 0.0 {
                        result.insert(trade.id, (sell_price - trade.price) * trade.quantity);
                    }
                }
            }
            _ => {}
        }
    }

    result
}
