use std::collections::VecDeque;

use super::{CostBasis, CostBasisMethod, Lot};
use crate::ledger::{Trade, TradeType};

/// Ordered lot layers for one asset during a single replay.
///
/// FIFO appends and consumes oldest-first; LIFO keeps the newest layer
/// at the front so consumption always happens at the front.
struct LotBook {
    layers: VecDeque<Lot>,
    method: CostBasisMethod,
}

impl LotBook {
    fn new(method: CostBasisMethod) -> LotBook {
        LotBook {
            layers: VecDeque::new(),
            method,
        }
    }

    fn deposit(&mut self, lot: Lot) {
        match self.method {
            CostBasisMethod::Lifo => self.layers.push_front(lot),
            _ => self.layers.push_back(lot),
        }
    }

    /// Consume up to `quantity` units from the front, returning the cost
    /// released. Runs dry silently when the book holds less than asked;
    /// the unmatched remainder has no basis to release.
    fn consume(&mut self, mut quantity: f64) -> f64 {
        let mut released = 0.0;
        while quantity > 0.0 {
            let layer = match self.layers.front_mut() {
                Some(layer) => layer,
                None => break,
            };
            if layer.quantity <= quantity {
                released += layer.quantity * layer.cost_per_unit;
                quantity -= layer.quantity;
                self.layers.pop_front();
            } else {
                released += quantity * layer.cost_per_unit;
                layer.quantity -= quantity;
                quantity = 0.0;
            }
        }
        released
    }

    fn into_lots(self) -> Vec<Lot> {
        self.layers.into_iter().collect()
    }
}

/// Replay one asset's history into its cost basis, remaining units and
/// open lots. Filters and sorts internally; the input need not be
/// pre-sorted or pre-filtered.
pub(crate) fn cost_basis(trades: &[Trade], asset: &str, method: CostBasisMethod) -> CostBasis {
    match method {
        CostBasisMethod::Average => cost_basis_average(trades, asset),
        _ => cost_basis_lots(trades, asset, method),
    }
}

fn asset_trades<'a>(trades: &'a [Trade], asset: &str) -> Vec<&'a Trade> {
    let mut filtered: Vec<&Trade> = trades.iter().filter(|t| t.asset == asset).collect();
    filtered.sort_by_key(|t| t.date);
    filtered
}

fn cost_basis_lots(trades: &[Trade], asset: &str, method: CostBasisMethod) -> CostBasis {
    let mut book = LotBook::new(method);
    let mut total_cost = 0.0;
    let mut units_held = 0.0;

    for trade in asset_trades(trades, asset) {
        match trade.trade_type {
            TradeType::Buy | TradeType::Transfer => {
                let qty = trade.quantity;
                let acquisition = trade.total_value + trade.fee;
                let cost_per_unit = if qty > 0.0 { acquisition / qty } else { 0.0 };
                if cost_per_unit > 0.0 && qty > 0.0 {
                    book.deposit(Lot {
                        quantity: qty,
                        cost_per_unit,
                        trade_id: Some(trade.id),
                        date: Some(trade.date),
                    });
                    units_held += qty;
                    total_cost += acquisition;
                }
            }
            TradeType::Sell => {
                // units go negative when history sells more than it bought
                units_held -= trade.quantity;
                total_cost -= book.consume(trade.quantity);
            }
            // Holding parks units elsewhere; fiat events never carry this asset
            _ => {}
        }
    }

    CostBasis {
        total_cost,
        units_held,
        lots: book.into_lots(),
    }
}

fn cost_basis_average(trades: &[Trade], asset: &str) -> CostBasis {
    let mut total_cost = 0.0;
    let mut units_held = 0.0;

    for trade in asset_trades(trades, asset) {
        match trade.trade_type {
            TradeType::Buy | TradeType::Transfer => {
                units_held += trade.quantity;
                total_cost += trade.total_value + trade.fee;
            }
            TradeType::Sell => {
                let units_before = units_held;
                units_held -= trade.quantity;
                if units_held > 0.0 {
                    let avg = if units_before > 0.0 {
                        total_cost / units_before
                    } else {
                        0.0
                    };
                    total_cost = units_held * avg;
                } else {
                    total_cost = 0.0;
                }
            }
            _ => {}
        }
    }

    // single synthetic lot so callers see the blended cost
    let mut lots = Vec::new();
    if units_held > 0.0 {
        lots.push(Lot {
            quantity: units_held,
            cost_per_unit: total_cost / units_held,
            trade_id: None,
            date: None,
        });
    }

    CostBasis {
        total_cost,
        units_held,
        lots,
    }
}
