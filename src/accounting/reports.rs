use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use uuid::Uuid;

use super::{buy_profit_per_trade, realized_pnl_per_trade, PortfolioMetrics};
use crate::error::Result;
use crate::ledger::Trade;

/// One row of the per-asset breakdown in a written report.
#[derive(Debug, Serialize)]
struct AssetRow<'a> {
    asset: &'a str,
    units_held: f64,
    holding_qty: f64,
    price: Option<f64>,
    current_value: f64,
    cost_basis: f64,
    unrealized_pnl: f64,
    realized_pnl: f64,
    lifetime_pnl: f64,
    roi_pct: f64,
}

/// Rendering wrapper around a computed snapshot.
pub struct PortfolioReport {
    metrics: PortfolioMetrics,
}

impl PortfolioReport {
    pub fn new(metrics: PortfolioMetrics) -> PortfolioReport {
        PortfolioReport { metrics }
    }

    pub fn metrics(&self) -> &PortfolioMetrics {
        &self.metrics
    }

    /// Write the per-asset breakdown as CSV.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for (asset, m) in &self.metrics.per_asset {
            writer.serialize(AssetRow {
                asset: asset.as_str(),
                units_held: m.units_held,
                holding_qty: m.holding_qty,
                price: m.price,
                current_value: m.current_value,
                cost_basis: m.cost_basis,
                unrealized_pnl: m.unrealized_pnl,
                realized_pnl: m.realized_pnl,
                lifetime_pnl: m.lifetime_pnl,
                roi_pct: m.roi_pct,
            })?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Print the summary and per-asset lines to stdout.
    pub fn print(&self) {
        let m = &self.metrics;
        println!("Portfolio value:   ${:.2}", m.total_value);
        println!("USD balance:       ${:.2}", m.usd_balance);
        println!("External cash:     ${:.2}", m.total_external_cash);
        println!("Cost basis:        ${:.2}", m.total_cost_basis_assets);
        println!("Realized P&L:      ${:.2}", m.realized_pnl);
        println!("Unrealized P&L:    ${:.2}", m.unrealized_pnl);
        println!("Total P&L:         ${:.2}", m.total_pnl);
        match m.roi_on_cost_pct {
            // with no external cash the primary ROI is meaningless;
            // report the cost-relative figure instead
            Some(on_cost) if m.total_external_cash <= 0.0 => {
                println!("ROI (on cost):     {:.2}%", on_cost);
            }
            _ => println!("ROI:               {:.2}%", m.roi_pct),
        }
        if !m.per_asset.is_empty() {
            println!();
            for (asset, a) in &m.per_asset {
                let price = match a.price {
                    Some(p) => format!("${:.2}", p),
                    None => "N/A".to_string(),
                };
                println!(
                    "{:<6} {:>14.8} units  price {:>12}  value ${:>12.2}  P&L ${:>12.2}  ROI {:>8.2}%",
                    asset,
                    a.units_held + a.holding_qty,
                    price,
                    a.current_value,
                    a.lifetime_pnl,
                    a.roi_pct,
                );
            }
        }
    }
}

/// Per-trade display profit: realized P&L for sells, price-differential
/// profit for buys that follow a sell. Ids are disjoint so the two maps
/// merge cleanly.
pub fn trade_profits(trades: &[Trade]) -> HashMap<Uuid, f64> {
    let mut profits = realized_pnl_per_trade(trades);
    profits.extend(buy_profit_per_trade(trades));
    profits
}

/// USD move over the last 24h, derived from each asset's current value
/// and its 24h percent change: `value * pct / (100 + pct)`. `None` when
/// no asset has a known change. Display-only.
pub fn portfolio_24h_usd(
    metrics: &PortfolioMetrics,
    pct_24h_of: &mut dyn FnMut(&str) -> Option<f64>,
) -> Option<f64> {
    let mut total = 0.0;
    for (asset, m) in &metrics.per_asset {
        if let Some(pct) = pct_24h_of(asset) {
            if m.current_value > 0.0 {
                total += m.current_value * (pct / (100.0 + pct));
            }
        }
    }
    if total != 0.0 {
        Some(total)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::accounting::{compute_portfolio_metrics, CostBasisMethod, PerAssetMetrics};
    use crate::ledger::{OrderType, TradeType};

    fn trade(trade_type: TradeType, minute: u32, price: f64, quantity: f64) -> Trade {
        Trade {
            id: Uuid::new_v4(),
            date: Utc.with_ymd_and_hms(2024, 7, 1, 7, minute, 0).unwrap(),
            asset: "BTC".to_string(),
            trade_type,
            price,
            quantity,
            fee: 0.0,
            total_value: price * quantity,
            exchange: String::new(),
            order_type: OrderType::Maker,
            account_id: None,
        }
    }

    fn snapshot_with_value(value: f64) -> PortfolioMetrics {
        let mut metrics = PortfolioMetrics::default();
        metrics.per_asset.insert(
            "BTC".to_string(),
            PerAssetMetrics {
                current_value: value,
                ..PerAssetMetrics::default()
            },
        );
        metrics
    }

    #[test]
    fn trade_profits_covers_sells_and_rebuys() {
        let buy = trade(TradeType::Buy, 0, 10000.0, 1.0);
        let sell = trade(TradeType::Sell, 1, 15000.0, 1.0);
        let rebuy = trade(TradeType::Buy, 2, 12000.0, 1.0);
        let sell_id = sell.id;
        let rebuy_id = rebuy.id;
        let profits = trade_profits(&[buy, sell, rebuy]);
        assert!((profits[&sell_id] - 5000.0).abs() < 1e-9);
        assert!((profits[&rebuy_id] - 3000.0).abs() < 1e-9);
    }

    #[test]
    fn day_change_uses_the_percent_move() {
        let metrics = snapshot_with_value(110.0);
        // value 110 after a +10% day: 24h ago it was worth 100
        let delta = portfolio_24h_usd(&metrics, &mut |_| Some(10.0));
        assert!((delta.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn day_change_is_none_without_any_percent_data() {
        let metrics = snapshot_with_value(110.0);
        assert!(portfolio_24h_usd(&metrics, &mut |_| None).is_none());
    }

    #[test]
    fn report_csv_round_trips_through_disk() {
        let trades = vec![trade(TradeType::Buy, 0, 40000.0, 1.0)];
        let metrics = compute_portfolio_metrics(&trades, CostBasisMethod::Fifo, &mut |_| {
            Some(41000.0)
        });
        let path = std::env::temp_dir().join(format!("report-{}.csv", Uuid::new_v4()));
        PortfolioReport::new(metrics).write_to_file(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("asset,"));
        assert!(contents.contains("BTC"));
        std::fs::remove_file(&path).ok();
    }
}
