use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use super::{lots, CostBasisMethod, PerAssetMetrics, PortfolioMetrics};
use crate::ledger::{sorted_by_date, Trade, TradeType, USD};

/// Compute the full portfolio snapshot from a trade history.
///
/// This is the single source of truth for positions, cost basis, cash,
/// realized/unrealized P&L and ROI; reports, projections and the CLI
/// consume its output instead of re-deriving valuation. `price_of`
/// supplies the current USD price per symbol, `None` when unavailable;
/// unpriced positions are valued at their own cost basis so the
/// snapshot stays usable offline. Never fails: malformed numbers
/// degrade to zeros.
pub fn compute_portfolio_metrics(
    trades: &[Trade],
    method: CostBasisMethod,
    price_of: &mut dyn FnMut(&str) -> Option<f64>,
) -> PortfolioMetrics {
    if trades.is_empty() {
        return PortfolioMetrics::default();
    }

    let sorted = sorted_by_date(trades);

    // net fiat the user put in
    let mut total_external_cash = 0.0;
    for t in sorted.iter().filter(|t| t.asset == USD) {
        match t.trade_type {
            TradeType::Deposit => total_external_cash += t.quantity,
            TradeType::Withdrawal => total_external_cash -= t.quantity,
            _ => {}
        }
    }

    let assets: BTreeSet<&str> = sorted
        .iter()
        .filter(|t| t.asset != USD)
        .map(|t| t.asset.as_str())
        .collect();

    let mut per_asset = BTreeMap::new();
    let mut total_cost_basis_assets = 0.0;
    let mut total_unrealized_pnl = 0.0;
    let mut total_value_assets = 0.0;

    for asset in assets {
        let basis = lots::cost_basis(&sorted, asset, method);
        // float drift on a fully-sold position can leave a tiny negative
        // basis; clamp once here so every derived figure agrees
        let cost_basis = basis.total_cost.max(0.0);
        let units_held = basis.units_held;

        let (buy_cost, sell_proceeds, holding_qty) = asset_flows(&sorted, asset);
        // realized gain is proceeds minus the cost that left the basis pool
        let realized_pnl = sell_proceeds - (buy_cost - cost_basis);

        let total_units_for_value = units_held + holding_qty;
        let price = price_of(asset).filter(|p| *p > 0.0);
        let current_value = match price {
            Some(p) => total_units_for_value * p,
            None => {
                warn!(asset, "no usable price, valuing position at cost basis");
                cost_basis
            }
        };

        let unrealized_pnl = current_value - cost_basis;
        let roi_pct = if cost_basis > 0.0 {
            unrealized_pnl / cost_basis * 100.0
        } else {
            0.0
        };

        per_asset.insert(
            asset.to_string(),
            PerAssetMetrics {
                units_held,
                holding_qty,
                price,
                current_value,
                cost_basis,
                unrealized_pnl,
                realized_pnl,
                lifetime_pnl: realized_pnl + unrealized_pnl,
                roi_pct,
            },
        );
        total_cost_basis_assets += cost_basis;
        total_unrealized_pnl += unrealized_pnl;
        total_value_assets += current_value;
    }

    // cash ledger: external fiat, minus what buys spent, plus what sells
    // returned; transfers and holdings never move cash
    let mut usd_balance = total_external_cash;
    for t in sorted.iter().filter(|t| t.asset != USD) {
        let notional = if t.total_value != 0.0 {
            t.total_value
        } else {
            t.price * t.quantity
        };
        match t.trade_type {
            TradeType::Buy => usd_balance -= notional + t.fee,
            TradeType::Sell => usd_balance += notional - t.fee,
            _ => {}
        }
    }

    let total_value = total_value_assets + usd_balance;

    // aggregate realized P&L is recomputed over all assets at once rather
    // than summing the per-asset figures, so summation order cannot
    // introduce drift between the two views
    let mut total_buy_cost = 0.0;
    let mut total_sell_proceeds = 0.0;
    for t in sorted.iter().filter(|t| t.asset != USD) {
        match t.trade_type {
            TradeType::Buy | TradeType::Transfer => total_buy_cost += t.total_value + t.fee,
            TradeType::Sell => total_sell_proceeds += t.total_value - t.fee,
            _ => {}
        }
    }
    let realized_pnl = total_sell_proceeds - (total_buy_cost - total_cost_basis_assets);
    let total_pnl = realized_pnl + total_unrealized_pnl;
    let roi_pct = if total_external_cash > 0.0 {
        total_pnl / total_external_cash * 100.0
    } else {
        0.0
    };
    let roi_on_cost_pct = if total_cost_basis_assets > 0.0 {
        Some(total_pnl / total_cost_basis_assets * 100.0)
    } else {
        None
    };

    PortfolioMetrics {
        per_asset,
        usd_balance,
        total_value,
        total_external_cash,
        total_cost_basis_assets,
        realized_pnl,
        unrealized_pnl: total_unrealized_pnl,
        total_pnl,
        roi_pct,
        roi_on_cost_pct,
    }
}

/// Gross acquisition cost, gross sale proceeds and parked holding
/// quantity for one asset.
fn asset_flows(trades: &[Trade], asset: &str) -> (f64, f64, f64) {
    let mut buy_cost = 0.0;
    let mut sell_proceeds = 0.0;
    let mut holding_qty = 0.0;
    for t in trades.iter().filter(|t| t.asset == asset) {
        match t.trade_type {
            TradeType::Buy | TradeType::Transfer => buy_cost += t.total_value + t.fee,
            TradeType::Sell => sell_proceeds += t.total_value - t.fee,
            TradeType::Holding => holding_qty += t.quantity,
            _ => {}
        }
    }
    (buy_cost, sell_proceeds, holding_qty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use uuid::Uuid;

    use crate::ledger::OrderType;

    fn trade(asset: &str, trade_type: TradeType, minute: u32, price: f64, quantity: f64, fee: f64) -> Trade {
        let total_value = if trade_type.is_fiat() {
            quantity
        } else {
            price * quantity
        };
        Trade {
            id: Uuid::new_v4(),
            date: Utc.with_ymd_and_hms(2024, 5, 1, 8, minute, 0).unwrap(),
            asset: asset.to_string(),
            trade_type,
            price,
            quantity,
            fee,
            total_value,
            exchange: String::new(),
            order_type: OrderType::Maker,
            account_id: None,
        }
    }

    fn no_price(_: &str) -> Option<f64> {
        None
    }

    #[test]
    fn empty_trades_yield_the_zero_snapshot() {
        let metrics = compute_portfolio_metrics(&[], CostBasisMethod::Average, &mut no_price);
        assert!(metrics.per_asset.is_empty());
        assert_eq!(metrics.total_value, 0.0);
        assert_eq!(metrics.total_external_cash, 0.0);
        assert_eq!(metrics.realized_pnl, 0.0);
        assert_eq!(metrics.unrealized_pnl, 0.0);
        assert_eq!(metrics.total_pnl, 0.0);
        assert_eq!(metrics.roi_pct, 0.0);
        assert!(metrics.roi_on_cost_pct.is_none());
    }

    #[test]
    fn deposit_buy_and_price_gain() {
        let trades = vec![
            trade(USD, TradeType::Deposit, 0, 1.0, 1000.0, 0.0),
            trade("BTC", TradeType::Buy, 1, 50000.0, 0.01, 5.0),
        ];
        let metrics = compute_portfolio_metrics(&trades, CostBasisMethod::Average, &mut |_| {
            Some(60000.0)
        });

        assert!((metrics.total_external_cash - 1000.0).abs() < 1e-9);
        assert!((metrics.usd_balance - 495.0).abs() < 1e-9);

        let btc = &metrics.per_asset["BTC"];
        assert!((btc.cost_basis - 505.0).abs() < 1e-9);
        assert!((btc.current_value - 600.0).abs() < 1e-9);
        assert!((btc.unrealized_pnl - 95.0).abs() < 1e-9);

        assert!((metrics.total_value - 1095.0).abs() < 1e-9);
        assert!((metrics.total_pnl - 95.0).abs() < 1e-9);
        assert!((metrics.roi_pct - 9.5).abs() < 1e-9);
    }

    #[test]
    fn missing_price_falls_back_to_cost_basis() {
        let trades = vec![trade("BTC", TradeType::Buy, 0, 40000.0, 1.0, 40.0)];
        let metrics = compute_portfolio_metrics(&trades, CostBasisMethod::Fifo, &mut no_price);
        let btc = &metrics.per_asset["BTC"];
        assert_eq!(btc.price, None);
        assert!((btc.current_value - 40040.0).abs() < 1e-9);
        assert!(btc.unrealized_pnl.abs() < 1e-9);
    }

    #[test]
    fn non_positive_price_counts_as_missing() {
        let trades = vec![trade("BTC", TradeType::Buy, 0, 40000.0, 1.0, 0.0)];
        let metrics =
            compute_portfolio_metrics(&trades, CostBasisMethod::Fifo, &mut |_| Some(0.0));
        let btc = &metrics.per_asset["BTC"];
        assert_eq!(btc.price, None);
        assert!((btc.current_value - 40000.0).abs() < 1e-9);
    }

    #[test]
    fn holding_is_valued_but_not_sellable() {
        let trades = vec![trade("BTC", TradeType::Holding, 0, 0.0, 0.5, 0.0)];

        let metrics = compute_portfolio_metrics(&trades, CostBasisMethod::Average, &mut |_| {
            Some(40000.0)
        });
        let btc = &metrics.per_asset["BTC"];
        assert_eq!(btc.units_held, 0.0);
        assert!((btc.holding_qty - 0.5).abs() < 1e-12);
        assert!((btc.current_value - 20000.0).abs() < 1e-9);

        // without a price the fallback is the (zero) cost basis
        let metrics = compute_portfolio_metrics(&trades, CostBasisMethod::Average, &mut no_price);
        assert_eq!(metrics.per_asset["BTC"].current_value, 0.0);
    }

    #[rstest]
    #[case(CostBasisMethod::Fifo)]
    #[case(CostBasisMethod::Lifo)]
    #[case(CostBasisMethod::Average)]
    fn methods_agree_on_single_lot_histories(#[case] method: CostBasisMethod) {
        let trades = vec![
            trade("BTC", TradeType::Buy, 0, 10000.0, 2.0, 0.0),
            trade("BTC", TradeType::Sell, 1, 15000.0, 1.0, 0.0),
        ];
        let metrics = compute_portfolio_metrics(&trades, method, &mut no_price);
        let btc = &metrics.per_asset["BTC"];
        assert!((btc.units_held - 1.0).abs() < 1e-12);
        assert!((btc.cost_basis - 10000.0).abs() < 1e-9);
        assert!((btc.realized_pnl - 5000.0).abs() < 1e-9);
    }

    #[test]
    fn lifetime_pnl_decomposes_into_realized_plus_unrealized() {
        let trades = vec![
            trade("BTC", TradeType::Buy, 0, 10000.0, 2.0, 20.0),
            trade("BTC", TradeType::Sell, 1, 15000.0, 1.0, 15.0),
            trade("ETH", TradeType::Buy, 2, 2000.0, 3.0, 6.0),
        ];
        let metrics = compute_portfolio_metrics(&trades, CostBasisMethod::Fifo, &mut |asset| {
            match asset {
                "BTC" => Some(18000.0),
                "ETH" => Some(1900.0),
                _ => None,
            }
        });
        for m in metrics.per_asset.values() {
            assert!((m.lifetime_pnl - (m.realized_pnl + m.unrealized_pnl)).abs() < 1e-9);
        }
        let summed: f64 = metrics.per_asset.values().map(|m| m.realized_pnl).sum();
        assert!((metrics.realized_pnl - summed).abs() < 1e-6);
    }

    #[test]
    fn crypto_funded_portfolio_reports_roi_on_cost() {
        let trades = vec![trade("BTC", TradeType::Transfer, 0, 30000.0, 1.0, 0.0)];
        let metrics = compute_portfolio_metrics(&trades, CostBasisMethod::Average, &mut |_| {
            Some(33000.0)
        });
        assert_eq!(metrics.roi_pct, 0.0);
        let on_cost = metrics.roi_on_cost_pct.expect("cost basis is positive");
        assert!((on_cost - 10.0).abs() < 1e-9);
    }

    #[test]
    fn deposits_make_roi_pct_primary() {
        let trades = vec![
            trade(USD, TradeType::Deposit, 0, 1.0, 1000.0, 0.0),
            trade("BTC", TradeType::Buy, 1, 500.0, 1.0, 0.0),
        ];
        let metrics = compute_portfolio_metrics(&trades, CostBasisMethod::Average, &mut |_| {
            Some(600.0)
        });
        assert!((metrics.roi_pct - 10.0).abs() < 1e-9);
        assert!(metrics.roi_on_cost_pct.is_some());
    }

    #[test]
    fn usd_cash_replay_falls_back_to_price_times_quantity() {
        let mut buy = trade("BTC", TradeType::Buy, 1, 100.0, 2.0, 0.0);
        buy.total_value = 0.0; // partially-filled record
        let trades = vec![trade(USD, TradeType::Deposit, 0, 1.0, 500.0, 0.0), buy];
        let metrics = compute_portfolio_metrics(&trades, CostBasisMethod::Average, &mut no_price);
        assert!((metrics.usd_balance - 300.0).abs() < 1e-9);
    }

    #[test]
    fn withdrawals_reduce_external_cash() {
        let trades = vec![
            trade(USD, TradeType::Deposit, 0, 1.0, 1000.0, 0.0),
            trade(USD, TradeType::Withdrawal, 1, 1.0, 400.0, 0.0),
        ];
        let metrics = compute_portfolio_metrics(&trades, CostBasisMethod::Average, &mut no_price);
        assert!((metrics.total_external_cash - 600.0).abs() < 1e-9);
        assert!((metrics.usd_balance - 600.0).abs() < 1e-9);
        assert!((metrics.total_value - 600.0).abs() < 1e-9);
    }

    #[test]
    fn transfer_does_not_move_cash() {
        let trades = vec![
            trade(USD, TradeType::Deposit, 0, 1.0, 1000.0, 0.0),
            trade("BTC", TradeType::Transfer, 1, 30000.0, 1.0, 0.0),
        ];
        let metrics = compute_portfolio_metrics(&trades, CostBasisMethod::Average, &mut no_price);
        assert!((metrics.usd_balance - 1000.0).abs() < 1e-9);
    }
}
