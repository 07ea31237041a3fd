use chrono::{Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;

use super::{compute_portfolio_metrics, CostBasisMethod, PortfolioMetrics};
use crate::ledger::{OrderType, Trade, TradeType};

/// One hypothetical transaction in a what-if run.
#[derive(Clone, Debug, Deserialize)]
pub struct HypotheticalTrade {
    pub asset: String,
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    pub price: f64,
    pub quantity: f64,
    #[serde(default)]
    pub account_id: Option<Uuid>,
}

/// Outcome of a what-if run over real plus synthetic trades.
#[derive(Clone, Debug)]
pub struct Projection {
    pub total_pnl: f64,
    /// External cash of the combined run; the "cost" figure.
    pub total_cost: f64,
    pub total_value: f64,
    pub metrics: PortfolioMetrics,
}

/// Value the ledger as if the hypothetical trades had also happened.
///
/// Synthetic trades are stamped one second apart after the newest real
/// trade, so row N sees the effect of rows 1..N-1 and a projected sell
/// can dispose of a projected buy. Rows with a non-positive price or
/// quantity are skipped. The real ledger is never modified and nothing
/// here is persisted.
pub fn project(
    trades: &[Trade],
    rows: &[HypotheticalTrade],
    method: CostBasisMethod,
    price_of: &mut dyn FnMut(&str) -> Option<f64>,
) -> Projection {
    let base = trades.iter().map(|t| t.date).max().unwrap_or_else(Utc::now);

    let mut combined = trades.to_vec();
    for (i, row) in rows.iter().enumerate() {
        if row.price <= 0.0 || row.quantity <= 0.0 {
            continue;
        }
        combined.push(Trade {
            id: Uuid::new_v4(),
            date: base + Duration::seconds(i as i64 + 1),
            asset: row.asset.clone(),
            trade_type: row.trade_type,
            price: row.price,
            quantity: row.quantity,
            fee: 0.0,
            total_value: row.price * row.quantity,
            exchange: String::new(),
            order_type: OrderType::Maker,
            account_id: row.account_id,
        });
    }

    let metrics = compute_portfolio_metrics(&combined, method, price_of);
    Projection {
        total_pnl: metrics.total_pnl,
        total_cost: metrics.total_external_cash,
        total_value: metrics.total_value,
        metrics,
    }
}
