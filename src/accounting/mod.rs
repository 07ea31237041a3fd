pub mod reports;

mod lots;
mod metrics;
mod projection;
mod realized;

pub use metrics::compute_portfolio_metrics;
pub use projection::{project, HypotheticalTrade, Projection};
pub use realized::{buy_profit_per_trade, realized_pnl_per_trade};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How acquisition costs are matched against sales.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostBasisMethod {
    Fifo,
    Lifo,
    Average,
}

impl CostBasisMethod {
    /// Parse a config/CLI value; anything unrecognized falls back to
    /// average cost, the safe default.
    pub fn parse_or_default(value: &str) -> CostBasisMethod {
        match value.to_ascii_lowercase().as_str() {
            "fifo" => CostBasisMethod::Fifo,
            "lifo" => CostBasisMethod::Lifo,
            _ => CostBasisMethod::Average,
        }
    }
}

impl Default for CostBasisMethod {
    fn default() -> CostBasisMethod {
        CostBasisMethod::Average
    }
}

/// One batch of units acquired at a single unit cost.
///
/// Lots exist only within one cost-basis run and are never persisted.
/// The average method collapses everything into a single blended lot
/// with no originating trade.
#[derive(Clone, Debug)]
pub(crate) struct Lot {
    pub quantity: f64,
    pub cost_per_unit: f64,
    pub trade_id: Option<Uuid>,
    pub date: Option<DateTime<Utc>>,
}

/// Result of replaying one asset's history under one method.
pub(crate) struct CostBasis {
    pub total_cost: f64,
    pub units_held: f64,
    pub lots: Vec<Lot>,
}

/// Valuation of a single asset within a snapshot.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PerAssetMetrics {
    /// Sellable balance under the lots model.
    pub units_held: f64,
    /// Units parked in Holding trades; valued but not sellable.
    pub holding_qty: f64,
    /// Current USD price, when the provider had one.
    pub price: Option<f64>,
    pub current_value: f64,
    pub cost_basis: f64,
    pub unrealized_pnl: f64,
    pub realized_pnl: f64,
    pub lifetime_pnl: f64,
    pub roi_pct: f64,
}

/// Aggregate portfolio snapshot.
///
/// Produced exclusively by [`compute_portfolio_metrics`]; reports,
/// projections and the CLI all consume this rather than re-deriving
/// valuation.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PortfolioMetrics {
    pub per_asset: BTreeMap<String, PerAssetMetrics>,
    /// Fiat cash on hand after replaying deposits, withdrawals and trades.
    pub usd_balance: f64,
    /// Assets plus cash.
    pub total_value: f64,
    /// Net fiat the user put in (deposits minus withdrawals).
    pub total_external_cash: f64,
    pub total_cost_basis_assets: f64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub total_pnl: f64,
    /// P&L relative to external cash; zero when none was ever deposited.
    pub roi_pct: f64,
    /// Fallback ROI relative to cost basis, for crypto-funded portfolios.
    pub roi_on_cost_pct: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::CostBasisMethod;

    #[test]
    fn method_parsing_falls_back_to_average() {
        assert_eq!(CostBasisMethod::parse_or_default("fifo"), CostBasisMethod::Fifo);
        assert_eq!(CostBasisMethod::parse_or_default("LIFO"), CostBasisMethod::Lifo);
        assert_eq!(CostBasisMethod::parse_or_default("average"), CostBasisMethod::Average);
        assert_eq!(CostBasisMethod::parse_or_default("hifo"), CostBasisMethod::Average);
        assert_eq!(CostBasisMethod::parse_or_default(""), CostBasisMethod::Average);
    }
}
