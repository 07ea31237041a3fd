use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::{sorted_by_date, OrderType, Trade, TradeType, USD};
use crate::accounting::reports::trade_profits;
use crate::error::Result;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub group_id: Option<Uuid>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountGroup {
    pub id: Uuid,
    pub name: String,
}

/// On-disk ledger: everything the tracker persists for one user.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Ledger {
    pub accounts: Vec<Account>,
    pub account_groups: Vec<AccountGroup>,
    pub trades: Vec<Trade>,
}

impl Ledger {
    /// Load from a JSON data file; an absent file yields an empty ledger.
    pub fn load(path: &Path) -> Result<Ledger> {
        if !path.exists() {
            info!(path = %path.display(), "no data file yet, starting empty");
            return Ok(Ledger::default());
        }
        let file = File::open(path)?;
        let ledger: Ledger = serde_json::from_reader(file)?;
        ledger.warn_on_oversells();
        Ok(ledger)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn account_by_name(&self, name: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.name == name)
    }

    pub fn group_by_name(&self, name: &str) -> Option<&AccountGroup> {
        self.account_groups.iter().find(|g| g.name == name)
    }

    /// Trades booked against one account.
    pub fn trades_for_account(&self, account_id: Uuid) -> Vec<Trade> {
        self.trades
            .iter()
            .filter(|t| t.account_id == Some(account_id))
            .cloned()
            .collect()
    }

    /// Trades booked against any account in a group.
    pub fn trades_for_group(&self, group_id: Uuid) -> Vec<Trade> {
        let members: Vec<Uuid> = self
            .accounts
            .iter()
            .filter(|a| a.group_id == Some(group_id))
            .map(|a| a.id)
            .collect();
        self.trades
            .iter()
            .filter(|t| t.account_id.map_or(false, |id| members.contains(&id)))
            .cloned()
            .collect()
    }

    /// Distinct non-USD symbols present in the ledger.
    pub fn crypto_assets(&self) -> Vec<String> {
        let assets: BTreeSet<&str> = self
            .trades
            .iter()
            .filter(|t| t.asset != USD)
            .map(|t| t.asset.as_str())
            .collect();
        assets.into_iter().map(str::to_string).collect()
    }

    /// Export trades, newest first, with the display profit column.
    pub fn export_csv(&self, path: &Path) -> Result<()> {
        let profits = trade_profits(&self.trades);
        let names: HashMap<Uuid, &str> = self
            .accounts
            .iter()
            .map(|a| (a.id, a.name.as_str()))
            .collect();

        let mut sorted = sorted_by_date(&self.trades);
        sorted.reverse();

        let mut writer = csv::Writer::from_path(path)?;
        for t in &sorted {
            writer.serialize(TradeRow {
                id: t.id,
                date: t.date,
                asset: t.asset.clone(),
                trade_type: t.trade_type,
                price: t.price,
                quantity: t.quantity,
                fee: t.fee,
                total_value: t.total_value,
                exchange: t.exchange.clone(),
                order_type: t.order_type,
                account: t
                    .account_id
                    .and_then(|id| names.get(&id).copied())
                    .unwrap_or("")
                    .to_string(),
                profit_usd: profits.get(&t.id).copied(),
            })?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Append trades from a CSV produced by [`Ledger::export_csv`].
    /// Rows whose id already exists are skipped; returns how many were
    /// added. Account names that no longer resolve import as unassigned.
    pub fn import_csv(&mut self, path: &Path) -> Result<usize> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut added = 0;
        for row in reader.deserialize::<TradeRow>() {
            let row = row?;
            if self.trades.iter().any(|t| t.id == row.id) {
                continue;
            }
            let account_id = self.account_by_name(&row.account).map(|a| a.id);
            self.trades.push(Trade {
                id: row.id,
                date: row.date,
                asset: row.asset,
                trade_type: row.trade_type,
                price: row.price,
                quantity: row.quantity,
                fee: row.fee,
                total_value: row.total_value,
                exchange: row.exchange,
                order_type: row.order_type,
                account_id,
            });
            added += 1;
        }
        Ok(added)
    }

    // a sell beyond what the ledger acquired means history was edited out
    // from under it; the core still values it, but loudly
    fn warn_on_oversells(&self) {
        for asset in self.crypto_assets() {
            let mut acquired = 0.0;
            let mut sold = 0.0;
            for t in self.trades.iter().filter(|t| t.asset == asset) {
                match t.trade_type {
                    TradeType::Buy | TradeType::Transfer => acquired += t.quantity,
                    TradeType::Sell => sold += t.quantity,
                    _ => {}
                }
            }
            if sold > acquired {
                warn!(%asset, sold, acquired, "ledger sells more than it acquired");
            }
        }
    }
}

/// One row of the trades CSV; export and import share this shape.
#[derive(Debug, Serialize, Deserialize)]
struct TradeRow {
    id: Uuid,
    date: DateTime<Utc>,
    asset: String,
    #[serde(rename = "type")]
    trade_type: TradeType,
    price: f64,
    quantity: f64,
    fee: f64,
    total_value: f64,
    exchange: String,
    order_type: OrderType,
    account: String,
    profit_usd: Option<f64>,
}
