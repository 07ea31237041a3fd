use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crypto_pnl::accounting::{self, reports, CostBasisMethod, HypotheticalTrade};
use crypto_pnl::app::App;
use crypto_pnl::config::Config;
use crypto_pnl::ledger::store::Ledger;
use crypto_pnl::ledger::{entry, OrderType, Trade, TradeType};
use crypto_pnl::prices::PriceQuotes;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let app = App::new();

    let config = Config::load(Path::new(app.get_config_path()))
        .with_context(|| format!("unable to read config file {:?}", app.get_config_path()))?;
    let mut ledger = Ledger::load(Path::new(app.get_data_path()))
        .with_context(|| format!("unable to read data file {:?}", app.get_data_path()))?;

    let mut quotes = PriceQuotes::new(
        Path::new(&config.price_cache_path),
        config.price_max_age_minutes,
        config.offline || app.get_offline(),
    );

    if app.get_clear_cache() {
        quotes.clear().context("unable to clear the price cache")?;
        info!("price cache cleared");
    }
    if app.get_refresh() {
        let updated = quotes.refresh(&ledger.crypto_assets());
        info!(updated, "price refresh finished");
    }

    if let Some(spec) = app.get_add_spec() {
        let input = parse_add_spec(spec, &ledger)?;
        let trade = entry::build_trade(&ledger.trades, &config, &input)?;
        info!(
            asset = %trade.asset,
            trade_type = ?trade.trade_type,
            quantity = trade.quantity,
            "trade appended"
        );
        ledger.trades.push(trade);
        ledger.save(Path::new(app.get_data_path()))
            .context("unable to save the ledger")?;
    }

    if let Some(path) = app.get_export_path() {
        ledger.export_csv(Path::new(path))
            .with_context(|| format!("unable to export trades to {:?}", path))?;
        info!(path, "trade history exported");
    }

    let method = match app.get_method() {
        Some(value) => CostBasisMethod::parse_or_default(value),
        None => CostBasisMethod::parse_or_default(&config.cost_basis_method),
    };
    let trades = scoped_trades(&ledger, &app)?;

    if let Some(path) = app.get_projection_path() {
        let rows = read_projection_rows(Path::new(path))?;
        let projection = accounting::project(&trades, &rows, method, &mut |a| quotes.quote(a));
        println!("Projected P&L:   ${:.2}", projection.total_pnl);
        println!("Projected cost:  ${:.2}", projection.total_cost);
        println!("Projected value: ${:.2}", projection.total_value);
        return Ok(());
    }

    let metrics = accounting::compute_portfolio_metrics(&trades, method, &mut |a| quotes.quote(a));
    let day_change = reports::portfolio_24h_usd(&metrics, &mut |a| quotes.pct_change_24h(a));
    let report = reports::PortfolioReport::new(metrics);
    report.print();
    if let Some(delta) = day_change {
        println!("24h change:        ${:.2}", delta);
    }
    if let Some(path) = app.get_report_path() {
        report.write_to_file(Path::new(path))
            .with_context(|| format!("unable to write report to {:?}", path))?;
        info!(path, "report written");
    }

    Ok(())
}

fn scoped_trades(ledger: &Ledger, app: &App) -> Result<Vec<Trade>> {
    if let Some(name) = app.get_account() {
        let account = ledger
            .account_by_name(name)
            .with_context(|| format!("unknown account {:?}", name))?;
        return Ok(ledger.trades_for_account(account.id));
    }
    if let Some(name) = app.get_group() {
        let group = ledger
            .group_by_name(name)
            .with_context(|| format!("unknown group {:?}", name))?;
        return Ok(ledger.trades_for_group(group.id));
    }
    Ok(ledger.trades.clone())
}

fn parse_add_spec(spec: &str, ledger: &Ledger) -> Result<entry::TradeInput> {
    let parts: Vec<&str> = spec.split(',').map(str::trim).collect();
    if parts.len() < 4 {
        bail!("expected TYPE,ASSET,PRICE,QTY[,EXCHANGE,ORDER,ACCOUNT], got {:?}", spec);
    }
    let trade_type = match parts[0].to_ascii_uppercase().as_str() {
        "BUY" => TradeType::Buy,
        "SELL" => TradeType::Sell,
        "HOLDING" => TradeType::Holding,
        "TRANSFER" => TradeType::Transfer,
        "DEPOSIT" => TradeType::Deposit,
        "WITHDRAWAL" => TradeType::Withdrawal,
        other => bail!("unknown trade type {:?}", other),
    };
    let amount: f64 = parts[2].parse().context("price must be a number")?;
    let quantity: f64 = parts[3].parse().context("quantity must be a number")?;
    let exchange = parts.get(4).copied().unwrap_or("Wallet").to_string();
    let order_type = match parts.get(5).copied().unwrap_or("maker").to_ascii_lowercase().as_str() {
        "taker" => OrderType::Taker,
        _ => OrderType::Maker,
    };
    let account_id = match parts.get(6) {
        Some(name) if !name.is_empty() => Some(
            ledger
                .account_by_name(name)
                .with_context(|| format!("unknown account {:?}", name))?
                .id,
        ),
        _ => None,
    };
    Ok(entry::TradeInput {
        asset: parts[1].to_string(),
        trade_type,
        amount,
        quantity,
        exchange,
        order_type,
        account_id,
    })
}

fn read_projection_rows(path: &Path) -> Result<Vec<HypotheticalTrade>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("unable to read projection table {:?}", path.display()))?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row.context("invalid projection row")?);
    }
    Ok(rows)
}
