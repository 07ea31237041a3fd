use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Maker/taker fee rates for one exchange, in percent of notional.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FeeRates {
    pub maker: f64,
    pub taker: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub cost_basis_method: String,
    pub fee_structure: HashMap<String, FeeRates>,
    pub price_cache_path: String,
    pub price_max_age_minutes: f64,
    pub offline: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            cost_basis_method: "average".to_string(),
            fee_structure: default_fee_structure(),
            price_cache_path: "price_cache.json".to_string(),
            price_max_age_minutes: 5.0,
            offline: false,
        }
    }
}

impl Config {
    /// Load from a YAML file; an absent file yields the defaults.
    pub fn load(config_path: &Path) -> Result<Config> {
        if !config_path.exists() {
            return Ok(Config::default());
        }
        let file = File::open(config_path)?;
        let config: Config = serde_yaml::from_reader(file)?;
        Ok(config)
    }
}

fn default_fee_structure() -> HashMap<String, FeeRates> {
    // maker/taker percentages per venue; wallet moves are free
    let venues = [
        ("Bitstamp", FeeRates { maker: 0.30, taker: 0.40 }),
        ("Wallet", FeeRates { maker: 0.0, taker: 0.0 }),
        ("Binance", FeeRates { maker: 0.10, taker: 0.10 }),
        ("Coinbase Pro", FeeRates { maker: 0.40, taker: 0.60 }),
        ("Kraken", FeeRates { maker: 0.25, taker: 0.40 }),
        ("Bybit", FeeRates { maker: 0.10, taker: 0.10 }),
        ("Crypto.com", FeeRates { maker: 0.25, taker: 0.50 }),
    ];
    venues
        .iter()
        .map(|(name, rates)| (name.to_string(), *rates))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn absent_file_yields_defaults() {
        let path = std::env::temp_dir().join(format!("config-{}.yaml", Uuid::new_v4()));
        let config = Config::load(&path).unwrap();
        assert_eq!(config.cost_basis_method, "average");
        assert_eq!(config.price_max_age_minutes, 5.0);
        assert!(config.fee_structure.contains_key("Bitstamp"));
        assert!(!config.offline);
    }

    #[test]
    fn partial_yaml_keeps_defaults_for_the_rest() {
        let path = std::env::temp_dir().join(format!("config-{}.yaml", Uuid::new_v4()));
        std::fs::write(&path, "cost_basis_method: fifo\noffline: true\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.cost_basis_method, "fifo");
        assert!(config.offline);
        assert_eq!(config.price_cache_path, "price_cache.json");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn bitstamp_default_rates_match_the_schedule() {
        let fees = default_fee_structure();
        let bitstamp = &fees["Bitstamp"];
        assert_eq!(bitstamp.maker, 0.30);
        assert_eq!(bitstamp.taker, 0.40);
    }
}
