use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3/simple/price";

/// CoinGecko ids for the common tickers; anything else queries its
/// lowercased symbol and may simply come back empty.
fn coingecko_id(asset: &str) -> String {
    let id = match asset.to_ascii_uppercase().as_str() {
        "BTC" => "bitcoin",
        "ETH" => "ethereum",
        "BNB" => "binancecoin",
        "ADA" => "cardano",
        "SOL" => "solana",
        "XRP" => "ripple",
        "DOT" => "polkadot",
        "DOGE" => "dogecoin",
        "MATIC" => "matic-network",
        "AVAX" => "avalanche-2",
        "LINK" => "chainlink",
        "UNI" => "uniswap",
        "ATOM" => "cosmos",
        "LTC" => "litecoin",
        "ALGO" => "algorand",
        _ => return asset.to_ascii_lowercase(),
    };
    id.to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct CachedQuote {
    price: f64,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pct_change_24h: Option<f64>,
}

/// Cached USD spot quotes with a freshness window.
///
/// The accounting core receives this as an injected closure and never
/// sees the cache or the network; every failure degrades to `None`.
pub struct PriceQuotes {
    cache: HashMap<String, CachedQuote>,
    cache_path: PathBuf,
    max_age: Duration,
    offline: bool,
    client: reqwest::blocking::Client,
}

impl PriceQuotes {
    pub fn new(cache_path: &Path, max_age_minutes: f64, offline: bool) -> PriceQuotes {
        PriceQuotes {
            cache: load_cache(cache_path),
            cache_path: cache_path.to_path_buf(),
            max_age: Duration::seconds((max_age_minutes * 60.0) as i64),
            offline,
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Current USD price: cache when fresh, otherwise the API. `None`
    /// when nothing is available. USDC is pegged at 1.
    pub fn quote(&mut self, asset: &str) -> Option<f64> {
        if asset.eq_ignore_ascii_case("USDC") {
            return Some(1.0);
        }
        if let Some(entry) = self.cache.get(asset) {
            if Utc::now() - entry.timestamp < self.max_age {
                return Some(entry.price);
            }
        }
        if self.offline {
            // a stale quote still beats valuing blind
            return self.cache.get(asset).map(|entry| entry.price);
        }
        let (price, pct_change_24h) = self.fetch(asset)?;
        self.cache.insert(
            asset.to_string(),
            CachedQuote {
                price,
                timestamp: Utc::now(),
                pct_change_24h,
            },
        );
        self.persist();
        Some(price)
    }

    /// 24h percent change, from cache only. USDC reports 0.
    pub fn pct_change_24h(&self, asset: &str) -> Option<f64> {
        if asset.eq_ignore_ascii_case("USDC") {
            return Some(0.0);
        }
        self.cache.get(asset).and_then(|entry| entry.pct_change_24h)
    }

    /// Re-fetch quotes for every crypto symbol given, skipping USD and
    /// the USDC peg. Returns how many were updated.
    pub fn refresh(&mut self, assets: &[String]) -> usize {
        if self.offline {
            return 0;
        }
        let mut updated = 0;
        for asset in assets {
            if asset.eq_ignore_ascii_case("USD") || asset.eq_ignore_ascii_case("USDC") {
                continue;
            }
            if let Some((price, pct_change_24h)) = self.fetch(asset) {
                self.cache.insert(
                    asset.clone(),
                    CachedQuote {
                        price,
                        timestamp: Utc::now(),
                        pct_change_24h,
                    },
                );
                updated += 1;
            }
        }
        if updated > 0 {
            self.persist();
        }
        updated
    }

    /// Drop every cached quote and persist the empty cache.
    pub fn clear(&mut self) -> Result<()> {
        self.cache.clear();
        self.save()
    }

    fn fetch(&self, asset: &str) -> Option<(f64, Option<f64>)> {
        let coin_id = coingecko_id(asset);
        debug!(asset, %coin_id, "querying spot price");
        let response = self
            .client
            .get(COINGECKO_API_URL)
            .timeout(std::time::Duration::from_secs(5))
            .query(&[
                ("ids", coin_id.as_str()),
                ("vs_currencies", "usd"),
                ("include_24hr_change", "true"),
            ])
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json::<HashMap<String, HashMap<String, f64>>>());
        let body = match response {
            Ok(body) => body,
            Err(err) => {
                warn!(asset, %err, "price query failed");
                return None;
            }
        };
        let entry = body.get(&coin_id)?;
        let price = *entry.get("usd")?;
        let pct_change_24h = entry.get("usd_24h_change").copied();
        debug!(asset, price, "price query succeeded");
        Some((price, pct_change_24h))
    }

    fn save(&self) -> Result<()> {
        let file = File::create(&self.cache_path)?;
        serde_json::to_writer_pretty(file, &self.cache)?;
        Ok(())
    }

    fn persist(&self) {
        if let Err(err) = self.save() {
            warn!(%err, "could not persist the price cache");
        }
    }
}

fn load_cache(path: &Path) -> HashMap<String, CachedQuote> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(_) => return HashMap::new(),
    };
    match serde_json::from_reader(file) {
        Ok(cache) => cache,
        Err(err) => {
            warn!(%err, "price cache unreadable, starting empty");
            HashMap::new()
        }
    }
}
