/// Application configuration module
use std::env;
use tracing::warn;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub catalog_path: String,
    pub cost_overrides: CostOverrides,
}

/// Optional replacements for the seed file's global cost parameters
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CostOverrides {
    pub fuel_price_per_liter: Option<f64>,
    pub navigation_charge_per_km: Option<f64>,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let catalog_path =
            env::var("CATALOG_PATH").unwrap_or_else(|_| "data/catalog.json".to_string());

        let cost_overrides = CostOverrides {
            fuel_price_per_liter: env_f64("FUEL_PRICE_PER_LITER"),
            navigation_charge_per_km: env_f64("NAVIGATION_CHARGE_PER_KM"),
        };

        Ok(Self {
            bind_addr,
            catalog_path,
            cost_overrides,
        })
    }
}

fn env_f64(key: &str) -> Option<f64> {
    let raw = env::var(key).ok()?;
    parse_non_negative(&raw).or_else(|| {
        warn!("ignoring {}={:?}: expected a non-negative number", key, raw);
        None
    })
}

fn parse_non_negative(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}
