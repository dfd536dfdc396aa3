use anyhow::Result;
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub tracking: TrackingConfig,
    pub fetcher: FetcherConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    pub interval_secs: u64,
    pub max_concurrent_checks: usize,
    pub selector_batch_size: usize,
    pub cycle_timeout_secs: u64,
}

impl TrackingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.cycle_timeout_secs)
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 900,
            max_concurrent_checks: 4,
            selector_batch_size: 500,
            cycle_timeout_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 20,
            user_agent: concat!("flip-tracker/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub health_port: u16,
    pub log_level: String,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let tracking_defaults = TrackingConfig::default();
        let fetcher_defaults = FetcherConfig::default();

        Ok(Config {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "data/listings.db".to_string()),
            },
            tracking: TrackingConfig {
                interval_secs: env_or("TRACKING_INTERVAL_SECS", tracking_defaults.interval_secs)
                    .max(1),
                max_concurrent_checks: env_or(
                    "MAX_CONCURRENT_CHECKS",
                    tracking_defaults.max_concurrent_checks,
                )
                .max(1),
                selector_batch_size: env_or(
                    "SELECTOR_BATCH_SIZE",
                    tracking_defaults.selector_batch_size,
                )
                .max(1),
                cycle_timeout_secs: env_or(
                    "CYCLE_TIMEOUT_SECS",
                    tracking_defaults.cycle_timeout_secs,
                ),
            },
            fetcher: FetcherConfig {
                timeout_secs: env_or("FETCH_TIMEOUT_SECS", fetcher_defaults.timeout_secs),
                user_agent: env::var("FETCH_USER_AGENT").unwrap_or(fetcher_defaults.user_agent),
            },
            monitoring: MonitoringConfig {
                health_port: env_or("HEALTH_PORT", 3000),
                log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
        })
    }
}
