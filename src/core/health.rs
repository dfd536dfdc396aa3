use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentHealth,
    pub last_cycle: Option<CycleSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub database: bool,
    pub scheduler: bool,
    #[serde(flatten)]
    pub extra: HashMap<String, bool>,
}

impl ComponentHealth {
    pub fn get(&self, key: &str) -> Option<bool> {
        match key {
            "database" => Some(self.database),
            "scheduler" => Some(self.scheduler),
            _ => self.extra.get(key).copied(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleSummary {
    pub finished_at: DateTime<Utc>,
    pub succeeded: bool,
    pub checked: usize,
    pub status_changes: usize,
    pub price_changes: usize,
    pub errors: usize,
}

#[derive(Clone)]
pub struct HealthChecker {
    start_time: std::time::Instant,
    status: Arc<RwLock<ComponentHealth>>,
    last_cycle: Arc<RwLock<Option<CycleSummary>>>,
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthChecker {
    pub fn new() -> Self {
        Self {
            start_time: std::time::Instant::now(),
            status: Arc::new(RwLock::new(ComponentHealth {
                database: false,
                scheduler: false,
                extra: HashMap::new(),
            })),
            last_cycle: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn get_status(&self) -> HealthStatus {
        let components = self.status.read().await.clone();
        let last_cycle = self.last_cycle.read().await.clone();

        let cycle_ok = last_cycle.as_ref().map_or(true, |c| c.succeeded);
        HealthStatus {
            status: if components.database && components.scheduler && cycle_ok {
                "healthy".to_string()
            } else {
                "degraded".to_string()
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            components,
            last_cycle,
        }
    }

    pub async fn update_component(&self, component: &str, healthy: bool) {
        let mut status = self.status.write().await;
        match component {
            "database" => status.database = healthy,
            "scheduler" => status.scheduler = healthy,
            _ => {
                status.extra.insert(component.to_string(), healthy);
            }
        }
    }

    pub async fn record_cycle(&self, summary: CycleSummary) {
        *self.last_cycle.write().await = Some(summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_degraded_until_components_report() {
        let checker = HealthChecker::new();
        assert_eq!(checker.get_status().await.status, "degraded");

        checker.update_component("database", true).await;
        checker.update_component("scheduler", true).await;
        checker.update_component("fetcher", true).await;

        let status = checker.get_status().await;
        assert_eq!(status.status, "healthy");
        assert_eq!(status.components.get("fetcher"), Some(true));
    }

    #[tokio::test]
    async fn test_failed_cycle_degrades_status() {
        let checker = HealthChecker::new();
        checker.update_component("database", true).await;
        checker.update_component("scheduler", true).await;
        checker
            .record_cycle(CycleSummary {
                finished_at: Utc::now(),
                succeeded: false,
                checked: 0,
                status_changes: 0,
                price_changes: 0,
                errors: 0,
            })
            .await;

        assert_eq!(checker.get_status().await.status, "degraded");
    }
}
