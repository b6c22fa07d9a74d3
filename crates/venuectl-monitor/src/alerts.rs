use chrono::{Duration as ChronoDuration, Utc};
use tokio::sync::Mutex;

use crate::types::Alert;

/// Append-only in-memory alert ring, purged by age (spec §3/§5). Guarded by
/// a single mutex — appends and the periodic purge are the only writers,
/// and neither is hot enough to warrant anything fancier.
#[derive(Default)]
pub struct AlertRing {
    alerts: Mutex<Vec<Alert>>,
}

impl AlertRing {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_all(&self, new_alerts: Vec<Alert>) {
        if new_alerts.is_empty() {
            return;
        }
        let mut guard = self.alerts.lock().await;
        guard.extend(new_alerts);
    }

    pub async fn all(&self) -> Vec<Alert> {
        self.alerts.lock().await.clone()
    }

    /// Prunes alerts older than `days`. Called periodically by the
    /// composition root, not by the sweep itself.
    pub async fn clear_old_alerts(&self, days: i64) {
        let cutoff = Utc::now() - ChronoDuration::days(days);
        let mut guard = self.alerts.lock().await;
        guard.retain(|a| a.timestamp >= cutoff);
    }
}

#[cfg(test)]
mod tests {
    use crate::types::{AlertKind, AlertLevel};

    use super::*;

    fn sample_alert(timestamp: chrono::DateTime<Utc>) -> Alert {
        Alert {
            timestamp,
            level: AlertLevel::Warning,
            kind: AlertKind::DeviceDown,
            device_ids: vec!["d1".to_string()],
            message: "d1 down".to_string(),
        }
    }

    #[tokio::test]
    async fn push_and_read_back() {
        let ring = AlertRing::new();
        ring.push_all(vec![sample_alert(Utc::now())]).await;
        assert_eq!(ring.all().await.len(), 1);
    }

    #[tokio::test]
    async fn clear_old_alerts_prunes_by_age() {
        let ring = AlertRing::new();
        let old = Utc::now() - ChronoDuration::days(10);
        ring.push_all(vec![sample_alert(old), sample_alert(Utc::now())]).await;
        ring.clear_old_alerts(1).await;
        assert_eq!(ring.all().await.len(), 1);
    }
}
