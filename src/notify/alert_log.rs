use std::collections::VecDeque;
use std::sync::Mutex;

use super::{Alert, AlertSink, TracingAlertSink};

const DEFAULT_CAPACITY: usize = 32;

/// Keeps the most recent alerts in memory for the control API
#[derive(Debug)]
pub struct AlertLog {
    capacity: usize,
    alerts: Mutex<VecDeque<Alert>>,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            alerts: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Oldest first
    pub fn recent(&self) -> Vec<Alert> {
        self.alerts
            .lock()
            .map(|alerts| alerts.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl AlertSink for AlertLog {
    fn notify(&self, alert: Alert) {
        TracingAlertSink.notify(alert.clone());

        if let Ok(mut alerts) = self.alerts.lock() {
            if alerts.len() == self.capacity {
                alerts.pop_front();
            }
            alerts.push_back(alert);
        }
    }
}
