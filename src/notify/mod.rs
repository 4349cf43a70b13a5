//! User-facing failure notifications
//!
//! The session core hands an `Alert` to an `AlertSink` and never looks at
//! what happens to it.

mod alert_log;

pub use alert_log::AlertLog;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Link rendered after an alert's description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertLink {
    pub label: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub title: String,
    pub description: String,
    pub link: Option<AlertLink>,
}

impl Alert {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            link: None,
        }
    }

    pub fn with_link(mut self, label: impl Into<String>, href: impl Into<String>) -> Self {
        self.link = Some(AlertLink {
            label: label.into(),
            href: href.into(),
        });
        self
    }
}

/// Fire-and-forget receiver of alerts
pub trait AlertSink: Send + Sync {
    fn notify(&self, alert: Alert);
}

/// Writes alerts to the log and nowhere else
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn notify(&self, alert: Alert) {
        warn!("{}: {}", alert.title, alert.description);
    }
}
