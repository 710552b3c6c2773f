//! Metrics Collection
//!
//! Counters for distribution runs and individual transfers. In-memory only,
//! reset on restart.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::types::DistributionReport;

/// Metrics collector for the reward bot
#[derive(Default)]
pub struct Metrics {
    /// Start time for uptime calculation
    start_time: Option<Instant>,

    /// `/distribute` calls received
    pub distributions_triggered: AtomicU64,

    /// `/distribute` calls answered with an error
    pub distributions_failed: AtomicU64,

    /// Transfers that went through
    pub transfers_sent: AtomicU64,

    /// Transfers attempted and failed
    pub transfers_failed: AtomicU64,

    /// Recipients passed over (below minimum or unfunded)
    pub recipients_skipped: AtomicU64,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0)
    }

    pub fn inc_distributions_triggered(&self) {
        self.distributions_triggered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_distributions_failed(&self) {
        self.distributions_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Fold one run's counts into the totals
    pub fn record(&self, report: &DistributionReport) {
        self.transfers_sent.fetch_add(report.sent as u64, Ordering::Relaxed);
        self.transfers_failed.fetch_add(report.failed as u64, Ordering::Relaxed);
        self.recipients_skipped.fetch_add(report.skipped as u64, Ordering::Relaxed);
    }

    /// Export metrics in Prometheus format
    pub fn to_prometheus(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "# HELP reward_bot_uptime_seconds Reward bot uptime in seconds\n\
             # TYPE reward_bot_uptime_seconds gauge\n\
             reward_bot_uptime_seconds {}\n\n",
            self.uptime_secs()
        ));

        let counters = [
            ("distributions_total", "Distribution runs triggered", &self.distributions_triggered),
            ("distributions_failed", "Distribution runs that returned an error", &self.distributions_failed),
            ("transfers_sent", "Reward transfers completed", &self.transfers_sent),
            ("transfers_failed", "Reward transfers that failed", &self.transfers_failed),
            ("recipients_skipped", "Recipients not paid", &self.recipients_skipped),
        ];

        for (name, help, value) in counters {
            output.push_str(&format!(
                "# HELP reward_bot_{name} {help}\n\
                 # TYPE reward_bot_{name} counter\n\
                 reward_bot_{name} {}\n\n",
                value.load(Ordering::Relaxed)
            ));
        }

        output
    }

    /// Export metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "uptime_secs": self.uptime_secs(),
            "distributions": {
                "triggered": self.distributions_triggered.load(Ordering::Relaxed),
                "failed": self.distributions_failed.load(Ordering::Relaxed),
            },
            "transfers": {
                "sent": self.transfers_sent.load(Ordering::Relaxed),
                "failed": self.transfers_failed.load(Ordering::Relaxed),
            },
            "recipients_skipped": self.recipients_skipped.load(Ordering::Relaxed),
        })
    }
}
