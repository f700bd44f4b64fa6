//! Threshold classification, local alert generation and notification choice.
//!
//! The evaluator never caches thresholds: every call reads the latest
//! [`AlertConfig`] published through the [`ConfigHandle`], so edits made in
//! the settings surface take effect on the next sample.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::notify::Tone;
use crate::types::{Alert, AlertConfig, AlertHistory, AlertLevel, AlertStats, AlertType, MetricSample};

/// Distance between the configured (warning) threshold and the critical one.
pub const DEFAULT_CRITICAL_MARGIN: f64 = 10.0;
pub const ALERT_LOG_CAP: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Normal,
    Warning,
    Critical,
}

impl Tier {
    pub fn level(self) -> Option<AlertLevel> {
        match self {
            Tier::Normal => None,
            Tier::Warning => Some(AlertLevel::Warning),
            Tier::Critical => Some(AlertLevel::Critical),
        }
    }
}

/// Lower bounds are inclusive: `warning <= v < critical` is a warning.
pub fn classify(value: f64, warning: f64, critical: f64) -> Tier {
    if value >= critical {
        Tier::Critical
    } else if value >= warning {
        Tier::Warning
    } else {
        Tier::Normal
    }
}

/// Sender side of the live alert configuration.
#[derive(Debug)]
pub struct ConfigHandle {
    tx: watch::Sender<AlertConfig>,
}

impl ConfigHandle {
    pub fn new(initial: AlertConfig) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn current(&self) -> AlertConfig {
        *self.tx.borrow()
    }

    pub fn set(&self, cfg: AlertConfig) {
        // send_replace never fails, even with no live receivers
        self.tx.send_replace(cfg);
    }

    pub fn update(&self, f: impl FnOnce(&mut AlertConfig)) -> AlertConfig {
        self.tx.send_modify(f);
        self.current()
    }

    pub fn evaluator(&self, critical_margin: f64) -> AlertEvaluator {
        AlertEvaluator::new(self.tx.subscribe(), critical_margin)
    }
}

pub struct AlertEvaluator {
    config: watch::Receiver<AlertConfig>,
    critical_margin: f64,
}

impl AlertEvaluator {
    pub fn new(config: watch::Receiver<AlertConfig>, critical_margin: f64) -> Self {
        Self {
            config,
            critical_margin: critical_margin.max(0.1),
        }
    }

    pub fn config(&self) -> AlertConfig {
        *self.config.borrow()
    }

    pub fn enabled(&self) -> bool {
        self.config.borrow().enabled
    }

    /// Critical boundary for a warning threshold, capped at 100 unless the
    /// warning threshold already sits there.
    pub fn critical_threshold(&self, warning: f64) -> f64 {
        if warning < 100.0 {
            (warning + self.critical_margin).min(100.0)
        } else {
            warning + self.critical_margin
        }
    }

    pub fn tier(&self, kind: AlertType, value: f64) -> Tier {
        let warning = self.config().threshold(kind);
        classify(value, warning, self.critical_threshold(warning))
    }

    /// Alerts for every metric present in `sample` at warning or above.
    pub fn evaluate(&self, sample: &MetricSample) -> Vec<Alert> {
        let cfg = self.config();
        if !cfg.enabled {
            return Vec::new();
        }
        let now = sample.timestamp.unwrap_or_else(Utc::now);
        AlertType::ALL
            .iter()
            .filter_map(|&kind| {
                let value = sample.usage(kind)?;
                let threshold = cfg.threshold(kind);
                let level = classify(value, threshold, self.critical_threshold(threshold)).level()?;
                Some(make_alert(kind, level, value, threshold, now))
            })
            .collect()
    }

    /// At most one tone per batch; critical outranks warning.
    pub fn notification_for(&self, batch: &[Alert]) -> Option<Tone> {
        if !self.enabled() || batch.is_empty() {
            return None;
        }
        if batch.iter().any(|a| a.level == AlertLevel::Critical) {
            Some(Tone::CRITICAL)
        } else {
            Some(Tone::WARNING)
        }
    }
}

fn make_alert(
    kind: AlertType,
    level: AlertLevel,
    value: f64,
    threshold: f64,
    at: DateTime<Utc>,
) -> Alert {
    let metric = if kind == AlertType::Cpu { "Loading" } else { "Usage" };
    let level_txt = match level {
        AlertLevel::Warning => "warning",
        AlertLevel::Critical => "critical",
    };
    Alert {
        id: Some(format!("{}-{}", kind.label(), at.timestamp())),
        kind,
        level,
        message: format!(
            "[{}] {level_txt}: {metric} {value:.1}% (Threshold: {threshold:.1}%)",
            kind.label()
        ),
        value,
        threshold,
        timestamp: at,
        active: true,
    }
}

/// Recent alerts seen by this client, oldest first.
#[derive(Debug, Clone)]
pub struct AlertLog {
    alerts: VecDeque<Alert>,
    cap: usize,
}

impl AlertLog {
    pub fn new(cap: usize) -> Self {
        Self {
            alerts: VecDeque::with_capacity(cap),
            cap: cap.max(1),
        }
    }

    pub fn record(&mut self, batch: &[Alert]) {
        for a in batch {
            tracing::info!(kind = a.kind.label(), level = ?a.level, "{}", a.message.trim_end());
            crate::history::push_capped(&mut self.alerts, a.clone(), self.cap);
        }
    }

    /// Mark every alert of `kind` inactive once its metric is back under threshold.
    pub fn resolve(&mut self, kind: AlertType) {
        let mut resolved = false;
        for a in self.alerts.iter_mut().filter(|a| a.kind == kind && a.active) {
            a.active = false;
            resolved = true;
        }
        if resolved {
            tracing::debug!(kind = kind.label(), "alert resolved");
        }
    }

    /// Replace local state with the backend's stored history.
    pub fn replace(&mut self, history: AlertHistory) {
        self.alerts.clear();
        let skip = history.alerts.len().saturating_sub(self.cap);
        self.alerts.extend(history.alerts.into_iter().skip(skip));
    }

    pub fn clear(&mut self) {
        self.alerts.clear();
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn iter_newest_first(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter().rev()
    }

    pub fn stats(&self) -> AlertStats {
        self.stats_at(Utc::now())
    }

    pub fn stats_at(&self, now: DateTime<Utc>) -> AlertStats {
        let today = now.date_naive();
        AlertStats {
            total_alerts: self.alerts.len(),
            active_alerts: self.alerts.iter().filter(|a| a.active).count(),
            today_alerts: self
                .alerts
                .iter()
                .filter(|a| a.timestamp.date_naive() == today)
                .count(),
        }
    }
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new(ALERT_LOG_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CpuInfo, DiskInfo, MemInfo};
    use chrono::TimeZone;

    fn sample(cpu: f64, mem: f64, disk: f64) -> MetricSample {
        MetricSample {
            cpu: Some(CpuInfo { usage: cpu, ..Default::default() }),
            memory: Some(MemInfo { usage: mem, ..Default::default() }),
            disk: Some(DiskInfo { usage: disk, ..Default::default() }),
            ..Default::default()
        }
    }

    fn alert(level: AlertLevel) -> Alert {
        make_alert(AlertType::Cpu, level, 90.0, 80.0, Utc::now())
    }

    #[test]
    fn classification_boundaries() {
        assert_eq!(classify(79.9, 80.0, 95.0), Tier::Normal);
        assert_eq!(classify(80.0, 80.0, 95.0), Tier::Warning);
        assert_eq!(classify(94.9, 80.0, 95.0), Tier::Warning);
        assert_eq!(classify(95.0, 80.0, 95.0), Tier::Critical);
        assert_eq!(classify(100.0, 80.0, 95.0), Tier::Critical);
    }

    #[test]
    fn critical_threshold_uses_margin_and_cap() {
        let h = ConfigHandle::new(AlertConfig::default());
        let ev = h.evaluator(DEFAULT_CRITICAL_MARGIN);
        assert_eq!(ev.critical_threshold(80.0), 90.0);
        assert_eq!(ev.critical_threshold(95.0), 100.0);
        assert_eq!(ev.critical_threshold(100.0), 110.0);
    }

    #[test]
    fn evaluate_emits_one_alert_per_hot_metric() {
        let h = ConfigHandle::new(AlertConfig {
            enabled: true,
            cpu_threshold: 80.0,
            ram_threshold: 80.0,
            disk_threshold: 80.0,
        });
        let ev = h.evaluator(15.0);
        let alerts = ev.evaluate(&sample(79.9, 85.0, 95.0));
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].kind, AlertType::Ram);
        assert_eq!(alerts[0].level, AlertLevel::Warning);
        assert_eq!(alerts[1].kind, AlertType::Disk);
        assert_eq!(alerts[1].level, AlertLevel::Critical);
        assert!(alerts[1].message.starts_with("[DISK] critical"), "{}", alerts[1].message);
    }

    #[test]
    fn evaluate_skips_absent_facets() {
        let h = ConfigHandle::new(AlertConfig::default());
        let ev = h.evaluator(DEFAULT_CRITICAL_MARGIN);
        let s = MetricSample {
            cpu: Some(CpuInfo { usage: 99.0, ..Default::default() }),
            ..Default::default()
        };
        let alerts = ev.evaluate(&s);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertType::Cpu);
    }

    #[test]
    fn evaluator_sees_config_updates() {
        let h = ConfigHandle::new(AlertConfig::default());
        let ev = h.evaluator(DEFAULT_CRITICAL_MARGIN);
        assert_eq!(ev.tier(AlertType::Cpu, 70.0), Tier::Normal);
        h.update(|c| c.cpu_threshold = 60.0);
        assert_eq!(ev.tier(AlertType::Cpu, 70.0), Tier::Critical);
        h.update(|c| c.enabled = false);
        assert!(ev.evaluate(&sample(99.0, 99.0, 99.0)).is_empty());
    }

    #[test]
    fn critical_tone_wins_over_warning() {
        let h = ConfigHandle::new(AlertConfig::default());
        let ev = h.evaluator(DEFAULT_CRITICAL_MARGIN);
        let batch = vec![alert(AlertLevel::Warning), alert(AlertLevel::Critical)];
        assert_eq!(ev.notification_for(&batch), Some(Tone::CRITICAL));
        assert_eq!(
            ev.notification_for(&[alert(AlertLevel::Warning)]),
            Some(Tone::WARNING)
        );
        assert_eq!(ev.notification_for(&[]), None);
    }

    #[test]
    fn disabled_config_never_notifies() {
        let h = ConfigHandle::new(AlertConfig { enabled: false, ..Default::default() });
        let ev = h.evaluator(DEFAULT_CRITICAL_MARGIN);
        assert_eq!(ev.notification_for(&[alert(AlertLevel::Critical)]), None);
    }

    #[test]
    fn log_is_bounded_and_tracks_stats() {
        let mut log = AlertLog::new(3);
        let day = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let yesterday = Utc.with_ymd_and_hms(2024, 4, 30, 12, 0, 0).unwrap();
        let mut batch = Vec::new();
        for (i, at) in [yesterday, day, day, day].into_iter().enumerate() {
            let kind = if i % 2 == 0 { AlertType::Cpu } else { AlertType::Ram };
            batch.push(make_alert(kind, AlertLevel::Warning, 90.0, 80.0, at));
        }
        log.record(&batch);
        assert_eq!(log.len(), 3);
        log.resolve(AlertType::Ram);
        let stats = log.stats_at(day);
        assert_eq!(stats.total_alerts, 3);
        assert_eq!(stats.active_alerts, 1);
        assert_eq!(stats.today_alerts, 3);

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn replace_keeps_newest_entries() {
        let mut log = AlertLog::new(2);
        let history = AlertHistory {
            alerts: (0..4)
                .map(|i| make_alert(AlertType::Disk, AlertLevel::Warning, i as f64, 80.0, Utc::now()))
                .collect(),
            stats: AlertStats::default(),
        };
        log.replace(history);
        let values: Vec<f64> = log.iter_newest_first().map(|a| a.value).collect();
        assert_eq!(values, vec![3.0, 2.0]);
    }
}
