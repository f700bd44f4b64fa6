//! Sample pipeline: history, alerts, notification, rankings and render
//! instructions for whatever display sits behind a [`RenderSink`].

use chrono::{DateTime, Local};

use crate::alerts::{AlertEvaluator, AlertLog, Tier};
use crate::connection::ConnectionState;
use crate::history::{MetricsHistory, Series};
use crate::notify::{Notifier, Tone};
use crate::processes::{self, ProcSortBy};
use crate::types::{Alert, AlertHistory, AlertType, MetricSample, ProcessInfo, SystemInfo};
use crate::ui::util::human;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Status,
    LastUpdate,
    Version,
    Host,
    CpuUsage,
    CpuDetails,
    MemoryUsage,
    MemoryDetails,
    DiskUsage,
    DiskDetails,
    Network,
    AlertSummary,
    Notice,
}

pub trait RenderSink {
    fn render(&mut self, field: Field, value: String);
}

/// What one sample produced, mostly for callers that want to react beyond
/// the sink (and for tests).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SampleOutcome {
    pub alerts: Vec<Alert>,
    pub tone: Option<Tone>,
    pub server_alerts: bool,
}

pub struct Monitor {
    history: MetricsHistory,
    evaluator: AlertEvaluator,
    alert_log: AlertLog,
    last_sample: Option<MetricSample>,
    last_update: Option<DateTime<Local>>,
    state: ConnectionState,
    sort_by: ProcSortBy,
    ranked: Vec<ProcessInfo>,
    process_count: usize,
}

impl Monitor {
    pub fn new(history: MetricsHistory, evaluator: AlertEvaluator) -> Self {
        Self {
            history,
            evaluator,
            alert_log: AlertLog::default(),
            last_sample: None,
            last_update: None,
            state: ConnectionState::Connecting,
            sort_by: ProcSortBy::default(),
            ranked: Vec::new(),
            process_count: 0,
        }
    }

    pub fn history(&self) -> &MetricsHistory {
        &self.history
    }

    pub fn evaluator(&self) -> &AlertEvaluator {
        &self.evaluator
    }

    pub fn alert_log(&self) -> &AlertLog {
        &self.alert_log
    }

    pub fn last_sample(&self) -> Option<&MetricSample> {
        self.last_sample.as_ref()
    }

    pub fn last_update(&self) -> Option<DateTime<Local>> {
        self.last_update
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn sort_by(&self) -> ProcSortBy {
        self.sort_by
    }

    pub fn ranked_processes(&self) -> &[ProcessInfo] {
        &self.ranked
    }

    pub fn process_count(&self) -> usize {
        self.process_count
    }

    pub fn apply_state(&mut self, state: ConnectionState, sink: &mut dyn RenderSink) {
        if state != self.state {
            tracing::debug!(from = %self.state, to = %state, "connection state");
        }
        self.state = state;
        sink.render(Field::Status, state.label().to_string());
    }

    pub fn apply_sample(
        &mut self,
        mut sample: MetricSample,
        sink: &mut dyn RenderSink,
        notifier: &mut dyn Notifier,
    ) -> SampleOutcome {
        if let Some(cpu) = &sample.cpu {
            self.history.append(Series::Cpu, cpu.usage);
            sink.render(Field::CpuUsage, format!("{:.1}%", cpu.usage));
            sink.render(
                Field::CpuDetails,
                format!("{} cores | Load: {:.2}", cpu.cores, cpu.load1),
            );
        }
        if let Some(mem) = &sample.memory {
            self.history.append(Series::Memory, mem.usage);
            sink.render(Field::MemoryUsage, format!("{:.1}%", mem.usage));
            sink.render(
                Field::MemoryDetails,
                format!("{} / {}", human(mem.used), human(mem.total)),
            );
        }
        if let Some(disk) = &sample.disk {
            self.history.append(Series::Disk, disk.usage);
            sink.render(Field::DiskUsage, format!("{:.1}%", disk.usage));
            sink.render(
                Field::DiskDetails,
                format!("{} / {}", human(disk.used), human(disk.total)),
            );
        }
        if let Some(net) = &sample.network {
            self.history.append(Series::NetDownload, net.current_download);
            self.history.append(Series::NetUpload, net.current_upload);
            let online = if net.is_online { "online" } else { "offline" };
            sink.render(
                Field::Network,
                format!(
                    "down {:.1} KB/s | up {:.1} KB/s | ping {:.0} ms | {online}",
                    net.current_download, net.current_upload, net.ping
                ),
            );
        }
        if let Some(sys) = &sample.system {
            sink.render(Field::Host, host_line(sys));
        }
        if let Some(procs) = &sample.processes {
            self.process_count = procs.len();
            self.ranked = processes::ranked(procs, self.sort_by);
        }

        // Server-computed alerts win when the backend sends them.
        let server_alerts = sample.alerts.is_some();
        let batch = match sample.alerts.take() {
            Some(alerts) => alerts,
            None => self.evaluator.evaluate(&sample),
        };
        for kind in AlertType::ALL {
            if let Some(v) = sample.usage(kind) {
                if self.evaluator.tier(kind, v) == Tier::Normal {
                    self.alert_log.resolve(kind);
                }
            }
        }
        self.alert_log.record(&batch);
        let tone = self.evaluator.notification_for(&batch);
        if let Some(t) = tone {
            notifier.play(t);
        }
        self.render_alert_summary(sink);

        let now = Local::now();
        self.last_update = Some(now);
        sink.render(Field::LastUpdate, now.format("%H:%M:%S").to_string());

        self.merge_last(sample);
        SampleOutcome {
            alerts: batch,
            tone,
            server_alerts,
        }
    }

    // Facets missing from this tick keep their previous value.
    fn merge_last(&mut self, mut m: MetricSample) {
        if let Some(prev) = self.last_sample.take() {
            m.cpu = m.cpu.or(prev.cpu);
            m.memory = m.memory.or(prev.memory);
            m.disk = m.disk.or(prev.disk);
            m.system = m.system.or(prev.system);
            m.network = m.network.or(prev.network);
            m.processes = m.processes.or(prev.processes);
        }
        self.last_sample = Some(m);
    }

    pub fn set_sort(&mut self, by: ProcSortBy) {
        self.sort_by = by;
        if let Some(procs) = self.last_sample.as_ref().and_then(|s| s.processes.as_ref()) {
            self.ranked = processes::ranked(procs, by);
        }
    }

    pub fn replace_alert_history(&mut self, history: AlertHistory, sink: &mut dyn RenderSink) {
        self.alert_log.replace(history);
        self.render_alert_summary(sink);
    }

    pub fn clear_alerts(&mut self, sink: &mut dyn RenderSink) {
        self.alert_log.clear();
        self.render_alert_summary(sink);
    }

    fn render_alert_summary(&self, sink: &mut dyn RenderSink) {
        let s = self.alert_log.stats();
        sink.render(
            Field::AlertSummary,
            format!(
                "total {} | active {} | today {}",
                s.total_alerts, s.active_alerts, s.today_alerts
            ),
        );
    }
}

fn host_line(sys: &SystemInfo) -> String {
    let up = sys.uptime;
    format!(
        "{} ({} {}) up {}d {}h {}m",
        sys.hostname,
        sys.os,
        sys.platform,
        up / 86_400,
        (up % 86_400) / 3600,
        (up % 3600) / 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{ConfigHandle, DEFAULT_CRITICAL_MARGIN};
    use crate::types::{AlertConfig, AlertLevel, CpuInfo, MemInfo, ProcessInfo};
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct Recorder(BTreeMap<Field, String>);
    impl RenderSink for Recorder {
        fn render(&mut self, field: Field, value: String) {
            self.0.insert(field, value);
        }
    }

    #[derive(Default)]
    struct Tones(Vec<Tone>);
    impl Notifier for Tones {
        fn play(&mut self, tone: Tone) {
            self.0.push(tone);
        }
    }

    fn monitor(cfg: AlertConfig) -> (Monitor, ConfigHandle) {
        let handle = ConfigHandle::new(cfg);
        let m = Monitor::new(MetricsHistory::new(3), handle.evaluator(DEFAULT_CRITICAL_MARGIN));
        (m, handle)
    }

    fn cpu_sample(usage: f64) -> MetricSample {
        MetricSample {
            cpu: Some(CpuInfo { usage, cores: 4, load1: 0.5, ..Default::default() }),
            ..Default::default()
        }
    }

    fn server_alert(level: AlertLevel) -> Alert {
        Alert {
            id: None,
            kind: AlertType::Ram,
            level,
            message: "ram".into(),
            value: 0.0,
            threshold: 80.0,
            timestamp: chrono::Utc::now(),
            active: true,
        }
    }

    #[test]
    fn sample_feeds_history_and_sink() {
        let (mut m, _h) = monitor(AlertConfig::default());
        let mut sink = Recorder::default();
        let mut tones = Tones::default();
        for v in [10.0, 20.0, 30.0, 40.0] {
            m.apply_sample(cpu_sample(v), &mut sink, &mut tones);
        }
        assert_eq!(m.history().snapshot(Series::Cpu), vec![20.0, 30.0, 40.0]);
        assert_eq!(m.history().len(Series::Memory), 0);
        assert_eq!(sink.0.get(&Field::CpuUsage).map(String::as_str), Some("40.0%"));
        assert_eq!(
            sink.0.get(&Field::CpuDetails).map(String::as_str),
            Some("4 cores | Load: 0.50")
        );
        assert!(sink.0.contains_key(&Field::LastUpdate));
        assert!(tones.0.is_empty());
    }

    #[test]
    fn local_evaluation_rings_once() {
        let (mut m, _h) = monitor(AlertConfig::default());
        let mut sink = Recorder::default();
        let mut tones = Tones::default();
        let s = MetricSample {
            cpu: Some(CpuInfo { usage: 99.0, ..Default::default() }),
            memory: Some(MemInfo { usage: 80.0, ..Default::default() }),
            ..Default::default()
        };
        let out = m.apply_sample(s, &mut sink, &mut tones);
        assert!(!out.server_alerts);
        assert_eq!(out.alerts.len(), 2);
        assert_eq!(tones.0, vec![Tone::CRITICAL]);
        assert_eq!(m.alert_log().len(), 2);
    }

    #[test]
    fn server_alerts_take_precedence() {
        let (mut m, _h) = monitor(AlertConfig::default());
        let mut sink = Recorder::default();
        let mut tones = Tones::default();
        // Local evaluation would flag cpu critical; the server says warning only.
        let mut s = cpu_sample(99.0);
        s.alerts = Some(vec![server_alert(AlertLevel::Warning)]);
        let out = m.apply_sample(s, &mut sink, &mut tones);
        assert!(out.server_alerts);
        assert_eq!(out.alerts.len(), 1);
        assert_eq!(tones.0, vec![Tone::WARNING]);

        // An explicit empty list means "no alerts", not "evaluate locally".
        let mut s = cpu_sample(99.0);
        s.alerts = Some(vec![]);
        let out = m.apply_sample(s, &mut sink, &mut tones);
        assert!(out.alerts.is_empty());
        assert_eq!(tones.0.len(), 1);
    }

    #[test]
    fn disabled_alerts_are_silent_even_from_server() {
        let (mut m, handle) = monitor(AlertConfig::default());
        handle.update(|c| c.enabled = false);
        let mut sink = Recorder::default();
        let mut tones = Tones::default();
        let mut s = cpu_sample(50.0);
        s.alerts = Some(vec![server_alert(AlertLevel::Critical)]);
        let out = m.apply_sample(s, &mut sink, &mut tones);
        assert_eq!(out.tone, None);
        assert!(tones.0.is_empty());
    }

    #[test]
    fn recovery_resolves_active_alerts() {
        let (mut m, _h) = monitor(AlertConfig::default());
        let mut sink = Recorder::default();
        let mut tones = Tones::default();
        m.apply_sample(cpu_sample(90.0), &mut sink, &mut tones);
        assert_eq!(m.alert_log().stats().active_alerts, 1);
        m.apply_sample(cpu_sample(10.0), &mut sink, &mut tones);
        assert_eq!(m.alert_log().stats().active_alerts, 0);
        assert_eq!(m.alert_log().stats().total_alerts, 1);
    }

    #[test]
    fn missing_facets_keep_previous_values() {
        let (mut m, _h) = monitor(AlertConfig::default());
        let mut sink = Recorder::default();
        let mut tones = Tones::default();
        let mut first = cpu_sample(10.0);
        first.processes = Some(vec![
            ProcessInfo { pid: 1, cpu_percent: Some(1.0), memory_percent: Some(9.0), ..Default::default() },
            ProcessInfo { pid: 2, cpu_percent: Some(5.0), memory_percent: Some(2.0), ..Default::default() },
        ]);
        m.apply_sample(first, &mut sink, &mut tones);
        m.apply_sample(
            MetricSample {
                memory: Some(MemInfo { usage: 33.0, ..Default::default() }),
                ..Default::default()
            },
            &mut sink,
            &mut tones,
        );
        let last = m.last_sample().unwrap();
        assert_eq!(last.cpu.as_ref().map(|c| c.usage), Some(10.0));
        assert_eq!(last.memory.as_ref().map(|c| c.usage), Some(33.0));
        assert_eq!(m.ranked_processes()[0].pid, 2);
        m.set_sort(ProcSortBy::MemDesc);
        assert_eq!(m.ranked_processes()[0].pid, 1);
        assert_eq!(m.process_count(), 2);
    }

    #[test]
    fn state_is_rendered_as_label() {
        let (mut m, _h) = monitor(AlertConfig::default());
        let mut sink = Recorder::default();
        m.apply_state(ConnectionState::Reconnecting, &mut sink);
        assert_eq!(m.state(), ConnectionState::Reconnecting);
        assert_eq!(sink.0.get(&Field::Status).map(String::as_str), Some("reconnecting"));
    }
}
