//! Types that mirror the backend's JSON schema.
//!
//! Every facet of a pushed sample is optional: a missing facet means
//! "no update for this facet this tick", not "zero".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct CpuInfo {
    pub usage: f64,
    pub cores: u32,
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct MemInfo {
    pub usage: f64,
    pub used: u64,
    pub total: u64,
    pub available: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct DiskInfo {
    pub usage: f64,
    pub used: u64,
    pub total: u64,
    pub free: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SystemInfo {
    pub hostname: String,
    pub os: String,
    pub platform: String,
    // seconds since boot
    pub uptime: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct NetworkStats {
    // KB/s as computed by the backend
    pub current_upload: f64,
    pub current_download: f64,
    // ms
    pub ping: f64,
    pub is_online: bool,
    pub local_ip: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct ProcessInfo {
    #[serde(default)]
    pub pid: i32,
    #[serde(default, rename = "process", alias = "name")]
    pub name: String,
    #[serde(default)]
    pub cpu_percent: Option<f64>,
    #[serde(default)]
    pub memory_percent: Option<f64>,
    #[serde(default)]
    pub memory_rss: Option<u64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub threads: Option<i32>,
    #[serde(default)]
    pub command_line: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AlertType {
    #[serde(rename = "cpu", alias = "CPU")]
    Cpu,
    #[serde(rename = "ram", alias = "RAM")]
    Ram,
    #[serde(rename = "disk", alias = "DISK")]
    Disk,
}

impl AlertType {
    pub const ALL: [AlertType; 3] = [AlertType::Cpu, AlertType::Ram, AlertType::Disk];

    pub fn label(self) -> &'static str {
        match self {
            AlertType::Cpu => "CPU",
            AlertType::Ram => "RAM",
            AlertType::Disk => "DISK",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
    Critical,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Alert {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: AlertType,
    pub level: AlertLevel,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// User-editable alert thresholds (percent). Each threshold is the warning
/// boundary for its metric.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct AlertConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cpu_threshold", alias = "cpu_treshold")]
    pub cpu_threshold: f64,
    #[serde(default = "default_ram_threshold", alias = "ram_treshold")]
    pub ram_threshold: f64,
    #[serde(default = "default_disk_threshold", alias = "disk_treshold")]
    pub disk_threshold: f64,
}

fn default_cpu_threshold() -> f64 {
    75.0
}
fn default_ram_threshold() -> f64 {
    75.0
}
fn default_disk_threshold() -> f64 {
    85.0
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cpu_threshold: default_cpu_threshold(),
            ram_threshold: default_ram_threshold(),
            disk_threshold: default_disk_threshold(),
        }
    }
}

impl AlertConfig {
    pub fn threshold(&self, kind: AlertType) -> f64 {
        match kind {
            AlertType::Cpu => self.cpu_threshold,
            AlertType::Ram => self.ram_threshold,
            AlertType::Disk => self.disk_threshold,
        }
    }

    /// Shift one threshold by `delta`, keeping it within 0..=100.
    pub fn adjust(&mut self, kind: AlertType, delta: f64) {
        let slot = match kind {
            AlertType::Cpu => &mut self.cpu_threshold,
            AlertType::Ram => &mut self.ram_threshold,
            AlertType::Disk => &mut self.disk_threshold,
        };
        *slot = (*slot + delta).clamp(0.0, 100.0);
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AlertStats {
    pub total_alerts: usize,
    pub active_alerts: usize,
    pub today_alerts: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AlertHistory {
    pub alerts: Vec<Alert>,
    pub stats: AlertStats,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct VersionInfo {
    pub version: String,
    #[serde(default)]
    pub service: Option<String>,
}

/// One telemetry push from the backend. Server-computed alerts ride along in
/// `alerts` when the backend evaluates thresholds itself.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct MetricSample {
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cpu: Option<CpuInfo>,
    #[serde(default)]
    pub memory: Option<MemInfo>,
    #[serde(default)]
    pub disk: Option<DiskInfo>,
    #[serde(default)]
    pub system: Option<SystemInfo>,
    #[serde(default)]
    pub network: Option<NetworkStats>,
    #[serde(default)]
    pub processes: Option<Vec<ProcessInfo>>,
    #[serde(default)]
    pub alerts: Option<Vec<Alert>>,
}

impl MetricSample {
    /// Usage percentage for the metric an alert type watches, if present.
    pub fn usage(&self, kind: AlertType) -> Option<f64> {
        match kind {
            AlertType::Cpu => self.cpu.as_ref().map(|c| c.usage),
            AlertType::Ram => self.memory.as_ref().map(|m| m.usage),
            AlertType::Disk => self.disk.as_ref().map(|d| d.usage),
        }
    }
}
