//! Top-N process rankings by CPU and memory share.

use std::cmp::Ordering;

use crate::types::ProcessInfo;

pub const TOP_N: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcSortBy {
    #[default]
    CpuDesc,
    MemDesc,
}

impl ProcSortBy {
    pub fn toggled(self) -> Self {
        match self {
            ProcSortBy::CpuDesc => ProcSortBy::MemDesc,
            ProcSortBy::MemDesc => ProcSortBy::CpuDesc,
        }
    }
}

/// Descending by `key`; processes without a usable value are left out.
/// `sort_by` is stable, so ties keep their arrival order.
fn rank<'a>(
    procs: &'a [ProcessInfo],
    key: impl Fn(&ProcessInfo) -> Option<f64>,
    n: usize,
) -> Vec<&'a ProcessInfo> {
    let mut ranked: Vec<(&ProcessInfo, f64)> = procs
        .iter()
        .filter_map(|p| key(p).filter(|v| !v.is_nan()).map(|v| (p, v)))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    ranked.truncate(n);
    ranked.into_iter().map(|(p, _)| p).collect()
}

pub fn top_by_cpu(procs: &[ProcessInfo]) -> Vec<&ProcessInfo> {
    rank(procs, |p| p.cpu_percent, TOP_N)
}

pub fn top_by_memory(procs: &[ProcessInfo]) -> Vec<&ProcessInfo> {
    rank(procs, |p| p.memory_percent, TOP_N)
}

/// Owned ranking for the given view, cached between samples.
pub fn ranked(procs: &[ProcessInfo], by: ProcSortBy) -> Vec<ProcessInfo> {
    let view = match by {
        ProcSortBy::CpuDesc => top_by_cpu(procs),
        ProcSortBy::MemDesc => top_by_memory(procs),
    };
    view.into_iter().cloned().collect()
}
