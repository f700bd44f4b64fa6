//! Bounded history buffers for charts.

use std::collections::VecDeque;

pub const DEFAULT_CAPACITY: usize = 60;

pub fn push_capped<T>(dq: &mut VecDeque<T>, v: T, cap: usize) {
    if cap == 0 {
        return;
    }
    while dq.len() >= cap {
        dq.pop_front();
    }
    dq.push_back(v);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Series {
    Cpu,
    Memory,
    Disk,
    NetDownload,
    NetUpload,
}

impl Series {
    fn index(self) -> usize {
        match self {
            Series::Cpu => 0,
            Series::Memory => 1,
            Series::Disk => 2,
            Series::NetDownload => 3,
            Series::NetUpload => 4,
        }
    }
}

/// Rolling window per series; oldest first, never longer than `cap`.
#[derive(Debug, Clone)]
pub struct MetricsHistory {
    deques: [VecDeque<f64>; 5],
    cap: usize,
}

impl MetricsHistory {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            deques: std::array::from_fn(|_| VecDeque::with_capacity(cap)),
            cap,
        }
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn append(&mut self, series: Series, value: f64) {
        push_capped(&mut self.deques[series.index()], value, self.cap);
    }

    // Owned copy so renderers never observe later appends
    pub fn snapshot(&self, series: Series) -> Vec<f64> {
        self.deques[series.index()].iter().copied().collect()
    }

    pub fn len(&self, series: Series) -> usize {
        self.deques[series.index()].len()
    }

    pub fn latest(&self, series: Series) -> Option<f64> {
        self.deques[series.index()].back().copied()
    }

    pub fn peak(&self, series: Series) -> f64 {
        self.deques[series.index()]
            .iter()
            .copied()
            .fold(0.0_f64, f64::max)
    }
}

impl Default for MetricsHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_is_min_of_appends_and_capacity() {
        for cap in [1usize, 3, 30] {
            for n in [0usize, 1, 2, 3, 29, 30, 31, 100] {
                let mut h = MetricsHistory::new(cap);
                for i in 0..n {
                    h.append(Series::Cpu, i as f64);
                }
                assert_eq!(h.len(Series::Cpu), n.min(cap), "cap={cap} n={n}");
                let expected: Vec<f64> = (n.saturating_sub(cap)..n).map(|i| i as f64).collect();
                assert_eq!(h.snapshot(Series::Cpu), expected, "cap={cap} n={n}");
            }
        }
    }

    #[test]
    fn series_are_independent() {
        let mut h = MetricsHistory::new(2);
        h.append(Series::Memory, 10.0);
        h.append(Series::Disk, 20.0);
        h.append(Series::Disk, 30.0);
        h.append(Series::Disk, 40.0);
        assert_eq!(h.snapshot(Series::Memory), vec![10.0]);
        assert_eq!(h.snapshot(Series::Disk), vec![30.0, 40.0]);
        assert_eq!(h.len(Series::Cpu), 0);
        assert_eq!(h.latest(Series::Disk), Some(40.0));
    }

    #[test]
    fn snapshot_is_detached() {
        let mut h = MetricsHistory::new(4);
        h.append(Series::Cpu, 1.0);
        let snap = h.snapshot(Series::Cpu);
        h.append(Series::Cpu, 2.0);
        assert_eq!(snap, vec![1.0]);
        assert_eq!(h.len(Series::Cpu), 2);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut h = MetricsHistory::new(0);
        h.append(Series::NetUpload, 5.0);
        h.append(Series::NetUpload, 6.0);
        assert_eq!(h.capacity(), 1);
        assert_eq!(h.snapshot(Series::NetUpload), vec![6.0]);
    }
}
