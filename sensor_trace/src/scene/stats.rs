//! Per-scene trace statistics

use std::time::Duration;

/// Counters accumulated by a scene since creation or the last reset
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TraceStats {
    /// Rays traced (batched and single)
    pub rays_traced: u64,
    /// Rays that hit something
    pub hits: u64,
    /// Successful acceleration index builds
    pub index_builds: u64,
    /// Transform-only updates applied by refitting the index in place
    pub index_refits: u64,
    /// Instances in the most recent index
    pub last_build_instances: usize,
    /// Wall time of the most recent index build or refit
    pub last_build_time: Duration,
}

impl TraceStats {
    pub(crate) fn record_trace(&mut self, rays: usize, hits: usize) {
        self.rays_traced += rays as u64;
        self.hits += hits as u64;
    }

    pub(crate) fn record_refit(&mut self, elapsed: Duration) {
        self.index_refits += 1;
        self.last_build_time = elapsed;
    }

    pub(crate) fn record_build(&mut self, instances: usize, elapsed: Duration) {
        self.index_builds += 1;
        self.last_build_instances = instances;
        self.last_build_time = elapsed;
    }
}
