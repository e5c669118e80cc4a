/// Mock TraceDevice for unit tests
///
/// Wraps the CPU device and fails builds or traces on demand, counting the
/// calls it receives.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use crate::accel::aabb::Aabb;
use crate::accel::acceleration_index::AccelerationIndex;
use crate::accel::bvh::Bvh;
use crate::config::ContextKind;
use crate::error::{Error, Result};
use crate::sensor::{Hit, Ray};
use super::cpu_device::CpuDevice;
use super::trace_device::TraceDevice;

#[derive(Debug, Default)]
pub struct FailingDevice {
    inner: CpuDevice,
    fail_builds: AtomicBool,
    fail_traces: AtomicBool,
    builds: AtomicUsize,
    traces: AtomicUsize,
}

impl FailingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_builds(&self, fail: bool) {
        self.fail_builds.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_traces(&self, fail: bool) {
        self.fail_traces.store(fail, Ordering::SeqCst);
    }

    pub fn build_calls(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn trace_calls(&self) -> usize {
        self.traces.load(Ordering::SeqCst)
    }
}

impl TraceDevice for FailingDevice {
    fn name(&self) -> &str {
        "failing mock"
    }

    fn kind(&self) -> ContextKind {
        ContextKind::Cpu
    }

    fn build_bvh(&self, bounds: &[Aabb], leaf_size: usize) -> Result<Bvh> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if self.fail_builds.load(Ordering::SeqCst) {
            return Err(Error::DeviceError("injected build failure".to_string()));
        }
        self.inner.build_bvh(bounds, leaf_size)
    }

    fn trace_nearest(&self, index: &AccelerationIndex, rays: &[Ray]) -> Result<Vec<Option<Hit>>> {
        self.traces.fetch_add(1, Ordering::SeqCst);
        if self.fail_traces.load(Ordering::SeqCst) {
            return Err(Error::OutOfMemory);
        }
        self.inner.trace_nearest(index, rays)
    }
}
