//! Device module
//!
//! Execution backends behind the `TraceDevice` trait.

mod trace_device;
mod cpu_device;
#[cfg(feature = "parallel")]
mod parallel_device;

#[cfg(test)]
pub(crate) mod mock_device;

use std::sync::Arc;
use crate::config::ContextKind;

pub use trace_device::TraceDevice;
pub use cpu_device::CpuDevice;
#[cfg(feature = "parallel")]
pub use parallel_device::ParallelDevice;

/// Device for an execution context
///
/// `Accelerated` falls back to the serial CPU device when the crate is built
/// without the `parallel` feature.
pub fn create_device(kind: ContextKind) -> Arc<dyn TraceDevice> {
    match kind {
        ContextKind::Cpu => Arc::new(CpuDevice::new()),
        #[cfg(feature = "parallel")]
        ContextKind::Accelerated => Arc::new(ParallelDevice::new()),
        #[cfg(not(feature = "parallel"))]
        ContextKind::Accelerated => {
            crate::engine_warn!("sensortrace::device",
                "Accelerated context requested without the 'parallel' feature, using CPU");
            Arc::new(CpuDevice::new())
        }
    }
}
