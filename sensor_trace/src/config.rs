/// Engine configuration
///
/// Chosen once at process start through `Engine::initialize`. The context
/// kind and buffer residency cannot change while the engine is initialized.

use crate::log::LogSeverity;

/// Where batched traces execute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    /// Serial tracing on the calling thread
    Cpu,
    /// Data-parallel tracing across rays (falls back to `Cpu` without the
    /// `parallel` feature)
    Accelerated,
}

/// Where result buffers live after a fire call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferResidency {
    /// Positions can be viewed in place through the result handle
    HostVisible,
    /// Positions must be copied out with `read_back`
    DeviceOnly,
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Execution context for batched traces
    pub context: ContextKind,
    /// Residency of fire-and-return-positions result buffers
    pub residency: BufferResidency,
    /// Upper bound on the rays a single sensor may generate
    pub max_rays_per_sensor: usize,
    /// Maximum primitives per BVH leaf (triangles or instances)
    pub bvh_leaf_size: usize,
    /// Entries below this severity are discarded before reaching the logger
    pub min_log_severity: LogSeverity,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            context: ContextKind::Cpu,
            residency: BufferResidency::HostVisible,
            max_rays_per_sensor: 4_000_000,
            bvh_leaf_size: 4,
            min_log_severity: if cfg!(debug_assertions) {
                LogSeverity::Debug
            } else {
                LogSeverity::Info
            },
        }
    }
}

impl EngineConfig {
    /// Configuration for data-parallel tracing with host-visible results
    pub fn accelerated() -> Self {
        Self {
            context: ContextKind::Accelerated,
            ..Self::default()
        }
    }

    /// Check the numeric limits
    pub(crate) fn validate(&self) -> crate::error::Result<()> {
        if self.max_rays_per_sensor == 0 {
            crate::engine_bail!("sensortrace::EngineConfig", InitializationFailed,
                "max_rays_per_sensor must be at least 1");
        }
        if self.bvh_leaf_size == 0 {
            crate::engine_bail!("sensortrace::EngineConfig", InitializationFailed,
                "bvh_leaf_size must be at least 1");
        }
        Ok(())
    }
}
