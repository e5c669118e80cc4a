/*!
# SensorTrace

Batched ray casting for simulated range sensors (lidar-like devices).

A host application owns the visual scene and pushes its meshes, transforms
and enabled flags into a [`Scene`](scene::Scene). Sensors are turned into
structured ray batches, traced against a two-level BVH, and the hit
positions come back through generational result handles that the host
releases when done.

## Architecture

- **Engine**: process-wide configuration (execution context, buffer
  residency, limits) and the swappable logger
- **GeometryStore**: immutable object models with their bottom-level BVH
- **InstanceTable**: per-instance model, transform and enabled flag
- **AccelerationManager**: rebuilds the top-level index when the table changed
- **RayGenerator**: sensor parameters to deterministic ray batches
- **TraceDevice**: serial CPU or data-parallel (rayon) execution
- **ResultRegistry**: owns hit buffers until their handle is released
- **HostSession**: the nine host boundary operations
*/

// Internal modules
mod error;
mod engine;
mod config;
mod math;
pub mod log;
pub mod accel;
pub mod device;
pub mod geometry;
pub mod host;
pub mod result;
pub mod scene;
pub mod sensor;

// Main sensortrace namespace module
pub mod sensortrace {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton and configuration
    pub use crate::engine::Engine;
    pub use crate::config::{BufferResidency, ContextKind, EngineConfig};

    // Scene context and host boundary
    pub use crate::scene::{FireResult, Scene, TraceStats, MISS_POSITION};
    pub use crate::host::HostSession;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger, MemoryLogger};
        pub use crate::engine::DEFAULT_MIN_SEVERITY;
    }

    // Geometry sub-module
    pub mod geometry {
        pub use crate::geometry::*;
    }

    // Sensor sub-module
    pub mod sensor {
        pub use crate::sensor::*;
    }

    // Result sub-module
    pub mod result {
        pub use crate::result::*;
    }

    // Device sub-module
    pub mod device {
        pub use crate::device::*;
    }

    // Math helpers (4x4 narrowing, quaternion rotation)
    pub mod math {
        pub use crate::math::*;
    }
}

// Re-export math library at crate root
pub use glam;
