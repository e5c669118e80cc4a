//! Error types for SensorTrace
//!
//! This module defines the error type shared by every component:
//! geometry upload, instance table updates, sensor ray generation,
//! acceleration index builds and result handle access.

use std::fmt;

/// Result type for SensorTrace operations
pub type Result<T> = std::result::Result<T, Error>;

/// SensorTrace errors
///
/// Contract violations (`InvalidGeometry`, `SizeMismatch`, `IndexOutOfRange`,
/// `InvalidSensorParams`, `InvalidTransform`) are reported by the offending call
/// and leave the scene untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed mesh input (negative count, missing vertex array, bad index...)
    InvalidGeometry(String),

    /// Two related arrays disagree in length
    SizeMismatch(String),

    /// Sparse update index beyond the current instance count
    IndexOutOfRange {
        /// Offending index as supplied by the caller
        index: i64,
        /// Instance count at the time of the call
        count: usize,
    },

    /// Non-positive point spacing or degenerate sensor shape
    InvalidSensorParams(String),

    /// 4x4 matrix whose last row is not `[0, 0, 0, 1]`
    InvalidTransform(String),

    /// Result handle that is not currently live
    UnknownHandle(String),

    /// Result buffer lives in device memory and cannot be viewed directly
    BufferNotHostVisible,

    /// Trace device failure (build or intersect)
    DeviceError(String),

    /// Out of memory while building or tracing
    OutOfMemory,

    /// Initialization failed (engine configuration, scene creation)
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidGeometry(msg) => write!(f, "Invalid geometry: {}", msg),
            Error::SizeMismatch(msg) => write!(f, "Size mismatch: {}", msg),
            Error::IndexOutOfRange { index, count } => {
                write!(f, "Index out of range: {} (instance count {})", index, count)
            }
            Error::InvalidSensorParams(msg) => write!(f, "Invalid sensor parameters: {}", msg),
            Error::InvalidTransform(msg) => write!(f, "Invalid transform: {}", msg),
            Error::UnknownHandle(msg) => write!(f, "Unknown result handle: {}", msg),
            Error::BufferNotHostVisible => write!(f, "Result buffer is not host visible"),
            Error::DeviceError(msg) => write!(f, "Device error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of memory"),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Build an `Error` variant from a format string and log it at ERROR severity.
///
/// # Example
///
/// ```ignore
/// let err = engine_err!("sensortrace::GeometryStore", InvalidGeometry,
///     "mesh {} has {} vertices", index, count);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $variant:ident, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::sensortrace::Error::$variant(message)
    }};
}

/// Log and return an `Error` variant from the enclosing function.
///
/// # Example
///
/// ```ignore
/// engine_bail!("sensortrace::Sensor", InvalidSensorParams, "point gap must be > 0");
/// ```
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $variant:ident, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $variant, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
