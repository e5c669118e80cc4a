/// SensorTrace Engine - process-wide configuration and logging
///
/// The engine holds the only process-wide state of the crate: the
/// configuration chosen at start-up (execution context, buffer residency,
/// limits) and the active logger. Scenes are explicit context objects
/// created from that configuration and owned by the host.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;
use crate::config::EngineConfig;
use crate::device;
use crate::error::Result;
use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
use crate::scene::Scene;

// ===== INTERNAL STATE =====

/// Global engine state storage
static ENGINE_STATE: OnceLock<EngineState> = OnceLock::new();

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Severity filter in effect outside `initialize`/`shutdown`
pub const DEFAULT_MIN_SEVERITY: LogSeverity = LogSeverity::Info;

/// Minimum severity forwarded to the logger (LogSeverity as u8)
static MIN_SEVERITY: AtomicU8 = AtomicU8::new(severity_to_u8(DEFAULT_MIN_SEVERITY));

/// Internal state structure
struct EngineState {
    /// Configuration fixed by `initialize` until `shutdown`
    config: RwLock<Option<EngineConfig>>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            config: RwLock::new(None),
        }
    }
}

const fn severity_to_u8(severity: LogSeverity) -> u8 {
    match severity {
        LogSeverity::Trace => 0,
        LogSeverity::Debug => 1,
        LogSeverity::Info => 2,
        LogSeverity::Warn => 3,
        LogSeverity::Error => 4,
    }
}

fn severity_from_u8(value: u8) -> LogSeverity {
    match value {
        0 => LogSeverity::Trace,
        1 => LogSeverity::Debug,
        2 => LogSeverity::Info,
        3 => LogSeverity::Warn,
        _ => LogSeverity::Error,
    }
}

// ===== PUBLIC API =====

/// Main engine entry point
///
/// # Example
///
/// ```no_run
/// use sensor_trace::sensortrace::{Engine, EngineConfig};
///
/// Engine::initialize(EngineConfig::accelerated())?;
/// let mut scene = Engine::create_scene()?;
/// // scene.set_scene(...), scene.fire_positions(...)
/// Engine::shutdown();
/// # Ok::<(), sensor_trace::sensortrace::Error>(())
/// ```
pub struct Engine;

impl Engine {
    /// Initialize the engine with a configuration
    ///
    /// Calling it again with an identical configuration is a no-op.
    ///
    /// # Errors
    ///
    /// - `InitializationFailed` if the configuration is invalid
    /// - `InitializationFailed` if the engine is already initialized with a
    ///   different configuration (call `shutdown()` first)
    pub fn initialize(config: EngineConfig) -> Result<()> {
        config.validate()?;

        let state = ENGINE_STATE.get_or_init(EngineState::new);
        let mut lock = state.config.write().map_err(|_| {
            crate::engine_err!("sensortrace::Engine", InitializationFailed,
                "Engine configuration lock poisoned")
        })?;

        if let Some(existing) = lock.as_ref() {
            if *existing == config {
                return Ok(());
            }
            return Err(crate::engine_err!("sensortrace::Engine", InitializationFailed,
                "Engine already initialized with {:?}/{:?}. Call Engine::shutdown() first.",
                existing.context, existing.residency));
        }

        Self::set_min_severity(config.min_log_severity);
        crate::engine_info!("sensortrace::Engine",
            "Engine initialized (context {:?}, residency {:?})",
            config.context, config.residency);
        *lock = Some(config);
        Ok(())
    }

    /// Whether `initialize` has been called since the last `shutdown`
    pub fn is_initialized() -> bool {
        ENGINE_STATE
            .get()
            .and_then(|state| state.config.read().ok().map(|c| c.is_some()))
            .unwrap_or(false)
    }

    /// Get a copy of the active configuration
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailed` if the engine is not initialized
    pub fn config() -> Result<EngineConfig> {
        let state = ENGINE_STATE.get().ok_or_else(|| {
            crate::engine_err!("sensortrace::Engine", InitializationFailed,
                "Engine not initialized. Call Engine::initialize() first.")
        })?;

        let lock = state.config.read().map_err(|_| {
            crate::engine_err!("sensortrace::Engine", InitializationFailed,
                "Engine configuration lock poisoned")
        })?;

        lock.clone().ok_or_else(|| {
            crate::engine_err!("sensortrace::Engine", InitializationFailed,
                "Engine not initialized. Call Engine::initialize() first.")
        })
    }

    /// Clear the configuration and restore `DEFAULT_MIN_SEVERITY`
    ///
    /// Existing scenes keep working with the device they were created with.
    pub fn shutdown() {
        if let Some(state) = ENGINE_STATE.get() {
            if let Ok(mut config) = state.config.write() {
                if config.take().is_some() {
                    crate::engine_info!("sensortrace::Engine", "Engine shut down");
                    Self::set_min_severity(DEFAULT_MIN_SEVERITY);
                }
            }
        }
    }

    /// Create an empty scene using the configured execution context
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailed` if the engine is not initialized
    pub fn create_scene() -> Result<Scene> {
        let config = Self::config()?;
        let device = device::create_device(config.context);
        crate::engine_debug!("sensortrace::Engine",
            "Creating scene on device '{}'", device.name());
        Ok(Scene::with_device(config, device))
    }

    // ===== LOGGING API =====

    /// Replace the active logger
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(logger);
        }
    }

    /// Reset the logger to `DefaultLogger`
    pub fn reset_logger() {
        Self::set_logger(DefaultLogger);
    }

    /// Discard entries below `severity`
    pub fn set_min_severity(severity: LogSeverity) {
        MIN_SEVERITY.store(severity_to_u8(severity), Ordering::Relaxed);
    }

    /// Current minimum severity
    pub fn min_severity() -> LogSeverity {
        severity_from_u8(MIN_SEVERITY.load(Ordering::Relaxed))
    }

    /// Log a message (used by `engine_info!`, `engine_debug!`...)
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        Self::dispatch(severity, source, message, None, None);
    }

    /// Log a message with file:line information (used by `engine_error!`)
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        Self::dispatch(severity, source, message, Some(file), Some(line));
    }

    fn dispatch(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: Option<&'static str>,
        line: Option<u32>,
    ) {
        if severity < Self::min_severity() {
            return;
        }
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(lock) = logger_lock.read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file,
                line,
            });
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
