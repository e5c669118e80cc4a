/// ResultRegistry - ownership of hit buffers between a fire call and release
///
/// Handles are generational slotmap keys: a released handle never aliases a
/// buffer registered later, even when the slot is reused.

use slotmap::{new_key_type, Key, KeyData, SlotMap};
use crate::error::Result;
use super::hit_buffer::HitBuffer;

new_key_type! {
    /// Opaque token for a registered HitBuffer.
    ///
    /// Valid from `register` until `release`.
    pub struct ResultHandle;
}

impl ResultHandle {
    /// Integer form for hosts that cannot hold a Rust value
    pub fn to_raw(self) -> u64 {
        self.data().as_ffi()
    }

    /// Rebuild a handle from `to_raw`. Arbitrary values are accepted and
    /// simply fail lookup.
    pub fn from_raw(raw: u64) -> Self {
        KeyData::from_ffi(raw).into()
    }
}

/// Owner of every live hit buffer
#[derive(Default)]
pub struct ResultRegistry {
    buffers: SlotMap<ResultHandle, HitBuffer>,
}

impl ResultRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a buffer and issue a fresh handle
    pub fn register(&mut self, buffer: HitBuffer) -> ResultHandle {
        let count = buffer.len();
        let handle = self.buffers.insert(buffer);
        crate::engine_trace!("sensortrace::ResultRegistry",
            "Registered {:?} ({} positions, {} live)", handle, count, self.buffers.len());
        handle
    }

    /// Look up a live buffer
    ///
    /// # Errors
    ///
    /// `UnknownHandle` if the handle was released or never issued here
    pub fn get(&self, handle: ResultHandle) -> Result<&HitBuffer> {
        match self.buffers.get(handle) {
            Some(buffer) => Ok(buffer),
            None => Err(crate::engine_err!("sensortrace::ResultRegistry", UnknownHandle,
                "{:?} is not live", handle)),
        }
    }

    /// Free a buffer. `true` the first time, `false` for released or unknown
    /// handles.
    pub fn release(&mut self, handle: ResultHandle) -> bool {
        let released = self.buffers.remove(handle).is_some();
        if !released {
            crate::engine_warn!("sensortrace::ResultRegistry",
                "Release of {:?} ignored: not live", handle);
        }
        released
    }

    /// Number of buffers awaiting release
    pub fn live_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn contains(&self, handle: ResultHandle) -> bool {
        self.buffers.contains_key(handle)
    }
}

impl Drop for ResultRegistry {
    fn drop(&mut self) {
        if !self.buffers.is_empty() {
            crate::engine_debug!("sensortrace::ResultRegistry",
                "Dropping {} unreleased result buffers", self.buffers.len());
        }
    }
}

#[cfg(test)]
#[path = "result_registry_tests.rs"]
mod tests;
