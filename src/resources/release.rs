//! Deferred destruction of GPU objects owned by dropped resources.
//!
//! Resources are dropped wherever their last `Arc` goes away, usually without
//! access to the backend. They push their handles here and the render context
//! destroys them between passes.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{BufferHandle, GraphicsBackend, ProgramHandle, TextureHandle};

/// A GPU object waiting to be destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingRelease {
    Program(ProgramHandle),
    Buffer(BufferHandle),
    Texture(TextureHandle),
}

/// Shared queue of GPU objects to destroy.
#[derive(Debug, Clone, Default)]
pub struct ReleaseQueue {
    pending: Arc<Mutex<Vec<PendingRelease>>>,
}

impl ReleaseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, release: PendingRelease) {
        self.pending.lock().push(release);
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Destroy every queued object. Returns how many were released.
    pub fn release_all<B: GraphicsBackend + ?Sized>(&self, backend: &mut B) -> usize {
        let pending = std::mem::take(&mut *self.pending.lock());
        for release in &pending {
            match *release {
                PendingRelease::Program(program) => backend.destroy_program(program),
                PendingRelease::Buffer(buffer) => backend.destroy_buffer(buffer),
                PendingRelease::Texture(texture) => backend.destroy_texture(texture),
            }
        }
        if !pending.is_empty() {
            log::debug!("Released {} GPU objects", pending.len());
        }
        pending.len()
    }
}
