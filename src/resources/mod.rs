//! Resource management
//!
//! GPU-backed resources (textures, meshes, framebuffers, sprite atlases) and
//! materials. Resources are shared through `Arc`; registries and the inspector
//! only hold weak references.

use std::sync::atomic::{AtomicU64, Ordering};

mod framebuffer;
mod material;
mod mesh;
pub mod registry;
pub mod release;
mod sprite;
mod texture;

pub use framebuffer::*;
pub use material::*;
pub use mesh::*;
pub use registry::Registry;
pub use release::{PendingRelease, ReleaseQueue};
pub use sprite::*;
pub use texture::*;

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity shared by all resource kinds and materials.
pub(crate) fn next_resource_id() -> u64 {
    NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed)
}
