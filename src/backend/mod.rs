//! Backend abstraction layer
//!
//! Provides the trait the render core drives plus two implementations: a
//! recording [`DummyBackend`] and, behind the `wgpu-backend` feature, a wgpu
//! backend.

pub mod dummy;
pub mod traits;
pub mod types;

#[cfg(feature = "wgpu-backend")]
pub mod wgpu_backend;

pub use dummy::{BackendCommand, DummyBackend};
pub use traits::*;
pub use types::*;

#[cfg(feature = "wgpu-backend")]
pub use wgpu_backend::WgpuBackend;
