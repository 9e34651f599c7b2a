//! Typed rendering-engine objects and the backend seam.
//!
//! The engine side of the service is a set of plain typed objects (camera,
//! world, renderer settings, framebuffer) with staged-commit semantics:
//! setters write a pending copy, `commit()` publishes it, and rendering reads
//! only committed state. The render pass itself sits behind the
//! [`RenderBackend`] trait so the serving path stays agnostic of how pixels
//! are produced (and so tests can inject failing backends).

pub mod camera;
pub mod framebuffer;
pub mod renderer;
pub mod tracer;
pub mod world;

pub use camera::{Camera, CameraState};
pub use framebuffer::FrameBuffer;
pub use renderer::{AmbientLight, RenderParams, RendererSettings};
pub use tracer::SoftwareTracer;
pub use world::{SceneObject, TransferFunction, TriangleMesh, VolumeField, World};

use crate::error::RenderError;
use std::ops::BitOr;

/// Bitmask over framebuffer channels.
///
/// Mirrors the engine contract's channel masks: render and readback calls
/// state which channels they touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channels(u8);

impl Channels {
  /// The color channel.
  pub const COLOR: Channels = Channels(1);
  /// The accumulation channel.
  pub const ACCUM: Channels = Channels(2);

  pub fn contains(self, other: Channels) -> bool {
    self.0 & other.0 == other.0
  }
}

impl BitOr for Channels {
  type Output = Channels;
  fn bitor(self, other: Channels) -> Channels {
    Channels(self.0 | other.0)
  }
}

/// One render pass over committed state.
///
/// Implementations read the committed camera/settings, write the requested
/// channels of the framebuffer, and return a variance estimate for the frame
/// (how noisy the sampled image still is; 0.0 for fully converged frames).
///
/// The built-in implementation is [`SoftwareTracer`]. The serving path holds
/// backends as `Arc<dyn RenderBackend>`, so alternatives (or failing test
/// doubles) slot in without touching the dispatcher.
pub trait RenderBackend: Send + Sync {
  fn render(
    &self,
    world: &World,
    camera: &Camera,
    settings: &RendererSettings,
    frame: &mut FrameBuffer,
    channels: Channels,
  ) -> std::result::Result<f32, RenderError>;
}
