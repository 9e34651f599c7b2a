//! Scene construction and lifecycle.
//!
//! A [`Scene`] bundles the per-context engine state one request renders
//! with: a camera, renderer settings, and a framebuffer, plus shared handles
//! to the immutable world and the render backend. Scenes are expensive by
//! design: the pool pre-warms a fixed number of them at startup and they
//! live until process shutdown.

use crate::engine::renderer::RenderParams;
use crate::engine::{
  AmbientLight, Camera, Channels, FrameBuffer, RenderBackend, RendererSettings, World,
};
use crate::error::{InitError, RenderError};
use crate::geometry::Vec3;
use std::sync::Arc;

/// Parameters for building pooled scenes.
///
/// ```
/// use scenecast::scene::SceneConfig;
///
/// let config = SceneConfig::new().with_size(256, 256).with_samples_per_pixel(2);
/// assert_eq!(config.width, 256);
/// ```
#[derive(Debug, Clone)]
pub struct SceneConfig {
  /// Frame width in pixels.
  pub width: u32,
  /// Frame height in pixels.
  pub height: u32,
  /// Samples per pixel.
  pub samples_per_pixel: u32,
  /// Background color for rays that miss everything.
  pub background: Vec3,
  /// Vertical field of view in degrees.
  pub fovy_degrees: f32,
}

impl Default for SceneConfig {
  fn default() -> Self {
    SceneConfig {
      width: 512,
      height: 512,
      samples_per_pixel: 4,
      background: Vec3::splat(0.5),
      fovy_degrees: 60.0,
    }
  }
}

impl SceneConfig {
  pub fn new() -> SceneConfig {
    SceneConfig::default()
  }

  pub fn with_size(mut self, width: u32, height: u32) -> SceneConfig {
    self.width = width;
    self.height = height;
    self
  }

  pub fn with_samples_per_pixel(mut self, spp: u32) -> SceneConfig {
    self.samples_per_pixel = spp;
    self
  }

  pub fn with_background(mut self, background: Vec3) -> SceneConfig {
    self.background = background;
    self
  }
}

/// One expensive rendering context.
///
/// Exactly one in-flight request may hold a scene at a time; the pool
/// enforces this by moving scenes by value through leases. The camera is the
/// only state a request mutates.
pub struct Scene {
  id: usize,
  pub camera: Camera,
  pub renderer: RendererSettings,
  pub framebuffer: FrameBuffer,
  world: Arc<World>,
  backend: Arc<dyn RenderBackend>,
}

impl Scene {
  /// Construct a scene against a shared world and backend.
  pub fn build(
    id: usize,
    config: &SceneConfig,
    world: Arc<World>,
    backend: Arc<dyn RenderBackend>,
  ) -> Result<Scene, InitError> {
    if config.samples_per_pixel == 0 {
      return Err(InitError::InvalidConfig {
        message: "samples per pixel must be nonzero".to_string(),
      });
    }
    let aspect = config.width as f32 / config.height as f32;
    let renderer = RendererSettings::new(RenderParams {
      samples_per_pixel: config.samples_per_pixel,
      background: config.background,
      ambient: AmbientLight::default(),
    });
    Ok(Scene {
      id,
      camera: Camera::new(config.fovy_degrees, aspect),
      renderer,
      framebuffer: FrameBuffer::new(config.width, config.height)?,
      world,
      backend,
    })
  }

  pub fn id(&self) -> usize {
    self.id
  }

  pub fn world(&self) -> &World {
    &self.world
  }

  /// Run one render pass over committed state into this scene's
  /// framebuffer, returning the backend's variance estimate.
  pub fn render(&mut self, channels: Channels) -> Result<f32, RenderError> {
    self
      .backend
      .render(&self.world, &self.camera, &self.renderer, &mut self.framebuffer, channels)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::engine::{Channels, SoftwareTracer};

  #[test]
  fn build_rejects_zero_spp() {
    let world = Arc::new(World::demo());
    let backend: Arc<dyn RenderBackend> = Arc::new(SoftwareTracer::initialize().unwrap());
    let config = SceneConfig::new().with_samples_per_pixel(0);
    assert!(Scene::build(0, &config, world, backend).is_err());
  }

  #[test]
  fn scene_renders_into_its_own_framebuffer() {
    let world = Arc::new(World::demo());
    let backend: Arc<dyn RenderBackend> = Arc::new(SoftwareTracer::initialize().unwrap());
    let config = SceneConfig::new().with_size(16, 16).with_samples_per_pixel(1);
    let mut scene = Scene::build(7, &config, world, backend).unwrap();
    assert_eq!(scene.id(), 7);

    scene.framebuffer.clear(Channels::COLOR);
    scene.render(Channels::COLOR).unwrap();
    let pixels = scene.framebuffer.read_pixels(Channels::COLOR);
    assert_eq!(pixels.len(), 16 * 16 * 3);
  }
}
