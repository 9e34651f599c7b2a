//! Renderer settings with staged-commit semantics.
//!
//! These are the fixed per-scene render parameters established at scene
//! construction: sample count, background, lighting. Like the
//! camera, changes stage into a pending copy and take effect at `commit()`;
//! the dispatcher commits only when something actually changed.

use crate::geometry::Vec3;

/// The single light source the demo scene uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
  pub color: Vec3,
  pub intensity: f32,
}

impl Default for AmbientLight {
  fn default() -> Self {
    AmbientLight {
      color: Vec3::ONE,
      intensity: 1.0,
    }
  }
}

/// Committable render parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
  /// Samples per pixel.
  pub samples_per_pixel: u32,
  /// Background color for rays that miss everything.
  pub background: Vec3,
  pub ambient: AmbientLight,
}

impl Default for RenderParams {
  fn default() -> Self {
    RenderParams {
      samples_per_pixel: 4,
      background: Vec3::splat(0.5),
      ambient: AmbientLight::default(),
    }
  }
}

/// Renderer configuration with a pending/committed cycle.
#[derive(Debug, Clone)]
pub struct RendererSettings {
  pending: RenderParams,
  committed: RenderParams,
  dirty: bool,
}

impl RendererSettings {
  /// Create settings that are already committed.
  pub fn new(params: RenderParams) -> RendererSettings {
    RendererSettings {
      pending: params,
      committed: params,
      dirty: false,
    }
  }

  pub fn set_samples_per_pixel(&mut self, spp: u32) {
    self.pending.samples_per_pixel = spp;
    self.dirty = true;
  }

  pub fn set_background(&mut self, background: Vec3) {
    self.pending.background = background;
    self.dirty = true;
  }

  pub fn set_ambient(&mut self, ambient: AmbientLight) {
    self.pending.ambient = ambient;
    self.dirty = true;
  }

  /// Whether there are staged changes a render would not yet see.
  pub fn is_dirty(&self) -> bool {
    self.dirty
  }

  /// Publish staged changes.
  pub fn commit(&mut self) {
    self.committed = self.pending;
    self.dirty = false;
  }

  /// The parameters rendering currently sees.
  pub fn committed(&self) -> &RenderParams {
    &self.committed
  }
}

impl Default for RendererSettings {
  fn default() -> Self {
    RendererSettings::new(RenderParams::default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn changes_stage_until_commit() {
    let mut settings = RendererSettings::default();
    assert!(!settings.is_dirty());

    settings.set_samples_per_pixel(16);
    assert!(settings.is_dirty());
    assert_eq!(settings.committed().samples_per_pixel, 4);

    settings.commit();
    assert!(!settings.is_dirty());
    assert_eq!(settings.committed().samples_per_pixel, 16);
  }
}
