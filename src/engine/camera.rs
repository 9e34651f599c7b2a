//! Perspective camera with staged-commit pose updates.
//!
//! Requests mutate the camera's pose while holding an exclusive scene lease,
//! then `commit()` the change before rendering. Rendering reads only the
//! committed state, so a half-applied pose can never leak into a frame.

use crate::geometry::Vec3;

/// The committable part of a camera: its pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
  /// Eye position.
  pub position: Vec3,
  /// View direction. Not required to be unit length; normalized at commit.
  pub direction: Vec3,
  /// Up vector.
  pub up: Vec3,
}

impl Default for CameraState {
  fn default() -> Self {
    // The stock pose of the demo scene.
    CameraState {
      position: Vec3::ZERO,
      direction: Vec3::new(0.1, 0.0, 0.1),
      up: Vec3::new(0.0, 1.0, 0.0),
    }
  }
}

/// Orthonormal frame derived from a committed pose.
#[derive(Debug, Clone, Copy)]
struct RayBasis {
  forward: Vec3,
  right: Vec3,
  up: Vec3,
}

impl RayBasis {
  fn from_state(state: &CameraState) -> RayBasis {
    let forward = state
      .direction
      .normalized()
      .unwrap_or(Vec3::new(0.0, 0.0, -1.0));
    // Degenerate up (zero, or parallel to the view direction) falls back to
    // world Y, then world X.
    let right = forward
      .cross(state.up)
      .normalized()
      .or_else(|| forward.cross(Vec3::new(0.0, 1.0, 0.0)).normalized())
      .unwrap_or(Vec3::new(1.0, 0.0, 0.0));
    let up = right.cross(forward).normalized().unwrap_or(state.up);
    RayBasis { forward, right, up }
  }
}

/// A primary ray leaving the camera.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
  pub origin: Vec3,
  pub direction: Vec3,
}

/// Perspective camera.
///
/// The field of view and aspect ratio are fixed at construction; the pose is
/// the only per-request mutable state. Setters write a pending copy that
/// becomes visible to rendering after [`Camera::commit`].
#[derive(Debug, Clone)]
pub struct Camera {
  pending: CameraState,
  committed: CameraState,
  basis: RayBasis,
  tan_half_fovy: f32,
  aspect: f32,
}

impl Camera {
  /// Create a camera with the given vertical field of view (degrees) and
  /// aspect ratio, at the default pose, already committed.
  pub fn new(fovy_degrees: f32, aspect: f32) -> Camera {
    let state = CameraState::default();
    Camera {
      pending: state,
      committed: state,
      basis: RayBasis::from_state(&state),
      tan_half_fovy: (fovy_degrees.to_radians() * 0.5).tan(),
      aspect,
    }
  }

  /// Stage a new eye position.
  pub fn set_position(&mut self, position: Vec3) {
    self.pending.position = position;
  }

  /// Stage a new view direction.
  pub fn set_direction(&mut self, direction: Vec3) {
    self.pending.direction = direction;
  }

  /// Stage a new up vector.
  pub fn set_up(&mut self, up: Vec3) {
    self.pending.up = up;
  }

  /// Publish staged pose changes and rebuild the ray basis.
  pub fn commit(&mut self) {
    self.committed = self.pending;
    self.basis = RayBasis::from_state(&self.committed);
  }

  /// The pose rendering currently sees.
  pub fn committed(&self) -> &CameraState {
    &self.committed
  }

  /// Generate the primary ray through pixel-space coordinates `(px, py)`
  /// (fractional pixel centers) on a `width` x `height` image plane.
  ///
  /// Reads only committed state.
  pub fn primary_ray(&self, px: f32, py: f32, width: u32, height: u32) -> Ray {
    // NDC in [-1, 1], y flipped so the image is not upside down.
    let ndc_x = 2.0 * (px / width as f32) - 1.0;
    let ndc_y = 1.0 - 2.0 * (py / height as f32);
    let dir = self.basis.forward
      + self.basis.right * (ndc_x * self.tan_half_fovy * self.aspect)
      + self.basis.up * (ndc_y * self.tan_half_fovy);
    Ray {
      origin: self.committed.position,
      direction: dir.normalized().unwrap_or(self.basis.forward),
    }
  }
}
