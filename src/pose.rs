//! Camera pose synthesis on an orbit sphere.
//!
//! `/random` and the `make_urls` load-test tool share this mapping: two
//! uniform variates pick a point on a sphere of fixed radius, the camera
//! sits there and looks back at the origin.

use crate::geometry::Vec3;
use rand::Rng;
use std::f32::consts::PI;

/// Orbit radius the URL tooling and `/random` use by default.
pub const DEFAULT_ORBIT_RADIUS: f32 = 200.0;

/// A full camera pose: the nine numbers a render request carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
  pub eye: Vec3,
  pub up: Vec3,
  pub direction: Vec3,
}

/// Map two uniform variates in [0, 1) to a pose on the orbit sphere.
///
/// theta = 2*pi*u and phi = acos(2v - 1) sample the sphere's surface
/// uniformly. The up vector is fixed at +Y and the view direction is the
/// exact negation of the eye position, so the camera always points at the
/// origin. Pure: the same `(u, v)` always yields the same pose.
pub fn pose_on_sphere(u: f32, v: f32, radius: f32) -> CameraPose {
  let theta = 2.0 * PI * u;
  let phi = (2.0 * v - 1.0).clamp(-1.0, 1.0).acos();
  let eye = Vec3::new(
    radius * phi.sin() * theta.cos(),
    radius * phi.sin() * theta.sin(),
    radius * phi.cos(),
  );
  CameraPose {
    eye,
    up: Vec3::new(0.0, 1.0, 0.0),
    direction: -eye,
  }
}

/// Draw a pose uniformly from the orbit sphere.
pub fn random_pose(radius: f32) -> CameraPose {
  let mut rng = rand::thread_rng();
  pose_on_sphere(rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0), radius)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn eye_sits_on_the_sphere() {
    for &(u, v) in &[(0.0, 0.0), (0.25, 0.5), (0.99, 0.01), (0.5, 1.0 - 1e-6)] {
      let pose = pose_on_sphere(u, v, DEFAULT_ORBIT_RADIUS);
      assert!(
        (pose.eye.length() - DEFAULT_ORBIT_RADIUS).abs() < 1e-2,
        "({u}, {v}) -> |eye| = {}",
        pose.eye.length()
      );
    }
  }

  #[test]
  fn direction_is_exact_negation_of_eye() {
    let pose = pose_on_sphere(0.37, 0.81, DEFAULT_ORBIT_RADIUS);
    assert_eq!(pose.direction, -pose.eye);
    assert_eq!(pose.up, Vec3::new(0.0, 1.0, 0.0));
  }

  #[test]
  fn mapping_is_reproducible() {
    let a = pose_on_sphere(0.123, 0.456, 50.0);
    let b = pose_on_sphere(0.123, 0.456, 50.0);
    assert_eq!(a, b);
  }

  #[test]
  fn random_pose_respects_radius() {
    for _ in 0..16 {
      let pose = random_pose(75.0);
      assert!((pose.eye.length() - 75.0).abs() < 1e-2);
      assert_eq!(pose.direction, -pose.eye);
    }
  }
}
