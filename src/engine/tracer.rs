//! Built-in software render backend.
//!
//! A small CPU raytracer: per-pixel supersampling, Moller-Trumbore triangle
//! intersection with barycentric color interpolation, and front-to-back
//! emission-absorption ray marching through volume fields. It exists so the
//! service is a complete system without an external engine; anything
//! heavier slots in behind [`RenderBackend`](crate::engine::RenderBackend).

use crate::engine::camera::{Camera, Ray};
use crate::engine::world::{TriangleMesh, VolumeField, World};
use crate::engine::{Channels, FrameBuffer, RenderBackend, RendererSettings};
use crate::error::{InitError, RenderError};
use crate::geometry::Vec3;

const DEFAULT_MARCH_STEPS: u32 = 64;

/// Software raytracer.
#[derive(Debug, Clone)]
pub struct SoftwareTracer {
  march_steps: u32,
}

impl SoftwareTracer {
  /// Bring up the backend. This is the engine-initialization seam: failure
  /// here is fatal to server startup.
  pub fn initialize() -> Result<SoftwareTracer, InitError> {
    SoftwareTracer::with_march_steps(DEFAULT_MARCH_STEPS)
  }

  /// Configure the number of ray-march steps across a volume's extent.
  pub fn with_march_steps(march_steps: u32) -> Result<SoftwareTracer, InitError> {
    if march_steps == 0 {
      return Err(InitError::BackendUnavailable {
        reason: "march step count must be nonzero".to_string(),
      });
    }
    Ok(SoftwareTracer { march_steps })
  }

  fn shade(&self, ray: &Ray, world: &World, settings: &RendererSettings) -> Vec3 {
    let params = settings.committed();
    let ambient = params.ambient.color * params.ambient.intensity;

    // Nearest surface hit bounds the volume integration.
    let hit = nearest_hit(ray, world);
    let t_max = hit.as_ref().map_or(f32::INFINITY, |h| h.t);
    let surface = match &hit {
      Some(h) => h.color.mul_elem(ambient),
      None => params.background,
    };

    let mut color = Vec3::ZERO;
    let mut transmittance = 1.0f32;
    for volume in world.volumes() {
      integrate_volume(
        ray,
        volume,
        t_max,
        self.march_steps,
        &mut color,
        &mut transmittance,
      );
      if transmittance < 1e-3 {
        break;
      }
    }

    color + surface * transmittance
  }
}

impl RenderBackend for SoftwareTracer {
  fn render(
    &self,
    world: &World,
    camera: &Camera,
    settings: &RendererSettings,
    frame: &mut FrameBuffer,
    channels: Channels,
  ) -> Result<f32, RenderError> {
    if !channels.contains(Channels::COLOR) {
      return Ok(0.0);
    }

    let (width, height) = (frame.width(), frame.height());
    let spp = settings.committed().samples_per_pixel.max(1);
    let mut variance_sum = 0.0f64;

    for y in 0..height {
      for x in 0..width {
        let mut sum = Vec3::ZERO;
        let mut luma_sum = 0.0f32;
        let mut luma_sq_sum = 0.0f32;
        for s in 0..spp {
          // Jitter derives from pixel and sample indices, so repeated
          // renders of the same pose are identical.
          let (jx, jy) = sample_jitter(x, y, s);
          let ray = camera.primary_ray(x as f32 + jx, y as f32 + jy, width, height);
          let sample = self.shade(&ray, world, settings);
          sum = sum + sample;
          let luma = luminance(sample);
          luma_sum += luma;
          luma_sq_sum += luma * luma;
        }
        let inv = 1.0 / spp as f32;
        frame.set_pixel(x, y, sum * inv);
        let mean = luma_sum * inv;
        variance_sum += (luma_sq_sum * inv - mean * mean).max(0.0) as f64;
      }
    }

    Ok((variance_sum / (width as f64 * height as f64)) as f32)
  }
}

fn luminance(c: Vec3) -> f32 {
  0.2126 * c.x + 0.7152 * c.y + 0.0722 * c.z
}

/// Low-discrepancy-ish jitter in [0, 1) from pixel and sample indices.
fn sample_jitter(x: u32, y: u32, sample: u32) -> (f32, f32) {
  let mut h = x
    .wrapping_mul(0x9E37_79B9)
    .wrapping_add(y.wrapping_mul(0x85EB_CA6B))
    .wrapping_add(sample.wrapping_mul(0xC2B2_AE35));
  h ^= h >> 16;
  h = h.wrapping_mul(0x7FEB_352D);
  h ^= h >> 15;
  let jx = (h & 0xFFFF) as f32 / 65536.0;
  let jy = ((h >> 16) & 0xFFFF) as f32 / 65536.0;
  (jx, jy)
}

struct SurfaceHit {
  t: f32,
  color: Vec3,
}

fn nearest_hit(ray: &Ray, world: &World) -> Option<SurfaceHit> {
  let mut nearest: Option<SurfaceHit> = None;
  for mesh in world.meshes() {
    if let Some(hit) = intersect_mesh(ray, mesh) {
      match &nearest {
        Some(best) if best.t <= hit.t => {}
        _ => nearest = Some(hit),
      }
    }
  }
  nearest
}

fn intersect_mesh(ray: &Ray, mesh: &TriangleMesh) -> Option<SurfaceHit> {
  let mut nearest: Option<SurfaceHit> = None;
  for [(p0, c0), (p1, c1), (p2, c2)] in mesh.triangles() {
    if let Some((t, u, v)) = intersect_triangle(ray, p0, p1, p2) {
      if nearest.as_ref().is_none_or(|best| t < best.t) {
        let w = 1.0 - u - v;
        nearest = Some(SurfaceHit {
          t,
          color: c0 * w + c1 * u + c2 * v,
        });
      }
    }
  }
  nearest
}

/// Moller-Trumbore. Returns (t, u, v) for hits in front of the origin.
fn intersect_triangle(ray: &Ray, p0: Vec3, p1: Vec3, p2: Vec3) -> Option<(f32, f32, f32)> {
  const EPS: f32 = 1e-7;
  let edge1 = p1 - p0;
  let edge2 = p2 - p0;
  let pvec = ray.direction.cross(edge2);
  let det = edge1.dot(pvec);
  if det.abs() < EPS {
    return None;
  }
  let inv_det = 1.0 / det;
  let tvec = ray.origin - p0;
  let u = tvec.dot(pvec) * inv_det;
  if !(0.0..=1.0).contains(&u) {
    return None;
  }
  let qvec = tvec.cross(edge1);
  let v = ray.direction.dot(qvec) * inv_det;
  if v < 0.0 || u + v > 1.0 {
    return None;
  }
  let t = edge2.dot(qvec) * inv_det;
  if t > EPS { Some((t, u, v)) } else { None }
}

/// March `ray` through `volume`, compositing front-to-back into `color` and
/// `transmittance`, stopping at `t_max` (the nearest surface).
fn integrate_volume(
  ray: &Ray,
  volume: &VolumeField,
  t_max: f32,
  steps: u32,
  color: &mut Vec3,
  transmittance: &mut f32,
) {
  let Some((mut t0, mut t1)) = intersect_sphere(ray, volume.center(), volume.extent()) else {
    return;
  };
  t0 = t0.max(0.0);
  t1 = t1.min(t_max);
  if t1 <= t0 {
    return;
  }

  let step = (t1 - t0) / steps as f32;
  let mut t = t0 + step * 0.5;
  for _ in 0..steps {
    let p = ray.origin + ray.direction * t;
    let density = volume.density(p);
    if density > 0.0 {
      let (sample_color, opacity) = volume.transfer().sample(density);
      // Opacity is per unit length; scale by the step size.
      let alpha = (opacity * step).min(1.0);
      *color = *color + sample_color * (alpha * *transmittance);
      *transmittance *= 1.0 - alpha;
      if *transmittance < 1e-3 {
        return;
      }
    }
    t += step;
  }
}

fn intersect_sphere(ray: &Ray, center: Vec3, radius: f32) -> Option<(f32, f32)> {
  let oc = ray.origin - center;
  let b = oc.dot(ray.direction);
  let c = oc.dot(oc) - radius * radius;
  let disc = b * b - c;
  if disc < 0.0 {
    return None;
  }
  let sqrt_disc = disc.sqrt();
  let t0 = -b - sqrt_disc;
  let t1 = -b + sqrt_disc;
  if t1 < 0.0 { None } else { Some((t0, t1)) }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::engine::renderer::RenderParams;

  fn look_at_origin(distance: f32) -> Camera {
    let mut camera = Camera::new(60.0, 1.0);
    camera.set_position(Vec3::new(0.0, 0.0, distance));
    camera.set_direction(Vec3::new(0.0, 0.0, -distance));
    camera.set_up(Vec3::new(0.0, 1.0, 0.0));
    camera.commit();
    camera
  }

  #[test]
  fn initialize_rejects_zero_steps() {
    assert!(SoftwareTracer::with_march_steps(0).is_err());
    assert!(SoftwareTracer::initialize().is_ok());
  }

  #[test]
  fn triangle_intersection_hits_front_face() {
    let ray = Ray {
      origin: Vec3::new(0.25, 0.25, -1.0),
      direction: Vec3::new(0.0, 0.0, 1.0),
    };
    let hit = intersect_triangle(
      &ray,
      Vec3::new(0.0, 0.0, 1.0),
      Vec3::new(1.0, 0.0, 1.0),
      Vec3::new(0.0, 1.0, 1.0),
    );
    let (t, u, v) = hit.unwrap();
    assert!((t - 2.0).abs() < 1e-5);
    assert!(u > 0.0 && v > 0.0 && u + v < 1.0);
  }

  #[test]
  fn triangle_intersection_misses_behind_origin() {
    let ray = Ray {
      origin: Vec3::new(0.25, 0.25, 2.0),
      direction: Vec3::new(0.0, 0.0, 1.0),
    };
    let hit = intersect_triangle(
      &ray,
      Vec3::new(0.0, 0.0, 1.0),
      Vec3::new(1.0, 0.0, 1.0),
      Vec3::new(0.0, 1.0, 1.0),
    );
    assert!(hit.is_none());
  }

  #[test]
  fn miss_fills_background() {
    let tracer = SoftwareTracer::initialize().unwrap();
    let world = World::new(); // nothing to hit
    let background = Vec3::new(0.1, 0.2, 0.3);
    let settings = RendererSettings::new(RenderParams {
      samples_per_pixel: 1,
      background,
      ..RenderParams::default()
    });
    let mut frame = FrameBuffer::new(4, 4).unwrap();

    let variance = tracer
      .render(&world, &look_at_origin(200.0), &settings, &mut frame, Channels::COLOR)
      .unwrap();
    assert_eq!(variance, 0.0);
    assert_eq!(frame.pixel(2, 2), background);
  }

  #[test]
  fn volume_darkens_transmittance_through_center() {
    let world = World::demo();
    let volume = world.volumes().next().unwrap();
    let ray = Ray {
      origin: Vec3::new(0.0, 0.0, 200.0),
      direction: Vec3::new(0.0, 0.0, -1.0),
    };
    let mut color = Vec3::ZERO;
    let mut transmittance = 1.0;
    integrate_volume(&ray, volume, f32::INFINITY, 64, &mut color, &mut transmittance);
    assert!(transmittance < 1.0);
    assert!(color.length() > 0.0);
  }

  #[test]
  fn render_of_demo_world_is_deterministic() {
    let tracer = SoftwareTracer::initialize().unwrap();
    let world = World::demo();
    let settings = RendererSettings::default();
    let camera = look_at_origin(200.0);

    let mut a = FrameBuffer::new(8, 8).unwrap();
    let mut b = FrameBuffer::new(8, 8).unwrap();
    tracer.render(&world, &camera, &settings, &mut a, Channels::COLOR).unwrap();
    tracer.render(&world, &camera, &settings, &mut b, Channels::COLOR).unwrap();
    assert_eq!(a.read_pixels(Channels::COLOR), b.read_pixels(Channels::COLOR));
  }
}
