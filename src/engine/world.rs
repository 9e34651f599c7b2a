//! The fixed scene content shared by every pooled scene.
//!
//! A [`World`] is an immutable collection of [`SceneObject`]s built once at
//! startup. Objects are a closed tagged variant (geometry or volume) and
//! the aggregate matches on the tag explicitly when adding or removing.

use crate::error::InitError;
use crate::geometry::Vec3;

/// An indexed triangle mesh with per-vertex colors.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
  positions: Vec<Vec3>,
  colors: Vec<Vec3>,
  indices: Vec<[u32; 3]>,
}

impl TriangleMesh {
  /// Build a mesh, validating that every index is in range and that each
  /// vertex has a color.
  pub fn new(
    positions: Vec<Vec3>,
    colors: Vec<Vec3>,
    indices: Vec<[u32; 3]>,
  ) -> Result<TriangleMesh, InitError> {
    if colors.len() != positions.len() {
      return Err(InitError::InvalidConfig {
        message: format!(
          "mesh has {} vertices but {} colors",
          positions.len(),
          colors.len()
        ),
      });
    }
    if let Some(tri) = indices
      .iter()
      .find(|tri| tri.iter().any(|&i| i as usize >= positions.len()))
    {
      return Err(InitError::InvalidConfig {
        message: format!("mesh index {:?} out of range", tri),
      });
    }
    Ok(TriangleMesh {
      positions,
      colors,
      indices,
    })
  }

  /// The two-triangle demo quad the service ships with.
  pub fn demo_quad() -> TriangleMesh {
    let positions = vec![
      Vec3::new(-1.0, -1.0, 3.0),
      Vec3::new(-1.0, 1.0, 3.0),
      Vec3::new(1.0, -1.0, 3.0),
      Vec3::new(0.1, 0.1, 0.3),
    ];
    let colors = vec![
      Vec3::new(0.9, 0.5, 0.5),
      Vec3::new(0.8, 0.8, 0.8),
      Vec3::new(0.8, 0.8, 0.8),
      Vec3::new(0.5, 0.9, 0.5),
    ];
    let indices = vec![[0, 1, 2], [1, 2, 3]];
    TriangleMesh::new(positions, colors, indices).expect("demo quad is well-formed")
  }

  pub fn triangles(&self) -> impl Iterator<Item = [(Vec3, Vec3); 3]> + '_ {
    self.indices.iter().map(|tri| {
      let v = |i: u32| (self.positions[i as usize], self.colors[i as usize]);
      [v(tri[0]), v(tri[1]), v(tri[2])]
    })
  }

  pub fn triangle_count(&self) -> usize {
    self.indices.len()
  }
}

/// Piecewise-linear mapping from scalar density to color and opacity.
#[derive(Debug, Clone)]
pub struct TransferFunction {
  colors: Vec<Vec3>,
  opacities: Vec<f32>,
  value_range: (f32, f32),
}

impl TransferFunction {
  pub fn new(
    colors: Vec<Vec3>,
    opacities: Vec<f32>,
    value_range: (f32, f32),
  ) -> Result<TransferFunction, InitError> {
    if colors.is_empty() || opacities.is_empty() {
      return Err(InitError::InvalidConfig {
        message: "transfer function needs at least one color and opacity".to_string(),
      });
    }
    if value_range.1 <= value_range.0 {
      return Err(InitError::InvalidConfig {
        message: format!("transfer function value range {:?} is empty", value_range),
      });
    }
    Ok(TransferFunction {
      colors,
      opacities,
      value_range,
    })
  }

  /// Sample color and opacity for a density value. Values outside the range
  /// clamp to the ends.
  pub fn sample(&self, value: f32) -> (Vec3, f32) {
    let (lo, hi) = self.value_range;
    let t = ((value - lo) / (hi - lo)).clamp(0.0, 1.0);
    (
      sample_ramp(&self.colors, t, |c| *c, Vec3::lerp),
      sample_ramp(&self.opacities, t, |o| *o, |a, b, t| a + (b - a) * t),
    )
  }
}

fn sample_ramp<T: Copy, O>(ramp: &[T], t: f32, get: impl Fn(&T) -> O, lerp: impl Fn(O, O, f32) -> O) -> O {
  if ramp.len() == 1 {
    return get(&ramp[0]);
  }
  let scaled = t * (ramp.len() - 1) as f32;
  let i = (scaled.floor() as usize).min(ramp.len() - 2);
  lerp(get(&ramp[i]), get(&ramp[i + 1]), scaled - i as f32)
}

/// A procedural spherical density field.
///
/// Density falls off with distance from the center and is modulated so the
/// rendered blob has visible structure rather than a flat gradient.
#[derive(Debug, Clone)]
pub struct VolumeField {
  center: Vec3,
  radius: f32,
  transfer: TransferFunction,
}

impl VolumeField {
  pub fn new(center: Vec3, radius: f32, transfer: TransferFunction) -> Result<VolumeField, InitError> {
    if !(radius > 0.0) {
      return Err(InitError::InvalidConfig {
        message: format!("volume radius must be positive, got {}", radius),
      });
    }
    Ok(VolumeField {
      center,
      radius,
      transfer,
    })
  }

  pub fn center(&self) -> Vec3 {
    self.center
  }

  /// Radius beyond which the density is negligible; ray marching clips to it.
  pub fn extent(&self) -> f32 {
    self.radius
  }

  pub fn transfer(&self) -> &TransferFunction {
    &self.transfer
  }

  /// Density in [0, 1] at a point.
  pub fn density(&self, p: Vec3) -> f32 {
    let offset = p - self.center;
    let d = offset.length() / self.radius;
    if d >= 1.0 {
      return 0.0;
    }
    let falloff = (1.0 - d * d).max(0.0);
    let swirl = 0.75
      + 0.25
        * (offset.x * 0.11).sin()
        * (offset.y * 0.13).sin()
        * (offset.z * 0.09).cos();
    (falloff * falloff * swirl).clamp(0.0, 1.0)
  }
}

/// Closed set of object kinds a world can hold.
#[derive(Debug, Clone)]
pub enum SceneObject {
  Geometry(TriangleMesh),
  Volume(VolumeField),
}

/// Immutable scene content: every pooled scene shares one world.
#[derive(Debug, Clone, Default)]
pub struct World {
  objects: Vec<SceneObject>,
  geometry_count: usize,
  volume_count: usize,
}

impl World {
  pub fn new() -> World {
    World::default()
  }

  /// Add an object, dispatching on its kind.
  pub fn add(&mut self, object: SceneObject) {
    match &object {
      SceneObject::Geometry(_) => self.geometry_count += 1,
      SceneObject::Volume(_) => self.volume_count += 1,
    }
    self.objects.push(object);
  }

  /// Remove the object at `index`, if any.
  pub fn remove(&mut self, index: usize) -> Option<SceneObject> {
    if index >= self.objects.len() {
      return None;
    }
    let object = self.objects.remove(index);
    match &object {
      SceneObject::Geometry(_) => self.geometry_count -= 1,
      SceneObject::Volume(_) => self.volume_count -= 1,
    }
    Some(object)
  }

  pub fn meshes(&self) -> impl Iterator<Item = &TriangleMesh> {
    self.objects.iter().filter_map(|o| match o {
      SceneObject::Geometry(mesh) => Some(mesh),
      SceneObject::Volume(_) => None,
    })
  }

  pub fn volumes(&self) -> impl Iterator<Item = &VolumeField> {
    self.objects.iter().filter_map(|o| match o {
      SceneObject::Volume(volume) => Some(volume),
      SceneObject::Geometry(_) => None,
    })
  }

  pub fn geometry_count(&self) -> usize {
    self.geometry_count
  }

  pub fn volume_count(&self) -> usize {
    self.volume_count
  }

  pub fn is_empty(&self) -> bool {
    self.objects.is_empty()
  }

  /// The world the service serves by default: the demo quad plus a
  /// nebula-like volume centered at the origin, sized for the orbit radius
  /// the URL tooling uses.
  pub fn demo() -> World {
    let transfer = TransferFunction::new(
      vec![
        Vec3::new(0.02, 0.02, 0.12),
        Vec3::new(0.30, 0.10, 0.35),
        Vec3::new(0.95, 0.45, 0.15),
        Vec3::new(1.0, 0.95, 0.80),
      ],
      vec![0.0, 0.04, 0.35, 0.85],
      (0.0, 1.0),
    )
    .expect("demo transfer function is well-formed");
    let volume =
      VolumeField::new(Vec3::ZERO, 80.0, transfer).expect("demo volume is well-formed");

    let mut world = World::new();
    world.add(SceneObject::Geometry(TriangleMesh::demo_quad()));
    world.add(SceneObject::Volume(volume));
    world
  }
}
