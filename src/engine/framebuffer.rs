//! Fixed-size framebuffer with linear-light storage and sRGB readback.

use crate::engine::Channels;
use crate::error::InitError;
use crate::geometry::Vec3;

/// A width x height framebuffer storing linear RGB per pixel.
///
/// The buffer is allocated once per scene at construction and reused across
/// requests; [`FrameBuffer::clear`] resets the color channel between frames.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
  width: u32,
  height: u32,
  color: Vec<Vec3>,
}

impl FrameBuffer {
  pub fn new(width: u32, height: u32) -> Result<FrameBuffer, InitError> {
    if width == 0 || height == 0 {
      return Err(InitError::InvalidConfig {
        message: format!("framebuffer dimensions must be nonzero, got {}x{}", width, height),
      });
    }
    Ok(FrameBuffer {
      width,
      height,
      color: vec![Vec3::ZERO; width as usize * height as usize],
    })
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  /// Zero the named channels. Only the color channel is stored.
  pub fn clear(&mut self, channels: Channels) {
    if channels.contains(Channels::COLOR) {
      self.color.fill(Vec3::ZERO);
    }
  }

  pub fn set_pixel(&mut self, x: u32, y: u32, color: Vec3) {
    let idx = y as usize * self.width as usize + x as usize;
    self.color[idx] = color;
  }

  pub fn pixel(&self, x: u32, y: u32) -> Vec3 {
    self.color[y as usize * self.width as usize + x as usize]
  }

  /// Read back the color channel as width x height x 3 sRGB-encoded bytes.
  pub fn read_pixels(&self, channels: Channels) -> Vec<u8> {
    let mut out = Vec::with_capacity(self.color.len() * 3);
    if channels.contains(Channels::COLOR) {
      for c in &self.color {
        out.push(linear_to_srgb(c.x));
        out.push(linear_to_srgb(c.y));
        out.push(linear_to_srgb(c.z));
      }
    }
    out
  }
}

fn linear_to_srgb(v: f32) -> u8 {
  let v = v.clamp(0.0, 1.0);
  let encoded = if v <= 0.003_130_8 {
    v * 12.92
  } else {
    1.055 * v.powf(1.0 / 2.4) - 0.055
  };
  (encoded * 255.0 + 0.5) as u8
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_zero_dimensions() {
    assert!(FrameBuffer::new(0, 32).is_err());
    assert!(FrameBuffer::new(32, 0).is_err());
  }

  #[test]
  fn clear_resets_color() {
    let mut fb = FrameBuffer::new(4, 4).unwrap();
    fb.set_pixel(1, 2, Vec3::ONE);
    fb.clear(Channels::COLOR);
    assert_eq!(fb.pixel(1, 2), Vec3::ZERO);
  }

  #[test]
  fn read_pixels_is_rgb_bytes() {
    let mut fb = FrameBuffer::new(2, 1).unwrap();
    fb.set_pixel(0, 0, Vec3::new(1.0, 0.0, 0.0));
    let bytes = fb.read_pixels(Channels::COLOR);
    assert_eq!(bytes.len(), 2 * 1 * 3);
    assert_eq!(bytes[0], 255);
    assert_eq!(bytes[1], 0);
  }

  #[test]
  fn srgb_encoding_is_monotonic_at_ends() {
    assert_eq!(linear_to_srgb(0.0), 0);
    assert_eq!(linear_to_srgb(1.0), 255);
    assert_eq!(linear_to_srgb(2.0), 255); // clamps
  }
}
