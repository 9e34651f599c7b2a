//! Encode raw RGB pixels into the response image container.

use crate::error::RenderError;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};
use std::io::Cursor;

/// Supported response containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
  Png,
  /// JPEG with quality 0-100.
  Jpeg(u8),
}

impl Default for OutputFormat {
  fn default() -> Self {
    OutputFormat::Png
  }
}

impl OutputFormat {
  /// The Content-Type header value for this container.
  pub fn content_type(self) -> &'static str {
    match self {
      OutputFormat::Png => "image/png",
      OutputFormat::Jpeg(_) => "image/jpeg",
    }
  }
}

/// Compress a width x height x 3 RGB buffer into `format`.
pub fn encode_rgb(
  pixels: Vec<u8>,
  width: u32,
  height: u32,
  format: OutputFormat,
) -> Result<Vec<u8>, RenderError> {
  let expected = width as usize * height as usize * 3;
  if pixels.len() != expected {
    return Err(RenderError::BufferMismatch {
      expected,
      actual: pixels.len(),
    });
  }

  let img = RgbImage::from_raw(width, height, pixels).ok_or_else(|| RenderError::EncodeFailed {
    format: "RGB",
    reason: "failed to wrap raw buffer".to_string(),
  })?;

  let mut buffer = Vec::new();
  let mut cursor = Cursor::new(&mut buffer);
  match format {
    OutputFormat::Png => {
      img
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| RenderError::EncodeFailed {
          format: "PNG",
          reason: e.to_string(),
        })?;
    }
    OutputFormat::Jpeg(quality) => {
      let encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
      img
        .write_with_encoder(encoder)
        .map_err(|e| RenderError::EncodeFailed {
          format: "JPEG",
          reason: e.to_string(),
        })?;
    }
  }

  Ok(buffer)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn png_round_trips_through_the_decoder() {
    let pixels = vec![200u8; 4 * 3 * 3];
    let encoded = encode_rgb(pixels, 4, 3, OutputFormat::Png).unwrap();
    let decoded = image::load_from_memory(&encoded).unwrap();
    assert_eq!(decoded.width(), 4);
    assert_eq!(decoded.height(), 3);
  }

  #[test]
  fn jpeg_encodes_at_requested_quality() {
    let pixels = vec![128u8; 8 * 8 * 3];
    let encoded = encode_rgb(pixels, 8, 8, OutputFormat::Jpeg(90)).unwrap();
    assert!(!encoded.is_empty());
    assert_eq!(&encoded[..2], &[0xFF, 0xD8]); // JPEG SOI marker
  }

  #[test]
  fn rejects_wrong_buffer_size() {
    let err = encode_rgb(vec![0u8; 10], 4, 4, OutputFormat::Png).unwrap_err();
    assert!(matches!(err, RenderError::BufferMismatch { expected: 48, actual: 10 }));
  }

  #[test]
  fn content_types_match_containers() {
    assert_eq!(OutputFormat::Png.content_type(), "image/png");
    assert_eq!(OutputFormat::Jpeg(80).content_type(), "image/jpeg");
  }
}
