use std::io::Cursor;

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::ImageReader;

use crate::error::GatewayError;

// Fixed re-encode quality; balances payload size against fidelity.
pub const JPEG_QUALITY: u8 = 85;

pub const JPEG_MIME: &str = "image/jpeg";

// An image normalized for transmission: always 3-channel JPEG at a
// fixed quality, whatever the input container or color model was.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
  pub bytes: Vec<u8>,
  pub mime: String,
  pub quality: u8,
}

impl NormalizedImage {
  pub fn to_base64(&self) -> String {
    base64::engine::general_purpose::STANDARD.encode(&self.bytes)
  }

  pub fn to_data_uri(&self) -> String {
    format!("data:{};base64,{}", self.mime, self.to_base64())
  }
}

// Decode arbitrary image bytes, drop any alpha channel, and re-encode
// as JPEG. Runs entirely in memory.
pub fn normalize(data: &[u8]) -> Result<NormalizedImage, GatewayError> {
  let reader = ImageReader::new(Cursor::new(data))
    .with_guessed_format()
    .map_err(|e| GatewayError::ImageDecode(e.to_string()))?;
  let decoded = reader
    .decode()
    .map_err(|e| GatewayError::ImageDecode(e.to_string()))?;

  let rgb = decoded.to_rgb8();
  let mut bytes = Vec::new();
  let encoder = JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY);
  rgb
    .write_with_encoder(encoder)
    .map_err(|e| GatewayError::ImageDecode(e.to_string()))?;

  Ok(NormalizedImage {
    bytes,
    mime: JPEG_MIME.to_string(),
    quality: JPEG_QUALITY,
  })
}
