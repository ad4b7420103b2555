//! CameraFrame - camera source output
//!
//! Opaque image payload handed to the classifier.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Camera frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraFrame {
    /// Frame sequence number
    pub frame_id: u64,

    /// Capture timestamp (seconds)
    pub timestamp: f64,

    /// Image payload
    pub image: ImageData,
}

/// Image data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    /// Image width
    pub width: u32,

    /// Image height
    pub height: u32,

    /// Pixel format
    pub format: ImageFormat,

    /// Raw pixel data (zero-copy)
    pub data: Bytes,
}

impl ImageData {
    /// Byte length implied by width, height and format
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    /// Image filled with a single RGB color
    pub fn solid(width: u32, height: u32, format: ImageFormat, rgb: [u8; 3]) -> Self {
        let [r, g, b] = rgb;
        let pixel: Vec<u8> = match format {
            ImageFormat::Rgb8 => vec![r, g, b],
            ImageFormat::Rgba8 => vec![r, g, b, 255],
            ImageFormat::Bgr8 => vec![b, g, r],
            ImageFormat::Bgra8 => vec![b, g, r, 255],
        };
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * pixel.len());
        for _ in 0..count {
            data.extend_from_slice(&pixel);
        }

        Self {
            width,
            height,
            format,
            data: Bytes::from(data),
        }
    }
}

/// Pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    Rgb8,
    Rgba8,
    Bgr8,
    #[default]
    Bgra8,
}

impl ImageFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb8 | Self::Bgr8 => 3,
            Self::Rgba8 | Self::Bgra8 => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_bgra_layout() {
        let img = ImageData::solid(2, 1, ImageFormat::Bgra8, [255, 10, 20]);
        assert_eq!(img.expected_len(), 8);
        assert_eq!(&img.data[..], &[20, 10, 255, 255, 20, 10, 255, 255]);
    }

    #[test]
    fn test_solid_rgb_layout() {
        let img = ImageData::solid(1, 2, ImageFormat::Rgb8, [1, 2, 3]);
        assert_eq!(img.data.len(), img.expected_len());
        assert_eq!(&img.data[..3], &[1, 2, 3]);
    }
}
