//! Color-ratio classifier over raw camera pixels.
//!
//! Every saturated, bright pixel is bucketed by hue into red, yellow or
//! green. The dominant bucket wins if it covers at least `threshold` of the
//! image, otherwise the frame is UNKNOWN.

use contracts::{
    CameraFrame, DetectorError, ImageData, ImageFormat, LightClassifier, LightColor, StopLine,
};
use image::{DynamicImage, Rgb, RgbImage, RgbaImage};

const MIN_VALUE: f32 = 0.35;
const MIN_SATURATION: f32 = 0.45;

/// Share of the image covered by each light color
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ColorRatios {
    pub red: f64,
    pub yellow: f64,
    pub green: f64,
}

impl ColorRatios {
    /// Dominant color and its share; stop colors win ties
    pub fn dominant(&self) -> (LightColor, f64) {
        [
            (LightColor::Red, self.red),
            (LightColor::Yellow, self.yellow),
            (LightColor::Green, self.green),
        ]
        .into_iter()
        .fold((LightColor::Unknown, 0.0), |best, candidate| {
            if candidate.1 > best.1 {
                candidate
            } else {
                best
            }
        })
    }
}

/// Pixel-ratio classifier
#[derive(Debug, Clone)]
pub struct PixelRatioClassifier {
    threshold: f64,
}

impl PixelRatioClassifier {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Measure color ratios, `None` if the buffer does not match its header
    pub fn measure(image: &ImageData) -> Option<ColorRatios> {
        let rgb = to_rgb(image)?;
        let total = u64::from(rgb.width()) * u64::from(rgb.height());
        if total == 0 {
            return Some(ColorRatios::default());
        }

        let (mut red, mut yellow, mut green) = (0u64, 0u64, 0u64);
        for pixel in rgb.pixels() {
            match bucket(pixel) {
                Some(LightColor::Red) => red += 1,
                Some(LightColor::Yellow) => yellow += 1,
                Some(LightColor::Green) => green += 1,
                _ => {}
            }
        }

        let total = total as f64;
        Some(ColorRatios {
            red: red as f64 / total,
            yellow: yellow as f64 / total,
            green: green as f64 / total,
        })
    }
}

impl LightClassifier for PixelRatioClassifier {
    fn name(&self) -> &str {
        "pixel_ratio"
    }

    fn classify(
        &mut self,
        frame: Option<&CameraFrame>,
        _target: &StopLine,
    ) -> Result<LightColor, DetectorError> {
        let frame = frame.ok_or(DetectorError::NoImageAvailable)?;

        let Some(ratios) = Self::measure(&frame.image) else {
            tracing::warn!(
                frame_id = frame.frame_id,
                width = frame.image.width,
                height = frame.image.height,
                len = frame.image.data.len(),
                "image buffer shorter than its dimensions"
            );
            return Ok(LightColor::Unknown);
        };

        let (color, share) = ratios.dominant();
        if share > 0.0 && share >= self.threshold {
            Ok(color)
        } else {
            Ok(LightColor::Unknown)
        }
    }
}

/// Convert any supported layout to packed RGB
fn to_rgb(image: &ImageData) -> Option<RgbImage> {
    let (width, height) = (image.width, image.height);
    match image.format {
        ImageFormat::Rgb8 => RgbImage::from_raw(width, height, image.data.to_vec()),
        ImageFormat::Bgr8 => {
            let mut data = image.data.to_vec();
            for chunk in data.chunks_exact_mut(3) {
                chunk.swap(0, 2); // Swap B and R
            }
            RgbImage::from_raw(width, height, data)
        }
        ImageFormat::Rgba8 => RgbaImage::from_raw(width, height, image.data.to_vec())
            .map(|rgba| DynamicImage::ImageRgba8(rgba).to_rgb8()),
        ImageFormat::Bgra8 => {
            let mut data = image.data.to_vec();
            for chunk in data.chunks_exact_mut(4) {
                chunk.swap(0, 2);
            }
            RgbaImage::from_raw(width, height, data)
                .map(|rgba| DynamicImage::ImageRgba8(rgba).to_rgb8())
        }
    }
}

/// Hue bucket of a single pixel, `None` for dark or grey pixels
fn bucket(&Rgb([r, g, b]): &Rgb<u8>) -> Option<LightColor> {
    let (r, g, b) = (
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
    );
    let max = r.max(g).max(b);
    let delta = max - r.min(g).min(b);
    if max < MIN_VALUE || delta / max < MIN_SATURATION {
        return None;
    }

    let hue = if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    if !(20.0..340.0).contains(&hue) {
        Some(LightColor::Red)
    } else if hue < 75.0 {
        Some(LightColor::Yellow)
    } else if (75.0..170.0).contains(&hue) {
        Some(LightColor::Green)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::Point2;

    const RED: [u8; 3] = [230, 20, 20];
    const YELLOW: [u8; 3] = [250, 200, 10];
    const GREEN: [u8; 3] = [20, 220, 60];
    const GREY: [u8; 3] = [90, 90, 90];

    fn target() -> StopLine {
        StopLine {
            ordinal: 0,
            position: Point2::new(0.0, 0.0),
        }
    }

    fn frame(image: ImageData) -> CameraFrame {
        CameraFrame {
            frame_id: 1,
            timestamp: 0.0,
            image,
        }
    }

    #[test]
    fn test_solid_colors_in_every_format() {
        let formats = [
            ImageFormat::Rgb8,
            ImageFormat::Rgba8,
            ImageFormat::Bgr8,
            ImageFormat::Bgra8,
        ];
        let mut classifier = PixelRatioClassifier::new(0.3);

        for format in formats {
            for (rgb, expected) in [
                (RED, LightColor::Red),
                (YELLOW, LightColor::Yellow),
                (GREEN, LightColor::Green),
                (GREY, LightColor::Unknown),
            ] {
                let image = ImageData::solid(8, 6, format, rgb);
                let color = classifier.classify(Some(&frame(image)), &target());
                assert_eq!(color, Ok(expected), "format {format:?}, rgb {rgb:?}");
            }
        }
    }

    #[test]
    fn test_threshold_on_share() {
        // 4x4 grey image with the top row red: 25% red
        let mut data = Vec::new();
        for row in 0..4 {
            for _ in 0..4 {
                data.extend_from_slice(if row == 0 { &RED } else { &GREY });
            }
        }
        let image = ImageData {
            width: 4,
            height: 4,
            format: ImageFormat::Rgb8,
            data: Bytes::from(data),
        };

        let ratios = PixelRatioClassifier::measure(&image).unwrap();
        assert_eq!(ratios.red, 0.25);
        assert_eq!(ratios.dominant(), (LightColor::Red, 0.25));

        let strict = PixelRatioClassifier::new(0.3).classify(Some(&frame(image.clone())), &target());
        assert_eq!(strict, Ok(LightColor::Unknown));

        let loose = PixelRatioClassifier::new(0.2).classify(Some(&frame(image)), &target());
        assert_eq!(loose, Ok(LightColor::Red));
    }

    #[test]
    fn test_truncated_buffer_is_unknown() {
        let image = ImageData {
            width: 10,
            height: 10,
            format: ImageFormat::Rgb8,
            data: Bytes::from_static(&[255, 0, 0]),
        };
        assert!(PixelRatioClassifier::measure(&image).is_none());
        let mut classifier = PixelRatioClassifier::new(0.3);
        assert_eq!(
            classifier.classify(Some(&frame(image)), &target()),
            Ok(LightColor::Unknown)
        );
    }

    #[test]
    fn test_no_image() {
        let mut classifier = PixelRatioClassifier::new(0.3);
        assert_eq!(
            classifier.classify(None, &target()),
            Err(DetectorError::NoImageAvailable)
        );
    }
}
