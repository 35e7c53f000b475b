use std::io::Cursor;

use anyhow::{Context, Result};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use imageproc::contrast::adaptive_threshold;
use imageproc::distance_transform::Norm;
use imageproc::filter::{filter3x3, median_filter};
use imageproc::morphology::{close, open};

/// Neighborhood radius for the adaptive threshold.
const BLOCK_RADIUS: u32 = 7;

const SHARPEN_KERNEL: [f32; 9] = [-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0];

/// Image-cleanup variants tried before handing bytes to the classifier.
/// `Threshold` empirically yields more readable glyphs on this portal's
/// captchas, so the solver tries it first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Grayscale + adaptive threshold, nothing else.
    Threshold,
    /// Threshold followed by morphological open/close, a median blur and a
    /// 3x3 sharpen, for images with heavy speckle noise.
    Denoised,
}

impl Variant {
    /// Order matters: higher-yield variant first.
    pub const ALL: [Variant; 2] = [Variant::Threshold, Variant::Denoised];
}

/// Apply one cleanup variant and re-encode as PNG for the classifier.
pub fn apply(variant: Variant, bytes: &[u8]) -> Result<Vec<u8>> {
    let gray = image::load_from_memory(bytes)
        .context("decoding captcha image")?
        .to_luma8();

    let cleaned = match variant {
        Variant::Threshold => adaptive_threshold(&gray, BLOCK_RADIUS),
        Variant::Denoised => denoise(&gray),
    };

    encode_png(cleaned)
}

fn denoise(gray: &GrayImage) -> GrayImage {
    let thresholded = adaptive_threshold(gray, BLOCK_RADIUS);
    let opened = open(&thresholded, Norm::LInf, 1);
    let closed = close(&opened, Norm::LInf, 1);
    let blurred = median_filter(&closed, 1, 1);
    filter3x3::<Luma<u8>, f32, u8>(&blurred, &SHARPEN_KERNEL)
}

fn encode_png(img: GrayImage) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(img)
        .write_to(&mut out, ImageFormat::Png)
        .context("encoding preprocessed captcha")?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_png() -> Vec<u8> {
        // 24x12 gradient, enough structure for the filters to chew on.
        let img = GrayImage::from_fn(24, 12, |x, y| Luma([((x * 10 + y) % 255) as u8]));
        encode_png(img).unwrap()
    }

    #[test]
    fn test_variants_produce_valid_png() {
        let bytes = sample_png();
        for variant in Variant::ALL {
            let cleaned = apply(variant, &bytes).unwrap();
            let decoded = image::load_from_memory(&cleaned).unwrap();
            assert_eq!(decoded.width(), 24);
            assert_eq!(decoded.height(), 12);
        }
    }

    #[test]
    fn test_garbage_input_is_an_error() {
        assert!(apply(Variant::Threshold, b"not an image").is_err());
    }
}
