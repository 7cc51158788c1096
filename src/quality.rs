//! Distortion metrics between a cover and its stego image.

use image::GrayImage;

use crate::error::{Result, StegoError};

const PEAK: f64 = 255.0;

/// Mean squared error over all pixels.
pub fn mse(original: &GrayImage, modified: &GrayImage) -> Result<f64> {
    if original.dimensions() != modified.dimensions() {
        return Err(StegoError::DimensionMismatch {
            left: original.dimensions(),
            right: modified.dimensions(),
        });
    }
    let count = original.as_raw().len();
    if count == 0 {
        return Ok(0.0);
    }
    let sum: f64 = original
        .as_raw()
        .iter()
        .zip(modified.as_raw())
        .map(|(&a, &b)| {
            let d = f64::from(a) - f64::from(b);
            d * d
        })
        .sum();
    Ok(sum / count as f64)
}

/// Peak signal-to-noise ratio in dB; infinite for identical images.
pub fn psnr(original: &GrayImage, modified: &GrayImage) -> Result<f64> {
    let mse = mse(original, modified)?;
    if mse == 0.0 {
        return Ok(f64::INFINITY);
    }
    Ok(10.0 * (PEAK * PEAK / mse).log10())
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;

    #[test]
    fn identical_images_are_infinite() {
        let image = GrayImage::from_pixel(16, 16, Luma([90]));
        assert_eq!(mse(&image, &image).unwrap(), 0.0);
        assert_eq!(psnr(&image, &image).unwrap(), f64::INFINITY);
    }

    #[test]
    fn unit_error_everywhere() {
        let a = GrayImage::from_pixel(8, 8, Luma([100]));
        let b = GrayImage::from_pixel(8, 8, Luma([101]));
        assert_eq!(mse(&a, &b).unwrap(), 1.0);
        let expected = 20.0 * 255f64.log10();
        assert!((psnr(&a, &b).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn shapes_must_match() {
        let a = GrayImage::new(8, 8);
        let b = GrayImage::new(8, 9);
        let err = psnr(&a, &b).unwrap_err();
        assert!(matches!(err, StegoError::DimensionMismatch { left: (8, 8), right: (8, 9) }));
    }
}
