//! Loading and saving grayscale images, plus synthetic covers for demos and tests.

use std::path::Path;

use image::{GrayImage, ImageFormat, Luma};
use log::{debug, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::Result;

/// Opens any format the `image` crate decodes and converts it to 8-bit luma.
pub fn load_grayscale(path: impl AsRef<Path>) -> Result<GrayImage> {
    let path = path.as_ref();
    let image = image::open(path)?.to_luma8();
    debug!(
        "loaded {} as {}x{} grayscale",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(image)
}

/// Saves `image`, format chosen by extension.
///
/// Lossy formats re-quantize the coefficients and will usually destroy an embedded payload;
/// they are written anyway, with a warning.
pub fn save_image(image: &GrayImage, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if matches!(ImageFormat::from_path(path), Ok(ImageFormat::Jpeg)) {
        warn!(
            "{} uses a lossy format, the hidden payload will likely not survive",
            path.display()
        );
    }
    image.save(path)?;
    Ok(())
}

/// 32-pixel checkerboard blended with diagonal gradients. Values stay within `[42, 148]`,
/// far enough from both ends that embedding never clips.
pub fn checkerboard_gradient(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let check = 128 + 64 * (((y / 32) + (x / 32)) % 2);
        let along_rows = 127 * y / 511;
        let along_cols = 127 * x / 511;
        Luma([((check + along_rows.min(127) + along_cols.min(127)) / 3) as u8])
    })
}

/// Noisy mid-gray field with a bright disc and a darker ring around the centre.
pub fn speckled_disc(width: u32, height: u32, seed: u64) -> GrayImage {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let (cx, cy) = (f64::from(width) / 2.0, f64::from(height) / 2.0);
    GrayImage::from_fn(width, height, |x, y| {
        let mut value: i32 = rng.gen_range(100..156);
        let dist = (f64::from(x) - cx).hypot(f64::from(y) - cy);
        if dist < 100.0 {
            value += 100;
        } else if dist < 200.0 {
            value -= 50;
        }
        Luma([value.clamp(0, 255) as u8])
    })
}
