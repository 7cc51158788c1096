//! Separable orthonormal 2-D DCT on a coefficient band, typically the `LL2` approximation.

use std::f64::consts::{FRAC_1_SQRT_2, SQRT_2};
use std::sync::Arc;

use rustdct::{DctPlanner, TransformType2And3};

use crate::dwt::Band;

fn transposed(band: &Band) -> Band {
    let (rows, cols) = band.shape();
    let mut out = Band::zeros(cols, rows);
    for r in 0..rows {
        for c in 0..cols {
            out[(c, r)] = band[(r, c)];
        }
    }
    out
}

/// DCT-II of every row, rescaled to the orthonormal basis.
fn dct2_rows(band: &mut Band, dct: &Arc<dyn TransformType2And3<f64>>) {
    let len = band.cols();
    let scale = (2.0 / len as f64).sqrt();
    for row in band.as_mut_slice().chunks_mut(len) {
        dct.process_dct2(row);
        row[0] *= FRAC_1_SQRT_2;
        row.iter_mut().for_each(|v| *v *= scale);
    }
}

/// Inverse of [`dct2_rows`].
fn dct3_rows(band: &mut Band, dct: &Arc<dyn TransformType2And3<f64>>) {
    let len = band.cols();
    let scale = (2.0 / len as f64).sqrt();
    for row in band.as_mut_slice().chunks_mut(len) {
        row[0] *= SQRT_2;
        row.iter_mut().for_each(|v| *v *= scale);
        dct.process_dct3(row);
    }
}

/// Orthonormal DCT-II along rows, then along columns.
pub fn forward_2d(band: &Band) -> Band {
    let (rows, cols) = band.shape();
    if rows == 0 || cols == 0 {
        return band.clone();
    }
    let mut planner = DctPlanner::new();

    let mut work = band.clone();
    dct2_rows(&mut work, &planner.plan_dct2(cols));

    // columns are rows of the transpose
    let mut work = transposed(&work);
    dct2_rows(&mut work, &planner.plan_dct2(rows));
    transposed(&work)
}

/// Inverse of [`forward_2d`] (orthonormal DCT-III both ways).
pub fn inverse_2d(coefficients: &Band) -> Band {
    let (rows, cols) = coefficients.shape();
    if rows == 0 || cols == 0 {
        return coefficients.clone();
    }
    let mut planner = DctPlanner::new();

    let mut work = coefficients.clone();
    dct3_rows(&mut work, &planner.plan_dct3(cols));

    let mut work = transposed(&work);
    dct3_rows(&mut work, &planner.plan_dct3(rows));
    transposed(&work)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dwt::{decompose, BandName};
    use crate::media;

    #[test]
    fn constant_band_has_only_dc() {
        let band = Band::from_vec(4, 6, vec![3.0; 24]).unwrap();
        let coefficients = forward_2d(&band);
        // orthonormal DC: sum / sqrt(rows * cols)
        assert!((coefficients[(0, 0)] - 3.0 * 24f64.sqrt()).abs() < 1e-9);
        for (i, v) in coefficients.as_slice().iter().enumerate().skip(1) {
            assert!(v.abs() < 1e-9, "{i}: {v}");
        }
    }

    #[test]
    fn approximation_band_round_trip() {
        let bands = decompose(&media::speckled_disc(200, 150, 5)).unwrap();
        let ll = bands.band(BandName::LL2);
        let restored = inverse_2d(&forward_2d(ll));
        assert_eq!(restored.shape(), ll.shape());
        for (a, b) in ll.as_slice().iter().zip(restored.as_slice()) {
            assert!((a - b).abs() < 1e-8);
        }
    }

    #[test]
    fn energy_is_preserved() {
        let data: Vec<f64> = (0..35).map(|i| ((i * 7919) % 97) as f64 - 40.0).collect();
        let band = Band::from_vec(5, 7, data).unwrap();
        let energy = |b: &Band| b.as_slice().iter().map(|v| v * v).sum::<f64>();
        assert!((energy(&band) - energy(&forward_2d(&band))).abs() < 1e-6);
    }
}
