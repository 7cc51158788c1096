//! Two-level separable 2-D discrete wavelet transform.
//!
//! Daubechies-4 (8 taps) with half-sample symmetric extension. A signal of length `n`
//! yields `(n + 7) / 2` coefficients per half, so the decomposition is redundant near
//! the borders; that redundancy is what makes the inverse exact for any length.
//! Band naming follows the usual `LL/LH/HL/HH` convention where the first letter is the
//! filter along the width and the second the filter along the height.

use std::fmt;
use std::ops::{Index, IndexMut, Range};

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StegoError};

/// Number of taps of the analysis and synthesis filters.
pub const FILTER_LEN: usize = 8;

/// Smallest side accepted by [`decompose`]: both levels need a full filter span.
pub const MIN_SIDE: usize = FILTER_LEN + 1;

const DEC_LO: [f64; FILTER_LEN] = [
    -0.010597401785069032,
    0.0328830116668852,
    0.030841381835560764,
    -0.18703481171909309,
    -0.027983769416859854,
    0.6308807679298589,
    0.7148465705529157,
    0.2303778133088965,
];

const DEC_HI: [f64; FILTER_LEN] = [
    -0.2303778133088965,
    0.7148465705529157,
    -0.6308807679298589,
    -0.027983769416859854,
    0.18703481171909309,
    0.030841381835560764,
    -0.0328830116668852,
    -0.010597401785069032,
];

/// Name of one of the seven sub-bands of a two-level decomposition.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BandName {
    LL2,
    LH2,
    HL2,
    HH2,
    LH1,
    HL1,
    HH1,
}

impl BandName {
    pub const ALL: [BandName; 7] = [
        BandName::LL2,
        BandName::LH2,
        BandName::HL2,
        BandName::HH2,
        BandName::LH1,
        BandName::HL1,
        BandName::HH1,
    ];

    /// Decomposition level the band belongs to (1 or 2).
    pub fn level(self) -> usize {
        match self {
            BandName::LH1 | BandName::HL1 | BandName::HH1 => 1,
            _ => 2,
        }
    }

    /// Level-2 band of the same orientation, for level-1 detail bands.
    pub fn parent(self) -> Option<BandName> {
        match self {
            BandName::LH1 => Some(BandName::LH2),
            BandName::HL1 => Some(BandName::HL2),
            BandName::HH1 => Some(BandName::HH2),
            _ => None,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for BandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Row-major grid of coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Band {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Band {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Wraps `data`, returning `None` when its length is not `rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Option<Self> {
        (data.len() == rows * cols).then_some(Band { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        (row < self.rows && col < self.cols).then(|| self.data[row * self.cols + col])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [f64] {
        &mut self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Copy cropped or zero-padded to `rows x cols`, anchored at the origin.
    fn fitted(&self, rows: usize, cols: usize) -> Band {
        if self.shape() == (rows, cols) {
            return self.clone();
        }
        let mut out = Band::zeros(rows, cols);
        let keep_cols = cols.min(self.cols);
        for r in 0..rows.min(self.rows) {
            out.row_mut(r)[..keep_cols].copy_from_slice(&self.row(r)[..keep_cols]);
        }
        out
    }
}

impl Index<(usize, usize)> for Band {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        &self.data[row * self.cols + col]
    }
}

impl IndexMut<(usize, usize)> for Band {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        &mut self.data[row * self.cols + col]
    }
}

/// Coefficient count per half for a 1-D input of length `n`.
fn half_len(n: usize) -> usize {
    (n + FILTER_LEN - 1) / 2
}

/// Output length of the synthesis of `k` coefficients per half.
fn synthesis_len(k: usize) -> usize {
    (2 * k + 2).saturating_sub(FILTER_LEN)
}

/// Shape-only geometry of a two-level decomposition.
///
/// Besides band shapes it tracks the *stable region* of each level: coefficients whose
/// filter support stays inside the signal at every level. Only those come back unchanged
/// (up to rounding noise) after reconstruct, quantize to 8 bits and decompose again; the
/// others mix with the mirrored border samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    height: usize,
    width: usize,
    level1: (usize, usize),
    level2: (usize, usize),
    lead: [usize; 2],
    stable_rows: [usize; 2],
    stable_cols: [usize; 2],
}

impl Layout {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width < MIN_SIDE || height < MIN_SIDE {
            return Err(StegoError::ImageTooSmall {
                width,
                height,
                minimum: MIN_SIDE,
            });
        }
        let level1 = (half_len(height), half_len(width));
        let level2 = (half_len(level1.0), half_len(level1.1));

        // coefficient k reads samples [2k + 2 - FILTER_LEN, 2k + 1] of its input
        let lead1 = (FILTER_LEN - 1) / 2;
        let lead2 = (lead1 + FILTER_LEN - 1) / 2;
        let (rows1, cols1) = (height / 2, width / 2);

        Ok(Layout {
            height,
            width,
            level1,
            level2,
            lead: [lead1, lead2],
            stable_rows: [rows1, rows1 / 2],
            stable_cols: [cols1, cols1 / 2],
        })
    }

    /// `(rows, cols)` of the source image.
    pub fn image_shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// `(rows, cols)` of the intermediate `LL1` approximation.
    pub fn ll1_shape(&self) -> (usize, usize) {
        self.level1
    }

    pub fn band_shape(&self, band: BandName) -> (usize, usize) {
        match band.level() {
            1 => self.level1,
            _ => self.level2,
        }
    }

    /// Rows and columns of `band` that are both stable and outside `margin`.
    pub fn stable_region(&self, band: BandName, margin: usize) -> (Range<usize>, Range<usize>) {
        let level = band.level() - 1;
        let start = margin.max(self.lead[level]);
        let rows_end = self.stable_rows[level];
        let cols_end = self.stable_cols[level];
        (start.min(rows_end)..rows_end, start.min(cols_end)..cols_end)
    }

    /// Number of coefficients in [`Layout::stable_region`].
    pub fn eligible_count(&self, band: BandName, margin: usize) -> usize {
        let (rows, cols) = self.stable_region(band, margin);
        rows.len() * cols.len()
    }
}

/// The seven bands of a two-level decomposition plus the shapes needed to invert it.
#[derive(Debug, Clone, PartialEq)]
pub struct SubbandSet {
    layout: Layout,
    bands: Vec<Band>,
}

impl SubbandSet {
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn band(&self, name: BandName) -> &Band {
        &self.bands[name.index()]
    }

    pub fn band_mut(&mut self, name: BandName) -> &mut Band {
        &mut self.bands[name.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (BandName, &Band)> {
        BandName::ALL.into_iter().zip(self.bands.iter())
    }
}

fn extended(signal: &[f64], idx: isize) -> f64 {
    let n = signal.len() as isize;
    let i = if idx < 0 {
        -idx - 1
    } else if idx >= n {
        2 * n - 1 - idx
    } else {
        idx
    };
    signal[i as usize]
}

fn analyze(signal: &[f64], lo: &mut [f64], hi: &mut [f64]) {
    for (k, (a, d)) in lo.iter_mut().zip(hi.iter_mut()).enumerate() {
        let centre = 2 * k as isize + 1;
        let (mut sum_lo, mut sum_hi) = (0.0, 0.0);
        for j in 0..FILTER_LEN {
            let x = extended(signal, centre - j as isize);
            sum_lo += DEC_LO[j] * x;
            sum_hi += DEC_HI[j] * x;
        }
        *a = sum_lo;
        *d = sum_hi;
    }
}

fn synthesize(lo: &[f64], hi: &[f64], out: &mut [f64]) {
    let last = lo.len() - 1;
    for (n, slot) in out.iter_mut().enumerate() {
        let k_end = ((n + FILTER_LEN - 2) / 2).min(last);
        let mut sum = 0.0;
        for k in n / 2..=k_end {
            let j = 2 * k + 1 - n;
            sum += lo[k] * DEC_LO[j] + hi[k] * DEC_HI[j];
        }
        *slot = sum;
    }
}

/// One analysis level: `[LL, LH, HL, HH]`.
fn analyze_2d(input: &Band) -> [Band; 4] {
    let (rows, cols) = input.shape();
    let (kr, kc) = (half_len(rows), half_len(cols));

    let mut lo_w = Band::zeros(rows, kc);
    let mut hi_w = Band::zeros(rows, kc);
    for r in 0..rows {
        analyze(input.row(r), lo_w.row_mut(r), hi_w.row_mut(r));
    }

    let mut ll = Band::zeros(kr, kc);
    let mut lh = Band::zeros(kr, kc);
    let mut hl = Band::zeros(kr, kc);
    let mut hh = Band::zeros(kr, kc);
    let mut column = vec![0.0; rows];
    let mut lo = vec![0.0; kr];
    let mut hi = vec![0.0; kr];

    for c in 0..kc {
        for (r, v) in column.iter_mut().enumerate() {
            *v = lo_w[(r, c)];
        }
        analyze(&column, &mut lo, &mut hi);
        for k in 0..kr {
            ll[(k, c)] = lo[k];
            lh[(k, c)] = hi[k];
        }

        for (r, v) in column.iter_mut().enumerate() {
            *v = hi_w[(r, c)];
        }
        analyze(&column, &mut lo, &mut hi);
        for k in 0..kr {
            hl[(k, c)] = lo[k];
            hh[(k, c)] = hi[k];
        }
    }

    [ll, lh, hl, hh]
}

/// One synthesis level, returning the natural (uncropped) output shape.
fn synthesize_2d(ll: &Band, lh: &Band, hl: &Band, hh: &Band) -> Band {
    let (kr, kc) = ll.shape();
    let (rows, cols) = (synthesis_len(kr), synthesis_len(kc));

    let mut lo_w = Band::zeros(rows, kc);
    let mut hi_w = Band::zeros(rows, kc);
    let mut lo = vec![0.0; kr];
    let mut hi = vec![0.0; kr];
    let mut column = vec![0.0; rows];

    for c in 0..kc {
        for k in 0..kr {
            lo[k] = ll[(k, c)];
            hi[k] = lh[(k, c)];
        }
        synthesize(&lo, &hi, &mut column);
        for (r, v) in column.iter().enumerate() {
            lo_w[(r, c)] = *v;
        }

        for k in 0..kr {
            lo[k] = hl[(k, c)];
            hi[k] = hh[(k, c)];
        }
        synthesize(&lo, &hi, &mut column);
        for (r, v) in column.iter().enumerate() {
            hi_w[(r, c)] = *v;
        }
    }

    let mut out = Band::zeros(rows, cols);
    for r in 0..rows {
        synthesize(lo_w.row(r), hi_w.row(r), out.row_mut(r));
    }
    out
}

/// Decomposes `image` into the seven sub-bands of a two-level DWT.
pub fn decompose(image: &GrayImage) -> Result<SubbandSet> {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let layout = Layout::new(width, height)?;

    let samples: Vec<f64> = image.pixels().map(|p| f64::from(p.0[0])).collect();
    let spatial = Band {
        rows: height,
        cols: width,
        data: samples,
    };

    let [ll1, lh1, hl1, hh1] = analyze_2d(&spatial);
    let [ll2, lh2, hl2, hh2] = analyze_2d(&ll1);

    // order matches BandName discriminants
    let bands = vec![ll2, lh2, hl2, hh2, lh1, hl1, hh1];
    Ok(SubbandSet { layout, bands })
}

/// Inverts [`decompose`], rounding and clipping to 8-bit samples.
pub fn reconstruct(bands: &SubbandSet) -> Result<GrayImage> {
    let layout = &bands.layout;
    for (name, band) in bands.iter() {
        let expected = layout.band_shape(name);
        if band.shape() != expected {
            return Err(StegoError::BandShape {
                band: name,
                expected,
                actual: band.shape(),
            });
        }
    }

    let (ll1_rows, ll1_cols) = layout.ll1_shape();
    let ll1 = synthesize_2d(
        bands.band(BandName::LL2),
        bands.band(BandName::LH2),
        bands.band(BandName::HL2),
        bands.band(BandName::HH2),
    )
    .fitted(ll1_rows, ll1_cols);

    let (height, width) = layout.image_shape();
    let spatial = synthesize_2d(
        &ll1,
        bands.band(BandName::LH1),
        bands.band(BandName::HL1),
        bands.band(BandName::HH1),
    )
    .fitted(height, width);

    Ok(GrayImage::from_fn(width as u32, height as u32, |x, y| {
        let v = spatial[(y as usize, x as usize)];
        Luma([v.round().clamp(0.0, 255.0) as u8])
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media;

    #[test]
    fn filters_are_orthonormal() {
        let energy: f64 = DEC_LO.iter().map(|h| h * h).sum();
        assert!((energy - 1.0).abs() < 1e-10);

        let dc: f64 = DEC_LO.iter().sum();
        assert!((dc - std::f64::consts::SQRT_2).abs() < 1e-10);

        for shift in [2, 4, 6] {
            let lo: f64 = (0..FILTER_LEN - shift).map(|n| DEC_LO[n] * DEC_LO[n + shift]).sum();
            assert!(lo.abs() < 1e-10, "shift {shift}: {lo}");
        }

        let cross: f64 = DEC_LO.iter().zip(DEC_HI.iter()).map(|(a, b)| a * b).sum();
        assert!(cross.abs() < 1e-10);
    }

    #[test]
    fn band_shapes_follow_filter_length() {
        let image = media::checkerboard_gradient(512, 512);
        let bands = decompose(&image).unwrap();

        assert_eq!(bands.layout().ll1_shape(), (259, 259));
        for name in [BandName::LH1, BandName::HL1, BandName::HH1] {
            assert_eq!(bands.band(name).shape(), (259, 259));
        }
        for name in [BandName::LL2, BandName::LH2, BandName::HL2, BandName::HH2] {
            assert_eq!(bands.band(name).shape(), (133, 133));
        }
    }

    #[test]
    fn round_trip_is_pixel_exact() {
        for (w, h) in [(512, 512), (64, 48), (37, 50), (9, 9)] {
            let image = media::speckled_disc(w, h, 7);
            let bands = decompose(&image).unwrap();
            let restored = reconstruct(&bands).unwrap();
            assert_eq!(restored.dimensions(), image.dimensions());
            assert_eq!(restored.as_raw(), image.as_raw(), "{w}x{h}");
        }
    }

    #[test]
    fn rejects_images_below_support() {
        let image = GrayImage::new(8, 64);
        let err = decompose(&image).unwrap_err();
        assert!(err.is_shape_error());
        assert!(matches!(err, StegoError::ImageTooSmall { width: 8, .. }));
    }

    #[test]
    fn rejects_misshaped_bands() {
        let image = media::checkerboard_gradient(64, 64);
        let mut bands = decompose(&image).unwrap();
        *bands.band_mut(BandName::HL1) = Band::zeros(3, 3);

        let err = reconstruct(&bands).unwrap_err();
        assert!(matches!(
            err,
            StegoError::BandShape {
                band: BandName::HL1,
                actual: (3, 3),
                ..
            }
        ));
    }

    #[test]
    fn stable_region_matches_geometry() {
        let layout = Layout::new(512, 512).unwrap();
        assert_eq!(layout.stable_region(BandName::HH1, 0), (3..256, 3..256));
        assert_eq!(layout.stable_region(BandName::HH2, 0), (5..128, 5..128));
        assert_eq!(layout.stable_region(BandName::LH1, 16), (16..256, 16..256));
        assert_eq!(layout.eligible_count(BandName::HL2, 16), 112 * 112);

        let tiny = Layout::new(20, 20).unwrap();
        assert_eq!(tiny.eligible_count(BandName::HH2, 16), 0);
    }

    #[test]
    fn stable_coefficients_survive_requantization() {
        let image = media::checkerboard_gradient(128, 96);
        let mut bands = decompose(&image).unwrap();
        let edits = [
            (BandName::HH1, 10, 40, 6.0),
            (BandName::LH1, 44, 60, -9.0),
            (BandName::HL2, 6, 20, 12.0),
            (BandName::LL2, 20, 11, -8.0),
        ];
        for (band, row, col, delta) in edits {
            bands.band_mut(band)[(row, col)] += delta;
        }

        let stego = reconstruct(&bands).unwrap();
        let again = decompose(&stego).unwrap();
        for (band, row, col, _) in edits {
            let expected = bands.band(band)[(row, col)];
            let actual = again.band(band)[(row, col)];
            assert!((expected - actual).abs() < 1.5, "{band}: {expected} vs {actual}");
        }
    }
}
