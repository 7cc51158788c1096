//! Coefficient selection strategies.
//!
//! A selector turns a decomposition into an ordered list of coefficient addresses. Sender
//! and receiver both call [`CoefficientSelector::select`]; the receiver must get back the
//! same addresses from the stego image, so every selector only reads values that the
//! embedding itself never moves, and every selector is prefix-stable: the first `n`
//! addresses of a request for `m >= n` are exactly a request for `n`.

use crate::chaos::LogisticParams;
use crate::config::{EmbeddingConfig, SelectionStrategy};
use crate::dwt::{BandName, Layout, SubbandSet};
use crate::error::{Result, StegoError};

/// Position of a single coefficient inside a [`SubbandSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoefficientAddress {
    pub band: BandName,
    pub row: usize,
    pub col: usize,
}

impl CoefficientAddress {
    pub fn new(band: BandName, row: usize, col: usize) -> Self {
        CoefficientAddress { band, row, col }
    }
}

/// Ordered addresses, without duplicates.
pub type CoefficientSequence = Vec<CoefficientAddress>;

pub trait CoefficientSelector {
    /// Number of distinct addresses the selector can produce for `layout`.
    fn pool_size(&self, layout: &Layout) -> usize;

    /// The first `count` addresses of the selection order.
    fn select(&self, bands: &SubbandSet, count: usize) -> Result<CoefficientSequence>;

    /// Nudges the values `select` reads so that the ranking survives the round trip through
    /// an 8-bit image. Called once on the working copy before embedding.
    fn stabilize(&self, _bands: &mut SubbandSet) {}
}

fn ensure_pool(required: usize, available: usize) -> Result<()> {
    if required > available {
        return Err(StegoError::InsufficientCoefficients {
            required,
            available,
        });
    }
    Ok(())
}

/// Stable coefficients of `bands` in band order, then raster order.
fn eligible(layout: &Layout, bands: &[BandName], margin: usize) -> CoefficientSequence {
    let mut pool = Vec::with_capacity(bands.iter().map(|b| layout.eligible_count(*b, margin)).sum());
    for &band in bands {
        let (rows, cols) = layout.stable_region(band, margin);
        for row in rows {
            pool.extend(cols.clone().map(|col| CoefficientAddress::new(band, row, col)));
        }
    }
    pool
}

/// Band order, then raster order.
#[derive(Debug, Clone)]
pub struct FixedSelector {
    bands: Vec<BandName>,
    margin: usize,
}

impl FixedSelector {
    pub fn new(bands: impl Into<Vec<BandName>>, margin: usize) -> Self {
        FixedSelector {
            bands: bands.into(),
            margin,
        }
    }
}

impl CoefficientSelector for FixedSelector {
    fn pool_size(&self, layout: &Layout) -> usize {
        self.bands
            .iter()
            .map(|band| layout.eligible_count(*band, self.margin))
            .sum()
    }

    fn select(&self, bands: &SubbandSet, count: usize) -> Result<CoefficientSequence> {
        let layout = bands.layout();
        ensure_pool(count, self.pool_size(layout))?;
        let mut pool = eligible(layout, &self.bands, self.margin);
        pool.truncate(count);
        Ok(pool)
    }
}

/// Logistic-map indices into the eligible pool, linear probing past collisions.
#[derive(Debug, Clone)]
pub struct ChaoticSelector {
    bands: Vec<BandName>,
    margin: usize,
    chaos: LogisticParams,
}

impl ChaoticSelector {
    pub fn new(bands: impl Into<Vec<BandName>>, margin: usize, chaos: LogisticParams) -> Self {
        ChaoticSelector {
            bands: bands.into(),
            margin,
            chaos,
        }
    }
}

impl CoefficientSelector for ChaoticSelector {
    fn pool_size(&self, layout: &Layout) -> usize {
        self.bands
            .iter()
            .map(|band| layout.eligible_count(*band, self.margin))
            .sum()
    }

    fn select(&self, bands: &SubbandSet, count: usize) -> Result<CoefficientSequence> {
        let pool = eligible(bands.layout(), &self.bands, self.margin);
        ensure_pool(count, pool.len())?;

        let mut taken = vec![false; pool.len()];
        let mut map = self.chaos.map();
        let mut picked = Vec::with_capacity(count);
        while picked.len() < count {
            let mut idx = map.next_index(pool.len());
            while taken[idx] {
                idx = (idx + 1) % pool.len();
            }
            taken[idx] = true;
            picked.push(pool[idx]);
        }
        Ok(picked)
    }
}

/// Parent magnitudes at which [`robustness_score`] changes value.
pub const SCORE_THRESHOLDS: [f64; 4] = [5.0, 10.0, 50.0, 100.0];

/// Distance [`RobustnessSelector::stabilize`] keeps between a parent magnitude and every
/// threshold. Larger than the drift a stable coefficient sees through 8-bit rounding.
pub const SCORE_GUARD: f64 = 2.0;

/// Preference for hiding a bit under a parent of magnitude `magnitude`.
///
/// Medium magnitudes are favoured: near-zero coefficients sit in flat areas where changes
/// show, very large ones sit on strong edges.
pub fn robustness_score(magnitude: f64) -> f64 {
    if (10.0..=50.0).contains(&magnitude) {
        1.0
    } else if (5.0..10.0).contains(&magnitude) {
        0.7
    } else if magnitude > 50.0 && magnitude <= 100.0 {
        0.5
    } else {
        0.1
    }
}

/// Moves `value` at least [`SCORE_GUARD`] away from every threshold, staying on its side.
fn guard(value: f64) -> f64 {
    let magnitude = value.abs();
    for threshold in SCORE_THRESHOLDS {
        if (magnitude - threshold).abs() < SCORE_GUARD {
            let snapped = if magnitude < threshold {
                threshold - SCORE_GUARD
            } else {
                threshold + SCORE_GUARD
            };
            return snapped.copysign(value);
        }
    }
    value
}

/// Level-1 detail coefficients ranked by their level-2 parent, picked chaotically from a
/// sliding window over the ranking.
///
/// The score reads the parent `(row / 2, col / 2)` of the same orientation instead of the
/// coefficient itself: bits are only ever written into level-1 coefficients, so parents move
/// by rounding noise alone and [`CoefficientSelector::stabilize`] keeps that noise from
/// crossing a score boundary.
#[derive(Debug, Clone)]
pub struct RobustnessSelector {
    bands: Vec<BandName>,
    margin: usize,
    chaos: LogisticParams,
    window: usize,
}

impl RobustnessSelector {
    pub fn new(
        bands: impl Into<Vec<BandName>>,
        margin: usize,
        chaos: LogisticParams,
        window: usize,
    ) -> Self {
        RobustnessSelector {
            bands: bands.into(),
            margin,
            chaos,
            window: window.max(1),
        }
    }

    /// Candidate rows and columns of a level-1 `band`: stable themselves, with a stable parent.
    fn child_region(
        &self,
        layout: &Layout,
        band: BandName,
        parent: BandName,
    ) -> (std::ops::Range<usize>, std::ops::Range<usize>) {
        let (rows, cols) = layout.stable_region(band, self.margin);
        let (parent_rows, parent_cols) = layout.stable_region(parent, 0);
        let clip = |own: std::ops::Range<usize>, up: std::ops::Range<usize>| {
            let end = own.end.min(2 * up.end);
            own.start.max(2 * up.start).min(end)..end
        };
        (clip(rows, parent_rows), clip(cols, parent_cols))
    }

    fn families(&self) -> impl Iterator<Item = (BandName, BandName)> + '_ {
        self.bands
            .iter()
            .filter_map(|&band| band.parent().map(|parent| (band, parent)))
    }

    fn candidates(&self, layout: &Layout) -> CoefficientSequence {
        let mut pool = Vec::new();
        for (band, parent) in self.families() {
            let (rows, cols) = self.child_region(layout, band, parent);
            for row in rows {
                pool.extend(cols.clone().map(|col| CoefficientAddress::new(band, row, col)));
            }
        }
        pool
    }
}

impl CoefficientSelector for RobustnessSelector {
    fn pool_size(&self, layout: &Layout) -> usize {
        self.families()
            .map(|(band, parent)| {
                let (rows, cols) = self.child_region(layout, band, parent);
                rows.len() * cols.len()
            })
            .sum()
    }

    fn select(&self, bands: &SubbandSet, count: usize) -> Result<CoefficientSequence> {
        let pool = self.candidates(bands.layout());
        ensure_pool(count, pool.len())?;

        let mut scored: Vec<(f64, CoefficientAddress)> = pool
            .into_iter()
            .map(|addr| {
                let parent = addr.band.parent().unwrap_or(addr.band);
                let magnitude = bands.band(parent)[(addr.row / 2, addr.col / 2)].abs();
                (robustness_score(magnitude), addr)
            })
            .collect();
        // stable: equal scores keep raster order
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut ranked = scored.into_iter().map(|(_, addr)| addr);
        let mut window: Vec<CoefficientAddress> = ranked.by_ref().take(self.window).collect();
        let mut map = self.chaos.map();
        let mut picked = Vec::with_capacity(count);
        while picked.len() < count {
            let idx = map.next_index(window.len());
            picked.push(window.remove(idx));
            if let Some(next) = ranked.next() {
                window.push(next);
            }
        }
        Ok(picked)
    }

    fn stabilize(&self, bands: &mut SubbandSet) {
        let layout = *bands.layout();
        for (band, parent) in self.families() {
            let (rows, cols) = self.child_region(&layout, band, parent);
            if rows.is_empty() || cols.is_empty() {
                continue;
            }
            let parent_band = bands.band_mut(parent);
            for row in rows.start / 2..=(rows.end - 1) / 2 {
                for col in cols.start / 2..=(cols.end - 1) / 2 {
                    let value = &mut parent_band[(row, col)];
                    *value = guard(*value);
                }
            }
        }
    }
}

/// Selector built from an [`EmbeddingConfig`].
#[derive(Debug, Clone)]
pub enum Selector {
    Fixed(FixedSelector),
    Chaotic(ChaoticSelector),
    Robustness(RobustnessSelector),
}

impl Selector {
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        let bands = config.bands().to_vec();
        let margin = config.margin();
        match config.strategy() {
            SelectionStrategy::Fixed => Selector::Fixed(FixedSelector::new(bands, margin)),
            SelectionStrategy::Chaotic(chaos) => {
                Selector::Chaotic(ChaoticSelector::new(bands, margin, *chaos))
            }
            SelectionStrategy::Robustness { chaos, window } => {
                Selector::Robustness(RobustnessSelector::new(bands, margin, *chaos, *window))
            }
        }
    }
}

impl CoefficientSelector for Selector {
    fn pool_size(&self, layout: &Layout) -> usize {
        match self {
            Selector::Fixed(s) => s.pool_size(layout),
            Selector::Chaotic(s) => s.pool_size(layout),
            Selector::Robustness(s) => s.pool_size(layout),
        }
    }

    fn select(&self, bands: &SubbandSet, count: usize) -> Result<CoefficientSequence> {
        match self {
            Selector::Fixed(s) => s.select(bands, count),
            Selector::Chaotic(s) => s.select(bands, count),
            Selector::Robustness(s) => s.select(bands, count),
        }
    }

    fn stabilize(&self, bands: &mut SubbandSet) {
        match self {
            Selector::Fixed(s) => s.stabilize(bands),
            Selector::Chaotic(s) => s.stabilize(bands),
            Selector::Robustness(s) => s.stabilize(bands),
        }
    }
}
