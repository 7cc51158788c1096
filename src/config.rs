//! Embedding parameters shared out of band by sender and receiver.
//!
//! An [`EmbeddingConfig`] is an immutable value: build it once, hand the same value to
//! [`crate::embed`] and [`crate::extract`]. It round-trips through JSON so both sides can
//! load it from the same file.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::chaos::LogisticParams;
use crate::dwt::BandName;
use crate::error::{Result, StegoError};

/// Bands used when nothing else is configured, in embedding order.
pub const DEFAULT_BANDS: [BandName; 6] = [
    BandName::HH1,
    BandName::HL1,
    BandName::LH1,
    BandName::HH2,
    BandName::HL2,
    BandName::LH2,
];

/// Leading rows/columns of every band that are never used.
pub const DEFAULT_MARGIN: usize = 16;

/// Step of the 32-bit length header, independent of the payload size.
pub const HEADER_STEP: f64 = 4.0;

/// Share of the eligible coefficients the capacity model hands out.
pub const DEFAULT_UTILIZATION: f64 = 0.9;

/// Ranked candidates the robustness selector draws from at any time.
pub const DEFAULT_WINDOW: usize = 1024;

/// How coefficients are picked from the eligible pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Band order, then raster order.
    Fixed,
    /// Logistic-map scatter over the whole pool.
    Chaotic(LogisticParams),
    /// Medium-magnitude ranking with a logistic pick inside a sliding window.
    Robustness { chaos: LogisticParams, window: usize },
}

impl SelectionStrategy {
    pub fn chaotic(seed: f64, mu: f64) -> Self {
        SelectionStrategy::Chaotic(LogisticParams::new(seed, mu))
    }

    pub fn robustness(seed: f64, mu: f64, window: usize) -> Self {
        SelectionStrategy::Robustness {
            chaos: LogisticParams::new(seed, mu),
            window,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SelectionStrategy::Fixed => "fixed",
            SelectionStrategy::Chaotic(_) => "chaotic",
            SelectionStrategy::Robustness { .. } => "robustness",
        }
    }

    /// The candidates tried by [`crate::extract_any`] when nothing is known.
    pub fn defaults() -> [SelectionStrategy; 3] {
        [
            SelectionStrategy::Fixed,
            SelectionStrategy::Chaotic(LogisticParams::default()),
            SelectionStrategy::robustness(0.618, 3.95, DEFAULT_WINDOW),
        ]
    }
}

impl Default for SelectionStrategy {
    fn default() -> Self {
        SelectionStrategy::Fixed
    }
}

/// Upper payload length (inclusive) served by a step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepTier {
    pub up_to: usize,
    pub step: f64,
}

/// Monotone payload-length to quantization-step table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTable {
    tiers: Vec<StepTier>,
    ceiling: f64,
}

impl StepTable {
    /// `tiers` sorted by `up_to`; `ceiling` serves every longer payload.
    pub fn new(tiers: Vec<StepTier>, ceiling: f64) -> Self {
        StepTable { tiers, ceiling }
    }

    pub fn step_for(&self, payload_len: usize) -> f64 {
        self.tiers
            .iter()
            .find(|tier| payload_len <= tier.up_to)
            .map_or(self.ceiling, |tier| tier.step)
    }

    fn validate(&self) -> Result<()> {
        let mut previous: Option<StepTier> = None;
        for tier in &self.tiers {
            check_step("step table entry", tier.step)?;
            if let Some(prev) = previous {
                if tier.up_to <= prev.up_to || tier.step < prev.step {
                    return Err(StegoError::InvalidConfig(
                        "step table must be strictly increasing in length and non-decreasing in step"
                            .into(),
                    ));
                }
            }
            previous = Some(*tier);
        }
        check_step("step table ceiling", self.ceiling)?;
        if previous.is_some_and(|last| self.ceiling < last.step) {
            return Err(StegoError::InvalidConfig(
                "step table ceiling is below its last tier".into(),
            ));
        }
        Ok(())
    }
}

impl Default for StepTable {
    fn default() -> Self {
        StepTable::new(
            vec![
                StepTier { up_to: 800, step: 4.0 },
                StepTier { up_to: 2500, step: 5.0 },
                StepTier { up_to: 4500, step: 6.0 },
            ],
            7.0,
        )
    }
}

/// Step used for the payload body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepPolicy {
    Adaptive(StepTable),
    Fixed { step: f64 },
}

impl StepPolicy {
    pub fn step_for(&self, payload_len: usize) -> f64 {
        match self {
            StepPolicy::Adaptive(table) => table.step_for(payload_len),
            StepPolicy::Fixed { step } => *step,
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            StepPolicy::Adaptive(table) => table.validate(),
            StepPolicy::Fixed { step } => check_step("fixed step", *step),
        }
    }
}

impl Default for StepPolicy {
    fn default() -> Self {
        StepPolicy::Adaptive(StepTable::default())
    }
}

fn check_step(what: &str, step: f64) -> Result<()> {
    if step.is_finite() && step > 0.0 {
        Ok(())
    } else {
        Err(StegoError::InvalidConfig(format!(
            "{what} must be a positive finite number, got {step}"
        )))
    }
}

/// Everything embed and extract must agree on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    strategy: SelectionStrategy,
    bands: Vec<BandName>,
    margin: usize,
    header_step: f64,
    steps: StepPolicy,
    utilization: f64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        EmbeddingConfig {
            strategy: SelectionStrategy::Fixed,
            bands: DEFAULT_BANDS.to_vec(),
            margin: DEFAULT_MARGIN,
            header_step: HEADER_STEP,
            steps: StepPolicy::default(),
            utilization: DEFAULT_UTILIZATION,
        }
    }
}

impl EmbeddingConfig {
    pub fn new(strategy: SelectionStrategy) -> Self {
        EmbeddingConfig {
            strategy,
            ..Default::default()
        }
    }

    pub fn with_strategy(self, strategy: SelectionStrategy) -> Self {
        EmbeddingConfig { strategy, ..self }
    }

    pub fn with_bands(self, bands: impl Into<Vec<BandName>>) -> Self {
        EmbeddingConfig {
            bands: bands.into(),
            ..self
        }
    }

    pub fn with_margin(self, margin: usize) -> Self {
        EmbeddingConfig { margin, ..self }
    }

    pub fn with_header_step(self, header_step: f64) -> Self {
        EmbeddingConfig {
            header_step,
            ..self
        }
    }

    pub fn with_steps(self, steps: StepPolicy) -> Self {
        EmbeddingConfig { steps, ..self }
    }

    /// Shorthand for a [`StepPolicy::Fixed`] body step.
    pub fn with_fixed_step(self, step: f64) -> Self {
        self.with_steps(StepPolicy::Fixed { step })
    }

    pub fn with_utilization(self, utilization: f64) -> Self {
        EmbeddingConfig {
            utilization,
            ..self
        }
    }

    pub fn strategy(&self) -> &SelectionStrategy {
        &self.strategy
    }

    pub fn bands(&self) -> &[BandName] {
        &self.bands
    }

    pub fn margin(&self) -> usize {
        self.margin
    }

    pub fn header_step(&self) -> f64 {
        self.header_step
    }

    pub fn steps(&self) -> &StepPolicy {
        &self.steps
    }

    pub fn utilization(&self) -> f64 {
        self.utilization
    }

    /// Body step for a payload of `payload_len` bytes.
    pub fn body_step(&self, payload_len: usize) -> f64 {
        self.steps.step_for(payload_len)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bands.is_empty() {
            return Err(StegoError::InvalidConfig("band list is empty".into()));
        }
        let unique: HashSet<_> = self.bands.iter().collect();
        if unique.len() != self.bands.len() {
            return Err(StegoError::InvalidConfig(
                "band list contains duplicates".into(),
            ));
        }
        check_step("header step", self.header_step)?;
        self.steps.validate()?;
        if !(self.utilization > 0.0 && self.utilization <= 1.0) {
            return Err(StegoError::InvalidConfig(format!(
                "utilization must lie in (0, 1], got {}",
                self.utilization
            )));
        }

        match &self.strategy {
            SelectionStrategy::Fixed => Ok(()),
            SelectionStrategy::Chaotic(chaos) => chaos.validate(),
            SelectionStrategy::Robustness { chaos, window } => {
                chaos.validate()?;
                if *window == 0 {
                    return Err(StegoError::InvalidConfig(
                        "robustness window must be at least 1".into(),
                    ));
                }
                if !self.bands.iter().any(|band| band.parent().is_some()) {
                    return Err(StegoError::InvalidConfig(
                        "robustness ranking needs at least one level-1 detail band".into(),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EmbeddingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
