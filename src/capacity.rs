//! How many payload bytes a cover can carry.
//!
//! Capacity depends on image shape and configuration only, never on pixel content, so the
//! receiver computes exactly what the sender did.

use crate::config::EmbeddingConfig;
use crate::dwt::Layout;
use crate::error::Result;
use crate::frame::HEADER_LEN;
use crate::selection::{CoefficientSelector, Selector};

/// Framed bytes (header included) available in a `width x height` cover.
pub fn capacity(width: u32, height: u32, config: &EmbeddingConfig) -> Result<usize> {
    config.validate()?;
    let layout = Layout::new(width as usize, height as usize)?;
    Ok(capacity_for(&layout, config))
}

pub(crate) fn capacity_for(layout: &Layout, config: &EmbeddingConfig) -> usize {
    let pool = Selector::from_config(config).pool_size(layout);
    let usable = (pool as f64 * config.utilization()).floor() as usize;
    usable / 8
}

/// Largest payload, in bytes, that still fits with its length header.
pub fn max_payload_len(width: u32, height: u32, config: &EmbeddingConfig) -> Result<usize> {
    Ok(capacity(width, height, config)?.saturating_sub(HEADER_LEN))
}

/// One bit per pixel, the ceiling of plain spatial-domain LSB hiding. For comparison only.
pub fn spatial_capacity(width: u32, height: u32) -> usize {
    width as usize * height as usize / 8
}
