//! Hide byte payloads in grayscale images.
//!
//! The cover is decomposed with a two-level db4 wavelet transform, a selector picks detail
//! coefficients, and each bit of a length-prefixed frame is written by parity quantization
//! (QIM). The receiver needs the same [`EmbeddingConfig`] and nothing else.
//!
//! ```no_run
//! use wavelet_stego::{embed, extract, media, EmbeddingConfig};
//!
//! let cover = media::load_grayscale("cover.png")?;
//! let config = EmbeddingConfig::default();
//! let stego = embed(&cover, b"meet at dawn", &config)?;
//! media::save_image(&stego, "stego.png")?;
//! assert_eq!(extract(&stego, &config)?, b"meet at dawn");
//! # Ok::<(), wavelet_stego::StegoError>(())
//! ```

pub mod capacity;
pub mod chaos;
pub mod config;
pub mod dct;
pub mod dwt;
pub mod error;
pub mod frame;
pub mod media;
pub mod qim;
pub mod quality;
pub mod selection;

use image::GrayImage;
use log::{debug, info};

pub use capacity::{capacity, max_payload_len, spatial_capacity};
pub use config::{EmbeddingConfig, SelectionStrategy, StepPolicy};
pub use dwt::{decompose, reconstruct, BandName, SubbandSet};
pub use error::{Result, StegoError};
pub use quality::{mse, psnr};

use capacity::capacity_for;
use dwt::Layout;
use frame::{HEADER_BITS, HEADER_LEN};
use selection::{CoefficientSelector, Selector};

/// Error-feedback rounds tried when clipping to 8 bits disturbs embedded coefficients.
pub const REPAIR_ROUNDS: usize = 8;

/// Embeds `payload` into `cover` and returns the stego image.
///
/// Fails with [`StegoError::CapacityExceeded`] before touching any coefficient when the
/// framed payload does not fit. The result is decoded once before it is returned; when
/// clipping at black or white areas breaks it, the lost part of every coefficient is added
/// back for up to [`REPAIR_ROUNDS`] rounds, and [`StegoError::ClippingLoss`] is returned if
/// it still does not decode.
pub fn embed(cover: &GrayImage, payload: &[u8], config: &EmbeddingConfig) -> Result<GrayImage> {
    config.validate()?;
    let (width, height) = cover.dimensions();
    let layout = Layout::new(width as usize, height as usize)?;

    let available = capacity_for(&layout, config);
    let required = payload.len().saturating_add(HEADER_LEN);
    if required > available {
        return Err(StegoError::CapacityExceeded {
            required,
            available,
        });
    }

    let selector = Selector::from_config(config);
    let mut bands = decompose(cover)?;
    selector.stabilize(&mut bands);

    let bits = frame::frame(payload)?;
    let addresses = selector.select(&bands, bits.len())?;
    let (header_bits, body_bits) = bits.split_at(HEADER_BITS);
    let (header_addrs, body_addrs) = addresses.split_at(HEADER_BITS);

    let body_step = config.body_step(payload.len());
    debug!(
        "{} coefficients selected, header step {}, body step {body_step}",
        addresses.len(),
        config.header_step()
    );
    qim::embed_into(&mut bands, header_addrs, header_bits, config.header_step())?;
    qim::embed_into(&mut bands, body_addrs, body_bits, body_step)?;

    let step_at = |i: usize| {
        if i < HEADER_BITS {
            config.header_step()
        } else {
            body_step
        }
    };
    let targets: Vec<f64> = addresses
        .iter()
        .map(|a| bands.band(a.band)[(a.row, a.col)])
        .collect();

    let mut round = 0;
    loop {
        let stego = reconstruct(&bands)?;
        let observed = decompose(&stego)?;
        if matches!(extract_from(&observed, config), Ok(ref decoded) if decoded.as_slice() == payload) {
            info!(
                "embedded {} bytes with {} selection, body step {body_step}, {required}/{available} bytes used",
                payload.len(),
                config.strategy().name(),
            );
            return Ok(stego);
        }

        if round == REPAIR_ROUNDS {
            let bit_errors = addresses
                .iter()
                .zip(bits.iter())
                .enumerate()
                .filter(|(i, (a, bit))| {
                    qim::extract_bit(observed.band(a.band)[(a.row, a.col)], step_at(*i)) != **bit
                })
                .count();
            return Err(StegoError::ClippingLoss {
                bit_errors,
                bits: bits.len(),
            });
        }
        round += 1;

        // push each drifted coefficient by what clipping took from it
        let mut pushed = 0;
        for (i, (a, target)) in addresses.iter().zip(&targets).enumerate() {
            let deficit = target - observed.band(a.band)[(a.row, a.col)];
            if deficit.abs() > step_at(i) / 4.0 {
                bands.band_mut(a.band)[(a.row, a.col)] += deficit;
                pushed += 1;
            }
        }
        debug!("repair round {round}: {pushed} coefficients compensated for clipping");
    }
}

fn extract_from(bands: &SubbandSet, config: &EmbeddingConfig) -> Result<Vec<u8>> {
    let available = capacity_for(bands.layout(), config);
    let selector = Selector::from_config(config);

    let header_addrs = selector.select(bands, HEADER_BITS)?;
    let mut bits = qim::extract_sequence(bands, &header_addrs, config.header_step())?;
    let length = frame::parse_length(&bits)?;
    if length.saturating_add(HEADER_LEN) > available {
        return Err(StegoError::DecodeMismatch {
            length,
            capacity: available,
        });
    }
    debug!("header announces {length} bytes");

    let addresses = selector.select(bands, HEADER_BITS + length * 8)?;
    let body = qim::extract_sequence(bands, &addresses[HEADER_BITS..], config.body_step(length))?;
    bits.extend_from_bitslice(body.as_bitslice());
    let (_, payload) = frame::unframe(&bits)?;
    Ok(payload)
}

/// Recovers the payload embedded with `config`.
///
/// A header announcing more than the image can hold yields [`StegoError::DecodeMismatch`];
/// a wrong configuration that happens to produce a plausible header yields wrong bytes, so
/// callers should authenticate what they get back.
pub fn extract(stego: &GrayImage, config: &EmbeddingConfig) -> Result<Vec<u8>> {
    config.validate()?;
    let bands = decompose(stego)?;
    let payload = extract_from(&bands, config)?;
    info!(
        "extracted {} bytes with {} selection",
        payload.len(),
        config.strategy().name()
    );
    Ok(payload)
}

/// Default configuration for each built-in strategy, in the order [`extract_any`] tries them.
pub fn default_candidates() -> Vec<EmbeddingConfig> {
    SelectionStrategy::defaults()
        .into_iter()
        .map(EmbeddingConfig::new)
        .collect()
}

/// Tries `candidates` in order and returns the index of the first that decodes, with its
/// payload. Only decode and capacity failures move on to the next candidate.
pub fn extract_any(
    stego: &GrayImage,
    candidates: &[EmbeddingConfig],
) -> Result<(usize, Vec<u8>)> {
    let bands = decompose(stego)?;
    let mut last_err = None;
    for (i, config) in candidates.iter().enumerate() {
        config.validate()?;
        match extract_from(&bands, config) {
            Ok(payload) => {
                info!(
                    "candidate {i} ({} selection) decoded {} bytes",
                    config.strategy().name(),
                    payload.len()
                );
                return Ok((i, payload));
            }
            Err(err) if err.is_decode_mismatch() || err.is_capacity_error() => {
                debug!("candidate {i} rejected: {err}");
                last_err = Some(err);
            }
            Err(err) => return Err(err),
        }
    }
    Err(last_err.unwrap_or_else(|| StegoError::InvalidConfig("no candidate configurations".into())))
}

#[cfg(test)]
mod tests {
    use image::Luma;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..len).map(|_| rng.gen()).collect()
    }

    fn cover() -> GrayImage {
        media::checkerboard_gradient(512, 512)
    }

    #[test]
    fn round_trip_across_strategies_and_sizes() {
        let cover = cover();
        for config in default_candidates() {
            for len in [0, 1, 100, 1000, 5000] {
                let payload = random_bytes(len, len as u64);
                let stego = embed(&cover, &payload, &config).unwrap();
                assert_eq!(stego.dimensions(), cover.dimensions());
                assert_eq!(
                    extract(&stego, &config).unwrap(),
                    payload,
                    "{} with {len} bytes",
                    config.strategy().name()
                );
            }
        }
    }

    #[test]
    fn short_message_is_nearly_invisible() {
        let cover = cover();
        let config = EmbeddingConfig::default();
        let stego = embed(&cover, b"Hello", &config).unwrap();
        assert_eq!(extract(&stego, &config).unwrap(), b"Hello");
        assert!(psnr(&cover, &stego).unwrap() > 55.0);
    }

    #[test]
    fn adaptive_step_keeps_quality_at_800_bytes() {
        let cover = cover();
        let config = EmbeddingConfig::default();
        let stego = embed(&cover, &random_bytes(800, 1), &config).unwrap();
        assert!(psnr(&cover, &stego).unwrap() > 50.0);
    }

    #[test]
    fn larger_steps_cost_quality() {
        let cover = cover();
        let payload = random_bytes(1000, 2);
        let mut last = f64::INFINITY;
        for step in [4.0, 5.0, 6.0, 7.0] {
            let config = EmbeddingConfig::default().with_fixed_step(step);
            let stego = embed(&cover, &payload, &config).unwrap();
            assert_eq!(extract(&stego, &config).unwrap(), payload);
            let quality = psnr(&cover, &stego).unwrap();
            assert!(quality < last, "step {step}: {quality} dB");
            last = quality;
        }
    }

    #[test]
    fn capacity_boundary() {
        let cover = cover();
        for config in default_candidates() {
            let name = config.strategy().name();
            let available = capacity(512, 512, &config).unwrap();

            let fits = random_bytes(available - HEADER_LEN, 3);
            let stego = embed(&cover, &fits, &config).unwrap();
            assert_eq!(extract(&stego, &config).unwrap(), fits, "{name}");

            let too_big = random_bytes(available - HEADER_LEN + 1, 4);
            let err = embed(&cover, &too_big, &config).unwrap_err();
            assert!(
                matches!(
                    err,
                    StegoError::CapacityExceeded { required, available: a }
                        if required == available + 1 && a == available
                ),
                "{name}: {err}"
            );
        }
    }

    fn split_black_white() -> GrayImage {
        GrayImage::from_fn(512, 512, |x, _| Luma([if x < 256 { 0 } else { 255 }]))
    }

    fn shadowed_waves() -> GrayImage {
        GrayImage::from_fn(512, 512, |x, y| {
            let v = 40.0 * (f64::from(x) / 17.0).sin() + 30.0 * (f64::from(y) / 23.0).cos() + 20.0;
            Luma([v.round().clamp(0.0, 255.0) as u8])
        })
    }

    #[test]
    fn clipped_covers_never_decode_silently() {
        for cover in [split_black_white(), shadowed_waves()] {
            for config in default_candidates() {
                for payload in [b"Hello".to_vec(), random_bytes(500, 7)] {
                    match embed(&cover, &payload, &config) {
                        Ok(stego) => assert_eq!(extract(&stego, &config).unwrap(), payload),
                        Err(err) => {
                            assert!(matches!(err, StegoError::ClippingLoss { .. }), "{err}");
                            assert!(err.is_capacity_error());
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn clipping_in_a_dark_stripe_is_compensated() {
        // rows 0..64 sit at 1, where the first header coefficients land
        let base = cover();
        let cover = GrayImage::from_fn(512, 512, |x, y| {
            if y < 64 {
                Luma([1])
            } else {
                *base.get_pixel(x, y)
            }
        });
        let config = EmbeddingConfig::default();
        let stego = embed(&cover, b"Hello", &config).unwrap();
        assert!(stego.as_raw().iter().take(512 * 64).any(|&p| p == 0));
        assert_eq!(extract(&stego, &config).unwrap(), b"Hello");
    }

    #[test]
    fn wrong_parameters_do_not_yield_the_payload() {
        let cover = cover();
        let payload = random_bytes(300, 5);
        let sent = EmbeddingConfig::new(SelectionStrategy::chaotic(0.5, 3.99));
        let stego = embed(&cover, &payload, &sent).unwrap();

        let wrong = [
            EmbeddingConfig::new(SelectionStrategy::chaotic(0.3, 3.99)),
            EmbeddingConfig::default(),
            EmbeddingConfig::new(SelectionStrategy::robustness(0.618, 3.95, 1024)),
        ];
        for config in wrong {
            match extract(&stego, &config) {
                Err(err) => assert!(err.is_decode_mismatch(), "{err}"),
                Ok(bytes) => assert_ne!(bytes, payload),
            }
        }
    }

    #[test]
    fn unmarked_cover_does_not_decode_as_payload() {
        let cover = media::speckled_disc(256, 256, 21);
        let config = EmbeddingConfig::default();
        match extract(&cover, &config) {
            Err(err) => assert!(err.is_decode_mismatch()),
            Ok(bytes) => assert!(bytes.len() + HEADER_LEN <= capacity(256, 256, &config).unwrap()),
        }
    }

    #[test]
    fn auto_detects_strategy() {
        let cover = cover();
        let candidates = default_candidates();
        let payload = b"which one was it".to_vec();
        let stego = embed(&cover, &payload, &candidates[2]).unwrap();

        let (index, found) = extract_any(&stego, &candidates).unwrap();
        // an earlier candidate may decode to garbage, never to the payload
        if index == 2 {
            assert_eq!(found, payload);
        } else {
            assert_ne!(found, payload);
            assert_eq!(extract(&stego, &candidates[2]).unwrap(), payload);
        }
        assert!(extract_any(&stego, &[]).is_err());
    }

    #[test]
    fn too_small_cover_is_a_shape_error() {
        let tiny = GrayImage::new(6, 6);
        let err = embed(&tiny, b"x", &EmbeddingConfig::default()).unwrap_err();
        assert!(err.is_shape_error());
        assert!(extract(&tiny, &EmbeddingConfig::default()).unwrap_err().is_shape_error());
    }

    #[test]
    fn survives_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stego.png");
        let cover = media::checkerboard_gradient(300, 260);
        let config = EmbeddingConfig::new(SelectionStrategy::robustness(0.7, 3.97, 256));
        let payload = random_bytes(400, 6);

        let stego = embed(&cover, &payload, &config).unwrap();
        media::save_image(&stego, &path).unwrap();
        let loaded = media::load_grayscale(&path).unwrap();
        assert_eq!(extract(&loaded, &config).unwrap(), payload);
    }

    #[test]
    fn config_travels_as_json() {
        let cover = cover();
        let config = EmbeddingConfig::new(SelectionStrategy::chaotic(0.77, 3.93)).with_margin(20);
        let received = EmbeddingConfig::from_json(&config.to_json().unwrap()).unwrap();
        let stego = embed(&cover, b"over the wire", &config).unwrap();
        assert_eq!(extract(&stego, &received).unwrap(), b"over the wire");
    }
}
