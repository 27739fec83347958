//! Impulse flattening and post-processing.
//!
//! Turns timestamped eight-band impulses into sampled band signals, then
//! filters, mixes, normalises and trims them into output channels.

pub mod filters;

pub use filters::{filter_bands, Biquad, LinkwitzRiley};

use crate::raytrace::AttenuatedImpulse;
use crate::spectrum::BAND_COUNT;

/// Impulses later than this never extend the output.
const MAX_TIME_LIMIT: f32 = 20.0;

/// Turn a collection of attenuated impulses into eight parallel band
/// signals at `sample_rate`. Impulses that round to the same sample add;
/// impulses with negative times are discarded.
pub fn flatten_impulses(impulses: &[AttenuatedImpulse], sample_rate: f32) -> Vec<Vec<f32>> {
    let max_time = impulses
        .iter()
        .fold(0.0f32, |max, impulse| max.max(impulse.time))
        .min(MAX_TIME_LIMIT);
    let len = (max_time * sample_rate).round() as usize + 1;

    let mut flattened = vec![vec![0.0f32; len]; BAND_COUNT];
    for impulse in impulses {
        if impulse.time < 0.0 {
            continue;
        }
        let sample = (impulse.time * sample_rate).round() as usize;
        if sample < len {
            for (band, signal) in flattened.iter_mut().enumerate() {
                signal[sample] += impulse.volume[band];
            }
        }
    }

    flattened
}

/// Flatten every channel of attenuated impulses.
pub fn flatten_channels(
    channels: &[Vec<AttenuatedImpulse>],
    sample_rate: f32,
) -> Vec<Vec<Vec<f32>>> {
    channels
        .iter()
        .map(|channel| flatten_impulses(channel, sample_rate))
        .collect()
}

/// Sum band signals of equal length into a single signal.
pub fn mixdown(bands: &[Vec<f32>]) -> Vec<f32> {
    let mut out = vec![0.0f32; bands.first().map_or(0, Vec::len)];
    for band in bands {
        for (sum, sample) in out.iter_mut().zip(band.iter()) {
            *sum += sample;
        }
    }
    out
}

/// Scale to a peak of 1. A silent signal is left unchanged.
pub fn normalize(signal: &mut [f32]) {
    let max = signal.iter().fold(0.0f32, |a, &b| a.max(b.abs()));
    if max > 0.0 {
        let scale = 1.0 / max;
        for sample in signal {
            *sample *= scale;
        }
    }
}

/// Normalise a channel set by its global peak, preserving channel balance.
pub fn normalize_channels(channels: &mut [Vec<f32>]) {
    let max = channels
        .iter()
        .flat_map(|channel| channel.iter())
        .fold(0.0f32, |a, &b| a.max(b.abs()));
    if max > 0.0 {
        let scale = 1.0 / max;
        for channel in channels {
            for sample in channel {
                *sample *= scale;
            }
        }
    }
}

pub fn scale(signal: &mut [f32], factor: f32) {
    for sample in signal {
        *sample *= factor;
    }
}

/// Truncate every channel after the last sample of at least `min_volume`
/// anywhere in the set. When no sample qualifies the channels become empty.
pub fn trim_tail(channels: &mut [Vec<f32>], min_volume: f32) {
    let len = channels
        .iter()
        .map(|channel| {
            channel
                .iter()
                .rposition(|sample| sample.abs() >= min_volume)
                .map_or(0, |index| index + 1)
        })
        .max()
        .unwrap_or(0);
    for channel in channels {
        channel.truncate(len);
    }
}

pub fn a2db(amplitude: f64) -> f64 {
    20.0 * amplitude.log10()
}

pub fn db2a(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Reverse cumulative sum of squares: `out[i] = Σ_{j≥i} sig[j]²`.
pub fn squintegrate(signal: &[f32]) -> Vec<f32> {
    let mut out = vec![0.0f32; signal.len()];
    let mut sum = 0.0f32;
    for (slot, &sample) in out.iter_mut().zip(signal.iter()).rev() {
        sum += sample * sample;
        *slot = sum;
    }
    out
}

/// Frames for the signal's integrated squared amplitude to decay by 60 dB:
/// the first index at which the normalised reverse energy drops below
/// `10^(-60/20)`.
pub fn rt60_frames(signal: &[f32]) -> usize {
    let mut integrated = squintegrate(signal);
    normalize(&mut integrated);
    let target = db2a(-60.0) as f32;
    integrated
        .iter()
        .position(|&value| value < target)
        .unwrap_or(integrated.len())
}

/// Geometric decay envelope starting at 1.
pub fn exponential_decay_envelope(len: usize, attenuation_factor: f32) -> Vec<f32> {
    let mut amplitude = 1.0f32;
    (0..len)
        .map(|_| {
            let current = amplitude;
            amplitude *= attenuation_factor;
            current
        })
        .collect()
}

pub fn elementwise_multiply(signal: &mut [f32], envelope: &[f32]) {
    for (sample, gain) in signal.iter_mut().zip(envelope.iter()) {
        *sample *= gain;
    }
}

/// The collected post-processing steps for flattened band data: band
/// filter, mixdown, then the optional gain stages.
pub fn process(
    mut data: Vec<Vec<Vec<f32>>>,
    sample_rate: f32,
    do_normalize: bool,
    lo_cutoff: f32,
    do_trim_tail: bool,
    volume_scale: f32,
) -> Vec<Vec<f32>> {
    for bands in &mut data {
        filter_bands(bands, sample_rate as f64, lo_cutoff as f64);
    }

    let mut channels: Vec<Vec<f32>> = data.iter().map(|bands| mixdown(bands)).collect();

    if do_normalize {
        normalize_channels(&mut channels);
    }
    if volume_scale != 1.0 {
        for channel in &mut channels {
            scale(channel, volume_scale);
        }
    }
    if do_trim_tail {
        trim_tail(&mut channels, 1e-5);
    }

    channels
}
