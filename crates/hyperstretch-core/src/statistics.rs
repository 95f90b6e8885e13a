//! Image statistics and the screen transfer function.
//!
//! The engine does not own image data. It consumes per-channel robust
//! statistics (median and median absolute deviation) through the
//! [`StatisticsProvider`] trait and turns them into the
//! `(shadow_clip, midtone, highlight_clip)` triple that drives the
//! screen transfer function family.
//!
//! [`Rgb8Statistics`] is a reference provider over interleaved 8-bit RGB
//! pixels. It bins each channel into a 256-entry histogram in one pass and
//! reads the median and MAD off the histograms.

use serde::{Deserialize, Serialize};

use crate::params::{Channel, ChannelSelection};

/// Shadow clipping distance below the median, in units of normalized MAD.
pub const SHADOW_CLIP_SIGMAS: f64 = 2.8;

/// Factor turning a MAD into a Gaussian-consistent standard deviation.
pub const MAD_TO_SIGMA: f64 = 1.4826;

/// Where the stretched background median lands.
pub const TARGET_BACKGROUND: f64 = 0.25;

/// Midtone balance is kept inside `[MIN_MIDTONE, 1 - MIN_MIDTONE]`.
pub const MIN_MIDTONE: f64 = 1e-4;

/// Midtones transfer function.
///
/// `mtf(m, x) = (m - 1) x / ((2m - 1) x - m)`. Maps 0 to 0, 1 to 1 and
/// `m` to 0.5.
pub fn mtf(m: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    (m - 1.0) * x / ((2.0 * m - 1.0) * x - m)
}

/// Robust statistics of one channel, normalized to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelStatistics {
    pub median: f64,
    /// Median absolute deviation from the median
    pub mad: f64,
}

impl ChannelStatistics {
    pub fn new(median: f64, mad: f64) -> Self {
        Self { median, mad }
    }

    /// Median and MAD of a sample slice.
    ///
    /// Returns `None` for an empty slice. NaN samples are ignored.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = samples.iter().copied().filter(|v| !v.is_nan()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);
        let median = sorted_median(&sorted);

        let mut deviations: Vec<f64> = sorted.iter().map(|v| (v - median).abs()).collect();
        deviations.sort_by(f64::total_cmp);
        let mad = sorted_median(&deviations);

        Some(Self { median, mad })
    }
}

fn sorted_median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

/// Source of per-channel statistics for the image being stretched.
pub trait StatisticsProvider {
    /// Statistics of one channel, or `None` if the image has no data for it.
    fn channel_statistics(&self, channel: Channel) -> Option<ChannelStatistics>;
}

/// Screen transfer function parameters for one channel (or linked channels).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StfParameters {
    pub shadow_clip: f64,
    pub midtone: f64,
    pub highlight_clip: f64,
}

impl Default for StfParameters {
    fn default() -> Self {
        Self {
            shadow_clip: 0.0,
            midtone: 0.5,
            highlight_clip: 1.0,
        }
    }
}

impl StfParameters {
    pub fn new(shadow_clip: f64, midtone: f64, highlight_clip: f64) -> Self {
        Self {
            shadow_clip,
            midtone,
            highlight_clip,
        }
    }

    /// Automatic parameters from channel statistics.
    ///
    /// The shadow clip sits `2.8` normalized MADs below the median; the
    /// midtone balance is chosen so the clipped median maps to
    /// [`TARGET_BACKGROUND`].
    pub fn from_statistics(stats: ChannelStatistics) -> Self {
        let shadow_clip =
            (stats.median - SHADOW_CLIP_SIGMAS * MAD_TO_SIGMA * stats.mad).clamp(0.0, 1.0);
        // mtf(m, x) = t  <=>  m = mtf(t, x)
        let midtone = mtf(TARGET_BACKGROUND, stats.median - shadow_clip);
        Self {
            shadow_clip,
            midtone,
            highlight_clip: 1.0,
        }
        .clamped()
    }

    /// Parameters for a channel selection.
    ///
    /// Linked stretches (and unlinked stretches of all channels at once)
    /// average the statistics of every channel the provider knows about.
    /// Returns `None` if the provider has no statistics at all.
    pub fn from_provider(
        provider: &dyn StatisticsProvider,
        selection: ChannelSelection,
        linked: bool,
    ) -> Option<Self> {
        match selection.single().filter(|_| !linked) {
            Some(channel) => provider
                .channel_statistics(channel)
                .map(Self::from_statistics),
            None => {
                let stats: Vec<ChannelStatistics> = Channel::ALL
                    .iter()
                    .filter_map(|&c| provider.channel_statistics(c))
                    .collect();
                if stats.is_empty() {
                    return None;
                }
                let n = stats.len() as f64;
                let median = stats.iter().map(|s| s.median).sum::<f64>() / n;
                let mad = stats.iter().map(|s| s.mad).sum::<f64>() / n;
                Some(Self::from_statistics(ChannelStatistics::new(median, mad)))
            }
        }
    }

    /// Separate parameters for each channel, in RGB order.
    pub fn per_channel(provider: &dyn StatisticsProvider) -> [Option<Self>; 3] {
        Channel::ALL.map(|c| provider.channel_statistics(c).map(Self::from_statistics))
    }

    /// Clip points inside `[0, 1]` with `shadow <= highlight`; midtone
    /// inside `[MIN_MIDTONE, 1 - MIN_MIDTONE]`. NaN falls back to defaults.
    pub fn clamped(self) -> Self {
        let or = |v: f64, fallback: f64| if v.is_nan() { fallback } else { v };
        let shadow_clip = or(self.shadow_clip, 0.0).clamp(0.0, 1.0);
        let highlight_clip = or(self.highlight_clip, 1.0).clamp(shadow_clip, 1.0);
        let midtone = or(self.midtone, 0.5).clamp(MIN_MIDTONE, 1.0 - MIN_MIDTONE);
        Self {
            shadow_clip,
            midtone,
            highlight_clip,
        }
    }
}

// ============================================================================
// Reference provider: 8-bit RGB
// ============================================================================

/// Per-channel histograms of an interleaved 8-bit RGB buffer.
#[derive(Debug, Clone)]
pub struct Rgb8Statistics {
    histograms: [[u32; 256]; 3],
    total: u64,
}

impl Rgb8Statistics {
    /// Bin RGB pixel data (3 bytes per pixel). A trailing partial pixel is
    /// ignored.
    pub fn from_pixels(pixels: &[u8]) -> Self {
        let mut histograms = [[0u32; 256]; 3];
        let mut total = 0u64;
        for chunk in pixels.chunks_exact(3) {
            histograms[0][chunk[0] as usize] += 1;
            histograms[1][chunk[1] as usize] += 1;
            histograms[2][chunk[2] as usize] += 1;
            total += 1;
        }
        Self { histograms, total }
    }

    /// Number of pixels binned.
    pub fn pixel_count(&self) -> u64 {
        self.total
    }

    pub fn histogram(&self, channel: Channel) -> &[u32; 256] {
        &self.histograms[channel.index()]
    }
}

impl StatisticsProvider for Rgb8Statistics {
    fn channel_statistics(&self, channel: Channel) -> Option<ChannelStatistics> {
        if self.total == 0 {
            return None;
        }
        let hist = self.histogram(channel);
        let median = weighted_median(
            hist.iter()
                .enumerate()
                .map(|(bin, &count)| (bin as f64 / 255.0, count)),
            self.total,
        );

        let mut deviations: Vec<(f64, u32)> = hist
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(bin, &count)| ((bin as f64 / 255.0 - median).abs(), count))
            .collect();
        deviations.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mad = weighted_median(deviations.into_iter(), self.total);

        Some(ChannelStatistics { median, mad })
    }
}

/// Lower median of ascending `(value, count)` pairs.
fn weighted_median(values: impl Iterator<Item = (f64, u32)>, total: u64) -> f64 {
    let half = total.div_ceil(2);
    let mut seen = 0u64;
    let mut last = 0.0;
    for (value, count) in values {
        if count == 0 {
            continue;
        }
        seen += u64::from(count);
        last = value;
        if seen >= half {
            break;
        }
    }
    last
}
