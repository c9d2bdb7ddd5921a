//! Channel transforms and moving averages.
//!
//! Two families live here with deliberately different warmup behavior:
//!
//! - [`TransformSpec::apply`] preprocesses a data channel before signal
//!   generation. The first `period - 1` outputs are NaN: a smoothed value
//!   does not exist until a full window has been seen, and pretending
//!   otherwise would let a strategy trade on fabricated history.
//! - [`moving_average`] computes the signal-side MAs used by the crossover
//!   strategies and the regime filter. Those warm up on an expanding window
//!   (mean of whatever has been observed so far) so a slow MA is defined
//!   from the very first bar.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Smoothing applied to a channel before signal generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    None,
    Sma,
    Ema,
    Median,
}

impl Default for TransformKind {
    fn default() -> Self {
        TransformKind::None
    }
}

/// A transform applied to one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformSpec {
    #[serde(default)]
    pub kind: TransformKind,
    #[serde(default = "default_period")]
    pub period: usize,
}

fn default_period() -> usize {
    1
}

impl Default for TransformSpec {
    fn default() -> Self {
        Self {
            kind: TransformKind::None,
            period: 1,
        }
    }
}

/// Per-channel transforms for a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChannelTransforms {
    #[serde(default)]
    pub value: TransformSpec,
    #[serde(default)]
    pub price: TransformSpec,
}

impl TransformSpec {
    /// Reject periods outside `1..=len`.
    pub fn validate(&self, len: usize) -> Result<()> {
        if self.period < 1 || self.period > len {
            return Err(Error::InvalidTransformPeriod {
                period: self.period,
                len,
            });
        }
        Ok(())
    }

    /// Apply the transform. Output length equals input length; the first
    /// `period - 1` entries are NaN. Every kind is the identity at
    /// `period = 1`.
    pub fn apply(&self, values: &[f64]) -> Result<Vec<f64>> {
        self.validate(values.len())?;
        let out = match self.kind {
            TransformKind::None => values.to_vec(),
            TransformKind::Sma => rolling_sma(values, self.period),
            TransformKind::Ema => rolling_ema(values, self.period),
            TransformKind::Median => rolling_median(values, self.period),
        };
        Ok(out)
    }
}

/// Simple moving average over a fixed window, NaN until the window fills.
fn rolling_sma(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    let mut sum = 0.0;
    for (i, &v) in values.iter().enumerate() {
        sum += v;
        if i >= period {
            sum -= values[i - period];
        }
        if i + 1 >= period {
            out[i] = sum / period as f64;
        }
    }
    out
}

/// EMA seeded with the simple average of the first `period` points, then the
/// standard recursion with `alpha = 2 / (period + 1)`.
fn rolling_ema(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if values.len() < period {
        return out;
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let seed = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = seed;
    let mut ema = seed;
    for i in period..values.len() {
        ema = alpha * values[i] + (1.0 - alpha) * ema;
        out[i] = ema;
    }
    out
}

/// Rolling median over a fixed window. The window is kept as a sorted vector
/// updated by binary-search insert/remove, which stays cheap for the period
/// sizes this engine sees.
fn rolling_median(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    let mut window: Vec<f64> = Vec::with_capacity(period);
    for (i, &v) in values.iter().enumerate() {
        let pos = window.partition_point(|&w| w < v);
        window.insert(pos, v);
        if window.len() > period {
            let old = values[i - period];
            let pos = window.partition_point(|&w| w < old);
            window.remove(pos);
        }
        if i + 1 >= period {
            out[i] = if period % 2 == 1 {
                window[period / 2]
            } else {
                (window[period / 2 - 1] + window[period / 2]) / 2.0
            };
        }
    }
    out
}

/// Moving-average kind used on the signal side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaKind {
    Sma,
    Ema,
}

/// Expanding-warmup moving average: defined from bar 0, converging to the
/// fixed-window behavior once `period` observations exist.
pub fn moving_average(kind: MaKind, values: &[f64], period: usize) -> Vec<f64> {
    match kind {
        MaKind::Sma => sma_expanding(values, period),
        MaKind::Ema => ema_expanding(values, period),
    }
}

/// SMA with expanding warmup: the mean of the last `min(i + 1, period)`
/// observations.
pub fn sma_expanding(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    let mut sum = 0.0;
    for (i, &v) in values.iter().enumerate() {
        sum += v;
        if i >= period {
            sum -= values[i - period];
        }
        let n = (i + 1).min(period);
        out[i] = sum / n as f64;
    }
    out
}

/// EMA with the recursion seeded at the first observation,
/// `alpha = 2 / (period + 1)`.
pub fn ema_expanding(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    let Some(&first) = values.first() else {
        return out;
    };
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut ema = first;
    out[0] = ema;
    for (i, &v) in values.iter().enumerate().skip(1) {
        ema = alpha * v + (1.0 - alpha) * ema;
        out[i] = ema;
    }
    out
}
