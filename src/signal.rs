//! Strategy configuration and per-bar signal generation.
//!
//! A strategy turns one or two data channels into a signal sequence aligned
//! one-to-one with the price bars. Signal generation is stateless with
//! respect to the portfolio: whether an `enter_long` actually opens a
//! position (or is a no-op because one is already open) is the simulator's
//! call.
//!
//! All crossings are evaluated on the transition between consecutive bars:
//! strict inequality on the current bar, opposite-or-equal on the previous.
//! Comparisons against NaN are false, so warmup bars and bar 0 never fire.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::transform::{moving_average, MaKind};

/// Per-bar trading signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    EnterLong,
    EnterShort,
    Exit,
    Hold,
}

/// Which channel of a series a strategy reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Indicator value channel (wire alias `v`).
    #[serde(alias = "v")]
    Value,
    /// Trading price channel (wire alias `usd`).
    #[serde(alias = "usd")]
    Price,
}

impl Default for Channel {
    fn default() -> Self {
        Channel::Value
    }
}

/// Direction of a zero-crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossDirection {
    Up,
    Down,
}

/// Take-profit / stop-loss percentages, in percent units (3.0 = 3%).
/// Enforced by the simulator, not baked into the signal stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BracketConfig {
    #[serde(default)]
    pub take_profit_pct: Option<f64>,
    #[serde(default)]
    pub stop_loss_pct: Option<f64>,
}

impl BracketConfig {
    pub fn validate(&self) -> Result<()> {
        if self.take_profit_pct.is_none() && self.stop_loss_pct.is_none() {
            return Err(Error::InvalidBracketConfiguration(
                "neither take-profit nor stop-loss is set".into(),
            ));
        }
        for (name, pct) in [
            ("take_profit_pct", self.take_profit_pct),
            ("stop_loss_pct", self.stop_loss_pct),
        ] {
            if let Some(p) = pct {
                if !p.is_finite() || p <= 0.0 {
                    return Err(Error::InvalidBracketConfiguration(format!(
                        "{name} must be a positive percentage, got {p}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Regime condition: where the trading price must sit relative to its MA for
/// entries to be allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegimeCondition {
    Above,
    Below,
}

/// Entry gate on the trading price versus its own moving average. Exits are
/// never blocked by the filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeFilter {
    pub ma_type: MaKind,
    pub ma_period: usize,
    pub condition: RegimeCondition,
}

/// Threshold strategy: enter when the channel crosses above `threshold_entry`,
/// exit when it crosses below `threshold_exit`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub threshold_entry: f64,
    pub threshold_exit: f64,
    #[serde(default)]
    pub apply_to: Channel,
}

/// Single-series MA crossover with independent entry and exit MA pairs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossoverConfig {
    #[serde(default = "default_fast")]
    pub entry_fast_period: usize,
    #[serde(default = "default_entry_slow")]
    pub entry_slow_period: usize,
    #[serde(default = "default_fast")]
    pub exit_fast_period: usize,
    #[serde(default = "default_exit_slow")]
    pub exit_slow_period: usize,
    #[serde(default = "default_ma")]
    pub entry_type: MaKind,
    #[serde(default = "default_ma")]
    pub exit_type: MaKind,
    #[serde(default = "default_up")]
    pub entry_direction: CrossDirection,
    #[serde(default = "default_down")]
    pub exit_direction: CrossDirection,
    #[serde(default)]
    pub apply_to: Channel,
}

fn default_fast() -> usize {
    7
}
fn default_entry_slow() -> usize {
    30
}
fn default_exit_slow() -> usize {
    14
}
fn default_ma() -> MaKind {
    MaKind::Sma
}
fn default_up() -> CrossDirection {
    CrossDirection::Up
}
fn default_down() -> CrossDirection {
    CrossDirection::Down
}

/// One side of a two-dataset crossover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetLeg {
    pub id: String,
    #[serde(default)]
    pub indicator: Channel,
    #[serde(default = "default_ma")]
    pub ma_type: MaKind,
    #[serde(default = "default_fast")]
    pub ma_period: usize,
}

/// Crossover between the MAs of two independent datasets, traded on a third
/// price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiDatasetCrossoverConfig {
    pub dataset1: DatasetLeg,
    pub dataset2: DatasetLeg,
    pub price_dataset_id: String,
    #[serde(default = "default_up")]
    pub entry_direction: CrossDirection,
    #[serde(default = "default_down")]
    pub exit_direction: CrossDirection,
    #[serde(default)]
    pub bracket: Option<BracketConfig>,
    #[serde(default)]
    pub regime_filter: Option<RegimeFilter>,
}

/// Strategy configuration, tagged on the wire by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StrategyConfig {
    #[serde(rename = "threshold")]
    Threshold(ThresholdConfig),
    #[serde(rename = "crossover")]
    Crossover(CrossoverConfig),
    #[serde(rename = "multi_dataset_crossover")]
    MultiDatasetCrossover(MultiDatasetCrossoverConfig),
}

const KNOWN_TYPES: &[&str] = &["threshold", "crossover", "multi_dataset_crossover"];

impl StrategyConfig {
    /// Parse a strategy from its JSON wire form.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| Error::UnknownStrategyType(format!("malformed JSON: {e}")))?;
        let tag = value
            .get("type")
            .and_then(|t| t.as_str())
            .unwrap_or("<missing>")
            .to_string();
        if !KNOWN_TYPES.contains(&tag.as_str()) {
            return Err(Error::UnknownStrategyType(tag));
        }
        let config: StrategyConfig = serde_json::from_value(value).map_err(|e| {
            Error::UnknownStrategyType(format!("invalid {tag} configuration: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let StrategyConfig::MultiDatasetCrossover(cfg) = self {
            if let Some(bracket) = &cfg.bracket {
                bracket.validate()?;
            }
        }
        Ok(())
    }

    /// Bracket handed to the simulator, if the variant carries one.
    pub fn bracket(&self) -> Option<BracketConfig> {
        match self {
            StrategyConfig::MultiDatasetCrossover(cfg) => cfg.bracket,
            _ => None,
        }
    }
}

/// True where `series[i]` crosses the zero line in `direction` on bar `i`.
fn zero_cross(diff: &[f64], i: usize, direction: CrossDirection) -> bool {
    if i == 0 {
        return false;
    }
    match direction {
        CrossDirection::Up => diff[i] > 0.0 && diff[i - 1] <= 0.0,
        CrossDirection::Down => diff[i] < 0.0 && diff[i - 1] >= 0.0,
    }
}

/// Merge entry and exit flags into one signal per bar. When both fire on the
/// same bar the entry wins.
fn merge(entries: &[bool], exits: &[bool]) -> Vec<Signal> {
    entries
        .iter()
        .zip(exits)
        .map(|(&e, &x)| {
            if e {
                Signal::EnterLong
            } else if x {
                Signal::Exit
            } else {
                Signal::Hold
            }
        })
        .collect()
}

/// Threshold transition signals over a channel.
pub fn threshold_signals(channel: &[f64], cfg: &ThresholdConfig) -> Vec<Signal> {
    let n = channel.len();
    let mut entries = vec![false; n];
    let mut exits = vec![false; n];
    for i in 1..n {
        let (prev, cur) = (channel[i - 1], channel[i]);
        entries[i] = cur > cfg.threshold_entry && prev <= cfg.threshold_entry;
        exits[i] = cur < cfg.threshold_exit && prev >= cfg.threshold_exit;
    }
    let signals = merge(&entries, &exits);
    debug!(
        entries = entries.iter().filter(|&&e| e).count(),
        exits = exits.iter().filter(|&&x| x).count(),
        "generated threshold signals"
    );
    signals
}

/// MA crossover signals over a single channel, with independent entry and
/// exit MA pairs.
pub fn crossover_signals(channel: &[f64], cfg: &CrossoverConfig) -> Vec<Signal> {
    let n = channel.len();
    let entry_fast = moving_average(cfg.entry_type, channel, cfg.entry_fast_period);
    let entry_slow = moving_average(cfg.entry_type, channel, cfg.entry_slow_period);
    let exit_fast = moving_average(cfg.exit_type, channel, cfg.exit_fast_period);
    let exit_slow = moving_average(cfg.exit_type, channel, cfg.exit_slow_period);

    let entry_diff: Vec<f64> = entry_fast
        .iter()
        .zip(&entry_slow)
        .map(|(f, s)| f - s)
        .collect();
    let exit_diff: Vec<f64> = exit_fast
        .iter()
        .zip(&exit_slow)
        .map(|(f, s)| f - s)
        .collect();

    let mut entries = vec![false; n];
    let mut exits = vec![false; n];
    for i in 0..n {
        entries[i] = zero_cross(&entry_diff, i, cfg.entry_direction);
        exits[i] = zero_cross(&exit_diff, i, cfg.exit_direction);
    }
    let signals = merge(&entries, &exits);
    debug!(
        entries = entries.iter().filter(|&&e| e).count(),
        exits = exits.iter().filter(|&&x| x).count(),
        "generated crossover signals"
    );
    signals
}

/// Crossover between the MAs of two aligned datasets. `prices` is the trading
/// price series the regime filter reads; all three slices share one index.
pub fn multi_dataset_signals(
    channel1: &[f64],
    channel2: &[f64],
    prices: &[f64],
    cfg: &MultiDatasetCrossoverConfig,
) -> Result<Vec<Signal>> {
    if channel1.len() != channel2.len() || channel1.len() != prices.len() {
        return Err(Error::SignalMismatch {
            signals: channel1.len().min(channel2.len()),
            bars: prices.len(),
        });
    }
    let n = prices.len();
    let ma1 = moving_average(cfg.dataset1.ma_type, channel1, cfg.dataset1.ma_period);
    let ma2 = moving_average(cfg.dataset2.ma_type, channel2, cfg.dataset2.ma_period);
    let diff: Vec<f64> = ma1.iter().zip(&ma2).map(|(a, b)| a - b).collect();

    let regime_ok: Vec<bool> = match &cfg.regime_filter {
        Some(filter) => {
            let ma = moving_average(filter.ma_type, prices, filter.ma_period);
            prices
                .iter()
                .zip(&ma)
                .map(|(&p, &m)| match filter.condition {
                    RegimeCondition::Above => p > m,
                    RegimeCondition::Below => p < m,
                })
                .collect()
        }
        None => vec![true; n],
    };

    let mut entries = vec![false; n];
    let mut exits = vec![false; n];
    for i in 0..n {
        entries[i] = zero_cross(&diff, i, cfg.entry_direction) && regime_ok[i];
        exits[i] = zero_cross(&diff, i, cfg.exit_direction);
    }
    let signals = merge(&entries, &exits);
    debug!(
        entries = entries.iter().filter(|&&e| e).count(),
        exits = exits.iter().filter(|&&x| x).count(),
        filtered = cfg.regime_filter.is_some(),
        "generated multi-dataset signals"
    );
    Ok(signals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_transition_crossing() {
        let cfg = ThresholdConfig {
            threshold_entry: 0.5,
            threshold_exit: -0.5,
            apply_to: Channel::Value,
        };
        let signals = threshold_signals(&[0.0, 1.0, 2.0, 0.0, -1.0, 0.0], &cfg);
        assert_eq!(
            signals,
            vec![
                Signal::Hold,
                Signal::EnterLong, // crosses above 0.5
                Signal::Hold,      // stays above, no re-fire
                Signal::Hold,
                Signal::Exit, // crosses below -0.5
                Signal::Hold,
            ]
        );
    }

    #[test]
    fn test_threshold_no_signal_at_bar_zero() {
        let cfg = ThresholdConfig {
            threshold_entry: 0.5,
            threshold_exit: -0.5,
            apply_to: Channel::Value,
        };
        // First value already above the entry threshold: a crossing needs a
        // prior bar to cross from.
        let signals = threshold_signals(&[5.0, 6.0], &cfg);
        assert_eq!(signals[0], Signal::Hold);
    }

    #[test]
    fn test_threshold_sitting_on_threshold_then_rising_fires() {
        let cfg = ThresholdConfig {
            threshold_entry: 0.5,
            threshold_exit: -0.5,
            apply_to: Channel::Value,
        };
        // prev == threshold counts as "at or below", so the rise fires.
        let signals = threshold_signals(&[0.5, 0.6], &cfg);
        assert_eq!(signals[1], Signal::EnterLong);
    }

    #[test]
    fn test_crossover_fires_on_fast_overtaking_slow() {
        let cfg = CrossoverConfig {
            entry_fast_period: 7,
            entry_slow_period: 30,
            exit_fast_period: 7,
            exit_slow_period: 14,
            entry_type: MaKind::Sma,
            exit_type: MaKind::Sma,
            entry_direction: CrossDirection::Up,
            exit_direction: CrossDirection::Down,
            apply_to: Channel::Value,
        };
        // Flat for 10 bars (fast == slow, diff 0), then a jump: the 7-bar
        // expanding MA reacts faster than the 30-bar one.
        let mut channel = vec![100.0; 10];
        channel.extend([110.0, 110.0, 110.0, 110.0, 110.0]);
        let signals = crossover_signals(&channel, &cfg);
        assert_eq!(signals[10], Signal::EnterLong);
        assert_eq!(
            signals.iter().filter(|&&s| s == Signal::EnterLong).count(),
            1
        );
    }

    #[test]
    fn test_multi_dataset_cross_at_bar_ten() {
        let cfg = MultiDatasetCrossoverConfig {
            dataset1: DatasetLeg {
                id: "mvrv".into(),
                indicator: Channel::Value,
                ma_type: MaKind::Sma,
                ma_period: 7,
            },
            dataset2: DatasetLeg {
                id: "price".into(),
                indicator: Channel::Value,
                ma_type: MaKind::Sma,
                ma_period: 30,
            },
            price_dataset_id: "btc-usd".into(),
            entry_direction: CrossDirection::Up,
            exit_direction: CrossDirection::Down,
            bracket: None,
            regime_filter: None,
        };
        // Both channels flat and equal for 10 bars, then channel 1 jumps:
        // its 7-bar MA overtakes channel 2's 30-bar MA exactly at bar 10.
        let mut c1 = vec![50.0; 10];
        c1.extend([60.0; 10]);
        let c2 = vec![50.0; 20];
        let prices = vec![100.0; 20];
        let signals = multi_dataset_signals(&c1, &c2, &prices, &cfg).unwrap();
        assert_eq!(signals[10], Signal::EnterLong);
        assert_eq!(
            signals.iter().filter(|&&s| s == Signal::EnterLong).count(),
            1
        );
        assert!(!signals.contains(&Signal::Exit));
    }

    #[test]
    fn test_regime_filter_gates_entries_only() {
        let base = MultiDatasetCrossoverConfig {
            dataset1: DatasetLeg {
                id: "a".into(),
                indicator: Channel::Value,
                ma_type: MaKind::Sma,
                ma_period: 2,
            },
            dataset2: DatasetLeg {
                id: "b".into(),
                indicator: Channel::Value,
                ma_type: MaKind::Sma,
                ma_period: 5,
            },
            price_dataset_id: "p".into(),
            entry_direction: CrossDirection::Up,
            exit_direction: CrossDirection::Down,
            bracket: None,
            regime_filter: Some(RegimeFilter {
                ma_type: MaKind::Sma,
                ma_period: 3,
                condition: RegimeCondition::Above,
            }),
        };
        let mut c1 = vec![10.0; 5];
        c1.extend([20.0; 5]);
        let c2 = vec![10.0; 10];
        // Price declining: always below its own MA, so the entry is blocked.
        let prices: Vec<f64> = (0..10).map(|i| 100.0 - i as f64).collect();
        let signals = multi_dataset_signals(&c1, &c2, &prices, &base).unwrap();
        assert!(!signals.contains(&Signal::EnterLong));
    }

    #[test]
    fn test_multi_dataset_length_mismatch() {
        let cfg = MultiDatasetCrossoverConfig {
            dataset1: DatasetLeg {
                id: "a".into(),
                indicator: Channel::Value,
                ma_type: MaKind::Sma,
                ma_period: 2,
            },
            dataset2: DatasetLeg {
                id: "b".into(),
                indicator: Channel::Value,
                ma_type: MaKind::Sma,
                ma_period: 2,
            },
            price_dataset_id: "p".into(),
            entry_direction: CrossDirection::Up,
            exit_direction: CrossDirection::Down,
            bracket: None,
            regime_filter: None,
        };
        let err = multi_dataset_signals(&[1.0, 2.0], &[1.0], &[1.0, 2.0], &cfg)
            .unwrap_err();
        assert!(matches!(err, Error::SignalMismatch { .. }));
    }

    #[test]
    fn test_from_json_threshold() {
        let cfg = StrategyConfig::from_json(
            r#"{"type": "threshold", "threshold_entry": 0.5,
                "threshold_exit": -0.5, "apply_to": "v"}"#,
        )
        .unwrap();
        match cfg {
            StrategyConfig::Threshold(t) => {
                assert_eq!(t.threshold_entry, 0.5);
                assert_eq!(t.apply_to, Channel::Value);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_from_json_crossover_defaults() {
        let cfg = StrategyConfig::from_json(r#"{"type": "crossover"}"#).unwrap();
        match cfg {
            StrategyConfig::Crossover(c) => {
                assert_eq!(c.entry_fast_period, 7);
                assert_eq!(c.entry_slow_period, 30);
                assert_eq!(c.exit_slow_period, 14);
                assert_eq!(c.entry_direction, CrossDirection::Up);
                assert_eq!(c.exit_direction, CrossDirection::Down);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_from_json_unknown_type() {
        let err = StrategyConfig::from_json(r#"{"type": "martingale"}"#).unwrap_err();
        assert!(matches!(err, Error::UnknownStrategyType(t) if t == "martingale"));
    }

    #[test]
    fn test_bracket_validation() {
        let empty = BracketConfig {
            take_profit_pct: None,
            stop_loss_pct: None,
        };
        assert!(empty.validate().is_err());

        let negative = BracketConfig {
            take_profit_pct: Some(-3.0),
            stop_loss_pct: None,
        };
        assert!(negative.validate().is_err());

        let ok = BracketConfig {
            take_profit_pct: Some(5.0),
            stop_loss_pct: Some(2.0),
        };
        assert!(ok.validate().is_ok());
    }
}
