//! Performance metrics over a simulated equity curve.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::series::Frequency;
use crate::simulator::{EquityPoint, Trade};

const SECONDS_PER_YEAR: f64 = 365.0 * 86_400.0;

/// Headline performance numbers, serialized under `results` in the response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    /// Final equity over initial cash, minus one.
    pub total_return: f64,
    /// Annualized Sharpe ratio of per-bar equity returns. Zero when the
    /// curve has no variance.
    pub sharpe: f64,
    /// Largest peak-to-trough relative decline, as a positive fraction.
    pub max_drawdown: f64,
    /// Completed round trips.
    pub trades: usize,
    /// Return of holding the traded asset over the same window.
    pub buy_and_hold_return: f64,
    /// Strategy return relative to buy-and-hold.
    pub trades_only_return: f64,
    /// Auxiliary carry estimate: `Σ notional × years held × annual rate`.
    /// Reported, never subtracted from equity.
    pub funding_cost: f64,
}

pub struct MetricsCalculator {
    frequency: Frequency,
    init_cash: Decimal,
    annual_funding_rate: f64,
}

impl MetricsCalculator {
    pub fn new(frequency: Frequency, init_cash: Decimal, annual_funding_rate: f64) -> Self {
        Self {
            frequency,
            init_cash,
            annual_funding_rate,
        }
    }

    pub fn calculate(
        &self,
        equity: &[EquityPoint],
        trades: &[Trade],
        prices: &[f64],
    ) -> Result<Kpis> {
        if equity.is_empty() || prices.is_empty() {
            return Err(Error::InsufficientData(
                "empty equity curve or price series".into(),
            ));
        }

        let init = self.init_cash.to_f64().unwrap_or(0.0);
        let finals = equity[equity.len() - 1].equity.to_f64().unwrap_or(0.0);
        if init <= 0.0 {
            return Err(Error::NumericAnomaly {
                bar: 0,
                message: format!("non-positive initial cash {init}"),
            });
        }
        let total_return = finals / init - 1.0;

        let curve: Vec<f64> = equity
            .iter()
            .map(|p| p.equity.to_f64().unwrap_or(f64::NAN))
            .collect();
        let sharpe = self.sharpe(&curve)?;
        let max_drawdown = max_drawdown(&curve);

        let first_price = prices[0];
        let last_price = prices[prices.len() - 1];
        if first_price <= 0.0 || !first_price.is_finite() || !last_price.is_finite() {
            return Err(Error::NumericAnomaly {
                bar: 0,
                message: format!("unusable boundary prices {first_price}, {last_price}"),
            });
        }
        let buy_and_hold_return = last_price / first_price - 1.0;

        // A total-loss asset makes the relative measure undefined; fall back
        // to the strategy's own return.
        let trades_only_return = if (1.0 + buy_and_hold_return).abs() < f64::EPSILON {
            total_return
        } else {
            (1.0 + total_return) / (1.0 + buy_and_hold_return) - 1.0
        };

        let funding_cost = self.funding_cost(trades);

        let kpis = Kpis {
            total_return,
            sharpe,
            max_drawdown,
            trades: trades.len(),
            buy_and_hold_return,
            trades_only_return,
            funding_cost,
        };
        debug!(
            total_return,
            sharpe, max_drawdown, trades = trades.len(), "computed metrics"
        );
        Ok(kpis)
    }

    /// Annualized Sharpe of per-bar returns, population standard deviation.
    fn sharpe(&self, curve: &[f64]) -> Result<f64> {
        if curve.len() < 2 {
            return Ok(0.0);
        }
        let mut returns = Vec::with_capacity(curve.len() - 1);
        for (i, w) in curve.windows(2).enumerate() {
            if !w[0].is_finite() || w[0] <= 0.0 {
                return Err(Error::NumericAnomaly {
                    bar: i,
                    message: format!("unusable equity value {}", w[0]),
                });
            }
            returns.push(w[1] / w[0] - 1.0);
        }
        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        if std == 0.0 {
            return Ok(0.0);
        }
        Ok(mean / std * self.frequency.periods_per_year().sqrt())
    }

    fn funding_cost(&self, trades: &[Trade]) -> f64 {
        if self.annual_funding_rate == 0.0 {
            return 0.0;
        }
        trades
            .iter()
            .map(|t| {
                let notional = (t.entry_price * t.size).to_f64().unwrap_or(0.0);
                let held_years =
                    (t.exit_time - t.entry_time).num_seconds() as f64 / SECONDS_PER_YEAR;
                notional * held_years * self.annual_funding_rate
            })
            .sum()
    }
}

/// Peak-tracking maximum drawdown as a positive fraction of the peak.
fn max_drawdown(curve: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0f64;
    for &e in curve {
        if e > peak {
            peak = e;
        }
        if peak > 0.0 {
            worst = worst.max((peak - e) / peak);
        }
    }
    worst
}
