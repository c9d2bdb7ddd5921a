//! Backtest orchestration.
//!
//! [`BacktestEngine::run`] wires the pipeline together for one request:
//! window slicing, channel transforms, signal generation, simulation, and
//! metrics, dispatching on the strategy variant. The engine holds only the
//! cost parameters; all per-run state lives on the stack of `run` and is
//! gone when the result is returned.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::metrics::{Kpis, MetricsCalculator};
use crate::series::{AlignMethod, Frequency, HistoryWindow, Series};
use crate::signal::{
    crossover_signals, multi_dataset_signals, threshold_signals, Channel, StrategyConfig,
};
use crate::simulator::{CostParams, EquityPoint, PortfolioSimulator, Trade};
use crate::transform::ChannelTransforms;

/// One evaluation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRequest {
    pub strategy: StrategyConfig,
    /// Preprocessing applied to the primary series' channels. Ignored by the
    /// multi-dataset variant, which reads its datasets raw.
    #[serde(default)]
    pub transform: ChannelTransforms,
    #[serde(skip, default = "default_window")]
    pub window: HistoryWindow,
    #[serde(default = "default_align")]
    pub align: AlignMethod,
    /// Bypass frequency detection.
    #[serde(default)]
    pub override_freq: Option<Frequency>,
}

fn default_window() -> HistoryWindow {
    HistoryWindow::All
}

fn default_align() -> AlignMethod {
    AlignMethod::Intersection
}

impl BacktestRequest {
    pub fn new(strategy: StrategyConfig) -> Self {
        Self {
            strategy,
            transform: ChannelTransforms::default(),
            window: HistoryWindow::All,
            align: AlignMethod::Intersection,
            override_freq: None,
        }
    }
}

/// The full evaluation result, serializing to the
/// `{results, equity, trades, freq}` wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub results: Kpis,
    pub equity: Vec<EquityPoint>,
    pub trades: Vec<Trade>,
    pub freq: Frequency,
}

pub struct BacktestEngine {
    costs: CostParams,
}

impl BacktestEngine {
    pub fn new(costs: CostParams) -> Result<Self> {
        costs.validate()?;
        Ok(Self { costs })
    }

    /// Evaluate a strategy.
    ///
    /// `primary` feeds the single-series strategies and is `dataset1` of the
    /// multi-dataset variant; `secondary` is `dataset2` (required there,
    /// ignored elsewhere); `trading` is the price series the multi-dataset
    /// variant trades on, defaulting to `primary`.
    pub fn run(
        &self,
        request: &BacktestRequest,
        primary: &Series,
        secondary: Option<&Series>,
        trading: Option<&Series>,
    ) -> Result<BacktestResult> {
        request.strategy.validate()?;
        info!(
            strategy = strategy_name(&request.strategy),
            bars = primary.len(),
            "backtest start"
        );

        let (bars, signals) = match &request.strategy {
            StrategyConfig::Threshold(cfg) => {
                let series = self.prepare_single(request, primary)?;
                let channel = select_channel(&series, cfg.apply_to);
                let signals = threshold_signals(&channel, cfg);
                (series, signals)
            }
            StrategyConfig::Crossover(cfg) => {
                let series = self.prepare_single(request, primary)?;
                let channel = select_channel(&series, cfg.apply_to);
                let signals = crossover_signals(&channel, cfg);
                (series, signals)
            }
            StrategyConfig::MultiDatasetCrossover(cfg) => {
                let secondary = secondary.ok_or_else(|| {
                    Error::InsufficientData(
                        "multi-dataset strategy requires a second series".into(),
                    )
                })?;
                let trading = trading.unwrap_or(primary);

                let sliced = primary.slice_window(&request.window)?;
                let (d1, d2) = sliced.align(secondary, request.align)?;
                // Re-index everything onto the bars shared with the trading
                // series; the final intersection is exact because d2 already
                // shares d1's index.
                let (d1, t) = d1.align(trading, request.align)?;
                let (t, d2) = t.align(&d2, AlignMethod::Intersection)?;
                let (t, d1) = t.align(&d1, AlignMethod::Intersection)?;
                if t.len() != d1.len() || t.len() != d2.len() {
                    return Err(Error::SignalMismatch {
                        signals: d1.len().min(d2.len()),
                        bars: t.len(),
                    });
                }

                let c1 = select_channel(&d1, cfg.dataset1.indicator);
                let c2 = select_channel(&d2, cfg.dataset2.indicator);
                let prices = t.prices();
                let signals = multi_dataset_signals(&c1, &c2, &prices, cfg)?;
                (t, signals)
            }
        };

        let freq = match request.override_freq {
            Some(freq) => freq,
            None => bars.detect_frequency()?,
        };

        let simulator = PortfolioSimulator::new(self.costs)?;
        let output = simulator.run(bars.points(), &signals, request.strategy.bracket().as_ref())?;

        let calculator =
            MetricsCalculator::new(freq, self.costs.init_cash, self.costs.annual_funding_rate);
        let results = calculator.calculate(&output.equity, &output.trades, &bars.prices())?;

        info!(
            trades = output.trades.len(),
            total_return = results.total_return,
            freq = freq.as_str(),
            "backtest complete"
        );
        Ok(BacktestResult {
            results,
            equity: output.equity,
            trades: output.trades,
            freq,
        })
    }

    /// Slice, transform, and trim the warmup prefix for the single-series
    /// strategies.
    fn prepare_single(&self, request: &BacktestRequest, primary: &Series) -> Result<Series> {
        let sliced = primary.slice_window(&request.window)?;
        let values = request.transform.value.apply(&sliced.values())?;
        let prices = request.transform.price.apply(&sliced.prices())?;
        let transformed = sliced.with_channels(values, prices);

        // A price transform leaves a NaN warmup prefix the simulator must
        // never see; signals on those bars are impossible anyway.
        let start = transformed
            .points()
            .iter()
            .position(|p| p.price.is_finite())
            .ok_or_else(|| {
                Error::InsufficientData("no bars remain after transform warmup".into())
            })?;
        if start == 0 {
            return Ok(transformed);
        }
        Series::from_points(transformed.points()[start..].to_vec())
    }
}

fn select_channel(series: &Series, channel: Channel) -> Vec<f64> {
    match channel {
        Channel::Value => series.values(),
        Channel::Price => series.prices(),
    }
}

fn strategy_name(strategy: &StrategyConfig) -> &'static str {
    match strategy {
        StrategyConfig::Threshold(_) => "threshold",
        StrategyConfig::Crossover(_) => "crossover",
        StrategyConfig::MultiDatasetCrossover(_) => "multi_dataset_crossover",
    }
}
