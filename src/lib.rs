//! Backtest Engine
//!
//! Deterministic strategy evaluation over historical time series.
//!
//! # Features
//!
//! - **Series Alignment**: Epoch normalization, frequency detection, window
//!   slicing, and two-series alignment (intersection or forward-fill)
//! - **Channel Transforms**: SMA/EMA/median smoothing with honest warmup
//! - **Strategies**: Threshold crossing, MA crossover, and two-dataset MA
//!   crossover with optional bracket and regime filter
//! - **Portfolio Simulator**: Long/short state machine with per-leg fees,
//!   adverse slippage, and decimal cash accounting
//! - **Metrics**: Total return, annualized Sharpe, max drawdown,
//!   buy-and-hold comparison, funding cost
//!
//! Identical inputs always produce bit-identical results: there is no clock,
//! randomness, or shared state anywhere on the evaluation path.
//!
//! # Example
//!
//! ```ignore
//! use backtest_engine::{
//!     BacktestEngine, BacktestRequest, CostParams, Series, StrategyConfig,
//! };
//!
//! let series = Series::from_raw(rows)?;
//! let strategy = StrategyConfig::from_json(
//!     r#"{"type": "threshold", "threshold_entry": 0.5, "threshold_exit": -0.5}"#,
//! )?;
//!
//! let engine = BacktestEngine::new(CostParams::default())?;
//! let result = engine.run(&BacktestRequest::new(strategy), &series, None, None)?;
//! println!("Return: {:.2}%", result.results.total_return * 100.0);
//! ```

pub mod engine;
pub mod error;
pub mod metrics;
pub mod series;
pub mod signal;
pub mod simulator;
pub mod transform;

// Re-exports
pub use engine::{BacktestEngine, BacktestRequest, BacktestResult};
pub use error::{Error, Result};
pub use metrics::{Kpis, MetricsCalculator};
pub use series::{
    AlignMethod, Frequency, HistoryWindow, RawPoint, Series, TimeSeriesPoint,
};
pub use signal::{
    BracketConfig, Channel, CrossDirection, RegimeCondition, RegimeFilter, Signal,
    StrategyConfig,
};
pub use simulator::{
    CostParams, Direction, EquityPoint, ExitReason, PortfolioSimulator,
    SimulationOutput, Trade,
};
pub use transform::{ChannelTransforms, MaKind, TransformKind, TransformSpec};
