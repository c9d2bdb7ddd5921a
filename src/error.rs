//! Error types for the backtest engine.
//!
//! Everything except [`Error::NumericAnomaly`] is a validation failure:
//! detected before simulation begins and returned to the caller without any
//! partial result. `NumericAnomaly` aborts the run mid-simulation and carries
//! the offending bar index. The engine never retries internally.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Series too short for the requested period, window, or alignment.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Corrupt ordering, or no dominant timestamp gap within tolerance.
    #[error("non-monotonic timestamps: {0}")]
    NonMonotonicTimestamp(String),

    /// Transform period outside `1..=len`.
    #[error("invalid transform period {period} for series of length {len}")]
    InvalidTransformPeriod { period: usize, len: usize },

    /// Unrecognized strategy variant tag.
    #[error("unknown strategy type: {0}")]
    UnknownStrategyType(String),

    /// Non-positive take-profit/stop-loss percentage, or an empty bracket.
    #[error("invalid bracket configuration: {0}")]
    InvalidBracketConfiguration(String),

    /// Fees or slippage outside `[0, 0.1]`, or non-positive initial cash.
    #[error("invalid cost parameters: {0}")]
    InvalidCostParameters(String),

    /// Signal sequence does not line up one-to-one with the price series.
    #[error("signal/price mismatch: {signals} signals for {bars} bars")]
    SignalMismatch { signals: usize, bars: usize },

    /// Unexpected NaN or non-finite value encountered mid-simulation.
    #[error("numeric anomaly at bar {bar}: {message}")]
    NumericAnomaly { bar: usize, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
