//! Portfolio simulation over a signal sequence.
//!
//! The simulator walks the bars once, holding at most one open position, and
//! makes exactly one decision per bar:
//!
//! 1. With a position open and a bracket configured, the bracket is checked
//!    first against the bar's close. Stop-loss before take-profit. A bracket
//!    exit fills at the bracket price itself (fees, no slippage) and
//!    consumes the bar: no re-entry on the same close.
//! 2. Otherwise the bar's signal is acted on. An exit closes at the
//!    slippage-adjusted close; an opposite entry is a reversal, closing and
//!    re-opening in the same bar (two legs, two fees).
//! 3. An entry from flat invests all available cash net of the entry fee.
//!
//! Every bar appends one mark-to-market [`EquityPoint`] at the unadjusted
//! close. All cash, fee, and PnL arithmetic is done in `Decimal`.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::series::TimeSeriesPoint;
use crate::signal::{BracketConfig, Signal};

/// Execution cost model: proportional per-leg fees, symmetric slippage
/// applied against the trader, and the starting cash.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostParams {
    /// Fee per leg as a fraction of notional.
    pub fees: Decimal,
    /// Price slippage per fill as a fraction, always unfavorable.
    pub slippage: Decimal,
    /// Starting cash.
    pub init_cash: Decimal,
    /// Annual funding rate used for the auxiliary funding-cost metric.
    pub annual_funding_rate: f64,
}

impl Default for CostParams {
    fn default() -> Self {
        Self {
            fees: Decimal::new(5, 4),     // 0.05%
            slippage: Decimal::new(2, 4), // 0.02%
            init_cash: Decimal::from(10_000),
            annual_funding_rate: 0.0,
        }
    }
}

impl CostParams {
    const MAX_FRACTION: Decimal = Decimal::from_parts(1, 0, 0, false, 1); // 0.1

    pub fn validate(&self) -> Result<()> {
        for (name, v) in [("fees", self.fees), ("slippage", self.slippage)] {
            if v < Decimal::ZERO || v > Self::MAX_FRACTION {
                return Err(Error::InvalidCostParameters(format!(
                    "{name} must be within [0, 0.1], got {v}"
                )));
            }
        }
        if self.init_cash <= Decimal::ZERO {
            return Err(Error::InvalidCostParameters(format!(
                "init_cash must be positive, got {}",
                self.init_cash
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Signal,
    TakeProfit,
    StopLoss,
    EndOfData,
}

/// A completed round trip. Created only when a position closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_time: DateTime<Utc>,
    pub entry_price: Decimal,
    pub exit_time: DateTime<Utc>,
    pub exit_price: Decimal,
    pub direction: Direction,
    /// Position size in units of the traded asset.
    pub size: Decimal,
    /// Net profit after both legs' fees.
    pub pnl: Decimal,
    /// `pnl` relative to the cash committed at entry.
    pub return_pct: f64,
    /// Total fees across both legs.
    pub fees_paid: Decimal,
    pub exit_reason: ExitReason,
}

/// Mark-to-market portfolio value at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: Decimal,
}

/// The open position. Shorts are cash-collateralized: the entry notional is
/// held aside as margin until the position closes.
#[derive(Debug, Clone, Copy)]
struct Position {
    direction: Direction,
    entry_time: DateTime<Utc>,
    entry_price: Decimal,
    size: Decimal,
    margin: Decimal,
    entry_fee: Decimal,
    cash_before: Decimal,
}

/// Equity curve and trade log of one simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub equity: Vec<EquityPoint>,
    pub trades: Vec<Trade>,
}

pub struct PortfolioSimulator {
    costs: CostParams,
}

impl PortfolioSimulator {
    pub fn new(costs: CostParams) -> Result<Self> {
        costs.validate()?;
        Ok(Self { costs })
    }

    /// Run the state machine over `bars` and their 1:1 `signals`.
    pub fn run(
        &self,
        bars: &[TimeSeriesPoint],
        signals: &[Signal],
        bracket: Option<&BracketConfig>,
    ) -> Result<SimulationOutput> {
        if bars.len() != signals.len() {
            return Err(Error::SignalMismatch {
                signals: signals.len(),
                bars: bars.len(),
            });
        }
        if let Some(b) = bracket {
            b.validate()?;
        }

        let mut cash = self.costs.init_cash;
        let mut position: Option<Position> = None;
        let mut trades: Vec<Trade> = Vec::new();
        let mut equity = Vec::with_capacity(bars.len());

        for (i, (bar, &signal)) in bars.iter().zip(signals).enumerate() {
            let close = decimal_price(bar.price, i)?;
            let mut bar_consumed = false;

            // Bracket check precedes everything, stop-loss first.
            if let (Some(pos), Some(b)) = (position, bracket) {
                if let Some(fill_and_reason) = bracket_hit(&pos, close, b) {
                    let (fill, reason) = fill_and_reason;
                    let trade =
                        self.close_position(&mut cash, pos, bar.timestamp, fill, reason);
                    debug!(
                        bar = i,
                        exit_price = %trade.exit_price,
                        reason = ?reason,
                        "bracket exit"
                    );
                    trades.push(trade);
                    position = None;
                    bar_consumed = true;
                }
            }

            if !bar_consumed {
                match (signal, position) {
                    (Signal::Exit, Some(pos)) => {
                        let fill = self.slip(close, pos.direction, Leg::Close);
                        trades.push(self.close_position(
                            &mut cash,
                            pos,
                            bar.timestamp,
                            fill,
                            ExitReason::Signal,
                        ));
                        position = None;
                    }
                    (Signal::EnterLong, None) => {
                        position =
                            Some(self.open_position(&mut cash, bar, close, Direction::Long));
                    }
                    (Signal::EnterShort, None) => {
                        position =
                            Some(self.open_position(&mut cash, bar, close, Direction::Short));
                    }
                    // Reversal: close the opposite position, then enter.
                    (Signal::EnterLong, Some(pos)) if pos.direction == Direction::Short => {
                        let fill = self.slip(close, pos.direction, Leg::Close);
                        trades.push(self.close_position(
                            &mut cash,
                            pos,
                            bar.timestamp,
                            fill,
                            ExitReason::Signal,
                        ));
                        position =
                            Some(self.open_position(&mut cash, bar, close, Direction::Long));
                    }
                    (Signal::EnterShort, Some(pos)) if pos.direction == Direction::Long => {
                        let fill = self.slip(close, pos.direction, Leg::Close);
                        trades.push(self.close_position(
                            &mut cash,
                            pos,
                            bar.timestamp,
                            fill,
                            ExitReason::Signal,
                        ));
                        position =
                            Some(self.open_position(&mut cash, bar, close, Direction::Short));
                    }
                    // Re-entering an already-held direction, exiting while
                    // flat, and holding are all no-ops.
                    _ => {}
                }
            }

            equity.push(EquityPoint {
                timestamp: bar.timestamp,
                equity: mark_to_market(cash, &position, close),
            });
        }

        // Force-close anything still open on the final bar. This is an
        // ordinary market exit, so the close leg pays slippage like any
        // signal exit would.
        if let Some(pos) = position.take() {
            let last = &bars[bars.len() - 1];
            let close = decimal_price(last.price, bars.len() - 1)?;
            let fill = self.slip(close, pos.direction, Leg::Close);
            let trade = self.close_position(
                &mut cash,
                pos,
                last.timestamp,
                fill,
                ExitReason::EndOfData,
            );
            trades.push(trade);
            if let Some(point) = equity.last_mut() {
                point.equity = cash;
            }
        }

        info!(
            bars = bars.len(),
            trades = trades.len(),
            final_equity = %equity.last().map(|p| p.equity).unwrap_or(cash),
            "simulation complete"
        );
        Ok(SimulationOutput { equity, trades })
    }

    /// Slippage-adjusted fill price, always against the trader.
    fn slip(&self, close: Decimal, direction: Direction, leg: Leg) -> Decimal {
        let adverse = match (direction, leg) {
            // Longs buy high and sell low; shorts the reverse.
            (Direction::Long, Leg::Open) | (Direction::Short, Leg::Close) => {
                Decimal::ONE + self.costs.slippage
            }
            (Direction::Long, Leg::Close) | (Direction::Short, Leg::Open) => {
                Decimal::ONE - self.costs.slippage
            }
        };
        close * adverse
    }

    /// Commit all available cash to a new position, net of the entry fee.
    fn open_position(
        &self,
        cash: &mut Decimal,
        bar: &TimeSeriesPoint,
        close: Decimal,
        direction: Direction,
    ) -> Position {
        let cash_before = *cash;
        let notional = cash_before / (Decimal::ONE + self.costs.fees);
        let entry_fee = notional * self.costs.fees;
        let fill = self.slip(close, direction, Leg::Open);
        let size = notional / fill;
        *cash -= notional + entry_fee;

        debug!(
            direction = ?direction,
            entry_price = %fill,
            size = %size,
            "opened position"
        );
        Position {
            direction,
            entry_time: bar.timestamp,
            entry_price: fill,
            size,
            margin: notional,
            entry_fee,
            cash_before,
        }
    }

    fn close_position(
        &self,
        cash: &mut Decimal,
        pos: Position,
        time: DateTime<Utc>,
        fill: Decimal,
        exit_reason: ExitReason,
    ) -> Trade {
        let exit_notional = fill * pos.size;
        let exit_fee = exit_notional * self.costs.fees;
        match pos.direction {
            Direction::Long => {
                *cash += exit_notional - exit_fee;
            }
            Direction::Short => {
                let gross = (pos.entry_price - fill) * pos.size;
                *cash += pos.margin + gross - exit_fee;
            }
        }

        let pnl = *cash - pos.cash_before;
        let return_pct = (pnl / pos.cash_before).to_f64().unwrap_or(0.0);
        Trade {
            entry_time: pos.entry_time,
            entry_price: pos.entry_price,
            exit_time: time,
            exit_price: fill,
            direction: pos.direction,
            size: pos.size,
            pnl,
            return_pct,
            fees_paid: pos.entry_fee + exit_fee,
            exit_reason,
        }
    }
}

#[derive(Clone, Copy)]
enum Leg {
    Open,
    Close,
}

fn decimal_price(price: f64, bar: usize) -> Result<Decimal> {
    if !price.is_finite() {
        return Err(Error::NumericAnomaly {
            bar,
            message: format!("non-finite price {price}"),
        });
    }
    Decimal::from_f64(price).ok_or_else(|| Error::NumericAnomaly {
        bar,
        message: format!("price {price} not representable"),
    })
}

fn mark_to_market(cash: Decimal, position: &Option<Position>, close: Decimal) -> Decimal {
    match position {
        None => cash,
        Some(pos) => match pos.direction {
            Direction::Long => cash + pos.size * close,
            Direction::Short => cash + pos.margin + (pos.entry_price - close) * pos.size,
        },
    }
}

/// Bracket fill for the bar, if one triggers. Stop-loss is checked first.
fn bracket_hit(
    pos: &Position,
    close: Decimal,
    bracket: &BracketConfig,
) -> Option<(Decimal, ExitReason)> {
    let pct = |p: f64| Decimal::from_f64(p / 100.0).unwrap_or(Decimal::ZERO);

    if let Some(sl) = bracket.stop_loss_pct {
        let stop = match pos.direction {
            Direction::Long => pos.entry_price * (Decimal::ONE - pct(sl)),
            Direction::Short => pos.entry_price * (Decimal::ONE + pct(sl)),
        };
        let hit = match pos.direction {
            Direction::Long => close <= stop,
            Direction::Short => close >= stop,
        };
        if hit {
            return Some((stop, ExitReason::StopLoss));
        }
    }
    if let Some(tp) = bracket.take_profit_pct {
        let target = match pos.direction {
            Direction::Long => pos.entry_price * (Decimal::ONE + pct(tp)),
            Direction::Short => pos.entry_price * (Decimal::ONE - pct(tp)),
        };
        let hit = match pos.direction {
            Direction::Long => close >= target,
            Direction::Short => close <= target,
        };
        if hit {
            return Some((target, ExitReason::TakeProfit));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(prices: &[f64]) -> Vec<TimeSeriesPoint> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &price)| TimeSeriesPoint {
                timestamp: DateTime::from_timestamp(1_700_000_000 + i as i64 * 86_400, 0)
                    .unwrap(),
                value: 0.0,
                price,
            })
            .collect()
    }

    fn free_costs() -> CostParams {
        CostParams {
            fees: Decimal::ZERO,
            slippage: Decimal::ZERO,
            init_cash: Decimal::from(10_000),
            annual_funding_rate: 0.0,
        }
    }

    fn hold(n: usize) -> Vec<Signal> {
        vec![Signal::Hold; n]
    }

    #[test]
    fn test_flat_price_round_trip_preserves_equity() {
        let sim = PortfolioSimulator::new(free_costs()).unwrap();
        let bars = bars(&[100.0; 6]);
        let mut signals = hold(6);
        signals[1] = Signal::EnterLong;
        signals[4] = Signal::Exit;

        let out = sim.run(&bars, &signals, None).unwrap();
        assert_eq!(out.trades.len(), 1);
        assert_eq!(out.trades[0].pnl, Decimal::ZERO);
        assert_eq!(out.equity.len(), 6);
        for point in &out.equity {
            assert_eq!(point.equity, Decimal::from(10_000));
        }
    }

    #[test]
    fn test_no_signals_no_trades() {
        let sim = PortfolioSimulator::new(free_costs()).unwrap();
        let bars = bars(&[100.0, 150.0, 50.0]);
        let out = sim.run(&bars, &hold(3), None).unwrap();
        assert!(out.trades.is_empty());
        assert!(out
            .equity
            .iter()
            .all(|p| p.equity == Decimal::from(10_000)));
    }

    #[test]
    fn test_fees_reduce_final_equity() {
        let bars = bars(&[100.0; 6]);
        let mut signals = hold(6);
        signals[1] = Signal::EnterLong;
        signals[4] = Signal::Exit;

        let free = PortfolioSimulator::new(free_costs())
            .unwrap()
            .run(&bars, &signals, None)
            .unwrap();
        let costly = PortfolioSimulator::new(CostParams {
            fees: Decimal::new(1, 3), // 0.1%
            ..free_costs()
        })
        .unwrap()
        .run(&bars, &signals, None)
        .unwrap();

        let last = |o: &SimulationOutput| o.equity.last().unwrap().equity;
        assert!(last(&costly) < last(&free));
        assert!(costly.trades[0].fees_paid > Decimal::ZERO);
    }

    #[test]
    fn test_long_profit_and_equity_tracks_price() {
        let sim = PortfolioSimulator::new(free_costs()).unwrap();
        let bars = bars(&[100.0, 100.0, 120.0, 120.0]);
        let mut signals = hold(4);
        signals[1] = Signal::EnterLong;
        signals[3] = Signal::Exit;

        let out = sim.run(&bars, &signals, None).unwrap();
        assert_eq!(out.equity[2].equity, Decimal::from(12_000));
        assert_eq!(out.trades[0].pnl, Decimal::from(2_000));
        assert!((out.trades[0].return_pct - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_short_profits_from_decline() {
        let sim = PortfolioSimulator::new(free_costs()).unwrap();
        let bars = bars(&[100.0, 100.0, 80.0]);
        let mut signals = hold(3);
        signals[1] = Signal::EnterShort;

        let out = sim.run(&bars, &signals, None).unwrap();
        // Force-closed at end of data.
        assert_eq!(out.trades.len(), 1);
        let trade = &out.trades[0];
        assert_eq!(trade.direction, Direction::Short);
        assert_eq!(trade.exit_reason, ExitReason::EndOfData);
        assert_eq!(trade.pnl, Decimal::from(2_000));
        assert_eq!(out.equity.last().unwrap().equity, Decimal::from(12_000));
    }

    #[test]
    fn test_reversal_produces_two_trades() {
        let sim = PortfolioSimulator::new(free_costs()).unwrap();
        let bars = bars(&[100.0, 100.0, 110.0, 105.0]);
        let mut signals = hold(4);
        signals[1] = Signal::EnterLong;
        signals[2] = Signal::EnterShort;

        let out = sim.run(&bars, &signals, None).unwrap();
        assert_eq!(out.trades.len(), 2);
        assert_eq!(out.trades[0].direction, Direction::Long);
        assert_eq!(out.trades[0].exit_reason, ExitReason::Signal);
        assert_eq!(out.trades[1].direction, Direction::Short);
        // Long leg: 10000 -> 11000; short leg gains as price falls to 105.
        assert!(out.trades[1].pnl > Decimal::ZERO);
    }

    #[test]
    fn test_repeated_entry_signal_is_noop() {
        let sim = PortfolioSimulator::new(free_costs()).unwrap();
        let bars = bars(&[100.0, 100.0, 100.0, 100.0]);
        let signals = vec![
            Signal::Hold,
            Signal::EnterLong,
            Signal::EnterLong,
            Signal::Exit,
        ];
        let out = sim.run(&bars, &signals, None).unwrap();
        assert_eq!(out.trades.len(), 1);
    }

    #[test]
    fn test_stop_loss_fills_at_stop_price() {
        let sim = PortfolioSimulator::new(free_costs()).unwrap();
        let bars = bars(&[100.0, 100.0, 80.0, 80.0]);
        let mut signals = hold(4);
        signals[1] = Signal::EnterLong;
        let bracket = BracketConfig {
            take_profit_pct: None,
            stop_loss_pct: Some(5.0),
        };

        let out = sim.run(&bars, &signals, Some(&bracket)).unwrap();
        let trade = &out.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        // Fills at the stop itself, not the close that breached it.
        assert_eq!(trade.exit_price, Decimal::from(95));
        assert_eq!(trade.pnl, Decimal::from(-500));
    }

    #[test]
    fn test_take_profit_fills_at_target_price() {
        let sim = PortfolioSimulator::new(free_costs()).unwrap();
        let bars = bars(&[100.0, 100.0, 130.0, 130.0]);
        let mut signals = hold(4);
        signals[1] = Signal::EnterLong;
        let bracket = BracketConfig {
            take_profit_pct: Some(10.0),
            stop_loss_pct: None,
        };

        let out = sim.run(&bars, &signals, Some(&bracket)).unwrap();
        let trade = &out.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::TakeProfit);
        assert_eq!(trade.exit_price, Decimal::from(110));
        assert_eq!(trade.pnl, Decimal::from(1_000));
    }

    #[test]
    fn test_both_legs_set_stop_loss_fires_on_drop() {
        let sim = PortfolioSimulator::new(free_costs()).unwrap();
        let bars = bars(&[100.0, 100.0, 80.0, 80.0]);
        let mut signals = hold(4);
        signals[1] = Signal::EnterLong;
        let bracket = BracketConfig {
            take_profit_pct: Some(10.0),
            stop_loss_pct: Some(5.0),
        };

        let out = sim.run(&bars, &signals, Some(&bracket)).unwrap();
        assert_eq!(out.trades.len(), 1);
        let trade = &out.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert_eq!(trade.exit_price, Decimal::from(95));
    }

    #[test]
    fn test_both_legs_set_take_profit_fires_on_rally() {
        let sim = PortfolioSimulator::new(free_costs()).unwrap();
        let bars = bars(&[100.0, 100.0, 130.0, 130.0]);
        let mut signals = hold(4);
        signals[1] = Signal::EnterLong;
        let bracket = BracketConfig {
            take_profit_pct: Some(10.0),
            stop_loss_pct: Some(5.0),
        };

        let out = sim.run(&bars, &signals, Some(&bracket)).unwrap();
        assert_eq!(out.trades.len(), 1);
        let trade = &out.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::TakeProfit);
        assert_eq!(trade.exit_price, Decimal::from(110));
    }

    #[test]
    fn test_bracket_exit_consumes_bar() {
        let sim = PortfolioSimulator::new(free_costs()).unwrap();
        let bars = bars(&[100.0, 100.0, 80.0, 80.0]);
        // An entry signal lands on the same bar the stop fires: the stop
        // wins the bar and the entry is dropped.
        let mut signals = hold(4);
        signals[1] = Signal::EnterLong;
        signals[2] = Signal::EnterLong;
        let bracket = BracketConfig {
            take_profit_pct: None,
            stop_loss_pct: Some(5.0),
        };

        let out = sim.run(&bars, &signals, Some(&bracket)).unwrap();
        assert_eq!(out.trades.len(), 1);
        assert_eq!(out.trades[0].exit_reason, ExitReason::StopLoss);
    }

    #[test]
    fn test_short_stop_loss_on_rally() {
        let sim = PortfolioSimulator::new(free_costs()).unwrap();
        let bars = bars(&[100.0, 100.0, 120.0, 120.0]);
        let mut signals = hold(4);
        signals[1] = Signal::EnterShort;
        let bracket = BracketConfig {
            take_profit_pct: None,
            stop_loss_pct: Some(10.0),
        };

        let out = sim.run(&bars, &signals, Some(&bracket)).unwrap();
        let trade = &out.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert_eq!(trade.exit_price, Decimal::from(110));
        assert_eq!(trade.pnl, Decimal::from(-1_000));
    }

    #[test]
    fn test_slippage_is_adverse_on_both_legs() {
        let costs = CostParams {
            slippage: Decimal::new(1, 2), // 1%
            ..free_costs()
        };
        let sim = PortfolioSimulator::new(costs).unwrap();
        let bars = bars(&[100.0, 100.0, 100.0]);
        let mut signals = hold(3);
        signals[1] = Signal::EnterLong;
        signals[2] = Signal::Exit;

        let out = sim.run(&bars, &signals, None).unwrap();
        let trade = &out.trades[0];
        assert_eq!(trade.entry_price, Decimal::from(101));
        assert_eq!(trade.exit_price, Decimal::from(99));
        assert!(trade.pnl < Decimal::ZERO);
    }

    #[test]
    fn test_end_of_data_close_pays_slippage() {
        let costs = CostParams {
            slippage: Decimal::new(1, 2), // 1%
            ..free_costs()
        };
        let sim = PortfolioSimulator::new(costs).unwrap();
        let bars = bars(&[100.0, 100.0, 100.0]);
        let mut signals = hold(3);
        signals[1] = Signal::EnterLong;

        let out = sim.run(&bars, &signals, None).unwrap();
        let trade = &out.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::EndOfData);
        // Same market-exit fill a signal exit would get.
        assert_eq!(trade.exit_price, Decimal::from(99));
        assert_eq!(
            out.equity.last().unwrap().equity,
            Decimal::from(10_000) + trade.pnl
        );
    }

    #[test]
    fn test_nan_price_aborts_with_bar_index() {
        let sim = PortfolioSimulator::new(free_costs()).unwrap();
        let bars = bars(&[100.0, f64::NAN, 100.0]);
        let err = sim.run(&bars, &hold(3), None).unwrap_err();
        assert!(matches!(err, Error::NumericAnomaly { bar: 1, .. }));
    }

    #[test]
    fn test_signal_length_mismatch() {
        let sim = PortfolioSimulator::new(free_costs()).unwrap();
        let bars = bars(&[100.0, 100.0]);
        let err = sim.run(&bars, &hold(3), None).unwrap_err();
        assert!(matches!(
            err,
            Error::SignalMismatch { signals: 3, bars: 2 }
        ));
    }

    #[test]
    fn test_cost_validation() {
        let bad_fees = CostParams {
            fees: Decimal::new(2, 1), // 0.2
            ..Default::default()
        };
        assert!(bad_fees.validate().is_err());

        let bad_cash = CostParams {
            init_cash: Decimal::ZERO,
            ..Default::default()
        };
        assert!(bad_cash.validate().is_err());

        assert!(CostParams::default().validate().is_ok());
    }
}
