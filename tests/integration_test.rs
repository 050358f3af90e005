//! Integration tests for the signal, backtest, portfolio and metrics
//! pipeline.
//!
//! Tests cover:
//! - Signal warmup and the first crossover on a known series
//! - Single-instrument backtest on flat and trending series
//! - Equal-weight portfolio aggregation with a fixed divisor
//! - Universe loading with partial failures through a mock data port
//! - Metrics and benchmark comparison end to end
//! - Property checks on signal, trade, drawdown and portfolio invariants

mod common;

use approx::assert_relative_eq;
use common::*;
use crosstrader::domain::backtest::backtest_instrument;
use crosstrader::domain::error::CrosstraderError;
use crosstrader::domain::metrics::{Metrics, MonthlyReturnTable};
use crosstrader::domain::portfolio::{backtest_portfolio, PortfolioConfig};
use crosstrader::domain::returns;
use crosstrader::domain::scan::scan_universe;
use crosstrader::domain::signal::{calculate_signals, current_signal, SignalState, WindowConfig};
use crosstrader::domain::universe::{load_universe, SkipReason};
use crosstrader::ports::data_port::DataPort;

mod signal_pipeline {
    use super::*;

    #[test]
    fn no_signal_before_long_window_fills() {
        let points = monthly_series(jan_2020(), &RALLY);
        let records = calculate_signals(&points, &WindowConfig::default());

        assert_eq!(records.len(), 14);
        for rec in &records[..9] {
            assert_eq!(rec.signal, None);
            assert!(!rec.buy && !rec.sell);
        }
        assert_eq!(records[9].signal, Some(false));
    }

    #[test]
    fn single_buy_with_return_realized_next_period() {
        let points = monthly_series(jan_2020(), &RALLY);
        let result = backtest_instrument(&points, &WindowConfig::default());

        let buys: Vec<usize> = result
            .signals
            .iter()
            .enumerate()
            .filter(|(_, r)| r.buy)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(buys, vec![12]);
        assert!(result.signals.iter().all(|r| !r.sell));

        // Buy-period return is not captured; the following one is.
        assert_eq!(result.returns[12].value, Some(0.0));
        assert_relative_eq!(result.returns[13].value.unwrap(), 0.25, epsilon = 1e-12);
        assert_relative_eq!(result.final_growth().unwrap(), 1.25, epsilon = 1e-12);

        // Still holding at the end, so no closed trade.
        assert!(result.trades.is_empty());
    }

    #[test]
    fn round_trip_trade_after_crash() {
        let points = monthly_series(jan_2020(), &rally_then_crash());
        let result = backtest_instrument(&points, &WindowConfig::default());

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.entry_date, points[12].date);
        assert_eq!(trade.exit_date, points[14].date);
        assert_relative_eq!(trade.entry_price, 120.0);
        assert_relative_eq!(trade.exit_price, 40.0);
        assert_relative_eq!(trade.return_pct, (40.0 - 120.0) / 120.0 * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn current_signal_tracks_latest_period() {
        let config = WindowConfig::default();
        let rally = monthly_series(jan_2020(), &RALLY[..13]);
        assert_eq!(
            current_signal(&rally, &config).unwrap().state(),
            SignalState::NewBuy
        );

        let held = monthly_series(jan_2020(), &RALLY);
        assert_eq!(
            current_signal(&held, &config).unwrap().state(),
            SignalState::Hold
        );

        let crashed = monthly_series(jan_2020(), &rally_then_crash()[..15]);
        assert_eq!(
            current_signal(&crashed, &config).unwrap().state(),
            SignalState::NewSell
        );

        let short = monthly_series(jan_2020(), &RALLY[..10]);
        assert!(current_signal(&short, &config).is_none());
    }
}

mod flat_series {
    use super::*;

    #[test]
    fn flat_prices_give_all_zero_metrics() {
        let points = monthly_series(jan_2020(), &[100.0; 20]);
        let result = backtest_instrument(&points, &WindowConfig::default());

        assert!(result.cumulative.iter().all(|e| e.equity == 1.0));
        assert!(result.trades.is_empty());

        let metrics = Metrics::compute(&result.returns, None).unwrap();
        assert_eq!(metrics.periods, 19);
        assert_eq!(metrics.cumulative_return, 0.0);
        assert_eq!(metrics.cagr, 0.0);
        assert_eq!(metrics.max_drawdown, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.win_rate, 0.0);
        assert_eq!(metrics.profit_loss_ratio, 0.0);
    }

    #[test]
    fn short_history_backtests_empty() {
        let points = monthly_series(jan_2020(), &[100.0; 10]);
        let result = backtest_instrument(&points, &WindowConfig::default());
        assert!(result.is_empty());
        assert!(Metrics::compute(&result.returns, None).is_none());
    }
}

mod portfolio_aggregation {
    use super::*;

    /// Active at index 13 with +5%.
    fn winner() -> Vec<PricePoint> {
        let mut prices = RALLY[..13].to_vec();
        prices.push(126.0);
        monthly_series(jan_2020(), &prices)
    }

    /// Inactive at index 13 with -10%.
    fn loser() -> Vec<PricePoint> {
        let mut prices = vec![100.0; 13];
        prices.push(90.0);
        monthly_series(jan_2020(), &prices)
    }

    #[test]
    fn fixed_divisor_spreads_single_active_return() {
        let u = universe(&[("A", winner()), ("B", loser())]);
        let result = backtest_portfolio(&u, &WindowConfig::default(), &PortfolioConfig::default());

        assert_eq!(result.returns.len(), 14);
        assert_relative_eq!(result.returns[13].value.unwrap(), 0.05 / 30.0, epsilon = 1e-12);
        assert_relative_eq!(result.returns[13].value.unwrap(), 0.001667, epsilon = 1e-6);
        for r in &result.returns[..13] {
            assert_eq!(r.value, Some(0.0));
        }

        assert_eq!(result.active_counts[13].count, 1);
        assert_eq!(result.max_active(), 1);
        assert_relative_eq!(
            result.cumulative.last().unwrap().equity,
            1.0 + 0.05 / 30.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn smaller_slot_count_scales_return() {
        let u = universe(&[("A", winner()), ("B", loser())]);
        let result = backtest_portfolio(
            &u,
            &WindowConfig::default(),
            &PortfolioConfig::new(2).unwrap(),
        );
        assert_relative_eq!(result.returns[13].value.unwrap(), 0.025, epsilon = 1e-12);
    }

    #[test]
    fn short_instruments_are_excluded() {
        let u = universe(&[
            ("A", winner()),
            ("SHORT", monthly_series(jan_2020(), &[100.0; 5])),
        ]);
        let result = backtest_portfolio(&u, &WindowConfig::default(), &PortfolioConfig::default());
        assert_eq!(result.instruments, vec!["A".to_string()]);
    }

    #[test]
    fn no_qualifying_instrument_is_empty() {
        let u = universe(&[("SHORT", monthly_series(jan_2020(), &[100.0; 5]))]);
        let result = backtest_portfolio(&u, &WindowConfig::default(), &PortfolioConfig::default());
        assert!(result.is_empty());
        assert!(result.cumulative.is_empty());
        assert!(result.active_counts.is_empty());
    }

    #[test]
    fn staggered_histories_use_union_of_dates() {
        let late = monthly_series(jan_2020(), &[100.0; 17])[3..].to_vec();
        let u = universe(&[("A", winner()), ("LATE", late)]);
        let result = backtest_portfolio(&u, &WindowConfig::default(), &PortfolioConfig::default());
        assert_eq!(result.returns.len(), 17);
        assert!(result.returns.iter().all(|r| r.value.is_some()));
    }
}

mod universe_loading {
    use super::*;

    #[test]
    fn partial_universe_proceeds() {
        let port = MockDataPort::new()
            .with_series("A", monthly_series(jan_2020(), &RALLY))
            .with_series("SHORT", monthly_series(jan_2020(), &[100.0; 4]))
            .with_error("BROKEN", "file missing");
        let codes: Vec<String> = ["A", "SHORT", "BROKEN", "EMPTY"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let loaded = load_universe(
            &port,
            &codes,
            date(2000, 1, 1),
            date(2030, 1, 1),
            WindowConfig::default().min_periods(),
        )
        .unwrap();

        assert_eq!(loaded.count(), 1);
        assert!(loaded.series.contains_key("A"));
        assert_eq!(loaded.skipped.len(), 3);

        let short = loaded.skipped.iter().find(|s| s.code == "SHORT").unwrap();
        assert_eq!(short.reason, SkipReason::InsufficientPeriods { periods: 4 });
        let broken = loaded.skipped.iter().find(|s| s.code == "BROKEN").unwrap();
        assert_eq!(broken.reason, SkipReason::NoData);
    }

    #[test]
    fn nothing_loaded_is_an_error() {
        let port = MockDataPort::new().with_error("A", "offline");
        let err = load_universe(
            &port,
            &["A".to_string()],
            date(2000, 1, 1),
            date(2030, 1, 1),
            WindowConfig::default().min_periods(),
        )
        .unwrap_err();
        assert!(matches!(err, CrosstraderError::InsufficientData { .. }));
    }

    #[test]
    fn loaded_universe_feeds_scan() {
        let port = MockDataPort::new()
            .with_series("BUY", monthly_series(jan_2020(), &RALLY[..13]))
            .with_series("HOLD", monthly_series(jan_2020(), &RALLY))
            .with_series("SELL", monthly_series(jan_2020(), &rally_then_crash()[..15]))
            .with_series("FLAT", monthly_series(jan_2020(), &[100.0; 12]));
        let codes = port.list_symbols().unwrap();

        let loaded = load_universe(
            &port,
            &codes,
            date(2000, 1, 1),
            date(2030, 1, 1),
            WindowConfig::default().min_periods(),
        )
        .unwrap();
        let scan = scan_universe(&loaded.series, &WindowConfig::default());

        let names = |entries: &[crosstrader::domain::scan::ScanEntry]| -> Vec<String> {
            entries.iter().map(|e| e.code.clone()).collect()
        };
        assert_eq!(names(&scan.new_buys), vec!["BUY"]);
        assert_eq!(names(&scan.new_sells), vec!["SELL"]);
        assert_eq!(names(&scan.holds), vec!["HOLD"]);
        assert!(scan.skipped.is_empty());
    }
}

mod metrics_end_to_end {
    use super::*;

    #[test]
    fn benchmark_compared_on_shared_dates() {
        let points = monthly_series(jan_2020(), &rally_then_crash());
        let result = backtest_instrument(&points, &WindowConfig::default());

        // Benchmark starts two months later.
        let bm_points = monthly_series(points[2].date, &[100.0; 14]);
        let bm = returns::from_prices(&bm_points);

        let metrics = Metrics::compute(&result.returns, Some(&bm)).unwrap();
        let bench = metrics.benchmark.as_ref().unwrap();
        assert_eq!(metrics.periods, 15);
        assert_eq!(bench.periods, 13);
        assert_eq!(bench.cumulative_return, 0.0);
        assert_eq!(bench.max_drawdown, 0.0);

        let named = metrics.to_named();
        assert_eq!(named.len(), 10);
        assert_eq!(named[6].0, "Benchmark Cumulative Return (%)");
    }

    #[test]
    fn trade_loss_shows_in_drawdown_and_table() {
        let points = monthly_series(jan_2020(), &rally_then_crash());
        let result = backtest_instrument(&points, &WindowConfig::default());
        let metrics = Metrics::compute(&result.returns, None).unwrap();

        // Held through 120 -> 150 -> 40, exited at 40.
        assert_relative_eq!(metrics.max_drawdown, 40.0 / 150.0 - 1.0, epsilon = 1e-12);
        assert_relative_eq!(metrics.cumulative_return, 40.0 / 120.0 - 1.0, epsilon = 1e-12);
        assert_relative_eq!(metrics.win_rate, 50.0);

        let table = MonthlyReturnTable::from_returns(&result.returns);
        let crash = points[14].date;
        assert_relative_eq!(
            table.get(2021, 3).unwrap(),
            (40.0 / 150.0 - 1.0) * 100.0,
            epsilon = 1e-9
        );
        assert_eq!(crash, date(2021, 3, 31));
    }
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    fn prices() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(1.0f64..1000.0, 0..60)
    }

    fn declining() -> impl Strategy<Value = Vec<f64>> {
        (100.0f64..1000.0, prop::collection::vec(0.5f64..0.99, 11..40)).prop_map(
            |(start, factors)| {
                let mut price = start;
                let mut out = vec![price];
                for f in factors {
                    price *= f;
                    out.push(price);
                }
                out
            },
        )
    }

    proptest! {
        #[test]
        fn buy_and_sell_are_exclusive_and_need_prior_signal(p in prices()) {
            let points = monthly_series(jan_2020(), &p);
            let records = calculate_signals(&points, &WindowConfig::default());
            for (i, rec) in records.iter().enumerate() {
                prop_assert!(!(rec.buy && rec.sell));
                if rec.buy || rec.sell {
                    prop_assert!(i > 0);
                    prop_assert!(records[i - 1].signal.is_some());
                    prop_assert_eq!(records[i - 1].signal, Some(rec.sell));
                }
                if i < 9 {
                    prop_assert!(rec.signal.is_none());
                }
            }
        }

        #[test]
        fn drawdown_is_bounded(p in prices()) {
            let points = monthly_series(jan_2020(), &p);
            let result = backtest_instrument(&points, &WindowConfig::default());
            if let Some(m) = Metrics::compute(&result.returns, None) {
                prop_assert!(m.max_drawdown <= 0.0);
                prop_assert!(m.max_drawdown >= -1.0);
                prop_assert!(m.win_rate >= 0.0 && m.win_rate <= 100.0);
            }
        }

        #[test]
        fn trades_exit_after_entry(p in prices()) {
            let points = monthly_series(jan_2020(), &p);
            let result = backtest_instrument(&points, &WindowConfig::default());
            let buys = result.signals.iter().filter(|r| r.buy).count();
            prop_assert!(result.trades.len() <= buys);
            for t in &result.trades {
                prop_assert!(t.exit_date > t.entry_date);
                let expected = (t.exit_price - t.entry_price) / t.entry_price * 100.0;
                prop_assert!((t.return_pct - expected).abs() < 1e-9);
            }
        }

        #[test]
        fn cumulative_equity_stays_positive(a in prices(), b in prices()) {
            let points = monthly_series(jan_2020(), &a);
            let result = backtest_instrument(&points, &WindowConfig::default());
            for e in &result.cumulative {
                prop_assert!(e.equity > 0.0);
            }

            let u = universe(&[
                ("A", monthly_series(jan_2020(), &a)),
                ("B", monthly_series(jan_2020(), &b)),
            ]);
            let result = backtest_portfolio(&u, &WindowConfig::default(), &PortfolioConfig::default());
            for e in &result.cumulative {
                prop_assert!(e.equity > 0.0);
            }
        }

        #[test]
        fn portfolio_without_active_positions_returns_zero(
            a in declining(),
            b in declining(),
        ) {
            let u = universe(&[
                ("A", monthly_series(jan_2020(), &a)),
                ("B", monthly_series(jan_2020(), &b)),
            ]);
            let result = backtest_portfolio(&u, &WindowConfig::default(), &PortfolioConfig::default());
            prop_assert!(!result.is_empty());
            for (r, c) in result.returns.iter().zip(&result.active_counts) {
                prop_assert_eq!(c.count, 0);
                prop_assert_eq!(r.value, Some(0.0));
            }
        }
    }
}
