//! Property tests for the backtest trading rules.

use edgelab_runner::walk_forward::{equity_curve, pnl_for, signal_for, split_index};
use proptest::prelude::*;

proptest! {
    #[test]
    fn split_never_below_minimum_or_fraction(n in 0usize..5_000, frac in 0.01f64..0.99, min_train in 0usize..200) {
        let cut = split_index(n, frac, min_train);
        prop_assert!(cut >= min_train);
        prop_assert!(cut >= (n as f64 * frac).floor() as usize);
        prop_assert!(cut == min_train || cut == (n as f64 * frac).floor() as usize);
    }

    #[test]
    fn equity_is_running_product(pnl in prop::collection::vec(-0.05f64..0.05, 0..300)) {
        let eq = equity_curve(&pnl);
        prop_assert_eq!(eq.len(), pnl.len());
        let mut acc = 1.0;
        for (p, e) in pnl.iter().zip(&eq) {
            acc *= 1.0 + p;
            prop_assert!((acc - e).abs() <= 1e-12 * acc.abs().max(1.0));
        }
    }

    #[test]
    fn cost_is_paid_only_when_trading(q_md in -0.01f64..0.01, fwd in -0.1f64..0.1, bps in 0.0f64..20.0) {
        let cost = bps * 1e-4;
        let s = signal_for(q_md, cost);
        let pnl = pnl_for(s, fwd, cost);
        match s {
            0 => prop_assert_eq!(pnl, 0.0),
            1 => prop_assert!((pnl - (fwd - cost)).abs() < 1e-15),
            _ => prop_assert!((pnl - (-fwd - cost)).abs() < 1e-15),
        }
        prop_assert!(s == 0 || q_md.abs() > cost);
    }
}
