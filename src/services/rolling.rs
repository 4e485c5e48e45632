// src/services/rolling.rs
use std::collections::BTreeMap;
use log::info;

use crate::models::RollingReturnSet;
use crate::services::returns::round2;

pub const DEFAULT_WINDOWS: [u32; 5] = [1, 5, 10, 20, 30];

/// Geometric annualized return of consecutive annual percentage returns.
fn annualized(window_returns: &[f64]) -> f64 {
    let cumulative: f64 = window_returns.iter().map(|r| 1.0 + r / 100.0).product();
    let years = window_returns.len() as f64;
    (cumulative.powf(1.0 / years) - 1.0) * 100.0
}

/// One compounded annualized return per window start, in order.
/// Empty when the window is longer than the history (or zero).
pub fn rolling_returns(annual_returns: &[f64], window: u32) -> Vec<f64> {
    let window = window as usize;
    if window == 0 || window > annual_returns.len() {
        return Vec::new();
    }
    annual_returns
        .windows(window)
        .map(|w| round2(annualized(w)))
        .collect()
}

pub fn rolling_return_set(annual_returns: &[f64], windows: &[u32]) -> RollingReturnSet {
    let mut set = BTreeMap::new();
    for &window in windows {
        let values = rolling_returns(annual_returns, window);
        info!("  {}-year rolling: {} data points", window, values.len());
        set.insert(window, values);
    }
    RollingReturnSet { windows: set }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_returns_compound_to_themselves() {
        let values = rolling_returns(&[10.0; 5], 5);
        assert_eq!(values, vec![10.0]);
    }

    #[test]
    fn window_longer_than_history_is_empty() {
        assert!(rolling_returns(&[5.0, 6.0], 5).is_empty());
        assert!(rolling_returns(&[], 1).is_empty());
    }

    #[test]
    fn one_year_window_reproduces_annual_returns() {
        let annual = [12.34, -5.67, 0.0, 21.5, -37.0];
        assert_eq!(rolling_returns(&annual, 1), annual.to_vec());
    }

    #[test]
    fn sequence_length_is_history_minus_window_plus_one() {
        let annual: Vec<f64> = (0..35).map(|i| (i % 7) as f64 - 2.0).collect();
        let set = rolling_return_set(&annual, &DEFAULT_WINDOWS);
        for window in DEFAULT_WINDOWS {
            let expected = (annual.len() + 1).saturating_sub(window as usize);
            assert_eq!(set.get(window).unwrap().len(), expected);
        }
        assert_eq!(set.total_points(), 35 + 31 + 26 + 16 + 6);
    }

    #[test]
    fn two_year_window_compounds() {
        // 1.1 * 0.9 = 0.99 over two years
        let values = rolling_returns(&[10.0, -10.0], 2);
        assert_eq!(values, vec![-0.5]);
    }
}
