//! Numeric helpers shared by the engine components.

/// Denominator padding for ratios whose baseline may be zero.
pub const EPSILON: f64 = 0.0001;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

pub fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

pub fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

/// `max - min`, zero for an empty slice.
pub fn range(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    max(values) - min(values)
}

/// Last `n` values, or the whole slice when shorter.
pub fn tail(values: &[f64], n: usize) -> &[f64] {
    if n >= values.len() {
        values
    } else {
        &values[values.len() - n..]
    }
}

/// `a / (b + EPSILON)`.
pub fn ratio(a: f64, b: f64) -> f64 {
    a / (b + EPSILON)
}

/// Simple returns `(p[i] - p[i-1]) / p[i-1]`. A zero previous price yields 0.
pub fn returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .map(|w| if w[0] != 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

/// Bar-to-bar differences.
pub fn deltas(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Sum of positive and (absolute) negative deltas.
pub fn pressure(prices: &[f64]) -> (f64, f64) {
    deltas(prices).iter().fold((0.0, 0.0), |(buy, sell), d| {
        if *d > 0.0 {
            (buy + d, sell)
        } else {
            (buy, sell - d)
        }
    })
}

/// Counts of values falling into `bins` equal-width buckets over `[low, high]`.
pub fn histogram(values: &[f64], bins: usize, low: f64, high: f64) -> Vec<usize> {
    let mut counts = vec![0usize; bins];
    let width = (high - low) / bins as f64;
    if bins == 0 || width <= 0.0 {
        return counts;
    }
    for v in values {
        let idx = (((v - low) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
}

/// Drop all but the last `n` items.
pub fn keep_last<T>(mut items: Vec<T>, n: usize) -> Vec<T> {
    if items.len() > n {
        items.drain(..items.len() - n);
    }
    items
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotKind {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pivot {
    pub index: usize,
    pub price: f64,
    pub kind: PivotKind,
}

/// Bars strictly above every other bar within `window` on either side.
pub fn swing_highs(prices: &[f64], window: usize) -> Vec<Pivot> {
    find_pivots(prices, window, PivotKind::High)
}

/// Bars strictly below every other bar within `window` on either side.
pub fn swing_lows(prices: &[f64], window: usize) -> Vec<Pivot> {
    find_pivots(prices, window, PivotKind::Low)
}

fn find_pivots(prices: &[f64], window: usize, kind: PivotKind) -> Vec<Pivot> {
    let mut pivots = Vec::new();
    if window == 0 || prices.len() < window * 2 + 1 {
        return pivots;
    }
    for i in window..prices.len() - window {
        let p = prices[i];
        let is_pivot = (i - window..=i + window).filter(|&j| j != i).all(|j| match kind {
            PivotKind::High => p > prices[j],
            PivotKind::Low => p < prices[j],
        });
        if is_pivot {
            pivots.push(Pivot {
                index: i,
                price: p,
                kind,
            });
        }
    }
    pivots
}

/// Highs and lows merged in chronological order.
pub fn merge_pivots(highs: &[Pivot], lows: &[Pivot]) -> Vec<Pivot> {
    let mut all: Vec<Pivot> = highs.iter().chain(lows.iter()).copied().collect();
    all.sort_by_key(|p| p.index);
    all
}

/// True when consecutive pivots alternate between highs and lows.
pub fn alternates(pivots: &[Pivot]) -> bool {
    pivots.windows(2).all(|w| w[0].kind != w[1].kind)
}

/// Closeness of `value` to `target` inside a tolerance band: 1 at the target,
/// 0 at the band edge, `None` outside.
pub fn within(value: f64, target: f64, tolerance: f64) -> Option<f64> {
    let error = (value - target).abs();
    if error <= tolerance {
        Some(1.0 - error / tolerance)
    } else {
        None
    }
}

/// Like [`within`] against a `[low, high]` band widened by `tolerance`.
pub fn within_band(value: f64, low: f64, high: f64, tolerance: f64) -> Option<f64> {
    if value >= low && value <= high {
        Some(1.0)
    } else if value < low {
        within(value, low, tolerance)
    } else {
        within(value, high, tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), 5.0);
        assert_eq!(std_dev(&values), 2.0);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(std_dev(&[]), 0.0);
    }

    #[test]
    fn test_tail_shorter_than_window() {
        let values = [1.0, 2.0, 3.0];
        assert_eq!(tail(&values, 2), &[2.0, 3.0]);
        assert_eq!(tail(&values, 10), &values);
    }

    #[test]
    fn test_returns_guard_zero_price() {
        let r = returns(&[0.0, 1.0, 2.0]);
        assert_eq!(r, vec![0.0, 1.0]);
    }

    #[test]
    fn test_pressure_split() {
        let (buy, sell) = pressure(&[10.0, 12.0, 11.0, 14.0]);
        assert_eq!(buy, 5.0);
        assert_eq!(sell, 1.0);
    }

    #[test]
    fn test_histogram_puts_max_in_last_bin() {
        let counts = histogram(&[0.0, 0.5, 1.0], 2, 0.0, 1.0);
        assert_eq!(counts, vec![1, 2]);
    }

    #[test]
    fn test_histogram_flat_range_is_empty() {
        let counts = histogram(&[1.0, 1.0], 4, 1.0, 1.0);
        assert_eq!(counts, vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_swing_pivots() {
        let prices = [1.0, 2.0, 5.0, 2.0, 1.0, 0.5, 1.0, 2.0];
        let highs = swing_highs(&prices, 2);
        let lows = swing_lows(&prices, 2);
        assert_eq!(highs.len(), 1);
        assert_eq!(highs[0].index, 2);
        assert_eq!(lows.len(), 1);
        assert_eq!(lows[0].index, 5);
        let merged = merge_pivots(&highs, &lows);
        assert!(alternates(&merged));
    }

    #[test]
    fn test_plateau_is_not_a_pivot() {
        let prices = [1.0, 3.0, 3.0, 1.0, 0.0];
        assert!(swing_highs(&prices, 1).is_empty());
    }

    #[test]
    fn test_within_tolerance() {
        assert_eq!(within(0.618, 0.618, 0.008), Some(1.0));
        assert!(within(0.622, 0.618, 0.008).unwrap() > 0.4);
        assert_eq!(within(0.63, 0.618, 0.008), None);
        assert_eq!(within_band(0.45, 0.382, 0.5, 0.008), Some(1.0));
        assert_eq!(within_band(0.2, 0.382, 0.5, 0.008), None);
    }
}
