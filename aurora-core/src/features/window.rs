//! Shift, rolling-window and gap-filling primitives.
//!
//! All operations use explicit index arithmetic over slices. Outputs are
//! `Option` so "not yet defined" (warm-up) is never confused with a computed
//! value. Aggregates are accumulated in f64 and rounded once to f32.

/// Value `k` rows back: `out[i] = values[i - k]`, `None` for `i < k`.
pub fn shift(values: &[f32], k: usize) -> Vec<Option<f32>> {
    (0..values.len())
        .map(|i| i.checked_sub(k).map(|j| values[j]))
        .collect()
}

/// Trailing window aggregate, inclusive of row `i`; `None` until the window is full.
fn rolling(values: &[f32], window: usize, agg: impl Fn(&[f32]) -> f64) -> Vec<Option<f32>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                None
            } else {
                Some(agg(&values[i + 1 - window..=i]) as f32)
            }
        })
        .collect()
}

pub fn rolling_mean(values: &[f32], window: usize) -> Vec<Option<f32>> {
    rolling(values, window, |w| {
        w.iter().map(|&v| v as f64).sum::<f64>() / w.len() as f64
    })
}

pub fn rolling_min(values: &[f32], window: usize) -> Vec<Option<f32>> {
    rolling(values, window, |w| {
        w.iter().map(|&v| v as f64).fold(f64::INFINITY, f64::min)
    })
}

pub fn rolling_max(values: &[f32], window: usize) -> Vec<Option<f32>> {
    rolling(values, window, |w| {
        w.iter().map(|&v| v as f64).fold(f64::NEG_INFINITY, f64::max)
    })
}

/// Carry the last present value forward over gaps.
///
/// With `limit = Some(n)` at most `n` consecutive gaps are filled; the rest
/// stay `None`. Leading gaps are never filled.
pub fn forward_fill(values: &mut [Option<f64>], limit: Option<usize>) {
    let mut last: Option<f64> = None;
    let mut run = 0usize;
    for slot in values.iter_mut() {
        match slot {
            Some(v) => {
                last = Some(*v);
                run = 0;
            }
            None => {
                run += 1;
                if limit.map_or(true, |n| run <= n) {
                    *slot = last;
                }
            }
        }
    }
}

/// Leading rows that cannot have every lag and window defined.
pub fn warm_up(max_lag: usize, windows: &[usize]) -> usize {
    windows
        .iter()
        .map(|w| w.saturating_sub(1))
        .fold(max_lag, usize::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_moves_values_down() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(shift(&v, 0), vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]);
        assert_eq!(shift(&v, 2), vec![None, None, Some(1.0), Some(2.0)]);
        assert_eq!(shift(&v, 9), vec![None; 4]);
    }

    #[test]
    fn rolling_stats() {
        let v = [3.0, -1.0, 2.0, -5.0, 4.0];
        assert_eq!(
            rolling_mean(&v, 3),
            vec![None, None, Some(4.0 / 3.0), Some(-4.0 / 3.0), Some(1.0 / 3.0)]
        );
        assert_eq!(
            rolling_min(&v, 3),
            vec![None, None, Some(-1.0), Some(-5.0), Some(-5.0)]
        );
        assert_eq!(
            rolling_max(&v, 2),
            vec![None, Some(3.0), Some(2.0), Some(2.0), Some(4.0)]
        );
    }

    #[test]
    fn degenerate_windows() {
        let v = [1.0, 2.0];
        assert_eq!(rolling_mean(&v, 0), vec![None, None]);
        assert_eq!(rolling_mean(&v, 1), vec![Some(1.0), Some(2.0)]);
        assert_eq!(rolling_max(&v, 5), vec![None, None]);
        assert!(rolling_min(&[], 3).is_empty());
    }

    #[test]
    fn forward_fill_keeps_leading_gap() {
        let mut v = vec![None, Some(1.0), None, None, Some(4.0), None];
        forward_fill(&mut v, None);
        assert_eq!(v, vec![None, Some(1.0), Some(1.0), Some(1.0), Some(4.0), Some(4.0)]);
    }

    #[test]
    fn forward_fill_respects_limit() {
        let mut v = vec![Some(1.0), None, None, None, Some(5.0), None];
        forward_fill(&mut v, Some(2));
        assert_eq!(v, vec![Some(1.0), Some(1.0), Some(1.0), None, Some(5.0), Some(5.0)]);
    }

    #[test]
    fn warm_up_is_largest_requirement() {
        assert_eq!(warm_up(3, &[3, 3, 7]), 6);
        assert_eq!(warm_up(3, &[3]), 3);
        assert_eq!(warm_up(0, &[]), 0);
    }
}
