//! Peak and valley detection over a close series.
//!
//! Closes are min-max scaled to [0, 1] across the whole slice, then local
//! maxima are found (plateaus resolve to their midpoint), thinned so no two
//! survivors are closer than `distance` (taller first, later index on ties),
//! and finally filtered by a minimum topographic prominence. Valleys are the
//! peaks of the negated series.
//!
//! The first and last points can never be signals. Because scaling uses the
//! prefix's own min and max, and because a point only becomes a local maximum
//! once a lower point follows it, classifications near the end of a growing
//! prefix can change as data arrives. Callers must treat signals as derived
//! from a specific prefix, never as permanent facts.

use std::collections::BTreeSet;

pub const DEFAULT_DISTANCE: usize = 5;
pub const DEFAULT_PROMINENCE: f64 = 0.1;

/// Peak and valley indices of `closes`. A flat or empty slice has neither.
pub fn peaks_and_valleys(
    closes: &[f64],
    distance: usize,
    min_prominence: f64,
) -> (BTreeSet<usize>, BTreeSet<usize>) {
    let Some(scaled) = min_max_scale(closes) else {
        return (BTreeSet::new(), BTreeSet::new());
    };

    let peaks = find_peaks(&scaled, distance, min_prominence);
    let negated: Vec<f64> = scaled.iter().map(|v| -v).collect();
    let valleys = find_peaks(&negated, distance, min_prominence);

    (peaks.into_iter().collect(), valleys.into_iter().collect())
}

/// Peaks of `x` passing the distance and prominence filters, ascending.
pub fn find_peaks(x: &[f64], distance: usize, min_prominence: f64) -> Vec<usize> {
    let maxima = local_maxima(x);
    let spaced = select_by_distance(x, &maxima, distance);
    spaced
        .into_iter()
        .filter(|&p| prominence(x, p) >= min_prominence)
        .collect()
}

/// Topographic prominence of the peak at `peak`: its height above the
/// higher of the two lowest points reached before climbing above it.
pub fn prominence(x: &[f64], peak: usize) -> f64 {
    let height = x[peak];
    let left_min = x[..=peak]
        .iter()
        .rev()
        .take_while(|&&v| v <= height)
        .fold(height, |m, &v| m.min(v));
    let right_min = x[peak..]
        .iter()
        .take_while(|&&v| v <= height)
        .fold(height, |m, &v| m.min(v));
    height - left_min.max(right_min)
}

fn min_max_scale(values: &[f64]) -> Option<Vec<f64>> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if values.is_empty() || range <= 0.0 {
        return None;
    }
    Some(values.iter().map(|v| (v - min) / range).collect())
}

fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut maxima = Vec::new();
    if x.len() < 3 {
        return maxima;
    }

    let last = x.len() - 1;
    let mut i = 1;
    while i < last {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < last && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                maxima.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    maxima
}

fn select_by_distance(x: &[f64], peaks: &[usize], distance: usize) -> Vec<usize> {
    if distance <= 1 {
        return peaks.to_vec();
    }

    let mut keep = vec![true; peaks.len()];
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| x[peaks[b]].total_cmp(&x[peaks[a]]).then(b.cmp(&a)));

    for &i in &order {
        if !keep[i] {
            continue;
        }
        for j in (0..i).rev() {
            if peaks[i] - peaks[j] >= distance {
                break;
            }
            keep[j] = false;
        }
        for j in i + 1..peaks.len() {
            if peaks[j] - peaks[i] >= distance {
                break;
            }
            keep[j] = false;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, k)| k.then_some(p))
        .collect()
}
