//! Descriptive statistics over market samples.
//!
//! Samples arrive unfiltered: one `Option<f64>` per market entity. Every
//! function here works on the valid part only (present and finite) and returns
//! `None` when nothing valid is left.
//!
//! Moments come from [`statrs`]. Quantiles are interpolated here because the
//! definition needed is the linear one between adjacent order statistics.

use statrs::statistics::Statistics;

/// Keeps the present, finite values of a sample.
#[must_use]
pub fn valid_values(sample: &[Option<f64>]) -> Vec<f64> {
    sample
        .iter()
        .filter_map(|v| v.filter(|x| x.is_finite()))
        .collect()
}

/// Sorts values ascending.
#[must_use]
pub fn sorted(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    values
}

/// Median of ascending values: the middle value, or the mean of the two
/// middle values for an even count.
#[must_use]
pub fn median_sorted(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let mid = n / 2;
    if n % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Quantile `q` in `[0, 1]` of ascending values, linearly interpolated
/// between the two nearest order statistics.
#[must_use]
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Arithmetic mean.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.mean())
}

/// Population standard deviation (divides by `n`, not `n - 1`).
#[must_use]
pub fn population_std(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.population_std_dev())
}

/// Share of `values` at or below `value` (inclusive empirical CDF).
///
/// Ties count on the "at or below" side and no interpolation is done, so
/// the result is always a multiple of `1 / values.len()`.
#[must_use]
pub fn empirical_cdf(value: f64, values: &[f64]) -> Option<f64> {
    if values.is_empty() || value.is_nan() {
        return None;
    }
    let at_or_below = values.iter().filter(|v| **v <= value).count();
    Some(at_or_below as f64 / values.len() as f64)
}

/// Equal-width histogram spanning `[min, max]` of the values.
///
/// Returns `(counts, edges)` with `edges.len() == bins + 1`. Every bin is
/// half-open except the last, which also holds the maximum. When all values
/// are equal the range is widened to `[v - 0.5, v + 0.5]`.
#[must_use]
pub fn histogram(values: &[f64], bins: usize) -> Option<(Vec<usize>, Vec<f64>)> {
    if bins == 0 || values.is_empty() {
        return None;
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (low, high) = if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    };

    let width = (high - low) / bins as f64;
    if !width.is_finite() || width <= 0.0 {
        return None;
    }

    let mut edges: Vec<f64> = (0..bins).map(|i| low + width * i as f64).collect();
    edges.push(high);

    let mut counts = vec![0usize; bins];
    for &v in values {
        let index = ((v - low) / width).floor() as usize;
        counts[index.min(bins - 1)] += 1;
    }

    Some((counts, edges))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_valid_values_drops_missing_and_non_finite() {
        let sample = [
            Some(1.0),
            None,
            Some(f64::NAN),
            Some(f64::INFINITY),
            Some(-2.0),
        ];
        assert_eq!(valid_values(&sample), vec![1.0, -2.0]);
    }

    #[rstest]
    #[case(vec![3.0], 3.0)]
    #[case(vec![1.0, 2.0, 3.0], 2.0)]
    #[case(vec![1.0, 2.0, 3.0, 1000.0], 2.5)]
    #[case(vec![-5.0, 5.0], 0.0)]
    fn test_median_sorted(#[case] values: Vec<f64>, #[case] expected: f64) {
        assert_relative_eq!(median_sorted(&sorted(values)).unwrap(), expected);
    }

    #[test]
    fn test_median_of_empty_is_none() {
        assert!(median_sorted(&[]).is_none());
    }

    #[rstest]
    #[case(0.0, 1.0)]
    #[case(0.25, 1.75)]
    #[case(0.5, 2.5)]
    #[case(0.75, 3.25)]
    #[case(1.0, 4.0)]
    fn test_quantile_interpolates(#[case] q: f64, #[case] expected: f64) {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(quantile_sorted(&values, q).unwrap(), expected);
    }

    #[test]
    fn test_quantile_rejects_out_of_range() {
        assert!(quantile_sorted(&[1.0], 1.5).is_none());
        assert!(quantile_sorted(&[], 0.5).is_none());
    }

    #[test]
    fn test_population_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&values).unwrap(), 5.0, epsilon = 1e-12);
        assert_relative_eq!(population_std(&values).unwrap(), 2.0, epsilon = 1e-12);
    }

    #[rstest]
    #[case(0.30, 0.6)]
    #[case(0.50, 1.0)]
    #[case(0.09, 0.0)]
    #[case(0.10, 0.2)]
    #[case(10.0, 1.0)]
    fn test_empirical_cdf(#[case] value: f64, #[case] expected: f64) {
        let values = [0.10, 0.20, 0.30, 0.40, 0.50];
        assert_relative_eq!(empirical_cdf(value, &values).unwrap(), expected);
    }

    #[test]
    fn test_empirical_cdf_counts_ties_below() {
        let values = [1.0, 2.0, 2.0, 2.0];
        assert_relative_eq!(empirical_cdf(2.0, &values).unwrap(), 1.0);
        assert_relative_eq!(empirical_cdf(1.0, &values).unwrap(), 0.25);
    }

    #[test]
    fn test_histogram_counts_and_edges() {
        let values = [0.0, 1.0, 2.0, 3.0, 4.0];
        let (counts, edges) = histogram(&values, 4).unwrap();
        assert_eq!(counts, vec![1, 1, 1, 2]);
        assert_eq!(edges.len(), 5);
        assert_relative_eq!(edges[0], 0.0);
        assert_relative_eq!(edges[2], 2.0);
        assert_relative_eq!(edges[4], 4.0);
    }

    #[test]
    fn test_histogram_constant_sample_widens_range() {
        let (counts, edges) = histogram(&[7.0, 7.0, 7.0], 2).unwrap();
        assert_eq!(counts, vec![0, 3]);
        assert_relative_eq!(edges[0], 6.5);
        assert_relative_eq!(edges[1], 7.0);
        assert_relative_eq!(edges[2], 7.5);
    }

    #[test]
    fn test_histogram_requires_bins_and_values() {
        assert!(histogram(&[1.0], 0).is_none());
        assert!(histogram(&[], 20).is_none());
    }
}
