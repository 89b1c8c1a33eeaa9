//! Small numeric kernels shared by the aggregation, transform and ranking
//! stages. All of them skip non-finite inputs and never return NaN.

use std::cmp::Ordering;

/// Population-weighted median using the cumulative-weight cutoff rule.
///
/// Values are sorted ascending, weights are accumulated in that order and the
/// result is the first value whose cumulative weight reaches or exceeds half
/// of the total weight. There is no interpolation between neighbours, so two
/// equally weighted values yield the lower one.
///
/// Pairs where either side is `None` or non-finite are ignored. Returns `None`
/// when nothing usable remains.
///
/// # Examples
/// ```
/// use redfin_geo_processor::utils::weighted_median;
///
/// let values = [Some(100.0), Some(200.0)];
/// let weights = [Some(1.0), Some(1.0)];
/// assert_eq!(weighted_median(&values, &weights), Some(100.0));
/// ```
pub fn weighted_median(values: &[Option<f64>], weights: &[Option<f64>]) -> Option<f64> {
    let mut pairs: Vec<(f64, f64)> = values
        .iter()
        .zip(weights.iter())
        .filter_map(|(value, weight)| match (value, weight) {
            (Some(v), Some(w)) if v.is_finite() && w.is_finite() => Some((*v, *w)),
            _ => None,
        })
        .collect();

    if pairs.is_empty() {
        return None;
    }

    // Stable sort keeps input order among equal values
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let total: f64 = pairs.iter().map(|(_, w)| w).sum();
    let cutoff = 0.5 * total;

    let mut cumulative = 0.0;
    for (value, weight) in &pairs {
        cumulative += weight;
        if cumulative >= cutoff {
            return Some(*value);
        }
    }

    // Only reachable through rounding in the running sum
    pairs.last().map(|(value, _)| *value)
}

/// Population skewness, the third standardized moment `m3 / m2^1.5` with
/// both moments divided by `n`.
///
/// Returns `None` for fewer than two finite values or a zero-variance column.
pub fn skewness(values: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.len() < 2 {
        return None;
    }

    let n = finite.len() as f64;
    let mean = finite.iter().sum::<f64>() / n;
    let (m2, m3) = finite.iter().fold((0.0, 0.0), |(m2, m3), v| {
        let d = v - mean;
        (m2 + d * d, m3 + d * d * d)
    });
    let m2 = m2 / n;
    let m3 = m3 / n;

    if m2 <= f64::EPSILON {
        return None;
    }

    let skew = m3 / m2.powf(1.5);
    skew.is_finite().then_some(skew)
}

/// Percentile ranks in `(0, 1]` using average ranks for ties.
///
/// The output is parallel to the input; `None` inputs stay `None`. The rank of
/// a value is the mean of the 1-based positions its tie group occupies in the
/// sorted column, divided by the number of non-null values. The result does not
/// depend on the order of the input.
pub fn percentile_ranks(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut indexed: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.filter(|x| x.is_finite()).map(|x| (i, x)))
        .collect();

    let mut ranks = vec![None; values.len()];
    if indexed.is_empty() {
        return ranks;
    }

    indexed.sort_by(|a, b| a.1.total_cmp(&b.1));
    let n = indexed.len() as f64;

    let mut start = 0;
    while start < indexed.len() {
        let mut end = start + 1;
        while end < indexed.len() && indexed[end].1.total_cmp(&indexed[start].1) == Ordering::Equal {
            end += 1;
        }

        // Positions start+1 ..= end share the mean rank
        let average_rank = (start + 1 + end) as f64 / 2.0;
        let pct = average_rank / n;
        for (index, _) in &indexed[start..end] {
            ranks[*index] = Some(pct);
        }

        start = end;
    }

    ranks
}

/// Plain median with linear interpolation, used for descriptive statistics only.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_weighted_median_single_value() {
        assert_eq!(weighted_median(&[Some(425_000.0)], &[Some(3_200.0)]), Some(425_000.0));
    }

    #[test]
    fn test_weighted_median_even_pair_takes_lower() {
        let result = weighted_median(&some(&[100.0, 200.0]), &some(&[1.0, 1.0]));
        assert_eq!(result, Some(100.0));
    }

    #[test]
    fn test_weighted_median_population_weights() {
        let values = some(&[300_000.0, 400_000.0, 500_000.0]);
        let weights = some(&[100.0, 200.0, 300.0]);
        assert_eq!(weighted_median(&values, &weights), Some(400_000.0));
    }

    #[test]
    fn test_weighted_median_unsorted_input() {
        let values = some(&[500_000.0, 300_000.0, 400_000.0]);
        let weights = some(&[300.0, 100.0, 200.0]);
        assert_eq!(weighted_median(&values, &weights), Some(400_000.0));
    }

    #[test]
    fn test_weighted_median_heavy_weight_dominates() {
        let values = some(&[1.0, 2.0, 3.0]);
        let weights = some(&[1.0, 1.0, 10.0]);
        assert_eq!(weighted_median(&values, &weights), Some(3.0));
    }

    #[test]
    fn test_weighted_median_skips_nulls() {
        let values = vec![Some(10.0), None, Some(30.0), Some(f64::NAN)];
        let weights = vec![Some(1.0), Some(5.0), None, Some(1.0)];
        assert_eq!(weighted_median(&values, &weights), Some(10.0));
    }

    #[test]
    fn test_weighted_median_all_null_is_none() {
        assert_eq!(weighted_median(&[None, None], &[Some(1.0), Some(1.0)]), None);
        assert_eq!(weighted_median(&[], &[]), None);
    }

    #[test]
    fn test_skewness() {
        assert!(skewness(&[1.0, 2.0, 3.0]).unwrap().abs() < 1e-12);
        assert!(skewness(&[1.0, 1.0, 1.0, 10.0]).unwrap() > 0.0);
        assert_eq!(skewness(&[5.0, 5.0, 5.0]), None);
        assert_eq!(skewness(&[5.0]), None);
        assert_eq!(skewness(&[1.0, 3.0]), Some(0.0));
        // m2 = 6.75, m3 = 20.25 for [1, 1, 1, 7]
        let expected = 20.25 / 6.75_f64.powf(1.5);
        assert!((skewness(&[1.0, 1.0, 1.0, 7.0]).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_ranks_with_ties_and_nulls() {
        let ranks = percentile_ranks(&[Some(10.0), None, Some(20.0), Some(20.0), Some(5.0)]);
        assert_eq!(ranks[0], Some(0.5));
        assert_eq!(ranks[1], None);
        assert_eq!(ranks[2], Some(0.875));
        assert_eq!(ranks[3], Some(0.875));
        assert_eq!(ranks[4], Some(0.25));
    }

    #[test]
    fn test_percentile_rank_single_value_is_one() {
        assert_eq!(percentile_ranks(&[Some(400_000.0)]), vec![Some(1.0)]);
    }

    #[test]
    fn test_percentile_ranks_order_independent() {
        let forward = percentile_ranks(&some(&[3.0, 1.0, 2.0, 2.0]));
        let reversed = percentile_ranks(&some(&[2.0, 2.0, 1.0, 3.0]));
        assert_eq!(forward[0], reversed[3]);
        assert_eq!(forward[1], reversed[2]);
        assert_eq!(forward[2], reversed[0]);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }
}
