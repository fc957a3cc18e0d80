use crate::DistributionError;
use cubeskel_runtime::config::GlobalConfig;

/// Relative share of the data assigned to each device of a distribution.
///
/// Weights are non-negative and sum to one within the tolerance configured in
/// [`DistributionConfig`](cubeskel_runtime::config::distribution::DistributionConfig).
#[derive(Debug, Clone, PartialEq)]
pub struct Significances {
    values: Vec<f64>,
}

impl Significances {
    /// Uniform significances for `count` devices.
    ///
    /// The last weight takes whatever the others leave, so the sum is one even when `1 / count`
    /// isn't representable.
    pub fn new(count: usize) -> Self {
        if count == 0 {
            return Self { values: Vec::new() };
        }

        let share = 1.0 / count as f64;
        let mut values = vec![share; count - 1];
        let rest: f64 = values.iter().sum();
        values.push(1.0 - rest);

        Self { values }
    }

    /// Explicit weights, validated against the configured tolerance.
    pub fn from_weights(weights: Vec<f64>) -> Result<Self, DistributionError> {
        let tolerance = GlobalConfig::get().distribution.significance_tolerance;
        Self::with_tolerance(weights, tolerance)
    }

    /// Explicit weights, validated against `tolerance`.
    pub fn with_tolerance(weights: Vec<f64>, tolerance: f64) -> Result<Self, DistributionError> {
        if weights.is_empty() {
            return Err(DistributionError::NoDevices);
        }

        for (index, value) in weights.iter().enumerate() {
            if !value.is_finite() || *value < 0.0 {
                return Err(DistributionError::InvalidSignificance {
                    index,
                    value: *value,
                });
            }
        }

        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > tolerance {
            return Err(DistributionError::SignificanceSum { sum, tolerance });
        }

        Ok(Self { values: weights })
    }

    /// The weight of the device at `index` in the distribution.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// The number of weights.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there is no weight.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over the weights in device order.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    /// Splits `units` rows into one contiguous range per device.
    ///
    /// Every device but the last gets `floor(weight * units)` rows, the last one takes the
    /// remainder. Ranges are contiguous, in device order, and cover `0..units` exactly.
    ///
    /// The product is nudged by a few ulps of `units` before flooring, so a share that is an
    /// integer up to rounding error (`1/49 * 49`) isn't floored to the integer below.
    pub(crate) fn partition(&self, units: usize) -> Vec<core::ops::Range<usize>> {
        let mut ranges = Vec::with_capacity(self.values.len());
        let mut start = 0;
        let total = units as f64;
        let slack = total * 4.0 * f64::EPSILON;

        if let Some((_, head)) = self.values.split_last() {
            for weight in head {
                let size = (weight * total + slack).floor() as usize;
                let end = (start + size).min(units);
                ranges.push(start..end);
                start = end;
            }
            ranges.push(start..units);
        }

        ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn uniform_weights_sum_to_one() {
        for count in 1..100 {
            let significances = Significances::new(count);
            let sum: f64 = significances.iter().sum();

            assert_eq!(significances.len(), count);
            assert!((sum - 1.0).abs() < 1e-10, "count {count} sums to {sum}");
        }
    }

    #[test]
    fn lookup_is_by_device_position() {
        let significances = Significances::new(4);

        assert_eq!(significances.get(0), Some(0.25));
        assert_eq!(significances.get(3), Some(0.25));
        assert_eq!(significances.get(4), None);
    }

    #[test]
    fn partition_truncates_and_gives_remainder_to_last() {
        let ranges = Significances::new(2).partition(11);

        assert_eq!(ranges, vec![0..5, 5..11]);
    }

    #[test]
    fn partition_covers_every_unit() {
        for count in 1..8 {
            let significances = Significances::new(count);
            for units in 0..50 {
                let ranges = significances.partition(units);
                let total: usize = ranges.iter().map(|range| range.len()).sum();

                assert_eq!(total, units);
                assert_eq!(ranges.first().map(|r| r.start), Some(0));
                assert_eq!(ranges.last().map(|r| r.end), Some(units));
                for pair in ranges.windows(2) {
                    assert_eq!(pair[0].end, pair[1].start);
                }
            }
        }
    }

    #[test]
    fn weighted_partition() {
        let significances = Significances::with_tolerance(vec![0.75, 0.25], 1e-10).unwrap();

        assert_eq!(significances.partition(8), vec![0..6, 6..8]);
        assert_eq!(significances.partition(3), vec![0..2, 2..3]);
    }

    #[test]
    fn integer_shares_are_not_floored_below() {
        let ranges = Significances::new(49).partition(49);

        assert!(ranges.iter().all(|range| range.len() == 1), "{ranges:?}");
    }

    #[test]
    fn weighted_shares_survive_rounding_error() {
        let significances = Significances::with_tolerance(vec![0.29, 0.71], 1e-10).unwrap();

        assert_eq!(significances.partition(100), vec![0..29, 29..100]);
    }

    #[test]
    fn exact_halves_still_truncate() {
        let significances = Significances::with_tolerance(vec![0.5, 0.5], 1e-10).unwrap();

        assert_eq!(significances.partition(11), vec![0..5, 5..11]);
    }

    #[test]
    fn zero_weight_gets_nothing() {
        let significances = Significances::with_tolerance(vec![0.0, 1.0], 1e-10).unwrap();

        assert_eq!(significances.partition(7), vec![0..0, 0..7]);
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let err = Significances::with_tolerance(vec![0.5, 0.4], 1e-10).unwrap_err();

        assert!(matches!(err, DistributionError::SignificanceSum { .. }));
    }

    #[test]
    fn rejects_negative_weights() {
        let err = Significances::with_tolerance(vec![1.5, -0.5], 1e-10).unwrap_err();

        assert_eq!(
            err,
            DistributionError::InvalidSignificance {
                index: 1,
                value: -0.5
            }
        );
    }

    #[test]
    fn rejects_nan() {
        let err = Significances::with_tolerance(vec![f64::NAN], 1e-10).unwrap_err();

        assert!(matches!(
            err,
            DistributionError::InvalidSignificance { index: 0, .. }
        ));
    }
}
