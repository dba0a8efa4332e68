//! Amount statistics and the consistency gate

use crate::models::{AmountStats, Transaction};

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation around a precomputed mean
pub(crate) fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Mean, min, max and population std dev of the members' amounts (unrounded)
pub fn amount_stats(members: &[&Transaction]) -> Option<AmountStats> {
    if members.is_empty() {
        return None;
    }

    let amounts: Vec<f64> = members.iter().map(|t| t.amount).collect();
    let average = mean(&amounts);

    Some(AmountStats {
        average,
        min: amounts.iter().copied().fold(f64::INFINITY, f64::min),
        max: amounts.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        std_dev: population_std_dev(&amounts, average),
    })
}

/// std_dev / |mean|, or None when the mean is zero
pub fn dispersion_ratio(stats: &AmountStats) -> Option<f64> {
    if stats.average == 0.0 || !stats.average.is_finite() {
        return None;
    }
    Some(stats.std_dev / stats.average.abs())
}

/// Whether the amounts are consistent enough to be one recurring charge
pub fn passes_amount_gate(stats: &AmountStats, max_dispersion: f64) -> bool {
    dispersion_ratio(stats).is_some_and(|ratio| ratio <= max_dispersion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::transaction;

    fn stats_for(amounts: &[f64]) -> AmountStats {
        let txs: Vec<_> = amounts
            .iter()
            .enumerate()
            .map(|(i, &a)| transaction(i as i64 + 1, "Shop", "Misc", a, None))
            .collect();
        let refs: Vec<&Transaction> = txs.iter().collect();
        amount_stats(&refs).unwrap()
    }

    #[test]
    fn test_amount_stats() {
        let stats = stats_for(&[20.0, 21.0, 19.0]);
        assert_eq!(stats.average, 20.0);
        assert_eq!(stats.min, 19.0);
        assert_eq!(stats.max, 21.0);
        assert!((stats.std_dev - (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_amount_stats_empty() {
        assert!(amount_stats(&[]).is_none());
    }

    #[test]
    fn test_gate_rejects_outlier() {
        // mean 27.5, std dev ~30.3
        let stats = stats_for(&[10.0, 80.0, 10.0, 10.0]);
        assert!(dispersion_ratio(&stats).unwrap() > 0.20);
        assert!(!passes_amount_gate(&stats, 0.20));
    }

    #[test]
    fn test_gate_accepts_constant_amounts() {
        let stats = stats_for(&[45.0, 45.0, 45.0, 45.0]);
        assert_eq!(dispersion_ratio(&stats), Some(0.0));
        assert!(passes_amount_gate(&stats, 0.20));
    }

    #[test]
    fn test_gate_boundary_is_inclusive() {
        // mean 10, std dev 2: exactly at the cutoff
        let stats = stats_for(&[8.0, 12.0]);
        assert_eq!(stats.std_dev, 2.0);
        assert_eq!(dispersion_ratio(&stats), Some(0.20));
        assert!(passes_amount_gate(&stats, 0.20));

        let wider = stats_for(&[8.0, 12.2]);
        assert!(!passes_amount_gate(&wider, 0.20));
    }

    #[test]
    fn test_gate_rejects_zero_mean() {
        let stats = stats_for(&[5.0, -5.0]);
        assert_eq!(dispersion_ratio(&stats), None);
        assert!(!passes_amount_gate(&stats, 0.20));

        let zeros = stats_for(&[0.0, 0.0]);
        assert!(!passes_amount_gate(&zeros, 0.20));
    }

    #[test]
    fn test_gate_uses_magnitude_for_negative_amounts() {
        let stats = stats_for(&[-45.0, -45.0, -46.0]);
        assert!(passes_amount_gate(&stats, 0.20));

        let spread = stats_for(&[-10.0, -80.0, -10.0, -10.0]);
        assert!(!passes_amount_gate(&spread, 0.20));
    }
}
