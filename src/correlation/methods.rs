//! Correlation statistics with two-sided p-values.
//!
//! Every function returns `(statistic, pvalue)`. Constant input, missing
//! values or fewer than two samples give `(NaN, NaN)`.

use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::function::erf::erfc;
use std::cmp::Ordering;

/// Largest sample size for which the exact Kendall distribution is used
const KENDALL_EXACT_MAX_N: usize = 33;

/// Pearson product-moment correlation
pub fn pearson(x: &[f64], y: &[f64]) -> (f64, f64) {
    let n = x.len().min(y.len());
    let (x, y) = (&x[..n], &y[..n]);
    if n < 2 || has_nan(x) || has_nan(y) || is_constant(x) || is_constant(y) {
        return (f64::NAN, f64::NAN);
    }

    let r = pearson_r(x, y);
    (r, t_test_pvalue(r, n))
}

/// Spearman rank correlation
pub fn spearman(x: &[f64], y: &[f64]) -> (f64, f64) {
    let n = x.len().min(y.len());
    let (x, y) = (&x[..n], &y[..n]);
    if n < 2 || has_nan(x) || has_nan(y) || is_constant(x) || is_constant(y) {
        return (f64::NAN, f64::NAN);
    }

    let rho = pearson_r(&to_ranks(x), &to_ranks(y));
    (rho, t_test_pvalue(rho, n))
}

/// Kendall tau-b correlation
pub fn kendall(x: &[f64], y: &[f64]) -> (f64, f64) {
    let n = x.len().min(y.len());
    let (x, y) = (&x[..n], &y[..n]);
    if n < 2 || has_nan(x) || has_nan(y) || is_constant(x) || is_constant(y) {
        return (f64::NAN, f64::NAN);
    }

    let x_ties = TieCounts::of(x);
    let y_ties = TieCounts::of(y);

    let total_pairs = (n * (n - 1) / 2) as f64;
    let denom = ((total_pairs - x_ties.pairs) * (total_pairs - y_ties.pairs)).sqrt();
    if denom <= 0.0 {
        return (f64::NAN, f64::NAN);
    }

    let Concordance {
        discordant,
        joint_ties,
    } = Concordance::of(x, y);
    let con_minus_dis = total_pairs - x_ties.pairs - y_ties.pairs + joint_ties as f64
        - 2.0 * discordant as f64;
    let tau = (con_minus_dis / denom).clamp(-1.0, 1.0);

    let no_ties = x_ties.pairs == 0.0 && y_ties.pairs == 0.0;
    let c = discordant.min((total_pairs as u64).saturating_sub(discordant)) as usize;

    let pvalue = if no_ties && (n <= KENDALL_EXACT_MAX_N || c <= 1) {
        kendall_exact_pvalue(n, c)
    } else {
        let m = (n * (n - 1)) as f64;
        let size = n as f64;
        let mut var = (m * (2.0 * size + 5.0) - x_ties.v1 - y_ties.v1) / 18.0
            + (2.0 * x_ties.pairs * y_ties.pairs) / m;
        if n > 2 {
            var += x_ties.v2 * y_ties.v2 / (9.0 * m * (size - 2.0));
        }
        let z = con_minus_dis / var.sqrt();
        erfc(z.abs() / std::f64::consts::SQRT_2)
    };

    (tau, pvalue.min(1.0))
}

/// Average ranks (1-based), ties share the mean of their positions
pub fn to_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut indexed: Vec<(usize, f64)> = values.iter().copied().enumerate().collect();

    indexed.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; n];
    let mut i = 0;

    while i < n {
        let mut j = i;
        while j < n && indexed[j].1 == indexed[i].1 {
            j += 1;
        }

        let avg_rank = (i + j + 1) as f64 / 2.0;
        for item in &indexed[i..j] {
            ranks[item.0] = avg_rank;
        }

        i = j;
    }

    ranks
}

fn pearson_r(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;

    for (xi, yi) in x.iter().zip(y.iter()) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0)
}

/// Two-sided p-value of a correlation coefficient under H0: rho = 0
fn t_test_pvalue(r: f64, n: usize) -> f64 {
    if n <= 2 {
        return 1.0;
    }
    if 1.0 - r.abs() <= f64::EPSILON {
        return 0.0;
    }

    let df = (n - 2) as f64;
    let t = r * (df / (1.0 - r * r)).sqrt();

    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * dist.cdf(-t.abs())).min(1.0),
        Err(_) => f64::NAN,
    }
}

/// Two-sided exact p-value for `c` discordant pairs (the smaller tail)
/// among all permutations of `n` untied values.
fn kendall_exact_pvalue(n: usize, c: usize) -> f64 {
    if n <= 2 {
        return 1.0;
    }

    // dist[k] = P(a random permutation of j elements has k inversions), k <= c
    let mut dist = vec![0.0; c + 1];
    dist[0] = 1.0;

    for j in 2..=n {
        let mut cumulative = vec![0.0; c + 2];
        for k in 0..=c {
            cumulative[k + 1] = cumulative[k] + dist[k];
        }
        for k in 0..=c {
            let lo = k.saturating_sub(j - 1);
            dist[k] = (cumulative[k + 1] - cumulative[lo]) / j as f64;
        }
    }

    (2.0 * dist.iter().sum::<f64>()).min(1.0)
}

/// Tie statistics of a sample, as used by the tau-b variance
struct TieCounts {
    /// sum t(t-1)/2
    pairs: f64,
    /// sum t(t-1)(2t+5)
    v1: f64,
    /// sum t(t-1)(t-2)
    v2: f64,
}

impl TieCounts {
    fn of(values: &[f64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        let mut counts = Self {
            pairs: 0.0,
            v1: 0.0,
            v2: 0.0,
        };

        let mut i = 0;
        while i < sorted.len() {
            let mut j = i;
            while j < sorted.len() && sorted[j] == sorted[i] {
                j += 1;
            }
            let t = (j - i) as f64;
            if t > 1.0 {
                counts.pairs += t * (t - 1.0) / 2.0;
                counts.v1 += t * (t - 1.0) * (2.0 * t + 5.0);
                counts.v2 += t * (t - 1.0) * (t - 2.0);
            }
            i = j;
        }

        counts
    }
}

/// Pair counts of a paired sample, found in O(n log n).
///
/// Points are sorted by (x, y); the discordant pairs are then the inversions
/// of the y sequence, counted while merge sorting it.
struct Concordance {
    /// Pairs ordered strictly opposite in x and y
    discordant: u64,
    /// Pairs tied in both x and y
    joint_ties: u64,
}

impl Concordance {
    fn of(x: &[f64], y: &[f64]) -> Self {
        let mut points: Vec<(f64, f64)> = x.iter().copied().zip(y.iter().copied()).collect();
        points.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(Ordering::Equal)
                .then(a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
        });

        let mut joint_ties = 0u64;
        let mut run = 1u64;
        for pair in points.windows(2) {
            if pair[0] == pair[1] {
                run += 1;
            } else {
                joint_ties += run * (run - 1) / 2;
                run = 1;
            }
        }
        joint_ties += run * (run - 1) / 2;

        let mut ys: Vec<f64> = points.iter().map(|p| p.1).collect();
        let mut buffer = vec![0.0; ys.len()];
        let discordant = count_inversions(&mut ys, &mut buffer);

        Self {
            discordant,
            joint_ties,
        }
    }
}

/// Sort `values` ascending and return the number of strictly inverted pairs
fn count_inversions(values: &mut [f64], buffer: &mut [f64]) -> u64 {
    let n = values.len();
    if n < 2 {
        return 0;
    }

    let mid = n / 2;
    let mut inversions = {
        let (left, right) = values.split_at_mut(mid);
        let (left_buf, right_buf) = buffer.split_at_mut(mid);
        count_inversions(left, left_buf) + count_inversions(right, right_buf)
    };

    let (mut i, mut j) = (0, mid);
    for slot in buffer.iter_mut().take(n) {
        if j < n && (i >= mid || values[j] < values[i]) {
            *slot = values[j];
            if i < mid {
                inversions += (mid - i) as u64;
            }
            j += 1;
        } else {
            *slot = values[i];
            i += 1;
        }
    }
    values.copy_from_slice(&buffer[..n]);

    inversions
}

fn has_nan(values: &[f64]) -> bool {
    values.iter().any(|v| v.is_nan())
}

fn is_constant(values: &[f64]) -> bool {
    values.iter().all(|&v| v == values[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_pearson_perfect_positive() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![2.0, 4.0, 6.0, 8.0, 10.0];

        let (r, p) = pearson(&x, &y);
        assert!((r - 1.0).abs() < 1e-10);
        assert!(p < 1e-10);
    }

    #[test]
    fn test_pearson_perfect_negative() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![10.0, 8.0, 6.0, 4.0, 2.0];

        let (r, _) = pearson(&x, &y);
        assert!((r + 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_pearson_pvalue_reference() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![2.0, 1.0, 4.0, 3.0, 5.0];

        let (r, p) = pearson(&x, &y);
        assert_relative_eq!(r, 0.8, epsilon = 1e-12);
        // t = 0.8 * sqrt(3 / 0.36) = 2.3094, two-sided with 3 dof
        assert_relative_eq!(p, 0.10408803866182788, epsilon = 1e-6);
    }

    #[test]
    fn test_pearson_constant_input() {
        let (r, p) = pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]);
        assert!(r.is_nan());
        assert!(p.is_nan());
    }

    #[test]
    fn test_two_samples_pvalue_is_one() {
        let (r, p) = pearson(&[1.0, 2.0], &[3.0, 1.0]);
        assert!((r + 1.0).abs() < 1e-12);
        assert_eq!(p, 1.0);
    }

    #[test]
    fn test_spearman_monotone() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![1.0, 4.0, 9.0, 16.0, 100.0];

        let (rho, p) = spearman(&x, &y);
        assert!((rho - 1.0).abs() < 1e-12);
        assert_eq!(p, 0.0);
    }

    #[test]
    fn test_spearman_with_ties() {
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![5.0, 6.0, 7.0, 8.0, 7.0];

        let (rho, _) = spearman(&x, &y);
        // ranks of y: 1, 2, 3.5, 5, 3.5
        assert_relative_eq!(rho, 0.8207826816681233, epsilon = 1e-12);
    }

    #[test]
    fn test_to_ranks() {
        let values = vec![3.0, 1.0, 4.0, 1.0, 5.0];
        let ranks = to_ranks(&values);

        assert!((ranks[1] - 1.5).abs() < 1e-10);
        assert!((ranks[3] - 1.5).abs() < 1e-10);
        assert!((ranks[0] - 3.0).abs() < 1e-10);
        assert!((ranks[4] - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_kendall_exact() {
        // one discordant pair out of ten
        let x = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![1.0, 3.0, 2.0, 4.0, 5.0];

        let (tau, p) = kendall(&x, &y);
        assert_relative_eq!(tau, 0.8, epsilon = 1e-12);
        // 2 * (1 + 4) / 5! = 1/12
        assert_relative_eq!(p, 1.0 / 12.0, epsilon = 1e-12);
    }

    #[test]
    fn test_kendall_identity() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let (tau, p) = kendall(&x, &x);

        assert!((tau - 1.0).abs() < 1e-12);
        // 2 / 10!
        assert!(p < 1e-6);
    }

    #[test]
    fn test_kendall_with_ties_uses_tau_b() {
        let x = vec![1.0, 2.0, 2.0, 3.0, 4.0, 5.0];
        let y = vec![1.0, 2.0, 3.0, 3.0, 5.0, 4.0];

        let (tau, p) = kendall(&x, &y);
        // concordant = 12, discordant = 1, one tie in x, one tie in y
        assert_relative_eq!(tau, 11.0 / 14.0, epsilon = 1e-12);
        assert!(p > 0.0 && p < 0.1);
    }

    #[test]
    fn test_kendall_exact_median_is_one() {
        assert_eq!(kendall_exact_pvalue(4, 3), 1.0);
    }

    /// Pair counts by comparing every pair
    fn brute_force_counts(x: &[f64], y: &[f64]) -> (i64, u64, u64) {
        let mut con_minus_dis = 0i64;
        let mut discordant = 0u64;
        let mut joint_ties = 0u64;
        for i in 0..x.len() {
            for j in (i + 1)..x.len() {
                let dx = (x[j] - x[i]).signum() as i64 * i64::from(x[j] != x[i]);
                let dy = (y[j] - y[i]).signum() as i64 * i64::from(y[j] != y[i]);
                con_minus_dis += dx * dy;
                if dx * dy < 0 {
                    discordant += 1;
                }
                if dx == 0 && dy == 0 {
                    joint_ties += 1;
                }
            }
        }
        (con_minus_dis, discordant, joint_ties)
    }

    #[test]
    fn test_kendall_counts_match_pairwise_comparison() {
        let mut rng = StdRng::seed_from_u64(11);

        for n in [2, 3, 17, 64, 257] {
            let x: Vec<f64> = (0..n).map(|_| rng.gen_range(0..7) as f64).collect();
            let y: Vec<f64> = (0..n).map(|_| rng.gen_range(0..5) as f64).collect();

            let (con_minus_dis, discordant, joint_ties) = brute_force_counts(&x, &y);
            let counts = Concordance::of(&x, &y);
            assert_eq!(counts.discordant, discordant);
            assert_eq!(counts.joint_ties, joint_ties);

            let x_ties = TieCounts::of(&x);
            let y_ties = TieCounts::of(&y);
            let denom = ((n * (n - 1) / 2) as f64 - x_ties.pairs)
                * ((n * (n - 1) / 2) as f64 - y_ties.pairs);
            let (tau, _) = kendall(&x, &y);
            if denom > 0.0 {
                assert_relative_eq!(tau, con_minus_dis as f64 / denom.sqrt(), epsilon = 1e-12);
            } else {
                assert!(tau.is_nan());
            }
        }
    }

    #[test]
    fn test_kendall_large_untied_sample() {
        let mut rng = StdRng::seed_from_u64(5);
        let x: Vec<f64> = (0..2000).map(|_| rng.gen::<f64>()).collect();
        let y: Vec<f64> = x.iter().map(|v| v + 0.5 * rng.gen::<f64>()).collect();

        let (_, discordant, _) = brute_force_counts(&x, &y);
        assert_eq!(Concordance::of(&x, &y).discordant, discordant);

        let (tau, p) = kendall(&x, &y);
        assert!(tau > 0.5 && tau < 1.0);
        assert!(p < 1e-10);
    }

    #[test]
    fn test_count_inversions_sorts() {
        let mut values = vec![3.0, 1.0, 2.0, 2.0, 0.0];
        let mut buffer = vec![0.0; values.len()];
        // (3,1) (3,2) (3,2) (3,0) (1,0) (2,0) (2,0)
        assert_eq!(count_inversions(&mut values, &mut buffer), 7);
        assert_eq!(values, vec![0.0, 1.0, 2.0, 2.0, 3.0]);
    }

    #[test]
    fn test_symmetry() {
        let x = vec![0.3, -1.2, 2.5, 0.7, 1.1, -0.4, 0.9];
        let y = vec![1.3, 0.2, 1.5, -0.7, 2.1, 0.4, -0.9];

        for f in [pearson, spearman, kendall] {
            let (s_xy, p_xy) = f(&x, &y);
            let (s_yx, p_yx) = f(&y, &x);
            assert!((s_xy - s_yx).abs() < 1e-12);
            assert!((p_xy - p_yx).abs() < 1e-12);
        }
    }
}
