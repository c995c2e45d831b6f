//! Pairwise correlation statistics between the variables of a table.
//!
//! The engine evaluates the chosen method on every ordered pair of columns,
//! self-pairs included, and stores the results row-major in variable order.

mod methods;

pub use methods::{kendall, pearson, spearman, to_ranks};

use crate::data::ObservationTable;
use crate::error::{Error, Result};
use ndarray::Array2;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, trace};

/// Caller-supplied correlation function returning `(statistic, pvalue)`
pub type CorrelationFn = Arc<dyn Fn(&[f64], &[f64]) -> (f64, f64) + Send + Sync>;

/// Method for calculating correlations
#[derive(Clone, Default)]
pub enum CorrelationMethod {
    /// Pearson correlation (linear)
    #[default]
    Pearson,
    /// Spearman correlation (rank-based)
    Spearman,
    /// Kendall tau-b correlation
    Kendall,
    /// Caller-supplied function
    Custom { name: String, function: CorrelationFn },
}

impl CorrelationMethod {
    /// Wrap a custom `(x, y) -> (statistic, pvalue)` function
    pub fn custom<F>(name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&[f64], &[f64]) -> (f64, f64) + Send + Sync + 'static,
    {
        Self::Custom {
            name: name.into(),
            function: Arc::new(function),
        }
    }

    /// Name used in labels and logs
    pub fn name(&self) -> &str {
        match self {
            Self::Pearson => "pearson",
            Self::Spearman => "spearman",
            Self::Kendall => "kendall",
            Self::Custom { name, .. } => name,
        }
    }

    /// Whether `f(x, y) == f(y, x)` is known to hold
    pub fn is_symmetric(&self) -> bool {
        !matches!(self, Self::Custom { .. })
    }

    /// Apply the method to two sequences
    pub fn correlate(&self, x: &[f64], y: &[f64]) -> (f64, f64) {
        match self {
            Self::Pearson => pearson(x, y),
            Self::Spearman => spearman(x, y),
            Self::Kendall => kendall(x, y),
            Self::Custom { function, .. } => function(x, y),
        }
    }
}

impl fmt::Debug for CorrelationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom { name, .. } => f.debug_struct("Custom").field("name", name).finish(),
            _ => f.write_str(self.name()),
        }
    }
}

impl fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CorrelationMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pearson" => Ok(Self::Pearson),
            "spearman" => Ok(Self::Spearman),
            "kendall" => Ok(Self::Kendall),
            _ => Err(Error::UnsupportedMethod(s.to_string())),
        }
    }
}

/// Statistic and p-value for one ordered pair of variables
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairwiseResult {
    /// Correlation coefficient in [-1, 1]
    pub statistic: f64,
    /// Probability in [0, 1], before or after correction
    pub pvalue: f64,
}

impl PairwiseResult {
    /// Create a new result
    pub fn new(statistic: f64, pvalue: f64) -> Self {
        Self { statistic, pvalue }
    }
}

/// Square matrix of pairwise results, row-major in variable order
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    variables: Vec<String>,
    results: Vec<PairwiseResult>,
}

impl CorrelationMatrix {
    /// Create a matrix from row-major results; needs exactly n² entries
    pub fn new(variables: Vec<String>, results: Vec<PairwiseResult>) -> Result<Self> {
        let n = variables.len();
        if results.len() != n * n {
            return Err(Error::MalformedCorrelationMatrix(format!(
                "expected {} entries for {} variables, got {}",
                n * n,
                n,
                results.len()
            )));
        }
        Ok(Self { variables, results })
    }

    /// Pivot long-form `(var_1, var_2, result)` entries into a square matrix.
    ///
    /// Variable order is the order of first appearance as `var_1`. Every
    /// ordered pair must appear exactly once.
    pub fn from_long_form<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String, PairwiseResult)>,
    {
        let entries: Vec<_> = entries.into_iter().collect();

        let mut variables: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (var_1, _, _) in &entries {
            if !positions.contains_key(var_1) {
                positions.insert(var_1.clone(), variables.len());
                variables.push(var_1.clone());
            }
        }

        let n = variables.len();
        let mut cells: Vec<Option<PairwiseResult>> = vec![None; n * n];

        for (var_1, var_2, result) in entries {
            let i = positions[&var_1];
            let j = *positions.get(&var_2).ok_or_else(|| {
                Error::MalformedCorrelationMatrix(format!(
                    "'{}' appears as a column but never as a row",
                    var_2
                ))
            })?;
            if cells[i * n + j].replace(result).is_some() {
                return Err(Error::MalformedCorrelationMatrix(format!(
                    "duplicate entry for ({}, {})",
                    var_1, var_2
                )));
            }
        }

        let results = cells
            .into_iter()
            .enumerate()
            .map(|(k, cell)| {
                cell.ok_or_else(|| {
                    Error::MalformedCorrelationMatrix(format!(
                        "missing entry for ({}, {})",
                        variables[k / n],
                        variables[k % n]
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(variables, results)
    }

    /// Variable names in matrix order
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Number of variables
    pub fn n_variables(&self) -> usize {
        self.variables.len()
    }

    /// Number of stored pairs (n²)
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether the matrix has no variables
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Result for the ordered pair (i, j)
    pub fn get(&self, i: usize, j: usize) -> Option<&PairwiseResult> {
        let n = self.n_variables();
        if i < n && j < n {
            self.results.get(i * n + j)
        } else {
            None
        }
    }

    /// Result for the ordered pair of named variables
    pub fn get_by_name(&self, var_1: &str, var_2: &str) -> Option<&PairwiseResult> {
        let i = self.variables.iter().position(|v| v == var_1)?;
        let j = self.variables.iter().position(|v| v == var_2)?;
        self.get(i, j)
    }

    /// Row of results for variable i
    pub fn row(&self, i: usize) -> &[PairwiseResult] {
        let n = self.n_variables();
        if i < n {
            &self.results[i * n..(i + 1) * n]
        } else {
            &[]
        }
    }

    /// All results, row-major
    pub fn results(&self) -> &[PairwiseResult] {
        &self.results
    }

    /// Iterate `(i, j, result)` in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &PairwiseResult)> + '_ {
        let n = self.n_variables();
        self.results
            .iter()
            .enumerate()
            .map(move |(k, result)| (k / n, k % n, result))
    }

    /// Flat row-major p-values
    pub fn pvalues(&self) -> Vec<f64> {
        self.results.iter().map(|r| r.pvalue).collect()
    }

    /// Write p-values back in the same row-major order they were read
    pub fn set_pvalues(&mut self, pvalues: &[f64]) -> Result<()> {
        if pvalues.len() != self.results.len() {
            return Err(Error::LengthMismatch {
                expected: self.results.len(),
                actual: pvalues.len(),
            });
        }
        for (result, &p) in self.results.iter_mut().zip(pvalues) {
            result.pvalue = p;
        }
        Ok(())
    }

    /// Statistics pivoted into an n x n array
    pub fn statistics(&self) -> Array2<f64> {
        let n = self.n_variables();
        Array2::from_shape_fn((n, n), |(i, j)| self.results[i * n + j].statistic)
    }
}

/// Computes the full pairwise result matrix for a table
#[derive(Debug, Clone, Default)]
pub struct CorrelationEngine {
    method: CorrelationMethod,
    exploit_symmetry: bool,
}

impl CorrelationEngine {
    /// Create an engine for the given method
    pub fn new(method: CorrelationMethod) -> Self {
        Self {
            method,
            exploit_symmetry: false,
        }
    }

    /// Compute only the upper triangle and mirror it when the method is a
    /// symmetric built-in. Custom methods are always evaluated on every pair.
    pub fn exploit_symmetry(mut self, enabled: bool) -> Self {
        self.exploit_symmetry = enabled;
        self
    }

    /// The configured method
    pub fn method(&self) -> &CorrelationMethod {
        &self.method
    }

    /// Compute `(statistic, pvalue)` for every ordered pair of columns
    pub fn compute(&self, table: &ObservationTable) -> Result<CorrelationMatrix> {
        let n = table.n_variables();
        if n > 0 && table.n_samples() < 2 {
            return Err(Error::InsufficientData(format!(
                "correlation needs at least 2 samples, got {}",
                table.n_samples()
            )));
        }

        let mirror = self.exploit_symmetry && self.method.is_symmetric();
        debug!(
            method = self.method.name(),
            variables = n,
            samples = table.n_samples(),
            mirror,
            "Computing pairwise correlations"
        );

        let columns = table.column_vectors();
        let names = table.columns();

        let rows: Vec<Vec<PairwiseResult>> = (0..n)
            .into_par_iter()
            .map(|i| {
                let start = if mirror { i } else { 0 };
                (start..n)
                    .map(|j| {
                        trace!(var_1 = %names[i], var_2 = %names[j], "Computing correlation");
                        let (statistic, pvalue) = self.method.correlate(&columns[i], &columns[j]);
                        PairwiseResult::new(statistic, pvalue)
                    })
                    .collect()
            })
            .collect();

        let results = if mirror {
            let mut full = vec![PairwiseResult::new(f64::NAN, f64::NAN); n * n];
            for (i, row) in rows.iter().enumerate() {
                for (offset, result) in row.iter().enumerate() {
                    let j = i + offset;
                    full[i * n + j] = *result;
                    full[j * n + i] = *result;
                }
            }
            full
        } else {
            rows.into_iter().flatten().collect()
        };

        CorrelationMatrix::new(names.to_vec(), results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_table() -> ObservationTable {
        ObservationTable::from_columns(
            vec!["a".into(), "b".into(), "c".into()],
            vec![
                vec![0.01, 0.02, -0.01, 0.015, 0.03, -0.02],
                vec![0.012, 0.018, -0.008, 0.014, 0.025, -0.015],
                vec![-0.005, 0.03, 0.01, -0.02, 0.0, 0.02],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_method_from_str() {
        assert!(matches!("pearson".parse::<CorrelationMethod>(), Ok(CorrelationMethod::Pearson)));
        assert!(matches!("Kendall".parse::<CorrelationMethod>(), Ok(CorrelationMethod::Kendall)));
        assert!(matches!(
            "cosine".parse::<CorrelationMethod>(),
            Err(Error::UnsupportedMethod(_))
        ));
    }

    #[test]
    fn test_full_matrix() {
        let table = test_table();
        for method in [
            CorrelationMethod::Pearson,
            CorrelationMethod::Spearman,
            CorrelationMethod::Kendall,
        ] {
            let matrix = CorrelationEngine::new(method).compute(&table).unwrap();

            assert_eq!(matrix.len(), 9);
            for i in 0..3 {
                let diag = matrix.get(i, i).unwrap();
                assert!((diag.statistic - 1.0).abs() < 1e-10);
                assert!(diag.pvalue < 0.01);
                for j in 0..3 {
                    let a = matrix.get(i, j).unwrap();
                    let b = matrix.get(j, i).unwrap();
                    assert!((a.statistic - b.statistic).abs() < 1e-12);
                    assert!((a.pvalue - b.pvalue).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_custom_method_sees_every_ordered_pair() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let method = CorrelationMethod::custom("first-diff", move |x: &[f64], y: &[f64]| {
            counter.fetch_add(1, Ordering::SeqCst);
            (x[0] - y[0], 0.5)
        });

        let matrix = CorrelationEngine::new(method)
            .exploit_symmetry(true)
            .compute(&test_table())
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 9);
        // asymmetric output is kept as computed
        let ab = matrix.get_by_name("a", "b").unwrap().statistic;
        let ba = matrix.get_by_name("b", "a").unwrap().statistic;
        assert!((ab + ba).abs() < 1e-12);
        assert!(ab.abs() > 0.0);
    }

    #[test]
    fn test_mirrored_matches_full() {
        let table = test_table();
        let full = CorrelationEngine::new(CorrelationMethod::Spearman)
            .compute(&table)
            .unwrap();
        let mirrored = CorrelationEngine::new(CorrelationMethod::Spearman)
            .exploit_symmetry(true)
            .compute(&table)
            .unwrap();

        assert_eq!(full, mirrored);
    }

    #[test]
    fn test_insufficient_samples() {
        let table =
            ObservationTable::from_columns(vec!["a".into()], vec![vec![1.0]]).unwrap();
        let result = CorrelationEngine::default().compute(&table);
        assert!(matches!(result, Err(Error::InsufficientData(_))));
    }

    #[test]
    fn test_pvalue_roundtrip_preserves_positions() {
        let mut matrix = CorrelationEngine::default().compute(&test_table()).unwrap();
        let replaced: Vec<f64> = (0..9).map(|k| k as f64 / 10.0).collect();
        matrix.set_pvalues(&replaced).unwrap();

        assert_eq!(matrix.get(1, 2).unwrap().pvalue, 0.5);
        assert_eq!(matrix.pvalues(), replaced);
        assert!(matrix.set_pvalues(&[0.1]).is_err());
    }

    #[test]
    fn test_from_long_form() {
        let entries = vec![
            ("a".to_string(), "a".to_string(), PairwiseResult::new(1.0, 0.0)),
            ("a".to_string(), "b".to_string(), PairwiseResult::new(0.3, 0.2)),
            ("b".to_string(), "a".to_string(), PairwiseResult::new(0.3, 0.2)),
            ("b".to_string(), "b".to_string(), PairwiseResult::new(1.0, 0.0)),
        ];
        let matrix = CorrelationMatrix::from_long_form(entries.clone()).unwrap();
        assert_eq!(matrix.variables(), &["a", "b"]);
        assert_eq!(matrix.statistics()[[0, 1]], 0.3);

        let incomplete = CorrelationMatrix::from_long_form(entries[..3].to_vec());
        assert!(matches!(incomplete, Err(Error::MalformedCorrelationMatrix(_))));

        let mut duplicated = entries.clone();
        duplicated.push(entries[1].clone());
        assert!(matches!(
            CorrelationMatrix::from_long_form(duplicated),
            Err(Error::MalformedCorrelationMatrix(_))
        ));
    }
}
