//! Multiple-testing correction of p-value families.
//!
//! Adjusted values are returned in input order so each one can be written
//! back into the slot it was read from.

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Multiple-testing procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Correction {
    /// Multiply by the number of tests
    #[default]
    Bonferroni,
    /// One-step Sidak
    Sidak,
    /// Holm step-down (Bonferroni based)
    Holm,
    /// Holm step-down (Sidak based)
    HolmSidak,
    /// Simes-Hochberg step-up
    SimesHochberg,
    /// Benjamini-Hochberg false discovery rate
    BenjaminiHochberg,
    /// Benjamini-Yekutieli false discovery rate under dependence
    BenjaminiYekutieli,
}

impl Correction {
    /// Canonical procedure name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bonferroni => "bonferroni",
            Self::Sidak => "sidak",
            Self::Holm => "holm",
            Self::HolmSidak => "holm-sidak",
            Self::SimesHochberg => "simes-hochberg",
            Self::BenjaminiHochberg => "fdr_bh",
            Self::BenjaminiYekutieli => "fdr_by",
        }
    }

    /// Parse an optional procedure name; `None` or an empty name disables correction
    pub fn parse_optional(name: Option<&str>) -> Result<Option<Self>> {
        match name.map(str::trim) {
            None | Some("") => Ok(None),
            Some(name) => name.parse().map(Some),
        }
    }

    /// Adjust a family of p-values, keeping input order
    pub fn adjust(&self, pvalues: &[f64]) -> Vec<f64> {
        let k = pvalues.len() as f64;

        match self {
            Self::Bonferroni => one_step(pvalues, |p| p * k),
            Self::Sidak => one_step(pvalues, |p| -(k * (-p).ln_1p()).exp_m1()),
            Self::Holm => step_down(pvalues, |p, rank| (k - rank as f64) * p),
            Self::HolmSidak => step_down(pvalues, |p, rank| {
                -((k - rank as f64) * (-p).ln_1p()).exp_m1()
            }),
            Self::SimesHochberg => step_up(pvalues, |p, rank| (k - rank as f64) * p),
            Self::BenjaminiHochberg => step_up(pvalues, |p, rank| p * k / (rank + 1) as f64),
            Self::BenjaminiYekutieli => {
                let harmonic: f64 = (1..=pvalues.len()).map(|i| 1.0 / i as f64).sum();
                step_up(pvalues, |p, rank| p * k / (rank + 1) as f64 * harmonic)
            }
        }
    }
}

impl fmt::Display for Correction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Correction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "bonferroni" | "b" => Ok(Self::Bonferroni),
            "sidak" | "s" => Ok(Self::Sidak),
            "holm" | "h" => Ok(Self::Holm),
            "holm-sidak" | "hs" => Ok(Self::HolmSidak),
            "simes-hochberg" | "hochberg" | "sh" => Ok(Self::SimesHochberg),
            "fdr_bh" | "bh" | "fdr_i" | "i" => Ok(Self::BenjaminiHochberg),
            "fdr_by" | "by" | "fdr_n" | "n" => Ok(Self::BenjaminiYekutieli),
            _ => Err(Error::UnsupportedCorrection(s.to_string())),
        }
    }
}

/// Apply an optional procedure; `None` passes values through unchanged
pub fn correct(pvalues: &[f64], procedure: Option<Correction>) -> Vec<f64> {
    match procedure {
        Some(procedure) => procedure.adjust(pvalues),
        None => pvalues.to_vec(),
    }
}

/// One-step adjustment capped at 1; NaN stays NaN
fn one_step<F>(pvalues: &[f64], raw: F) -> Vec<f64>
where
    F: Fn(f64) -> f64,
{
    pvalues
        .iter()
        .map(|&p| if p.is_nan() { p } else { raw(p).min(1.0) })
        .collect()
}

/// Indices of the finite p-values in ascending order
fn ascending_order(pvalues: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..pvalues.len())
        .filter(|&i| !pvalues[i].is_nan())
        .collect();
    order.sort_by(|&a, &b| {
        pvalues[a]
            .partial_cmp(&pvalues[b])
            .unwrap_or(Ordering::Equal)
    });
    order
}

/// Step-down adjustment: raw values made monotone with a running maximum
fn step_down<F>(pvalues: &[f64], raw: F) -> Vec<f64>
where
    F: Fn(f64, usize) -> f64,
{
    let mut adjusted = vec![f64::NAN; pvalues.len()];
    let mut running = 0.0_f64;

    for (rank, &idx) in ascending_order(pvalues).iter().enumerate() {
        running = running.max(raw(pvalues[idx], rank));
        adjusted[idx] = running.min(1.0);
    }

    adjusted
}

/// Step-up adjustment: raw values made monotone with a running minimum from the top
fn step_up<F>(pvalues: &[f64], raw: F) -> Vec<f64>
where
    F: Fn(f64, usize) -> f64,
{
    let mut adjusted = vec![f64::NAN; pvalues.len()];
    let mut running = f64::INFINITY;

    for (rank, &idx) in ascending_order(pvalues).iter().enumerate().rev() {
        running = running.min(raw(pvalues[idx], rank));
        adjusted[idx] = running.min(1.0);
    }

    adjusted
}
