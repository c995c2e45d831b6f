//! Data module for observation tables.
//!
//! This module provides:
//! - The immutable observation table (rows = samples, columns = variables)
//! - CSV loading
//! - Preprocessing (standardization, missing values)
//! - Synthetic demo data

pub mod demo;
mod loader;
mod preprocessor;

pub use loader::CsvOptions;
pub use preprocessor::{fill_missing, standardize};

use crate::error::{Error, Result};
use ndarray::{Array2, ArrayView1};
use std::collections::HashSet;

/// Table of numeric observations.
///
/// Column order is the variable order used by everything downstream.
/// Missing values are stored as `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationTable {
    /// Variable names, in column order
    columns: Vec<String>,
    /// Optional row labels
    index: Option<Vec<String>>,
    /// Values matrix (rows = samples, cols = variables)
    values: Array2<f64>,
}

impl ObservationTable {
    /// Create a table from column names and a samples x variables matrix
    pub fn new(columns: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if values.ncols() != columns.len() {
            return Err(Error::LengthMismatch {
                expected: columns.len(),
                actual: values.ncols(),
            });
        }

        let mut seen = HashSet::new();
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(Error::InvalidConfig(format!("duplicate column name '{}'", name)));
            }
        }

        Ok(Self {
            columns,
            index: None,
            values,
        })
    }

    /// Create a table from one vector per variable
    pub fn from_columns(columns: Vec<String>, data: Vec<Vec<f64>>) -> Result<Self> {
        if data.len() != columns.len() {
            return Err(Error::LengthMismatch {
                expected: columns.len(),
                actual: data.len(),
            });
        }

        let n_samples = data.first().map(|c| c.len()).unwrap_or(0);
        let mut values = Array2::zeros((n_samples, data.len()));

        for (j, column) in data.iter().enumerate() {
            if column.len() != n_samples {
                return Err(Error::LengthMismatch {
                    expected: n_samples,
                    actual: column.len(),
                });
            }
            for (i, &value) in column.iter().enumerate() {
                values[[i, j]] = value;
            }
        }

        Self::new(columns, values)
    }

    /// Attach row labels
    pub fn with_index(mut self, index: Vec<String>) -> Result<Self> {
        if index.len() != self.n_samples() {
            return Err(Error::LengthMismatch {
                expected: self.n_samples(),
                actual: index.len(),
            });
        }
        self.index = Some(index);
        Ok(self)
    }

    /// Variable names in column order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Row labels, if the table was loaded with an index column
    pub fn index(&self) -> Option<&[String]> {
        self.index.as_deref()
    }

    /// Raw values matrix
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Number of variables
    pub fn n_variables(&self) -> usize {
        self.columns.len()
    }

    /// Number of samples
    pub fn n_samples(&self) -> usize {
        self.values.nrows()
    }

    /// Position of a variable in the column order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// View of the i-th column
    pub fn column(&self, i: usize) -> ArrayView1<'_, f64> {
        self.values.column(i)
    }

    /// Values of a variable by name
    pub fn column_by_name(&self, name: &str) -> Option<Vec<f64>> {
        self.position(name).map(|i| self.column(i).to_vec())
    }

    /// All columns as contiguous vectors, in column order
    pub fn column_vectors(&self) -> Vec<Vec<f64>> {
        (0..self.n_variables())
            .map(|j| self.column(j).to_vec())
            .collect()
    }

    /// New table restricted to the given columns, in the given order
    pub fn select(&self, columns: &[String]) -> Result<Self> {
        let positions = columns
            .iter()
            .map(|name| {
                self.position(name)
                    .ok_or_else(|| Error::InvalidConfig(format!("unknown column '{}'", name)))
            })
            .collect::<Result<Vec<_>>>()?;

        let values = self.values.select(ndarray::Axis(1), &positions);
        let mut table = Self::new(columns.to_vec(), values)?;
        table.index = self.index.clone();
        Ok(table)
    }

    /// Number of missing (NaN) cells
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }

    /// Whether any cell is missing
    pub fn has_missing(&self) -> bool {
        self.values.iter().any(|v| v.is_nan())
    }

    /// Copy of the table with every column standardized to zero mean and unit variance
    pub fn standardized(&self) -> Self {
        Self {
            columns: self.columns.clone(),
            index: self.index.clone(),
            values: standardize(&self.values),
        }
    }
}
