//! CSV loading for observation tables.

use super::ObservationTable;
use crate::error::{Error, Result};
use ndarray::Array2;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// Tokens read as missing values
const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "NULL", "null"];

/// Options for reading a delimited file with a header row
#[derive(Debug, Clone, Default)]
pub struct CsvOptions {
    /// Treat the first column as row labels instead of a variable
    pub index_col: bool,
    /// Keep only these columns, in this order
    pub columns: Option<Vec<String>>,
    /// Field delimiter, defaults to ','
    pub delimiter: Option<u8>,
}

impl CsvOptions {
    /// Use the first column as row labels
    pub fn with_index_col(mut self, index_col: bool) -> Self {
        self.index_col = index_col;
        self
    }

    /// Restrict the table to the given columns
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    /// Set the field delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }
}

impl ObservationTable {
    /// Load a table from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P, options: &CsvOptions) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading observation table");
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file, options)
    }

    /// Load a table from any CSV source
    pub fn from_csv_reader<R: Read>(source: R, options: &CsvOptions) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter.unwrap_or(b','))
            .trim(csv::Trim::All)
            .from_reader(source);

        let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
        let skip = usize::from(options.index_col);
        let columns: Vec<String> = headers.iter().skip(skip).cloned().collect();

        let mut index = Vec::new();
        let mut rows: Vec<Vec<f64>> = Vec::new();

        for (row_idx, result) in reader.records().enumerate() {
            let record = result?;
            if record.len() != headers.len() {
                return Err(Error::LengthMismatch {
                    expected: headers.len(),
                    actual: record.len(),
                });
            }

            if options.index_col {
                index.push(record.get(0).unwrap_or_default().to_string());
            }

            let values = record
                .iter()
                .skip(skip)
                .zip(columns.iter())
                .map(|(cell, column)| parse_cell(cell, row_idx, column))
                .collect::<Result<Vec<f64>>>()?;
            rows.push(values);
        }

        let mut values = Array2::zeros((rows.len(), columns.len()));
        for (i, row) in rows.iter().enumerate() {
            for (j, &value) in row.iter().enumerate() {
                values[[i, j]] = value;
            }
        }

        debug!(
            samples = values.nrows(),
            variables = values.ncols(),
            "Parsed CSV"
        );

        let mut table = ObservationTable::new(columns, values)?;
        if options.index_col {
            table = table.with_index(index)?;
        }

        match &options.columns {
            Some(selected) => table.select(selected),
            None => Ok(table),
        }
    }

    /// Write the table as CSV; row labels, if any, become a leading `index` column
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), "Writing observation table");
        let file = std::fs::File::create(path)?;
        self.to_csv_writer(file)
    }

    /// Write the table as CSV to any sink
    pub fn to_csv_writer<W: Write>(&self, sink: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(sink);

        let mut header: Vec<&str> = Vec::with_capacity(self.n_variables() + 1);
        if self.index().is_some() {
            header.push("index");
        }
        header.extend(self.columns().iter().map(String::as_str));
        writer.write_record(&header)?;

        for (i, row) in self.values().rows().into_iter().enumerate() {
            let mut record: Vec<String> = Vec::with_capacity(header.len());
            if let Some(index) = self.index() {
                record.push(index[i].clone());
            }
            record.extend(row.iter().map(|v| {
                if v.is_nan() {
                    String::new()
                } else {
                    v.to_string()
                }
            }));
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }
}

fn parse_cell(cell: &str, row: usize, column: &str) -> Result<f64> {
    if MISSING_TOKENS.contains(&cell) {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>().map_err(|_| {
        Error::Parse(format!(
            "row {}, column '{}': '{}' is not numeric",
            row + 1,
            column,
            cell
        ))
    })
}
