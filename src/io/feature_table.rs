//! Feature sink interface and an in-memory table
//!
//! Each column holds one dense multi-dimensional cell per row. Columns are
//! registered lazily the first time the analyzer writes to them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DspError;

/// Append-only tabular store receiving one row per analyzed trial
pub trait FeatureSink {
    /// Appends an empty row and returns its index
    fn add_row(&mut self) -> usize;

    /// Registers `name` with the given cell shape unless it already exists
    ///
    /// # Errors
    ///
    /// Returns `DspError::InvalidInput` if the column exists with a different shape.
    fn add_column_if_absent(&mut self, name: &str, shape: &[usize]) -> Result<(), DspError>;

    /// Writes one value into a cell
    ///
    /// # Errors
    ///
    /// Returns `DspError::InvalidInput` for an unknown column, row or index.
    fn write_cell(
        &mut self,
        name: &str,
        row: usize,
        indices: &[usize],
        value: f32,
    ) -> Result<(), DspError>;
}

/// One column: a shape and a flat row-major cell per row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    shape: Vec<usize>,
    cells: Vec<Vec<f32>>,
}

impl Column {
    fn new(shape: &[usize], rows: usize) -> Self {
        let len = shape.iter().product();
        Self {
            shape: shape.to_vec(),
            cells: vec![vec![0.0; len]; rows],
        }
    }

    /// Cell shape
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Row-major offset of `indices`, or `None` if out of range
    fn offset(&self, indices: &[usize]) -> Option<usize> {
        if indices.len() != self.shape.len() {
            return None;
        }
        let mut off = 0;
        for (&i, &dim) in indices.iter().zip(&self.shape) {
            if i >= dim {
                return None;
            }
            off = off * dim + i;
        }
        Some(off)
    }
}

/// In-memory [`FeatureSink`] with a lazily populated schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    rows: usize,
    columns: BTreeMap<String, Column>,
}

impl FeatureTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Registered column names, sorted
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Looks up a column
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Reads one value back
    pub fn cell(&self, name: &str, row: usize, indices: &[usize]) -> Option<f32> {
        let col = self.columns.get(name)?;
        let off = col.offset(indices)?;
        col.cells.get(row).map(|cell| cell[off])
    }

    /// Flat row-major values of one cell
    pub fn row_values(&self, name: &str, row: usize) -> Option<&[f32]> {
        self.columns
            .get(name)
            .and_then(|col| col.cells.get(row))
            .map(Vec::as_slice)
    }
}

impl FeatureSink for FeatureTable {
    fn add_row(&mut self) -> usize {
        for col in self.columns.values_mut() {
            let len = col.shape.iter().product();
            col.cells.push(vec![0.0; len]);
        }
        self.rows += 1;
        self.rows - 1
    }

    fn add_column_if_absent(&mut self, name: &str, shape: &[usize]) -> Result<(), DspError> {
        if let Some(col) = self.columns.get(name) {
            if col.shape != shape {
                return Err(DspError::InvalidInput(format!(
                    "Column '{}' exists with shape {:?}, requested {:?}",
                    name, col.shape, shape
                )));
            }
            return Ok(());
        }
        log::debug!("Adding column '{}' with shape {:?}", name, shape);
        self.columns
            .insert(name.to_string(), Column::new(shape, self.rows));
        Ok(())
    }

    fn write_cell(
        &mut self,
        name: &str,
        row: usize,
        indices: &[usize],
        value: f32,
    ) -> Result<(), DspError> {
        let col = self
            .columns
            .get_mut(name)
            .ok_or_else(|| DspError::InvalidInput(format!("Unknown column '{}'", name)))?;
        let off = col.offset(indices).ok_or_else(|| {
            DspError::InvalidInput(format!(
                "Index {:?} out of range for column '{}' with shape {:?}",
                indices, name, col.shape
            ))
        })?;
        let cell = col.cells.get_mut(row).ok_or_else(|| {
            DspError::InvalidInput(format!("Row {} out of range for column '{}'", row, name))
        })?;
        cell[off] = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_columns_and_rows() {
        let mut table = FeatureTable::new();
        let row = table.add_row();
        assert_eq!(row, 0);

        // Column added after the row still gets a cell for it
        table.add_column_if_absent("mel", &[2, 3]).unwrap();
        table.write_cell("mel", 0, &[1, 2], 0.5).unwrap();
        assert_eq!(table.cell("mel", 0, &[1, 2]), Some(0.5));
        assert_eq!(table.cell("mel", 0, &[0, 0]), Some(0.0));

        let row = table.add_row();
        assert_eq!(row, 1);
        assert_eq!(table.row_values("mel", 1).map(|v| v.len()), Some(6));
    }

    #[test]
    fn test_shape_conflict() {
        let mut table = FeatureTable::new();
        table.add_column_if_absent("mel", &[4]).unwrap();
        assert!(table.add_column_if_absent("mel", &[4]).is_ok());
        assert!(table.add_column_if_absent("mel", &[5]).is_err());
    }

    #[test]
    fn test_write_out_of_range() {
        let mut table = FeatureTable::new();
        table.add_column_if_absent("pow", &[3]).unwrap();
        table.add_row();
        assert!(table.write_cell("pow", 0, &[3], 1.0).is_err());
        assert!(table.write_cell("pow", 1, &[0], 1.0).is_err());
        assert!(table.write_cell("missing", 0, &[0], 1.0).is_err());
    }
}
