// Row-major table value plus the options shared by every read path.
use serde::Serialize;

use crate::core::line::DEFAULT_LINE_CAPACITY;
use crate::core::transpose::{col_major_to_row_major, row_major_to_col_major};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Table {
    name: String,
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl Table {
    /// Returns `None` unless `values.len() == rows * cols`.
    pub fn from_row_major(
        name: impl Into<String>,
        rows: usize,
        cols: usize,
        values: Vec<f64>,
    ) -> Option<Self> {
        if Some(values.len()) != rows.checked_mul(cols) {
            return None;
        }
        Some(Self {
            name: name.into(),
            rows,
            cols,
            values,
        })
    }

    /// Takes column-major storage (as binary matrix files hold it) and converts in place.
    pub fn from_column_major(
        name: impl Into<String>,
        rows: usize,
        cols: usize,
        mut values: Vec<f64>,
    ) -> Option<Self> {
        if Some(values.len()) != rows.checked_mul(cols) {
            return None;
        }
        col_major_to_row_major(&mut values, rows, cols);
        Self::from_row_major(name, rows, cols, values)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.values.get(row * self.cols + col).copied()
    }

    pub fn row(&self, row: usize) -> Option<&[f64]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.cols;
        self.values.get(start..start + self.cols)
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// Consumes the table and returns its values in column-major order.
    pub fn into_column_major(mut self) -> Vec<f64> {
        row_major_to_col_major(&mut self.values, self.rows, self.cols);
        self.values
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReadOptions {
    /// Log an info line naming table and file before reading.
    pub verbose: bool,
    /// Starting size of the line buffer; doubled whenever a line does not fit.
    pub initial_line_capacity: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            initial_line_capacity: DEFAULT_LINE_CAPACITY,
        }
    }
}

impl ReadOptions {
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn initial_line_capacity(mut self, capacity: usize) -> Self {
        self.initial_line_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{ReadOptions, Table};

    #[test]
    fn shape_must_match_value_count() {
        assert!(Table::from_row_major("t", 2, 2, vec![1.0; 3]).is_none());
        assert!(Table::from_row_major("t", 0, 4, Vec::new()).is_some());
        assert!(Table::from_row_major("t", usize::MAX, 2, Vec::new()).is_none());
    }

    #[test]
    fn accessors_follow_row_major_layout() {
        let table =
            Table::from_row_major("t", 2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("table");
        assert_eq!(table.shape(), (2, 3));
        assert_eq!(table.get(1, 0), Some(4.0));
        assert_eq!(table.get(2, 0), None);
        assert_eq!(table.get(0, 3), None);
        assert_eq!(table.row(1), Some(&[4.0, 5.0, 6.0][..]));
        assert_eq!(table.row(2), None);
    }

    #[test]
    fn column_major_conversions_are_inverse() {
        let table = Table::from_column_major("t", 2, 3, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0])
            .expect("table");
        assert_eq!(table.values(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(
            table.into_column_major(),
            vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]
        );
    }

    #[test]
    fn table_serializes_with_shape() {
        let table = Table::from_row_major("t", 1, 2, vec![0.5, 1.5]).expect("table");
        let value = serde_json::to_value(&table).expect("json");
        assert_eq!(value["name"], "t");
        assert_eq!(value["rows"], 1);
        assert_eq!(value["cols"], 2);
        assert_eq!(value["values"][1], 1.5);
    }

    #[test]
    fn read_options_builder() {
        let options = ReadOptions::default().verbose(true).initial_line_capacity(8);
        assert!(options.verbose);
        assert_eq!(options.initial_line_capacity, 8);
        assert_eq!(ReadOptions::default().initial_line_capacity, 64);
    }
}
