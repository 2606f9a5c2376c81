//! Column-oriented frames

use recstore_core::Value;

/// One named column
#[derive(Debug, Clone, PartialEq)]
pub struct FrameColumn {
    /// Field key
    pub name: String,
    /// One value per record
    pub values: Vec<Value>,
}

/// Table of named columns, one row per record
///
/// Column names are kept even when there are no rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    columns: Vec<FrameColumn>,
    num_rows: usize,
}

impl Frame {
    /// Transpose decoded rows into columns named by `keys`
    pub fn from_rows(keys: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let num_rows = rows.len();
        let mut columns: Vec<FrameColumn> = keys
            .into_iter()
            .map(|name| FrameColumn {
                name,
                values: Vec::with_capacity(num_rows),
            })
            .collect();
        for row in rows {
            for (column, value) in columns.iter_mut().zip(row) {
                column.values.push(value);
            }
        }
        Frame { columns, num_rows }
    }

    /// Values of column `name`
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// All columns in schema order
    pub fn columns(&self) -> &[FrameColumn] {
        &self.columns
    }

    /// Column names in schema order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Number of rows
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of columns
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Values of row `index`
    pub fn row(&self, index: usize) -> Option<Vec<Value>> {
        if index >= self.num_rows {
            return None;
        }
        Some(self.columns.iter().map(|c| c.values[index].clone()).collect())
    }
}
