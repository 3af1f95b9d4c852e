//! Immutable, column-major result tables. Derivations always copy.

use std::collections::HashSet;

use thiserror::Error;

use crate::{
    data::{Cell, cell_from_json},
    schema::{DType, Schema},
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("row {row} has {found} value(s) but the schema declares {expected} column(s)")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("column '{name}' has {found} value(s), expected {expected}")]
    ColumnLength {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),
    #[error("column '{0}' not found")]
    MissingColumn(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub dtype: DType,
    pub cells: Vec<Cell>,
}

impl Column {
    /// Builds a column whose dtype is inferred from its cells.
    pub fn inferred(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        let dtype = DType::infer(&cells);
        Self {
            name: name.into(),
            dtype,
            cells,
        }
    }

    pub fn has_nulls(&self) -> bool {
        self.cells.iter().any(Option::is_none)
    }

    pub fn value_set(&self) -> HashSet<&Cell> {
        self.cells.iter().collect()
    }

    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dtype: self.dtype,
            cells: self.cells.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let row_count = columns.first().map(|c| c.cells.len()).unwrap_or(0);
        Self::from_columns(columns, row_count)
    }

    /// Builds a table with an explicit row count, which keeps the shape of
    /// tables that have no columns.
    pub fn from_columns(columns: Vec<Column>, row_count: usize) -> Result<Self, TableError> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(TableError::DuplicateColumn(column.name.clone()));
            }
            if column.cells.len() != row_count {
                return Err(TableError::ColumnLength {
                    name: column.name.clone(),
                    expected: row_count,
                    found: column.cells.len(),
                });
            }
        }
        Ok(Self { columns, row_count })
    }

    /// Materializes decoded rows against a schema, inferring each column's
    /// native dtype. Declared types are applied later by the normalizer.
    pub fn from_rows(schema: &Schema, rows: &[Vec<Cell>]) -> Result<Self, TableError> {
        let width = schema.columns.len();
        let mut buffers = vec![Vec::with_capacity(rows.len()); width];
        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(TableError::RowWidth {
                    row: row_idx,
                    expected: width,
                    found: row.len(),
                });
            }
            for (buffer, cell) in buffers.iter_mut().zip(row) {
                buffer.push(cell.clone());
            }
        }
        let columns = schema
            .columns
            .iter()
            .zip(buffers)
            .map(|(spec, cells)| Column::inferred(spec.name.clone(), cells))
            .collect();
        Self::from_columns(columns, rows.len())
    }

    pub fn from_json_rows(
        schema: &Schema,
        rows: &[Vec<serde_json::Value>],
    ) -> Result<Self, TableError> {
        let decoded = rows
            .iter()
            .map(|row| row.iter().map(cell_from_json).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        Self::from_rows(schema, &decoded)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.row_count, self.columns.len())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn name_set(&self) -> HashSet<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn row(&self, idx: usize) -> Vec<Cell> {
        self.columns.iter().map(|c| c.cells[idx].clone()).collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<Cell>> + '_ {
        (0..self.row_count).map(|idx| self.row(idx))
    }

    pub fn has_nulls(&self) -> bool {
        self.columns.iter().any(Column::has_nulls)
    }

    pub fn contains_placeholder(&self, placeholder: &str) -> bool {
        self.columns
            .iter()
            .flat_map(|c| c.cells.iter())
            .flatten()
            .any(|value| value.is_placeholder(placeholder))
    }

    /// Returns a copy with the column at `idx` replaced.
    pub fn with_column(&self, idx: usize, column: Column) -> Result<Self, TableError> {
        let mut columns = self.columns.clone();
        match columns.get_mut(idx) {
            Some(slot) => *slot = column,
            None => return Err(TableError::MissingColumn(format!("#{idx}"))),
        }
        Self::from_columns(columns, self.row_count)
    }

    /// Returns a copy holding only `names`, in that order.
    pub fn select(&self, names: &[&str]) -> Result<Self, TableError> {
        let columns = names
            .iter()
            .map(|name| {
                self.column(name)
                    .cloned()
                    .ok_or_else(|| TableError::MissingColumn(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_columns(columns, self.row_count)
    }
}
