#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use query_oracle::{
    data::{Cell, Value},
    table::{Column, Table},
};
use serde_json::Value as Json;
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `value` as pretty JSON under the workspace and returns the path.
    pub fn write_json(&self, name: &str, value: &Json) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let rendered = serde_json::to_string_pretty(value).expect("serialize fixture");
        fs::write(&path, rendered).expect("write temp file contents");
        path
    }

    pub fn read_json(&self, name: &str) -> Json {
        let path = self.temp_dir.path().join(name);
        let contents = fs::read_to_string(&path).expect("read output file");
        serde_json::from_str(&contents).expect("parse output json")
    }
}

pub fn int(value: i64) -> Cell {
    Some(Value::Integer(value))
}

pub fn float(value: f64) -> Cell {
    Some(Value::Float(value))
}

pub fn text(value: &str) -> Cell {
    Some(Value::String(value.to_string()))
}

/// Builds a table from named columns with inferred dtypes.
pub fn table(columns: Vec<(&str, Vec<Cell>)>) -> Table {
    Table::new(
        columns
            .into_iter()
            .map(|(name, cells)| Column::inferred(name, cells))
            .collect(),
    )
    .expect("well-formed table")
}
