//! Wire schema model, declared column types, and runtime dtypes.
//!
//! The query engine reports each result column as `{name, type}` where
//! `type` is one of its index field types. Those names collapse onto a small
//! [`DeclaredType`] set. Once a [`Table`](crate::table::Table) is built, each
//! column carries a [`DType`] describing what its cells actually hold, which
//! is what casting and matching reason about.

use std::{collections::HashSet, fmt, str::FromStr};

use anyhow::{Result, ensure};
use itertools::Itertools;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::data::{Cell, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclaredType {
    Float,
    Double,
    Boolean,
    String,
    /// Always coerced through a nullable integer cast.
    Integer,
    /// Nullable 32-bit integer, applied only to columns without nulls.
    Int32,
}

impl DeclaredType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclaredType::Float => "float",
            DeclaredType::Double => "double",
            DeclaredType::Boolean => "boolean",
            DeclaredType::String => "string",
            DeclaredType::Integer => "int",
            DeclaredType::Int32 => "integer",
        }
    }

    /// Runtime dtype a column of this declared type is cast into.
    pub fn target_dtype(&self) -> DType {
        match self {
            DeclaredType::Float | DeclaredType::Double => DType::Float64,
            DeclaredType::Boolean => DType::Boolean,
            DeclaredType::String => DType::Object,
            DeclaredType::Integer => DType::NullableInt64,
            DeclaredType::Int32 => DType::NullableInt32,
        }
    }
}

impl FromStr for DeclaredType {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Ok(match normalized.as_str() {
            "float" => DeclaredType::Float,
            "double" => DeclaredType::Double,
            "boolean" => DeclaredType::Boolean,
            "int" | "long" | "bigint" => DeclaredType::Integer,
            "integer" => DeclaredType::Int32,
            // keyword, text, object, struct, timestamp, time, datetime, date,
            // string, array, ip, geo_point and anything unrecognised.
            _ => DeclaredType::String,
        })
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for DeclaredType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DeclaredType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        Ok(DeclaredType::from_str(&token).unwrap_or(DeclaredType::String))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub declared_type: DeclaredType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, declared_type: DeclaredType) -> Self {
        Self {
            name: name.into(),
            declared_type,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Schema {
    pub columns: Vec<ColumnSpec>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        let duplicates = self
            .columns
            .iter()
            .filter(|c| !seen.insert(c.name.as_str()))
            .map(|c| c.name.as_str())
            .unique()
            .collect::<Vec<_>>();
        ensure!(
            duplicates.is_empty(),
            "Duplicate column name(s) in schema: {}",
            duplicates.join(", ")
        );
        Ok(())
    }
}

/// What the cells of a materialized column hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    Float64,
    /// Native integers; cannot hold nulls.
    Int64,
    NullableInt64,
    NullableInt32,
    Boolean,
    /// Strings, mixed values, or anything that failed to settle on a type.
    Object,
}

impl DType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DType::Float64 => "float64",
            DType::Int64 => "int64",
            DType::NullableInt64 => "Int64",
            DType::NullableInt32 => "Int32",
            DType::Boolean => "bool",
            DType::Object => "object",
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DType::Float64)
    }

    /// Infers the dtype of freshly decoded cells.
    ///
    /// Integers with gaps widen to floats, booleans with gaps fall back to
    /// objects, and an all-null or empty column is an object column.
    pub fn infer(cells: &[Cell]) -> DType {
        let mut has_null = false;
        let mut has_integer = false;
        let mut has_float = false;
        let mut has_boolean = false;
        let mut has_other = false;
        for cell in cells {
            match cell {
                None => has_null = true,
                Some(Value::Integer(_)) => has_integer = true,
                Some(Value::Float(_)) => has_float = true,
                Some(Value::Boolean(_)) => has_boolean = true,
                Some(Value::String(_)) => has_other = true,
            }
        }

        let numeric = has_integer || has_float;
        if has_other || (numeric && has_boolean) {
            return DType::Object;
        }
        if numeric {
            if has_float || has_null {
                DType::Float64
            } else {
                DType::Int64
            }
        } else if has_boolean && !has_null {
            DType::Boolean
        } else {
            DType::Object
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_type_names_collapse_to_declared_types() {
        let parse = |s: &str| DeclaredType::from_str(s).unwrap();
        assert_eq!(parse("double"), DeclaredType::Double);
        assert_eq!(parse("long"), DeclaredType::Integer);
        assert_eq!(parse("bigint"), DeclaredType::Integer);
        assert_eq!(parse("int"), DeclaredType::Integer);
        assert_eq!(parse("integer"), DeclaredType::Int32);
        assert_eq!(parse("keyword"), DeclaredType::String);
        assert_eq!(parse("timestamp"), DeclaredType::String);
        assert_eq!(parse("something_new"), DeclaredType::String);
    }

    #[test]
    fn schema_deserializes_from_wire_list() {
        let schema: Schema = serde_json::from_str(
            r#"[{"name":"count","type":"integer"},{"name":"host","type":"keyword"}]"#,
        )
        .unwrap();
        assert_eq!(schema.names(), vec!["count", "host"]);
        assert_eq!(schema.columns[0].declared_type, DeclaredType::Int32);
        assert_eq!(schema.columns[1].declared_type, DeclaredType::String);
    }

    #[test]
    fn validate_rejects_duplicate_names() {
        let schema = Schema::new(vec![
            ColumnSpec::new("a", DeclaredType::Float),
            ColumnSpec::new("a", DeclaredType::String),
        ]);
        let err = schema.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate column"));
    }

    #[test]
    fn infer_widens_integers_with_nulls() {
        let ints = vec![Some(Value::Integer(1)), Some(Value::Integer(2))];
        assert_eq!(DType::infer(&ints), DType::Int64);
        let gaps = vec![Some(Value::Integer(1)), None];
        assert_eq!(DType::infer(&gaps), DType::Float64);
        let mixed = vec![Some(Value::Integer(1)), Some(Value::Float(1.5))];
        assert_eq!(DType::infer(&mixed), DType::Float64);
        let flags = vec![Some(Value::Boolean(true)), None];
        assert_eq!(DType::infer(&flags), DType::Object);
        assert_eq!(DType::infer(&[None, None]), DType::Object);
        assert_eq!(DType::infer(&[]), DType::Object);
    }
}
