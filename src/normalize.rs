//! Type normalization: declared-type application, dtype casts, and float
//! rounding.
//!
//! Casting never mutates its input. A failed cast is reported as a typed
//! [`CastError`] so callers decide whether it means "leave the column alone"
//! (declared types) or "these columns cannot pair" (matching).

use log::debug;
use thiserror::Error;

use crate::{
    data::{Cell, Value, integral_float, round_float},
    schema::{DType, DeclaredType, Schema},
    table::{Column, Table},
};

/// Decimal places floats are rounded to before any float comparison.
pub const DEFAULT_FLOAT_DECIMALS: u32 = 4;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CastError {
    #[error("cannot cast {value} to {target}")]
    Incompatible { value: String, target: DType },
    #[error("cannot cast missing value to non-nullable {0}")]
    NullNotAllowed(DType),
    #[error("value {value} is out of range for {target}")]
    OutOfRange { value: String, target: DType },
}

/// Casts every cell of `column` into `target`, producing a new column.
pub fn cast_column(column: &Column, target: DType) -> Result<Column, CastError> {
    let cells = column
        .cells
        .iter()
        .map(|cell| cast_cell(cell, target))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Column {
        name: column.name.clone(),
        dtype: target,
        cells,
    })
}

/// Rounds float cells; other cells pass through unchanged.
pub fn round_column(column: &Column, decimals: u32) -> Column {
    let cells = column
        .cells
        .iter()
        .map(|cell| match cell {
            Some(Value::Float(f)) => Some(Value::Float(round_float(*f, decimals))),
            other => other.clone(),
        })
        .collect();
    Column {
        name: column.name.clone(),
        dtype: column.dtype,
        cells,
    }
}

/// Casts `source` into `target`'s dtype so the two can be compared.
///
/// Rounding follows the dtype being cast into: when `target` is a float
/// column both sides are rounded, otherwise neither is. Returns the
/// (possibly rounded) target and the converted source.
pub fn coerce_pair(
    target: &Column,
    source: &Column,
    decimals: u32,
) -> Result<(Column, Column), CastError> {
    let cast = cast_column(source, target.dtype)?;
    if target.dtype.is_float() {
        Ok((round_column(target, decimals), round_column(&cast, decimals)))
    } else {
        Ok((target.clone(), cast))
    }
}

/// Applies one column's declared type.
///
/// Integer-declared columns are always coerced; unparseable cells become
/// null. Every other declared type is applied only when the column has no
/// missing values.
pub fn apply_declared_type(column: &Column, declared: DeclaredType) -> Result<Column, CastError> {
    match declared {
        DeclaredType::Integer => coerce_nullable_integer(column),
        _ if column.has_nulls() => Ok(column.clone()),
        DeclaredType::String => Ok(stringify_column(column)),
        other => cast_column(column, other.target_dtype()),
    }
}

/// Applies each schema column's declared type, keeping a column as inferred
/// when its cast fails.
pub fn normalize_table(table: &Table, schema: &Schema) -> Table {
    let mut normalized = table.clone();
    for spec in &schema.columns {
        let Some(idx) = normalized.column_index(&spec.name) else {
            continue;
        };
        let column = &normalized.columns()[idx];
        match apply_declared_type(column, spec.declared_type) {
            Ok(cast) => match normalized.with_column(idx, cast) {
                Ok(next) => normalized = next,
                Err(err) => debug!("Keeping column '{}' as inferred: {err}", spec.name),
            },
            Err(err) => debug!(
                "Declared type {} not applied to column '{}': {err}",
                spec.declared_type, spec.name
            ),
        }
    }
    normalized
}

fn coerce_nullable_integer(column: &Column) -> Result<Column, CastError> {
    let numeric = column
        .cells
        .iter()
        .map(|cell| match cell {
            Some(Value::Integer(i)) => Some(Value::Integer(*i)),
            Some(Value::Float(f)) => Some(Value::Float(*f)),
            Some(Value::Boolean(b)) => Some(Value::Integer(i64::from(*b))),
            Some(Value::String(s)) => parse_number(s),
            None => None,
        })
        .collect::<Vec<_>>();
    let cells = numeric
        .iter()
        .map(|cell| cast_cell(cell, DType::NullableInt64))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Column {
        name: column.name.clone(),
        dtype: DType::NullableInt64,
        cells,
    })
}

fn stringify_column(column: &Column) -> Column {
    let cells = column
        .cells
        .iter()
        .map(|cell| cell.as_ref().map(|v| Value::String(v.as_display())))
        .collect();
    Column {
        name: column.name.clone(),
        dtype: DType::Object,
        cells,
    }
}

fn cast_cell(cell: &Cell, target: DType) -> Result<Cell, CastError> {
    let Some(value) = cell else {
        return match target {
            DType::Int64 | DType::Boolean => Err(CastError::NullNotAllowed(target)),
            _ => Ok(None),
        };
    };
    let incompatible = || CastError::Incompatible {
        value: format!("{value:?}"),
        target,
    };
    let cast = match target {
        DType::Object => value.clone(),
        DType::Float64 => match value {
            Value::Integer(i) => Value::Float(*i as f64),
            Value::Float(f) => Value::Float(*f),
            Value::Boolean(b) => Value::Float(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| incompatible())?,
        },
        DType::Int64 | DType::NullableInt64 | DType::NullableInt32 => {
            let parsed = match value {
                Value::Integer(i) => *i,
                Value::Float(f) => integral_float(*f).ok_or_else(incompatible)?,
                Value::Boolean(b) => i64::from(*b),
                Value::String(s) => s.trim().parse::<i64>().map_err(|_| incompatible())?,
            };
            if target == DType::NullableInt32 && i32::try_from(parsed).is_err() {
                return Err(CastError::OutOfRange {
                    value: parsed.to_string(),
                    target,
                });
            }
            Value::Integer(parsed)
        }
        DType::Boolean => match value {
            Value::Boolean(b) => Value::Boolean(*b),
            Value::Integer(i) => Value::Boolean(*i != 0),
            Value::Float(f) => Value::Boolean(*f != 0.0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Value::Boolean(true),
                "false" => Value::Boolean(false),
                _ => Value::Boolean(!s.is_empty()),
            },
        },
    };
    Ok(Some(cast))
}

fn parse_number(raw: &str) -> Cell {
    let trimmed = raw.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Value::Integer(i));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|f| !f.is_nan())
        .map(Value::Float)
}
