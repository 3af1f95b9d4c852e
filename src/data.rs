//! Cell values and the helpers every comparison step shares.
//!
//! A [`Cell`] is an optional [`Value`]; `None` is a missing value. Numeric
//! cells compare by value across the integer/float variants, so `1` and
//! `1.0` are the same element of a value set and the same join key.

use std::{
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

pub type Cell = Option<Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// Renders the value the way result reports print it (`True`, `1.0`).
    pub fn as_display(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => display_float(*f),
            Value::Boolean(true) => "True".to_string(),
            Value::Boolean(false) => "False".to_string(),
        }
    }

    pub fn is_placeholder(&self, placeholder: &str) -> bool {
        matches!(self, Value::String(s) if s == placeholder)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => canonical_bits(*a) == canonical_bits(*b),
            (Value::Integer(i), Value::Float(f)) | (Value::Float(f), Value::Integer(i)) => {
                integral_float(*f) == Some(*i)
            }
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::String(s) => {
                0u8.hash(state);
                s.hash(state);
            }
            Value::Boolean(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            // Integral floats hash like the integer they equal.
            Value::Integer(i) => {
                2u8.hash(state);
                i.hash(state);
            }
            Value::Float(f) => match integral_float(*f) {
                Some(i) => {
                    2u8.hash(state);
                    i.hash(state);
                }
                None => {
                    3u8.hash(state);
                    canonical_bits(*f).hash(state);
                }
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

pub fn display_cell(cell: &Cell) -> String {
    match cell {
        Some(value) => value.as_display(),
        None => "None".to_string(),
    }
}

/// Converts one decoded JSON cell into a [`Cell`].
///
/// Arrays and objects are kept as their JSON text, matching how the engine
/// reports `array`, `object` and `struct` columns.
pub fn cell_from_json(value: &serde_json::Value) -> Cell {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(Value::Boolean(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Value::Integer(i))
            } else {
                n.as_f64().map(Value::Float)
            }
        }
        serde_json::Value::String(s) => Some(Value::String(s.clone())),
        other => Some(Value::String(other.to_string())),
    }
}

/// Rounds to `decimals` places on the value's shortest decimal form,
/// resolving ties to even, so `1.00005` rounds the way it reads.
pub fn round_float(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    Decimal::from_str(&value.to_string())
        .ok()
        .map(|d| d.round_dp_with_strategy(decimals, RoundingStrategy::MidpointNearestEven))
        .and_then(|d| d.to_string().parse::<f64>().ok())
        .unwrap_or(value)
}

pub fn integral_float(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.2e18 {
        Some(value as i64)
    } else {
        None
    }
}

fn canonical_bits(value: f64) -> u64 {
    if value.is_nan() {
        f64::NAN.to_bits()
    } else if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

fn display_float(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn integer_and_integral_float_are_the_same_set_element() {
        let mut set = HashSet::new();
        set.insert(Value::Integer(3));
        assert!(set.contains(&Value::Float(3.0)));
        assert!(!set.contains(&Value::Float(3.5)));
        assert_ne!(Value::Integer(1), Value::Boolean(true));
    }

    #[test]
    fn negative_zero_equals_zero() {
        assert_eq!(Value::Float(-0.0), Value::Float(0.0));
    }

    #[test]
    fn round_float_uses_half_to_even() {
        assert_eq!(round_float(1.00004, 4), 1.0);
        assert_eq!(round_float(1.00005, 4), 1.0);
        assert_eq!(round_float(2.00005, 4), 2.0);
        assert_eq!(round_float(1.00015, 4), 1.0002);
        assert_eq!(round_float(1.23456, 4), 1.2346);
        assert!(round_float(f64::NAN, 4).is_nan());
    }

    #[test]
    fn display_matches_report_rendering() {
        assert_eq!(Value::Float(1.0).as_display(), "1.0");
        assert_eq!(Value::Float(2.5).as_display(), "2.5");
        assert_eq!(Value::Boolean(true).as_display(), "True");
        assert_eq!(display_cell(&None), "None");
    }

    #[test]
    fn json_cells_decode_to_values() {
        let raw: serde_json::Value = serde_json::json!([1, 1.5, "a", true, null, [1, 2]]);
        let cells = raw
            .as_array()
            .unwrap()
            .iter()
            .map(cell_from_json)
            .collect::<Vec<_>>();
        assert_eq!(cells[0], Some(Value::Integer(1)));
        assert_eq!(cells[1], Some(Value::Float(1.5)));
        assert_eq!(cells[2], Some(Value::String("a".to_string())));
        assert_eq!(cells[3], Some(Value::Boolean(true)));
        assert_eq!(cells[4], None);
        assert_eq!(cells[5], Some(Value::String("[1,2]".to_string())));
    }
}
