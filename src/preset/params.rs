//! Parameter values, tables, and the random-walk stepper.
//!
//! Every preset kind declares a table of named parameters with
//! defaults. The Maestro steps static presets' parameters each block
//! through a [`ParamWalker`], which keeps each numeric value inside a
//! window derived from its default.

use std::collections::BTreeMap;

use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// A parameter value as carried in engine commands and preset tables.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Float(f64),
    Int(i64),
    Bool(bool),
    List(Vec<f64>),
    Text(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) => Some(v.round() as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[f64]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }
}

/// Ordered parameter map — deterministic iteration order matters for
/// reproducible stepping.
pub type Params = BTreeMap<String, Value>;

/// Convenience accessors used by preset constructors.
pub trait ParamsExt {
    fn f64_or(&self, key: &str, default: f64) -> f64;
    fn i64_or(&self, key: &str, default: i64) -> i64;
    fn bool_or(&self, key: &str, default: bool) -> bool;
    fn list(&self, key: &str) -> Option<Vec<f64>>;
}

impl ParamsExt for Params {
    fn f64_or(&self, key: &str, default: f64) -> f64 {
        self.get(key).and_then(Value::as_f64).unwrap_or(default)
    }

    fn i64_or(&self, key: &str, default: i64) -> i64 {
        self.get(key).and_then(Value::as_i64).unwrap_or(default)
    }

    fn bool_or(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    fn list(&self, key: &str) -> Option<Vec<f64>> {
        self.get(key).and_then(Value::as_list).map(<[f64]>::to_vec)
    }
}

/// Random-walks one parameter inside its clamping window.
///
/// Windows: numeric parameters stay in `[0.5×default, 2×default]`
/// (`[0, 1]` when the default is zero). Ints move ±1 per step, floats
/// by up to ±10% of their current magnitude (±0.1 near zero) and are
/// rounded to three decimals. Bools flip. Lists and text never step.
#[derive(Debug, Clone)]
pub struct ParamWalker {
    default: Value,
    current: Value,
}

impl ParamWalker {
    pub fn new(default: Value) -> Self {
        Self {
            current: default.clone(),
            default,
        }
    }

    pub fn current(&self) -> &Value {
        &self.current
    }

    fn float_window(default: f64) -> (f64, f64) {
        if default == 0.0 {
            (0.0, 1.0)
        } else {
            let a = default * 0.5;
            let b = default * 2.0;
            (a.min(b), a.max(b))
        }
    }

    /// Step once and return the new value.
    pub fn step(&mut self, rng: &mut ChaCha8Rng) -> Value {
        self.current = match (&self.default, &self.current) {
            (Value::Float(d), Value::Float(v)) => {
                let (lo, hi) = Self::float_window(*d);
                let spread = if v.abs() < 1e-9 { 0.1 } else { 0.1 * v.abs() };
                let stepped = v + rng.gen_range(-spread..=spread);
                let clamped = stepped.clamp(lo, hi);
                Value::Float((clamped * 1000.0).round() / 1000.0)
            }
            (Value::Int(d), Value::Int(v)) => {
                let (lo, hi) = Self::float_window(*d as f64);
                let delta = if rng.gen_bool(0.5) { 1 } else { -1 };
                let stepped = (v + delta) as f64;
                Value::Int(stepped.clamp(lo.ceil(), hi.floor()) as i64)
            }
            (_, Value::Bool(v)) => Value::Bool(!v),
            (_, other) => other.clone(),
        };
        self.current.clone()
    }
}
