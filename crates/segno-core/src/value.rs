//! Typed trigger argument values.

use serde::{Deserialize, Serialize};

use crate::module::PatInstRef;
use crate::tstamp::Tstamp;

/// A trigger argument.
///
/// The dispatcher checks the variant against the expected type of the event
/// before calling a handler; a mismatch drops the event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Tstamp(Tstamp),
    String(String),
    PatInstRef(PatInstRef),
}

impl Value {
    /// Name of the variant, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Tstamp(_) => "tstamp",
            Value::String(_) => "string",
            Value::PatInstRef(_) => "pattern instance",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric read; ints widen to float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_tstamp(&self) -> Option<Tstamp> {
        match self {
            Value::Tstamp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_pat_inst(&self) -> Option<PatInstRef> {
        match self {
            Value::PatInstRef(p) => Some(*p),
            _ => None,
        }
    }
}
