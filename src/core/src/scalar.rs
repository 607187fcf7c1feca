//! The scalar value type shared by [`Context`](crate::Context), query results,
//! and rendered DML parameters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single value as it flows through the engine: seeded from upstream
/// parameters, written by `QUERY` step output, or rendered into a DML
/// statement.
///
/// This is deliberately a closed, scalar-only set — no arrays, no objects.
/// Recipes operate on one result row at a time (see `workorder-interpreter`),
/// so there is never a need to represent anything richer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// A UTF-8 string value.
    String(String),
    /// A signed 64-bit integer value.
    Int(i64),
    /// A 64-bit floating point value.
    Float(f64),
    /// A boolean value.
    Bool(bool),
    /// The absence of a value. Distinct from a missing key: a context key can
    /// be present and hold `Null` (e.g. a `NULL` column from a probe), or be
    /// entirely absent (an unresolved variable reference).
    Null,
}

impl Scalar {
    /// Returns the raw, human-readable form of the value, as used by the
    /// template renderer's `raw` mode (spec §4.B). This is *not* SQL-safe —
    /// it must never be written into a SQL string directly.
    #[must_use]
    pub fn raw_display(&self) -> String {
        match self {
            Scalar::String(s) => s.clone(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Null => "null".to_owned(),
        }
    }

    /// A short name for the value's type, used in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Scalar::String(_) => "string",
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
            Scalar::Bool(_) => "bool",
            Scalar::Null => "null",
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw_display())
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<serde_json::Value> for Scalar {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Scalar::Null,
            serde_json::Value::Bool(b) => Scalar::Bool(b),
            serde_json::Value::String(s) => Scalar::String(s),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Scalar::Int(i)
                } else {
                    Scalar::Float(n.as_f64().unwrap_or_default())
                }
            }
            // Arrays and objects have no scalar representation; the caller
            // (typically the recipe matcher, extracting parameters from an
            // LLM's JSON reply) should reject these before they reach here.
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => Scalar::Null,
        }
    }
}
