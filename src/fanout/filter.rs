//! Filter matching
//!
//! A filter is a set of equality constraints over the `pld` object of a
//! published message. Every key of the filter must be present in the payload
//! with an equal value; an absent key reads as `null`. An empty filter
//! passes everything.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(Map<String, Value>);

impl Filter {
    /// Filter requiring each key of `constraints` to match the payload.
    pub fn new(constraints: Map<String, Value>) -> Self {
        Self(constraints)
    }

    /// True when the filter has no constraints.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when every constraint equals the payload's value for its key; absent keys read as null.
    pub fn passes(&self, payload: &Map<String, Value>) -> bool {
        self.0
            .iter()
            .all(|(key, want)| values_equal(payload.get(key).unwrap_or(&Value::Null), want))
    }

    /// Parses the string form kept in the registry.
    pub fn from_stored(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

impl From<Map<String, Value>> for Filter {
    fn from(constraints: Map<String, Value>) -> Self {
        Self(constraints)
    }
}

/// The string form kept in the registry (a JSON object).
impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

// Numbers compare by value so `1` and `1.0` match.
fn values_equal(have: &Value, want: &Value) -> bool {
    match (have, want) {
        (Value::Number(a), Value::Number(b)) => {
            a == b || matches!((a.as_f64(), b.as_f64()), (Some(x), Some(y)) if x == y)
        }
        _ => have == want,
    }
}
