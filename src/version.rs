//! Target document versions and their encoding differences.
//!
//! 3.0 marks nullability with `nullable: true` and encodes exclusive bounds as
//! booleans next to `minimum` / `maximum`. 3.1 is JSON Schema based: null is a
//! type of its own and exclusive bounds carry the limit.

use std::fmt;
use std::str::FromStr;

use serde_json::{json, Map, Value};

use crate::error::GenerateError;
use crate::schema::NumberCheck;

/// Supported version strings, in ascending order.
pub const SUPPORTED_VERSIONS: &[&str] = &["3.0.0", "3.0.1", "3.0.2", "3.0.3", "3.1.0"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OpenApiVersion {
    V3_0_0,
    V3_0_1,
    V3_0_2,
    V3_0_3,
    V3_1_0,
}

impl OpenApiVersion {
    /// All versions, in the same order as [`SUPPORTED_VERSIONS`].
    pub const ALL: [OpenApiVersion; 5] = [
        OpenApiVersion::V3_0_0,
        OpenApiVersion::V3_0_1,
        OpenApiVersion::V3_0_2,
        OpenApiVersion::V3_0_3,
        OpenApiVersion::V3_1_0,
    ];

    pub const LATEST: OpenApiVersion = OpenApiVersion::V3_1_0;

    pub fn as_str(&self) -> &'static str {
        match self {
            OpenApiVersion::V3_0_0 => "3.0.0",
            OpenApiVersion::V3_0_1 => "3.0.1",
            OpenApiVersion::V3_0_2 => "3.0.2",
            OpenApiVersion::V3_0_3 => "3.0.3",
            OpenApiVersion::V3_1_0 => "3.1.0",
        }
    }

    /// Webhooks exist from 3.1 on.
    pub fn supports_webhooks(&self) -> bool {
        *self >= OpenApiVersion::V3_1_0
    }

    /// The encoding rules for this version.
    pub fn adapter(&self) -> Box<dyn VersionAdapter> {
        if *self >= OpenApiVersion::V3_1_0 {
            Box::new(OpenApi31)
        } else {
            Box::new(OpenApi30)
        }
    }
}

impl fmt::Display for OpenApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpenApiVersion {
    type Err = GenerateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OpenApiVersion::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| GenerateError::UnsupportedVersion {
                version: s.to_string(),
            })
    }
}

/// Version-specific encodings consumed by the schema walker.
pub trait VersionAdapter {
    /// Fragment standing for the `null` type.
    fn null_type(&self) -> Value;

    /// `type` keys for `base_type`, marked nullable when requested. A missing
    /// base type means "any type".
    fn map_nullable_type(&self, base_type: Option<&Value>, is_nullable: bool) -> Map<String, Value>;

    /// Appends the null fragment to a list of alternatives when nullable.
    fn map_nullable_of_array(&self, mut fragments: Vec<Value>, is_nullable: bool) -> Vec<Value> {
        if is_nullable {
            fragments.push(self.null_type());
        }
        fragments
    }

    /// Numeric constraint keys.
    fn number_checks(&self, checks: &[NumberCheck]) -> Map<String, Value>;

    /// Whether documents of this version may carry `webhooks`.
    fn supports_webhooks(&self) -> bool {
        false
    }
}

/// Encodings for 3.0.x documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenApi30;

/// Encodings for 3.1.x documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenApi31;

impl VersionAdapter for OpenApi30 {
    fn null_type(&self) -> Value {
        json!({ "nullable": true })
    }

    fn map_nullable_type(&self, base_type: Option<&Value>, is_nullable: bool) -> Map<String, Value> {
        let mut result = Map::new();
        if let Some(base_type) = base_type {
            result.insert("type".into(), base_type.clone());
        }
        if is_nullable {
            result.insert("nullable".into(), Value::Bool(true));
        }
        result
    }

    fn number_checks(&self, checks: &[NumberCheck]) -> Map<String, Value> {
        let mut result = Map::new();
        for check in checks {
            match check {
                NumberCheck::Min { value, inclusive } => {
                    result.insert("minimum".into(), number_value(*value));
                    if !inclusive {
                        result.insert("exclusiveMinimum".into(), Value::Bool(true));
                    }
                }
                NumberCheck::Max { value, inclusive } => {
                    result.insert("maximum".into(), number_value(*value));
                    if !inclusive {
                        result.insert("exclusiveMaximum".into(), Value::Bool(true));
                    }
                }
                NumberCheck::MultipleOf { value } => {
                    result.insert("multipleOf".into(), number_value(*value));
                }
                NumberCheck::Int | NumberCheck::Finite => {}
            }
        }
        result
    }
}

impl VersionAdapter for OpenApi31 {
    fn null_type(&self) -> Value {
        json!({ "type": "null" })
    }

    fn map_nullable_type(&self, base_type: Option<&Value>, is_nullable: bool) -> Map<String, Value> {
        let mut result = Map::new();
        let Some(base_type) = base_type else {
            return result;
        };
        let ty = if is_nullable {
            let mut types = match base_type {
                Value::Array(types) => types.clone(),
                single => vec![single.clone()],
            };
            types.push(Value::from("null"));
            Value::Array(types)
        } else {
            base_type.clone()
        };
        result.insert("type".into(), ty);
        result
    }

    fn number_checks(&self, checks: &[NumberCheck]) -> Map<String, Value> {
        let mut result = Map::new();
        for check in checks {
            let (key, value) = match check {
                NumberCheck::Min { value, inclusive: true } => ("minimum", value),
                NumberCheck::Min { value, inclusive: false } => ("exclusiveMinimum", value),
                NumberCheck::Max { value, inclusive: true } => ("maximum", value),
                NumberCheck::Max { value, inclusive: false } => ("exclusiveMaximum", value),
                NumberCheck::MultipleOf { value } => ("multipleOf", value),
                NumberCheck::Int | NumberCheck::Finite => continue,
            };
            result.insert(key.into(), number_value(*value));
        }
        result
    }

    fn supports_webhooks(&self) -> bool {
        true
    }
}

/// Whole numbers are emitted as integers so `5.0` prints as `5`.
pub(crate) fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}
