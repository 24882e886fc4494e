//! Schema node model.
//!
//! A [`Schema`] is a cheap, shareable handle to an immutable [`SchemaNode`].
//! Cloning a handle shares the node, which is how the same schema is reused at
//! several sites in a tree. Builder methods never mutate a shared node; they
//! produce a new node (copy-on-write) and leave every other handle untouched.
//!
//! # Example
//!
//! ```
//! use schema_openapi::Schema;
//!
//! let user = Schema::object([
//!     ("id", Schema::string().uuid()),
//!     ("nickname", Schema::string().max_length(32).optional()),
//! ])
//! .named("User");
//!
//! assert!(user.kind().is_object());
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::metadata::{effective_openapi, ExtendedFrom, InternalMetadata, OpenApiMetadata};
use crate::metadata::{ParamMetadata, SchemaMetadata};

/// Shared handle to a schema node.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct Schema(Arc<SchemaNode>);

/// One node of a schema tree.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaNode {
    #[serde(flatten)]
    pub kind: SchemaKind,
    /// Free-form description attached with [`Schema::describe`].
    #[serde(default)]
    pub description: Option<String>,
    /// Document metadata attached with [`Schema::openapi`] / [`Schema::named`].
    #[serde(default)]
    pub openapi: Option<OpenApiMetadata>,
}

/// The variant of a schema node.
///
/// Wrapper variants own exactly one inner schema; composite variants own an
/// ordered or keyed collection of schemas.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SchemaKind {
    Null,
    String(StringDef),
    Number(NumberDef),
    #[serde(rename = "bigint")]
    BigInt(NumberDef),
    Boolean,
    Literal {
        value: Value,
    },
    Enum {
        values: Vec<String>,
    },
    NativeEnum {
        values: IndexMap<String, Value>,
    },
    Object(ObjectDef),
    Array(ArrayDef),
    Tuple {
        items: Vec<Schema>,
    },
    Union {
        options: Vec<Schema>,
    },
    DiscriminatedUnion {
        discriminator: String,
        options: Vec<Schema>,
    },
    Intersection {
        left: Schema,
        right: Schema,
    },
    Record {
        #[serde(default)]
        key: Option<Schema>,
        value: Schema,
    },
    Unknown,
    Any,
    Date,
    Effects {
        inner: Schema,
    },
    Optional {
        inner: Schema,
    },
    Nullable {
        inner: Schema,
    },
    Default {
        inner: Schema,
        value: Value,
    },
    Branded {
        inner: Schema,
        #[serde(default)]
        brand: Option<String>,
    },
    Readonly {
        inner: Schema,
    },
    Pipeline {
        #[serde(rename = "in")]
        input: Schema,
        #[serde(rename = "out")]
        output: Schema,
    },
    // Variants with no document representation.
    Never,
    Void,
    Undefined,
    Map {
        key: Schema,
        value: Schema,
    },
    Set {
        item: Schema,
    },
    Promise {
        inner: Schema,
    },
}

/// Checks attached to a string schema.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StringDef {
    #[serde(default)]
    pub checks: Vec<StringCheck>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "check", rename_all = "camelCase")]
pub enum StringCheck {
    Min { value: usize },
    Max { value: usize },
    Length { value: usize },
    Email,
    Url,
    Uuid,
    Datetime,
    Regex { pattern: String },
}

/// Checks attached to a number or bigint schema.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NumberDef {
    #[serde(default)]
    pub checks: Vec<NumberCheck>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "check", rename_all = "camelCase")]
pub enum NumberCheck {
    Min { value: f64, inclusive: bool },
    Max { value: f64, inclusive: bool },
    MultipleOf { value: f64 },
    Int,
    Finite,
}

/// How an object treats keys that are not part of its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownKeys {
    #[default]
    Strip,
    Strict,
    Passthrough,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDef {
    pub shape: IndexMap<String, Schema>,
    #[serde(default)]
    pub unknown_keys: UnknownKeys,
    /// Schema for keys outside the shape. `None` behaves like `never`.
    #[serde(default)]
    pub catchall: Option<Schema>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrayDef {
    pub element: Schema,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub exact_length: Option<usize>,
}

impl StringDef {
    /// Most restrictive lower bound.
    pub fn min_length(&self) -> Option<usize> {
        self.checks
            .iter()
            .filter_map(|c| match c {
                StringCheck::Min { value } => Some(*value),
                _ => None,
            })
            .max()
    }

    /// Most restrictive upper bound.
    pub fn max_length(&self) -> Option<usize> {
        self.checks
            .iter()
            .filter_map(|c| match c {
                StringCheck::Max { value } => Some(*value),
                _ => None,
            })
            .min()
    }

    pub fn exact_length(&self) -> Option<usize> {
        self.checks.iter().find_map(|c| match c {
            StringCheck::Length { value } => Some(*value),
            _ => None,
        })
    }

    /// Well-known format hint. Precedence: uuid, email, url, date-time.
    pub fn format(&self) -> Option<&'static str> {
        let has = |check: &StringCheck| self.checks.contains(check);
        if has(&StringCheck::Uuid) {
            Some("uuid")
        } else if has(&StringCheck::Email) {
            Some("email")
        } else if has(&StringCheck::Url) {
            Some("uri")
        } else if has(&StringCheck::Datetime) {
            Some("date-time")
        } else {
            None
        }
    }

    /// Source text of the first regex check.
    pub fn pattern(&self) -> Option<&str> {
        self.checks.iter().find_map(|c| match c {
            StringCheck::Regex { pattern } => Some(pattern.as_str()),
            _ => None,
        })
    }
}

impl NumberDef {
    pub fn is_int(&self) -> bool {
        self.checks.contains(&NumberCheck::Int)
    }
}

impl SchemaKind {
    /// Variant name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            SchemaKind::Null => "null",
            SchemaKind::String(_) => "string",
            SchemaKind::Number(_) => "number",
            SchemaKind::BigInt(_) => "bigint",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Literal { .. } => "literal",
            SchemaKind::Enum { .. } => "enum",
            SchemaKind::NativeEnum { .. } => "nativeEnum",
            SchemaKind::Object(_) => "object",
            SchemaKind::Array(_) => "array",
            SchemaKind::Tuple { .. } => "tuple",
            SchemaKind::Union { .. } => "union",
            SchemaKind::DiscriminatedUnion { .. } => "discriminatedUnion",
            SchemaKind::Intersection { .. } => "intersection",
            SchemaKind::Record { .. } => "record",
            SchemaKind::Unknown => "unknown",
            SchemaKind::Any => "any",
            SchemaKind::Date => "date",
            SchemaKind::Effects { .. } => "effects",
            SchemaKind::Optional { .. } => "optional",
            SchemaKind::Nullable { .. } => "nullable",
            SchemaKind::Default { .. } => "default",
            SchemaKind::Branded { .. } => "branded",
            SchemaKind::Readonly { .. } => "readonly",
            SchemaKind::Pipeline { .. } => "pipeline",
            SchemaKind::Never => "never",
            SchemaKind::Void => "void",
            SchemaKind::Undefined => "undefined",
            SchemaKind::Map { .. } => "map",
            SchemaKind::Set { .. } => "set",
            SchemaKind::Promise { .. } => "promise",
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, SchemaKind::Object(_))
    }
}

impl From<SchemaKind> for Schema {
    fn from(kind: SchemaKind) -> Self {
        Schema(Arc::new(SchemaNode {
            kind,
            description: None,
            openapi: None,
        }))
    }
}

// --- Constructors ---

impl Schema {
    pub fn null() -> Self {
        SchemaKind::Null.into()
    }

    pub fn string() -> Self {
        SchemaKind::String(StringDef::default()).into()
    }

    pub fn number() -> Self {
        SchemaKind::Number(NumberDef::default()).into()
    }

    /// Shorthand for `Schema::number().int()`.
    pub fn integer() -> Self {
        Self::number().int()
    }

    pub fn bigint() -> Self {
        SchemaKind::BigInt(NumberDef::default()).into()
    }

    pub fn boolean() -> Self {
        SchemaKind::Boolean.into()
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        SchemaKind::Literal {
            value: value.into(),
        }
        .into()
    }

    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SchemaKind::Enum {
            values: values.into_iter().map(Into::into).collect(),
        }
        .into()
    }

    /// Enum backed by named members with string or numeric values.
    pub fn native_enum<I, K, V>(members: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        SchemaKind::NativeEnum {
            values: members
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
        .into()
    }

    pub fn object<I, K>(shape: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        SchemaKind::Object(ObjectDef {
            shape: shape.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            unknown_keys: UnknownKeys::Strip,
            catchall: None,
        })
        .into()
    }

    pub fn array(element: Schema) -> Self {
        SchemaKind::Array(ArrayDef {
            element,
            min_length: None,
            max_length: None,
            exact_length: None,
        })
        .into()
    }

    pub fn tuple(items: impl IntoIterator<Item = Schema>) -> Self {
        SchemaKind::Tuple {
            items: items.into_iter().collect(),
        }
        .into()
    }

    pub fn union(options: impl IntoIterator<Item = Schema>) -> Self {
        SchemaKind::Union {
            options: options.into_iter().collect(),
        }
        .into()
    }

    pub fn discriminated_union(
        discriminator: impl Into<String>,
        options: impl IntoIterator<Item = Schema>,
    ) -> Self {
        SchemaKind::DiscriminatedUnion {
            discriminator: discriminator.into(),
            options: options.into_iter().collect(),
        }
        .into()
    }

    pub fn intersection(left: Schema, right: Schema) -> Self {
        SchemaKind::Intersection { left, right }.into()
    }

    /// String-keyed record.
    pub fn record(value: Schema) -> Self {
        SchemaKind::Record { key: None, value }.into()
    }

    pub fn unknown() -> Self {
        SchemaKind::Unknown.into()
    }

    pub fn any() -> Self {
        SchemaKind::Any.into()
    }

    pub fn date() -> Self {
        SchemaKind::Date.into()
    }

    pub fn never() -> Self {
        SchemaKind::Never.into()
    }

    pub fn void() -> Self {
        SchemaKind::Void.into()
    }

    pub fn undefined() -> Self {
        SchemaKind::Undefined.into()
    }

    pub fn map(key: Schema, value: Schema) -> Self {
        SchemaKind::Map { key, value }.into()
    }

    pub fn set(item: Schema) -> Self {
        SchemaKind::Set { item }.into()
    }

    pub fn promise(inner: Schema) -> Self {
        SchemaKind::Promise { inner }.into()
    }
}

// --- Wrappers ---

impl Schema {
    pub fn optional(self) -> Self {
        SchemaKind::Optional { inner: self }.into()
    }

    pub fn nullable(self) -> Self {
        SchemaKind::Nullable { inner: self }.into()
    }

    /// Nullable and optional.
    pub fn nullish(self) -> Self {
        self.nullable().optional()
    }

    pub fn default_value(self, value: impl Into<Value>) -> Self {
        SchemaKind::Default {
            inner: self,
            value: value.into(),
        }
        .into()
    }

    pub fn brand(self, brand: impl Into<String>) -> Self {
        SchemaKind::Branded {
            inner: self,
            brand: Some(brand.into()),
        }
        .into()
    }

    pub fn readonly(self) -> Self {
        SchemaKind::Readonly { inner: self }.into()
    }

    /// Wraps the schema in a refinement or transform step.
    pub fn refine(self) -> Self {
        SchemaKind::Effects { inner: self }.into()
    }

    /// Pipes the output of this schema into `output`.
    pub fn pipe(self, output: Schema) -> Self {
        SchemaKind::Pipeline {
            input: self,
            output,
        }
        .into()
    }
}

// --- Checks ---
//
// Checks only apply to the variants that support them; any other variant is
// returned unchanged.

impl Schema {
    /// Minimum length for strings, minimum items for arrays.
    pub fn min_length(self, value: usize) -> Self {
        self.with_kind(|kind| match kind {
            SchemaKind::String(def) => def.checks.push(StringCheck::Min { value }),
            SchemaKind::Array(def) => def.min_length = Some(value),
            _ => {}
        })
    }

    /// Maximum length for strings, maximum items for arrays.
    pub fn max_length(self, value: usize) -> Self {
        self.with_kind(|kind| match kind {
            SchemaKind::String(def) => def.checks.push(StringCheck::Max { value }),
            SchemaKind::Array(def) => def.max_length = Some(value),
            _ => {}
        })
    }

    /// Exact length for strings and arrays.
    pub fn length(self, value: usize) -> Self {
        self.with_kind(|kind| match kind {
            SchemaKind::String(def) => def.checks.push(StringCheck::Length { value }),
            SchemaKind::Array(def) => def.exact_length = Some(value),
            _ => {}
        })
    }

    pub fn email(self) -> Self {
        self.string_check(StringCheck::Email)
    }

    pub fn url(self) -> Self {
        self.string_check(StringCheck::Url)
    }

    pub fn uuid(self) -> Self {
        self.string_check(StringCheck::Uuid)
    }

    pub fn datetime(self) -> Self {
        self.string_check(StringCheck::Datetime)
    }

    /// Regex constraint given as its source text.
    pub fn regex(self, pattern: impl Into<String>) -> Self {
        self.string_check(StringCheck::Regex {
            pattern: pattern.into(),
        })
    }

    pub fn int(self) -> Self {
        self.number_check(NumberCheck::Int)
    }

    pub fn gt(self, value: f64) -> Self {
        self.number_check(NumberCheck::Min {
            value,
            inclusive: false,
        })
    }

    pub fn gte(self, value: f64) -> Self {
        self.number_check(NumberCheck::Min {
            value,
            inclusive: true,
        })
    }

    pub fn lt(self, value: f64) -> Self {
        self.number_check(NumberCheck::Max {
            value,
            inclusive: false,
        })
    }

    pub fn lte(self, value: f64) -> Self {
        self.number_check(NumberCheck::Max {
            value,
            inclusive: true,
        })
    }

    pub fn multiple_of(self, value: f64) -> Self {
        self.number_check(NumberCheck::MultipleOf { value })
    }

    /// Rejects keys outside the shape.
    pub fn strict(self) -> Self {
        self.with_kind(|kind| {
            if let SchemaKind::Object(def) = kind {
                def.unknown_keys = UnknownKeys::Strict;
            }
        })
    }

    pub fn passthrough(self) -> Self {
        self.with_kind(|kind| {
            if let SchemaKind::Object(def) = kind {
                def.unknown_keys = UnknownKeys::Passthrough;
            }
        })
    }

    pub fn catchall(self, schema: Schema) -> Self {
        self.with_kind(|kind| {
            if let SchemaKind::Object(def) = kind {
                def.catchall = Some(schema);
            }
        })
    }

    fn string_check(self, check: StringCheck) -> Self {
        self.with_kind(|kind| {
            if let SchemaKind::String(def) = kind {
                def.checks.push(check);
            }
        })
    }

    fn number_check(self, check: NumberCheck) -> Self {
        self.with_kind(|kind| match kind {
            SchemaKind::Number(def) | SchemaKind::BigInt(def) => def.checks.push(check),
            _ => {}
        })
    }
}

// --- Metadata ---

impl Schema {
    pub fn describe(self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.with_node(|node| node.description = Some(description))
    }

    /// Attaches document metadata.
    ///
    /// The new record starts from the metadata already visible through this
    /// node's wrapper chain, so later calls override earlier ones key by key.
    pub fn openapi(self, metadata: SchemaMetadata) -> Self {
        let mut record = effective_openapi(&self).cloned().unwrap_or_default();
        record.metadata = Some(match record.metadata.take() {
            Some(existing) => existing.merged(metadata),
            None => metadata,
        });
        self.with_node(|node| node.openapi = Some(record))
    }

    /// Assigns the stable identifier that promotes this schema to a named
    /// component.
    pub fn named(self, ref_id: impl Into<String>) -> Self {
        let mut record = effective_openapi(&self).cloned().unwrap_or_default();
        record.internal.get_or_insert_with(Default::default).ref_id = Some(ref_id.into());
        self.with_node(|node| node.openapi = Some(record))
    }

    /// Shorthand for attaching parameter metadata only.
    pub fn param(self, param: ParamMetadata) -> Self {
        self.openapi(SchemaMetadata::with_param(param))
    }

    /// Builds a child object from this object plus `fields`.
    ///
    /// When this object carries a stable identifier the child records it as its
    /// parent, otherwise the child inherits this object's own parent link. The
    /// child keeps descriptive metadata but never the identifier. Non-object
    /// schemas are returned unchanged.
    pub fn extend<I, K>(&self, fields: I) -> Schema
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        let SchemaKind::Object(parent) = self.kind() else {
            return self.clone();
        };

        let mut def = parent.clone();
        for (key, schema) in fields {
            def.shape.insert(key.into(), schema);
        }

        let parent_record = effective_openapi(self);
        let extended_from = match parent_record
            .and_then(|r| r.internal.as_ref())
            .and_then(|i| i.ref_id.clone())
        {
            Some(ref_id) => Some(ExtendedFrom {
                ref_id,
                schema: self.clone(),
            }),
            None => parent_record
                .and_then(|r| r.internal.as_ref())
                .and_then(|i| i.extended_from.clone()),
        };

        Schema(Arc::new(SchemaNode {
            kind: SchemaKind::Object(def),
            description: self.0.description.clone(),
            openapi: Some(OpenApiMetadata {
                internal: Some(InternalMetadata {
                    ref_id: None,
                    extended_from,
                }),
                metadata: parent_record.and_then(|r| r.metadata.clone()),
            }),
        }))
    }
}

// --- Inspection ---

impl Schema {
    pub fn node(&self) -> &SchemaNode {
        &self.0
    }

    pub fn kind(&self) -> &SchemaKind {
        &self.0.kind
    }

    pub fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    pub fn openapi_metadata(&self) -> Option<&OpenApiMetadata> {
        self.0.openapi.as_ref()
    }

    /// Whether both handles point at the same node.
    pub fn ptr_eq(&self, other: &Schema) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Whether the schema accepts a missing value.
    pub fn is_optional(&self) -> bool {
        match self.kind() {
            SchemaKind::Optional { .. }
            | SchemaKind::Default { .. }
            | SchemaKind::Undefined
            | SchemaKind::Void
            | SchemaKind::Any
            | SchemaKind::Unknown => true,
            SchemaKind::Nullable { inner }
            | SchemaKind::Branded { inner, .. }
            | SchemaKind::Readonly { inner }
            | SchemaKind::Effects { inner } => inner.is_optional(),
            SchemaKind::Pipeline { input, .. } => input.is_optional(),
            SchemaKind::Union { options } | SchemaKind::DiscriminatedUnion { options, .. } => {
                options.iter().any(Schema::is_optional)
            }
            SchemaKind::Intersection { left, right } => left.is_optional() && right.is_optional(),
            _ => false,
        }
    }

    /// Whether the schema accepts `null`.
    pub fn is_nullable(&self) -> bool {
        match self.kind() {
            SchemaKind::Nullable { .. } | SchemaKind::Null | SchemaKind::Any | SchemaKind::Unknown => {
                true
            }
            SchemaKind::Literal { value } => value.is_null(),
            SchemaKind::Optional { inner }
            | SchemaKind::Default { inner, .. }
            | SchemaKind::Branded { inner, .. }
            | SchemaKind::Readonly { inner }
            | SchemaKind::Effects { inner } => inner.is_nullable(),
            SchemaKind::Pipeline { input, .. } => input.is_nullable(),
            SchemaKind::Union { options } | SchemaKind::DiscriminatedUnion { options, .. } => {
                options.iter().any(Schema::is_nullable)
            }
            SchemaKind::Intersection { left, right } => left.is_nullable() && right.is_nullable(),
            _ => false,
        }
    }

    fn with_node(mut self, f: impl FnOnce(&mut SchemaNode)) -> Self {
        f(Arc::make_mut(&mut self.0));
        self
    }

    fn with_kind(self, f: impl FnOnce(&mut SchemaKind)) -> Self {
        self.with_node(|node| f(&mut node.kind))
    }
}
