//! Document metadata attached to schema nodes, and its resolution through
//! wrapper chains.
//!
//! A schema usually reaches the generator wrapped in optional / nullable /
//! default / branded / readonly / effects layers. Metadata may sit on any of
//! those layers, so every lookup first unwraps to the innermost semantic node
//! and then prefers the outer record, falling back to the inner one.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::schema::{Schema, SchemaKind};
use crate::types::ParameterLocation;

/// Metadata record stored on a schema node.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenApiMetadata {
    #[serde(default)]
    pub internal: Option<InternalMetadata>,
    #[serde(default)]
    pub metadata: Option<SchemaMetadata>,
}

/// Generator-only metadata. Never emitted into the document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalMetadata {
    #[serde(default)]
    pub ref_id: Option<String>,
    #[serde(default)]
    pub extended_from: Option<ExtendedFrom>,
}

/// Link from an extended object to the named object it was built from.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedFrom {
    pub ref_id: String,
    pub schema: Schema,
}

/// Descriptive metadata: document-schema key overrides plus parameter data.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SchemaMetadata {
    #[serde(default)]
    pub param: Option<ParamMetadata>,
    /// Keys copied verbatim onto the compiled schema (`description`,
    /// `example`, `format`, ...). A `type` key replaces variant compilation.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Parameter descriptor.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ParamMetadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "in")]
    pub location: Option<ParameterLocation>,
    #[serde(default)]
    pub description: Option<String>,
    /// Other parameter keys (`example`, `deprecated`, `style`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SchemaMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(param: ParamMetadata) -> Self {
        Self {
            param: Some(param),
            fields: Map::new(),
        }
    }

    /// Adds a document-schema key.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn description(self, description: impl Into<String>) -> Self {
        self.with("description", description.into())
    }

    pub fn example(self, example: impl Into<Value>) -> Self {
        self.with("example", example)
    }

    /// Overrides the compiled type entirely.
    pub fn type_override(self, ty: impl Into<Value>) -> Self {
        self.with("type", ty)
    }

    /// Merges `later` over `self`; keys present in `later` win.
    pub fn merged(mut self, later: SchemaMetadata) -> SchemaMetadata {
        self.fields.extend(later.fields);
        self.param = match (self.param, later.param) {
            (Some(earlier), Some(later)) => Some(earlier.merged(later)),
            (earlier, later) => later.or(earlier),
        };
        self
    }
}

impl ParamMetadata {
    pub fn new(name: impl Into<String>, location: ParameterLocation) -> Self {
        Self {
            name: Some(name.into()),
            location: Some(location),
            ..Self::default()
        }
    }

    pub fn located(location: ParameterLocation) -> Self {
        Self {
            location: Some(location),
            ..Self::default()
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn merged(mut self, later: ParamMetadata) -> ParamMetadata {
        self.name = later.name.or(self.name);
        self.location = later.location.or(self.location);
        self.description = later.description.or(self.description);
        self.extra.extend(later.extra);
        self
    }
}

/// Normalized `{internal, metadata}` pair for one schema.
#[derive(Debug, Clone)]
pub struct ResolvedMetadata<'a> {
    pub internal: Option<&'a InternalMetadata>,
    pub metadata: SchemaMetadata,
}

impl ResolvedMetadata<'_> {
    pub fn ref_id(&self) -> Option<&str> {
        self.internal.and_then(|i| i.ref_id.as_deref())
    }

    pub fn param(&self) -> Option<&ParamMetadata> {
        self.metadata.param.as_ref()
    }

    pub fn type_override(&self) -> Option<&Value> {
        self.metadata.fields.get("type").filter(|v| !v.is_null())
    }
}

/// Strips every wrapper that carries no document meaning of its own.
pub fn unwrap_chained(schema: &Schema) -> &Schema {
    match schema.kind() {
        SchemaKind::Optional { inner }
        | SchemaKind::Nullable { inner }
        | SchemaKind::Branded { inner, .. }
        | SchemaKind::Default { inner, .. }
        | SchemaKind::Readonly { inner }
        | SchemaKind::Effects { inner } => unwrap_chained(inner),
        _ => schema,
    }
}

pub fn unwrap_nullable(schema: &Schema) -> &Schema {
    match schema.kind() {
        SchemaKind::Nullable { inner } => unwrap_nullable(inner),
        _ => schema,
    }
}

/// The record on the outer node, else the one on the innermost node.
pub fn effective_openapi(schema: &Schema) -> Option<&OpenApiMetadata> {
    schema
        .openapi_metadata()
        .or_else(|| unwrap_chained(schema).openapi_metadata())
}

fn effective_description(schema: &Schema) -> Option<&str> {
    schema
        .description()
        .or_else(|| unwrap_chained(schema).description())
}

pub fn get_internal_metadata(schema: &Schema) -> Option<&InternalMetadata> {
    effective_openapi(schema).and_then(|r| r.internal.as_ref())
}

pub fn get_ref_id(schema: &Schema) -> Option<&str> {
    get_internal_metadata(schema).and_then(|i| i.ref_id.as_deref())
}

/// Resolves schema metadata. A `describe` description is used unless the
/// metadata record sets its own.
pub fn get_metadata(schema: &Schema) -> ResolvedMetadata<'_> {
    let record = effective_openapi(schema);

    let mut metadata = SchemaMetadata::new();
    if let Some(description) = effective_description(schema) {
        metadata
            .fields
            .insert("description".to_string(), Value::from(description));
    }
    if let Some(own) = record.and_then(|r| r.metadata.clone()) {
        metadata = metadata.merged(own);
    }

    ResolvedMetadata {
        internal: record.and_then(|r| r.internal.as_ref()),
        metadata,
    }
}

/// Same as [`get_metadata`] but folds the `describe` description into the
/// parameter descriptor instead of the schema keys.
pub fn get_param_metadata(schema: &Schema) -> ResolvedMetadata<'_> {
    let record = effective_openapi(schema);

    let mut metadata = record
        .and_then(|r| r.metadata.clone())
        .unwrap_or_default();
    let described = ParamMetadata {
        description: effective_description(schema).map(String::from),
        ..ParamMetadata::default()
    };
    metadata.param = Some(match metadata.param.take() {
        Some(param) => described.merged(param),
        None => described,
    });

    ResolvedMetadata {
        internal: record.and_then(|r| r.internal.as_ref()),
        metadata,
    }
}

/// Default value, looked up through optional / nullable / effects layers.
pub fn get_default_value(schema: &Schema) -> Option<&Value> {
    match schema.kind() {
        SchemaKind::Optional { inner }
        | SchemaKind::Nullable { inner }
        | SchemaKind::Effects { inner } => get_default_value(inner),
        SchemaKind::Default { value, .. } => Some(value),
        _ => None,
    }
}

/// Schema keys of a metadata record, without parameter data and null values.
pub fn build_schema_metadata(metadata: &SchemaMetadata) -> Map<String, Value> {
    metadata
        .fields
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Parameter object keys of a descriptor, without null values.
pub fn build_parameter_metadata(param: &ParamMetadata) -> Map<String, Value> {
    let mut result = Map::new();
    if let Some(name) = &param.name {
        result.insert("name".to_string(), Value::from(name.as_str()));
    }
    if let Some(location) = param.location {
        result.insert("in".to_string(), Value::from(location.as_str()));
    }
    if let Some(description) = &param.description {
        result.insert("description".to_string(), Value::from(description.as_str()));
    }
    for (key, value) in &param.extra {
        if !value.is_null() {
            result.insert(key.clone(), value.clone());
        }
    }
    result
}

/// Overlays metadata keys on a compiled fragment and drops null values.
pub fn apply_schema_metadata(fragment: Value, metadata: &SchemaMetadata) -> Value {
    match fragment {
        Value::Object(mut map) => {
            map.extend(build_schema_metadata(metadata));
            map.retain(|_, v| !v.is_null());
            Value::Object(map)
        }
        other => other,
    }
}
