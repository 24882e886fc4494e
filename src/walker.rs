//! Per-variant compilation of schema nodes into document schemas.

use serde_json::{json, Map, Value};
use tracing::trace;

use crate::error::GenerateError;
use crate::generator::{OpenApiGenerator, Result};
use crate::metadata::{
    get_default_value, get_internal_metadata, get_ref_id, unwrap_chained, unwrap_nullable,
};
use crate::refs::{reference_object, schema_ref};
use crate::schema::{ObjectDef, Schema, SchemaKind, StringDef, UnknownKeys};

impl OpenApiGenerator {
    /// Compiles one node. `schema` is expected to be unwrapped already; the
    /// nullability and default of the enclosing wrappers are passed in.
    pub(crate) fn to_openapi_schema(
        &mut self,
        schema: &Schema,
        is_nullable: bool,
        default: Option<&Value>,
    ) -> Result<Value> {
        trace!(kind = schema.kind().name(), is_nullable, "compiling schema node");

        let result = match schema.kind() {
            SchemaKind::Null => return Ok(self.adapter.null_type()),

            SchemaKind::String(def) => {
                let mut result = self.typed("string", is_nullable);
                string_constraints(&mut result, def);
                result
            }

            SchemaKind::Number(def) => {
                let ty = if def.is_int() { "integer" } else { "number" };
                let mut result = self.typed(ty, is_nullable);
                result.extend(self.adapter.number_checks(&def.checks));
                result
            }

            SchemaKind::BigInt(def) => {
                let mut result = self.typed("integer", is_nullable);
                result.extend(self.adapter.number_checks(&def.checks));
                result.insert("format".into(), Value::from("int64"));
                result
            }

            SchemaKind::Boolean => self.typed("boolean", is_nullable),

            // Registered for reuse but never referenced from here.
            SchemaKind::Effects { inner } => return self.generate_schema(inner),

            SchemaKind::Literal { value } => {
                let ty = match value {
                    Value::Null => return Ok(self.adapter.null_type()),
                    Value::String(_) => "string",
                    Value::Number(_) => "number",
                    Value::Bool(_) => "boolean",
                    _ => {
                        return Err(GenerateError::unsupported(
                            "literal values must be strings, numbers, booleans or null",
                        ))
                    }
                };
                let mut result = self.typed(ty, is_nullable);
                result.insert("enum".into(), json!([value]));
                result
            }

            SchemaKind::Enum { values } => {
                let mut result = self.typed("string", is_nullable);
                result.insert("enum".into(), json!(values));
                result
            }

            SchemaKind::NativeEnum { values } => {
                let ty = if values.values().all(Value::is_string) {
                    "string"
                } else if values.values().all(Value::is_number) {
                    "integer"
                } else {
                    return Err(GenerateError::unsupported(
                        "enum has mixed string and number values, please specify the OpenAPI type manually",
                    ));
                };
                let mut result = self.typed(ty, is_nullable);
                result.insert(
                    "enum".into(),
                    Value::Array(values.values().cloned().collect()),
                );
                result
            }

            SchemaKind::Object(def) => {
                return self.object_schema(schema, def, is_nullable, default);
            }

            SchemaKind::Array(def) => {
                let mut result = self.typed("array", is_nullable);
                result.insert("items".into(), self.generate_schema_with_ref(&def.element)?);
                if let Some(min) = def.exact_length.or(def.min_length) {
                    result.insert("minItems".into(), Value::from(min));
                }
                if let Some(max) = def.exact_length.or(def.max_length) {
                    result.insert("maxItems".into(), Value::from(max));
                }
                result
            }

            SchemaKind::Tuple { items } => {
                let mut unique: Vec<Value> = Vec::new();
                for item in items {
                    let compiled = self.generate_schema_with_ref(item)?;
                    if !unique.contains(&compiled) {
                        unique.push(compiled);
                    }
                }
                let items_schema = match unique.len() {
                    1 => unique.remove(0),
                    _ => json!({ "anyOf": unique }),
                };
                let mut result = self.typed("array", is_nullable);
                result.insert("items".into(), items_schema);
                result.insert("minItems".into(), Value::from(items.len()));
                result.insert("maxItems".into(), Value::from(items.len()));
                return Ok(Value::Object(result));
            }

            SchemaKind::Union { .. } => {
                let mut options = Vec::new();
                for option in flatten_union(schema) {
                    // Nullability is hoisted to the union itself.
                    options.push(self.generate_schema_with_ref(unwrap_nullable(option))?);
                }
                // A bare null option already stands for the null alternative.
                let null_type = self.adapter.null_type();
                let append_null = is_nullable && !options.contains(&null_type);
                let mut result = Map::new();
                result.insert(
                    "anyOf".into(),
                    Value::Array(self.adapter.map_nullable_of_array(options, append_null)),
                );
                result
            }

            SchemaKind::DiscriminatedUnion {
                discriminator,
                options,
            } => {
                let mut compiled = Vec::with_capacity(options.len());
                for option in options {
                    compiled.push(self.generate_schema_with_ref(option)?);
                }
                let mut result = Map::new();
                if is_nullable {
                    result.insert(
                        "oneOf".into(),
                        Value::Array(self.adapter.map_nullable_of_array(compiled, true)),
                    );
                } else {
                    result.insert("oneOf".into(), Value::Array(compiled));
                    if let Some(mapping) = map_discriminator(options, discriminator)? {
                        result.insert("discriminator".into(), mapping);
                    }
                }
                result
            }

            SchemaKind::Intersection { .. } => {
                let mut subtypes = Vec::new();
                for subtype in flatten_intersection(schema) {
                    subtypes.push(self.generate_schema_with_ref(subtype)?);
                }
                let mut all_of = Map::new();
                all_of.insert("allOf".into(), Value::Array(subtypes));
                if is_nullable {
                    let wrapped = vec![Value::Object(all_of)];
                    let mut result = Map::new();
                    result.insert(
                        "anyOf".into(),
                        Value::Array(self.adapter.map_nullable_of_array(wrapped, true)),
                    );
                    result
                } else {
                    all_of
                }
            }

            SchemaKind::Record { value, .. } => {
                let mut result = self.typed("object", is_nullable);
                result.insert(
                    "additionalProperties".into(),
                    self.generate_schema_with_ref(value)?,
                );
                result
            }

            SchemaKind::Unknown | SchemaKind::Any => {
                return Ok(Value::Object(self.adapter.map_nullable_type(None, is_nullable)));
            }

            SchemaKind::Date => self.typed("string", is_nullable),

            SchemaKind::Pipeline { input, .. } => {
                return self.to_openapi_schema(input, is_nullable, default);
            }

            SchemaKind::Optional { .. }
            | SchemaKind::Nullable { .. }
            | SchemaKind::Default { .. }
            | SchemaKind::Branded { .. }
            | SchemaKind::Readonly { .. } => {
                let default = default.or_else(|| get_default_value(schema));
                return self.to_openapi_schema(
                    unwrap_chained(schema),
                    is_nullable || schema.is_nullable(),
                    default,
                );
            }

            SchemaKind::Never
            | SchemaKind::Void
            | SchemaKind::Undefined
            | SchemaKind::Map { .. }
            | SchemaKind::Set { .. }
            | SchemaKind::Promise { .. } => {
                return Err(GenerateError::UnknownSchemaVariant {
                    kind: schema.kind().name(),
                    definition: format!("{:?}", schema.kind()),
                    schema_name: get_ref_id(schema).map(String::from),
                });
            }
        };

        Ok(Value::Object(with_default(result, default)))
    }

    fn typed(&self, ty: &str, is_nullable: bool) -> Map<String, Value> {
        self.adapter
            .map_nullable_type(Some(&Value::from(ty)), is_nullable)
    }

    fn object_schema(
        &mut self,
        schema: &Schema,
        def: &ObjectDef,
        is_nullable: bool,
        default: Option<&Value>,
    ) -> Result<Value> {
        let extended_from = get_internal_metadata(schema).and_then(|i| i.extended_from.clone());
        let required = required_keys(def);
        let mut properties = self.compile_properties(def)?;
        let additional = self.additional_properties(def)?;

        let mut result = with_default(self.typed("object", is_nullable), default);

        let Some(parent) = extended_from else {
            result.insert("properties".into(), Value::Object(properties));
            if !required.is_empty() {
                result.insert("required".into(), json!(required));
            }
            if let Some(additional) = additional {
                result.insert("additionalProperties".into(), additional);
            }
            return Ok(Value::Object(result));
        };

        // The parent must be registered before it can be referenced.
        self.generate_schema(&parent.schema)?;
        let (parent_required, parent_properties) = match unwrap_chained(&parent.schema).kind() {
            SchemaKind::Object(parent_def) => {
                (required_keys(parent_def), self.compile_properties(parent_def)?)
            }
            _ => (Vec::new(), Map::new()),
        };

        properties.retain(|key, value| parent_properties.get(key) != Some(value));
        let additionally_required: Vec<&str> = required
            .into_iter()
            .filter(|key| !parent_required.contains(key))
            .collect();

        result.insert("properties".into(), Value::Object(properties));
        if !additionally_required.is_empty() {
            result.insert("required".into(), json!(additionally_required));
        }
        if let Some(additional) = additional {
            result.insert("additionalProperties".into(), additional);
        }

        Ok(json!({
            "allOf": [
                reference_object(schema_ref(&parent.ref_id)),
                result,
            ]
        }))
    }

    fn compile_properties(&mut self, def: &ObjectDef) -> Result<Map<String, Value>> {
        let mut properties = Map::new();
        for (key, property) in &def.shape {
            properties.insert(key.clone(), self.generate_schema_with_ref(property)?);
        }
        Ok(properties)
    }

    fn additional_properties(&mut self, def: &ObjectDef) -> Result<Option<Value>> {
        match &def.catchall {
            Some(catchall) if !matches!(catchall.kind(), SchemaKind::Never) => {
                Ok(Some(self.generate_schema_with_ref(catchall)?))
            }
            _ if def.unknown_keys == UnknownKeys::Strict => Ok(Some(Value::Bool(false))),
            _ => Ok(None),
        }
    }
}

fn with_default(mut result: Map<String, Value>, default: Option<&Value>) -> Map<String, Value> {
    if let Some(default) = default.filter(|d| !d.is_null()) {
        result.insert("default".into(), default.clone());
    }
    result
}

fn string_constraints(result: &mut Map<String, Value>, def: &StringDef) {
    let exact = def.exact_length();
    if let Some(min) = exact.or(def.min_length()) {
        result.insert("minLength".into(), Value::from(min));
    }
    if let Some(max) = exact.or(def.max_length()) {
        result.insert("maxLength".into(), Value::from(max));
    }
    if let Some(format) = def.format() {
        result.insert("format".into(), Value::from(format));
    }
    if let Some(pattern) = def.pattern() {
        result.insert("pattern".into(), Value::from(pattern));
    }
}

fn required_keys(def: &ObjectDef) -> Vec<&str> {
    def.shape
        .iter()
        .filter(|(_, schema)| !schema.is_optional())
        .map(|(key, _)| key.as_str())
        .collect()
}

fn flatten_union(schema: &Schema) -> Vec<&Schema> {
    match schema.kind() {
        SchemaKind::Union { options } => options.iter().flat_map(flatten_union).collect(),
        _ => vec![schema],
    }
}

fn flatten_intersection(schema: &Schema) -> Vec<&Schema> {
    match schema.kind() {
        SchemaKind::Intersection { left, right } => {
            let mut subtypes = flatten_intersection(left);
            subtypes.extend(flatten_intersection(right));
            subtypes
        }
        _ => vec![schema],
    }
}

/// Discriminator object for a discriminated union, or `None` when an option
/// has no stable identifier.
fn map_discriminator(options: &[Schema], discriminator: &str) -> Result<Option<Value>> {
    if options.iter().any(|option| get_ref_id(option).is_none()) {
        return Ok(None);
    }

    let mut mapping = Map::new();
    for option in options {
        let Some(ref_id) = get_ref_id(option) else {
            continue;
        };
        let reference = Value::from(schema_ref(ref_id));

        match unwrap_chained(option).kind() {
            SchemaKind::DiscriminatedUnion { .. } => {
                let values = discriminator_values(option, discriminator);
                let [value] = values.as_slice() else {
                    return Err(GenerateError::unsupported(format!(
                        "evaluating {discriminator}: only one child discriminator value is supported, got {}",
                        values.join(", ")
                    )));
                };
                mapping.insert(value.clone(), reference);
            }
            SchemaKind::Object(def) => {
                match def.shape.get(discriminator).map(|f| unwrap_chained(f).kind()) {
                    Some(SchemaKind::Enum { values }) => {
                        for value in values {
                            mapping.insert(value.clone(), reference.clone());
                        }
                    }
                    Some(SchemaKind::Literal {
                        value: Value::String(value),
                    }) => {
                        mapping.insert(value.clone(), reference);
                    }
                    _ => return Err(missing_discriminator(discriminator)),
                }
            }
            _ => return Err(missing_discriminator(discriminator)),
        }
    }

    Ok(Some(json!({
        "propertyName": discriminator,
        "mapping": mapping,
    })))
}

fn missing_discriminator(discriminator: &str) -> GenerateError {
    GenerateError::unsupported(format!(
        "discriminator {discriminator} could not be found in one of the values of a discriminated union"
    ))
}

/// Distinct values `schema` can take for the `discriminator` field.
fn discriminator_values(schema: &Schema, discriminator: &str) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    let mut push = |value: String| {
        if !values.contains(&value) {
            values.push(value);
        }
    };

    match unwrap_chained(schema).kind() {
        SchemaKind::DiscriminatedUnion { options, .. } => {
            for option in options {
                for value in discriminator_values(option, discriminator) {
                    push(value);
                }
            }
        }
        SchemaKind::Object(def) => {
            match def.shape.get(discriminator).map(|f| unwrap_chained(f).kind()) {
                Some(SchemaKind::Literal { value: Value::String(s) }) => push(s.clone()),
                Some(SchemaKind::Literal { value }) => push(value.to_string()),
                Some(SchemaKind::Enum { values: members }) => {
                    for member in members {
                        push(member.clone());
                    }
                }
                _ => {}
            }
        }
        _ => {}
    }
    values
}
