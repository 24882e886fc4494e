//! Parameter compilation.
//!
//! Parameters come from two places: registered parameter definitions, which
//! become `#/components/parameters/<id>` entries, and route request schemas,
//! which are expanded in place. A request schema that resolves to a registered
//! parameter is emitted as a reference instead, provided its declared name and
//! location agree with the registration.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{GenerateError, MissingParameterData};
use crate::generator::{OpenApiGenerator, Result};
use crate::metadata::{
    build_parameter_metadata, get_metadata, get_param_metadata, get_ref_id, ParamMetadata,
    ResolvedMetadata,
};
use crate::refs::{parameter_ref, reference_object};
use crate::schema::{Schema, SchemaKind};
use crate::types::ParameterLocation;

impl OpenApiGenerator {
    /// Compiles a registered parameter and stores it under its identifier.
    ///
    /// An identifier is written once; registering it again with a different
    /// `name` or `in` is a conflict.
    pub(crate) fn generate_parameter_definition(&mut self, schema: &Schema) -> Result<Value> {
        let result = self.generate_parameter(schema)?;
        let Some(ref_id) = get_ref_id(schema) else {
            return Ok(result);
        };

        match self.param_refs.get(ref_id) {
            None => {
                debug!(ref_id, "materialized parameter component");
                self.param_refs.insert(ref_id.to_string(), result.clone());
            }
            Some(existing) => {
                for key in ["in", "name"] {
                    let before = existing.get(key).and_then(Value::as_str);
                    let after = result.get(key).and_then(Value::as_str);
                    if before != after {
                        return Err(conflict(
                            format!("conflicting registrations for parameter {ref_id}"),
                            key,
                            [before, after],
                        ));
                    }
                }
            }
        }
        Ok(result)
    }

    /// Reference to an already registered parameter, checked against the
    /// expansion context (`external_in`, `external_name`) and the schema's own
    /// declaration.
    fn get_parameter_ref(
        &self,
        metadata: &ResolvedMetadata<'_>,
        external_in: Option<ParameterLocation>,
        external_name: Option<&str>,
    ) -> Result<Option<Value>> {
        let Some(ref_id) = metadata.ref_id() else {
            return Ok(None);
        };
        let Some(existing) = self.param_refs.get(ref_id) else {
            return Ok(None);
        };

        let existing_in = existing.get("in").and_then(Value::as_str);
        let existing_name = existing.get("name").and_then(Value::as_str);
        let declared = metadata.param();
        let declared_in = declared.and_then(|p| p.location).map(|l| l.as_str());
        let declared_name = declared.and_then(|p| p.name.as_deref());
        let external_in = external_in.map(|l| l.as_str());

        let differs = |value: Option<&str>, existing: Option<&str>| {
            value.is_some_and(|v| Some(v) != existing)
        };

        if differs(declared_in, existing_in) || differs(external_in, existing_in) {
            return Err(conflict(
                format!(
                    "conflicting location for parameter {}",
                    existing_name.unwrap_or(ref_id)
                ),
                "in",
                [existing_in, external_in, declared_in],
            ));
        }
        if differs(declared_name, existing_name) || differs(external_name, existing_name) {
            return Err(conflict(
                "conflicting names for parameter",
                "name",
                [existing_name, external_name, declared_name],
            ));
        }

        Ok(Some(reference_object(parameter_ref(ref_id))))
    }

    /// Parameters for one request location. An object schema is a bag: every
    /// property becomes its own parameter at `location`.
    pub(crate) fn generate_inline_parameters(
        &mut self,
        schema: &Schema,
        location: ParameterLocation,
    ) -> Result<Vec<Value>> {
        let metadata = get_metadata(schema);
        if let Some(reference) = self.get_parameter_ref(&metadata, Some(location), None)? {
            return Ok(vec![reference]);
        }

        if let SchemaKind::Object(def) = schema.kind() {
            let mut parameters = Vec::with_capacity(def.shape.len());
            for (key, property) in &def.shape {
                parameters.push(self.generate_property_parameter(key, property, location)?);
            }
            return Ok(parameters);
        }

        let declared = metadata.param();
        if let Some(declared_in) = declared.and_then(|p| p.location) {
            if declared_in != location {
                return Err(conflict(
                    format!(
                        "conflicting location for parameter {}",
                        declared.and_then(|p| p.name.as_deref()).unwrap_or_default()
                    ),
                    "in",
                    [Some(location.as_str()), Some(declared_in.as_str())],
                ));
            }
        }

        let located = schema.clone().param(ParamMetadata::located(location));
        Ok(vec![self.generate_parameter(&located)?])
    }

    fn generate_property_parameter(
        &mut self,
        key: &str,
        schema: &Schema,
        location: ParameterLocation,
    ) -> Result<Value> {
        let metadata = get_metadata(schema);
        if let Some(reference) = self.get_parameter_ref(&metadata, Some(location), Some(key))? {
            return Ok(reference);
        }

        let declared = metadata.param();
        let declared_name = declared.and_then(|p| p.name.as_deref());
        if let Some(name) = declared_name.filter(|name| *name != key) {
            return Err(conflict(
                "conflicting names for parameter",
                "name",
                [Some(key), Some(name)],
            ));
        }
        if let Some(declared_in) = declared.and_then(|p| p.location) {
            if declared_in != location {
                return Err(conflict(
                    format!(
                        "conflicting location for parameter {}",
                        declared_name.unwrap_or(key)
                    ),
                    "in",
                    [Some(location.as_str()), Some(declared_in.as_str())],
                ));
            }
        }

        self.generate_parameter(&schema.clone().param(ParamMetadata::new(key, location)))
    }

    /// `{schema, required, ...param keys}` without enforcing `name` / `in`.
    /// Response headers use this form directly.
    pub(crate) fn generate_simple_parameter(&mut self, schema: &Schema) -> Result<Map<String, Value>> {
        let param_keys = get_param_metadata(schema)
            .param()
            .map(build_parameter_metadata)
            .unwrap_or_default();
        let required = !schema.is_optional() && !schema.is_nullable();

        let mut result = Map::new();
        result.insert("schema".into(), self.generate_schema_with_ref(schema)?);
        result.insert("required".into(), Value::Bool(required));
        result.extend(param_keys);
        Ok(result)
    }

    pub(crate) fn generate_parameter(&mut self, schema: &Schema) -> Result<Value> {
        let metadata = get_metadata(schema);
        let param = metadata.param();
        let Some(name) = param.and_then(|p| p.name.clone()) else {
            return Err(MissingParameterData::new("name").into());
        };
        let Some(location) = param.and_then(|p| p.location) else {
            let mut missing = MissingParameterData::new("in");
            missing.param_name = Some(name);
            return Err(missing.into());
        };

        let mut result = self.generate_simple_parameter(schema)?;
        result.insert("in".into(), Value::from(location.as_str()));
        result.insert("name".into(), Value::from(name));
        Ok(Value::Object(result))
    }
}

/// Conflict error listing each distinct observed value once, in order.
fn conflict<'a>(
    message: impl Into<String>,
    key: &'static str,
    observed: impl IntoIterator<Item = Option<&'a str>>,
) -> GenerateError {
    let mut values: Vec<String> = Vec::new();
    for value in observed.into_iter().flatten() {
        if !values.iter().any(|v| v == value) {
            values.push(value.to_string());
        }
    }
    GenerateError::Conflict {
        message: message.into(),
        key,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::OpenApiVersion;
    use serde_json::json;

    fn generator() -> OpenApiGenerator {
        OpenApiGenerator::new(Vec::new(), OpenApiVersion::V3_1_0)
    }

    #[test]
    fn object_bag_expands_per_property() {
        let query = Schema::object([
            ("limit", Schema::integer().optional()),
            ("q", Schema::string().describe("search text")),
        ]);
        let params = generator()
            .generate_inline_parameters(&query, ParameterLocation::Query)
            .unwrap();

        assert_eq!(
            params,
            vec![
                json!({
                    "schema": { "type": "integer" },
                    "required": false,
                    "name": "limit",
                    "in": "query"
                }),
                json!({
                    "schema": { "type": "string", "description": "search text" },
                    "required": true,
                    "name": "q",
                    "in": "query",
                    "description": "search text"
                }),
            ]
        );
    }

    #[test]
    fn nullable_parameter_is_not_required() {
        let schema = Schema::string()
            .nullable()
            .param(ParamMetadata::new("token", ParameterLocation::Header));
        let param = generator().generate_parameter(&schema).unwrap();
        assert_eq!(param["required"], json!(false));
    }

    #[test]
    fn property_name_conflict() {
        let query = Schema::object([(
            "limit",
            Schema::integer().param(ParamMetadata::named("size")),
        )]);
        let err = generator()
            .generate_inline_parameters(&query, ParameterLocation::Query)
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Conflict { key: "name", ref values, .. }
                if values == &["limit".to_string(), "size".to_string()]
        ));
    }

    #[test]
    fn property_location_conflict() {
        let query = Schema::object([(
            "id",
            Schema::string().param(ParamMetadata::located(ParameterLocation::Path)),
        )]);
        let err = generator()
            .generate_inline_parameters(&query, ParameterLocation::Query)
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Conflict { key: "in", ref values, .. }
                if values == &["query".to_string(), "path".to_string()]
        ));
    }

    #[test]
    fn missing_name_and_location() {
        let err = generator().generate_parameter(&Schema::string()).unwrap_err();
        assert!(matches!(
            err,
            GenerateError::MissingParameterData(MissingParameterData { missing_field: "name", .. })
        ));

        let named = Schema::string().param(ParamMetadata::named("id"));
        let err = generator().generate_parameter(&named).unwrap_err();
        match err {
            GenerateError::MissingParameterData(data) => {
                assert_eq!(data.missing_field, "in");
                assert_eq!(data.param_name.as_deref(), Some("id"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn registered_parameter_is_referenced() {
        let mut generator = generator();
        let id = Schema::string()
            .named("WidgetId")
            .param(ParamMetadata::new("id", ParameterLocation::Path));
        generator.generate_parameter_definition(&id).unwrap();

        let params = Schema::object([("id", id)]);
        assert_eq!(
            generator
                .generate_inline_parameters(&params, ParameterLocation::Path)
                .unwrap(),
            vec![json!({ "$ref": "#/components/parameters/WidgetId" })]
        );
    }

    #[test]
    fn registered_parameter_under_other_key_conflicts() {
        let mut generator = generator();
        let id = Schema::string()
            .named("WidgetId")
            .param(ParamMetadata::new("id", ParameterLocation::Path));
        generator.generate_parameter_definition(&id).unwrap();

        let params = Schema::object([("widgetId", id)]);
        let err = generator
            .generate_inline_parameters(&params, ParameterLocation::Path)
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Conflict { key: "name", ref values, .. }
                if values == &["id".to_string(), "widgetId".to_string()]
        ));
    }

    #[test]
    fn re_registration_must_agree() {
        let mut generator = generator();
        let path_id = Schema::string()
            .named("Id")
            .param(ParamMetadata::new("id", ParameterLocation::Path));
        let query_id = Schema::string()
            .named("Id")
            .param(ParamMetadata::new("id", ParameterLocation::Query));

        generator.generate_parameter_definition(&path_id).unwrap();
        generator.generate_parameter_definition(&path_id).unwrap();
        let err = generator.generate_parameter_definition(&query_id).unwrap_err();
        assert!(matches!(err, GenerateError::Conflict { key: "in", .. }));
    }
}
