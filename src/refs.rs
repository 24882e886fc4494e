//! Named schema components and reference-preferring compilation.
//!
//! A schema with a stable identifier is compiled once and stored under that
//! identifier. Later sites receive a `$ref`, or `allOf: [$ref, delta]` when they
//! add metadata the stored fragment does not already carry.

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::generator::{OpenApiGenerator, Result};
use crate::metadata::{
    apply_schema_metadata, build_schema_metadata, get_default_value, get_metadata, get_ref_id,
    unwrap_chained,
};
use crate::schema::Schema;

pub(crate) fn schema_ref(ref_id: &str) -> String {
    format!("#/components/schemas/{ref_id}")
}

pub(crate) fn parameter_ref(ref_id: &str) -> String {
    format!("#/components/parameters/{ref_id}")
}

pub(crate) fn reference_object(path: String) -> Value {
    json!({ "$ref": path })
}

/// Write-once map from stable identifier to compiled schema fragment.
#[derive(Debug, Clone, Default)]
pub struct RefRegistry {
    schemas: Map<String, Value>,
}

impl RefRegistry {
    pub fn get(&self, ref_id: &str) -> Option<&Value> {
        self.schemas.get(ref_id)
    }

    pub fn contains(&self, ref_id: &str) -> bool {
        self.schemas.contains_key(ref_id)
    }

    /// Stores `fragment` unless the identifier is already materialized.
    /// Returns whether it was stored.
    pub fn materialize(&mut self, ref_id: &str, fragment: &Value) -> bool {
        if self.contains(ref_id) {
            return false;
        }
        debug!(ref_id, "materialized schema component");
        self.schemas.insert(ref_id.to_string(), fragment.clone());
        true
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.schemas
    }
}

impl OpenApiGenerator {
    /// Compiles a schema and registers it when it carries an identifier. The
    /// full fragment is returned even when it was just registered.
    pub(crate) fn generate_schema(&mut self, schema: &Schema) -> Result<Value> {
        let result = self.generate_simple_schema(schema)?;
        if let Some(ref_id) = get_ref_id(schema) {
            self.schema_refs.materialize(ref_id, &result);
        }
        Ok(result)
    }

    /// Like [`generate_schema`](Self::generate_schema), but a schema that gets
    /// registered here is answered with its `$ref`.
    pub(crate) fn generate_schema_with_ref(&mut self, schema: &Schema) -> Result<Value> {
        let result = self.generate_simple_schema(schema)?;
        match get_ref_id(schema) {
            Some(ref_id) if self.schema_refs.materialize(ref_id, &result) => {
                Ok(reference_object(schema_ref(ref_id)))
            }
            _ => Ok(result),
        }
    }

    /// A schema fragment with metadata applied, or a reference (plus delta)
    /// when the identifier is already registered.
    fn generate_simple_schema(&mut self, schema: &Schema) -> Result<Value> {
        let Some((ref_id, cached)) = get_ref_id(schema).and_then(|ref_id| {
            self.schema_refs
                .get(ref_id)
                .map(|cached| (ref_id, cached.clone()))
        }) else {
            return self.generate_schema_with_metadata(schema);
        };

        let reference = reference_object(schema_ref(ref_id));
        let metadata = get_metadata(schema);

        let new_metadata = without_cached_keys(build_schema_metadata(&metadata.metadata), &cached);
        // A type override replaces the compiled schema, so no structural delta.
        if new_metadata.contains_key("type") {
            return Ok(json!({ "allOf": [reference, new_metadata] }));
        }

        let new_schema = match self.construct_referenced_openapi_schema(schema)? {
            Value::Object(map) => without_cached_keys(map, &cached),
            _ => Map::new(),
        };
        let mut delta = new_schema;
        delta.extend(new_metadata);
        delta.retain(|_, v| !v.is_null());

        if delta.is_empty() {
            Ok(reference)
        } else {
            Ok(json!({ "allOf": [reference, delta] }))
        }
    }

    pub(crate) fn generate_schema_with_metadata(&mut self, schema: &Schema) -> Result<Value> {
        let metadata = get_metadata(schema);
        let result = match metadata.type_override() {
            Some(ty) => json!({ "type": ty }),
            None => {
                let default = get_default_value(schema).cloned();
                self.to_openapi_schema(unwrap_chained(schema), schema.is_nullable(), default.as_ref())?
            }
        };
        Ok(apply_schema_metadata(result, &metadata.metadata))
    }

    /// The schema as it would compile at this site, ignoring the registry.
    fn construct_referenced_openapi_schema(&mut self, schema: &Schema) -> Result<Value> {
        let metadata = get_metadata(schema);
        let is_nullable = schema.is_nullable();
        if let Some(ty) = metadata.type_override() {
            return Ok(Value::Object(
                self.adapter.map_nullable_type(Some(ty), is_nullable),
            ));
        }
        let default = get_default_value(schema).cloned();
        self.to_openapi_schema(unwrap_chained(schema), is_nullable, default.as_ref())
    }
}

/// Drops keys whose value is already present, equal, in the cached fragment.
fn without_cached_keys(map: Map<String, Value>, cached: &Value) -> Map<String, Value> {
    map.into_iter()
        .filter(|(key, value)| !value.is_null() && cached.get(key) != Some(value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::SchemaMetadata;
    use crate::version::OpenApiVersion;

    fn generator() -> OpenApiGenerator {
        OpenApiGenerator::new(Vec::new(), OpenApiVersion::V3_1_0)
    }

    #[test]
    fn materialize_is_write_once() {
        let mut registry = RefRegistry::default();
        assert!(registry.materialize("A", &json!({ "type": "string" })));
        assert!(!registry.materialize("A", &json!({ "type": "number" })));
        assert_eq!(registry.get("A"), Some(&json!({ "type": "string" })));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn first_reference_site_gets_ref() {
        let mut generator = generator();
        let name = Schema::string().named("Name");

        let first = generator.generate_schema_with_ref(&name).unwrap();
        assert_eq!(first, json!({ "$ref": "#/components/schemas/Name" }));
        assert_eq!(
            generator.schema_refs.get("Name"),
            Some(&json!({ "type": "string" }))
        );
    }

    #[test]
    fn top_level_registration_returns_fragment() {
        let mut generator = generator();
        let name = Schema::string().named("Name");
        assert_eq!(
            generator.generate_schema(&name).unwrap(),
            json!({ "type": "string" })
        );
        // Second visit resolves to the cached component.
        assert_eq!(
            generator.generate_schema(&name).unwrap(),
            json!({ "$ref": "#/components/schemas/Name" })
        );
    }

    #[test]
    fn new_metadata_becomes_delta() {
        let mut generator = generator();
        let name = Schema::string()
            .openapi(SchemaMetadata::new().example("abc"))
            .named("Name");
        generator.generate_schema(&name).unwrap();

        let described = name
            .clone()
            .openapi(SchemaMetadata::new().description("A name").example("abc"));
        assert_eq!(
            generator.generate_schema_with_ref(&described).unwrap(),
            json!({
                "allOf": [
                    { "$ref": "#/components/schemas/Name" },
                    { "description": "A name" }
                ]
            })
        );
    }

    #[test]
    fn type_override_delta_skips_structure() {
        let mut generator = generator();
        let name = Schema::string().named("Name");
        generator.generate_schema(&name).unwrap();

        let overridden = name.openapi(SchemaMetadata::new().type_override("integer"));
        assert_eq!(
            generator.generate_schema_with_ref(&overridden).unwrap(),
            json!({
                "allOf": [
                    { "$ref": "#/components/schemas/Name" },
                    { "type": "integer" }
                ]
            })
        );
    }

    #[test]
    fn nullable_reference_adds_type_delta() {
        let mut generator = generator();
        let name = Schema::string().named("Name");
        generator.generate_schema(&name).unwrap();

        assert_eq!(
            generator.generate_schema_with_ref(&name.nullable()).unwrap(),
            json!({
                "allOf": [
                    { "$ref": "#/components/schemas/Name" },
                    { "type": ["string", "null"] }
                ]
            })
        );
    }

    #[test]
    fn unnamed_schema_inlines() {
        let mut generator = generator();
        let schema = Schema::string().describe("plain");
        assert_eq!(
            generator.generate_schema_with_ref(&schema).unwrap(),
            json!({ "type": "string", "description": "plain" })
        );
        assert!(generator.schema_refs.is_empty());
    }
}
