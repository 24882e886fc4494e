//! Document assembly.
//!
//! [`OpenApiGenerator`] owns every registry of one compilation run. It sorts
//! the submitted definitions so that schemas and parameters are compiled before
//! anything that may reference them, compiles each definition once, and then
//! merges raw components with the compiled schema and parameter registries.
//!
//! A generator is consumed by the generation call; use a fresh one per run.

use std::mem;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::GenerateError;
use crate::refs::RefRegistry;
use crate::registry::{Definition, RawComponent};
use crate::types::DocumentConfig;
use crate::version::{OpenApiVersion, VersionAdapter};

pub type Result<T> = std::result::Result<T, GenerateError>;

/// Compiles definitions into `components` / `paths` / `webhooks`.
pub struct OpenApiGenerator {
    definitions: Vec<Definition>,
    pub(crate) adapter: Box<dyn VersionAdapter>,
    pub(crate) schema_refs: RefRegistry,
    pub(crate) param_refs: Map<String, Value>,
    pub(crate) path_refs: IndexMap<String, Map<String, Value>>,
    pub(crate) webhook_refs: IndexMap<String, Map<String, Value>>,
    raw_components: Vec<RawComponent>,
}

/// Output of a full generation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentData {
    pub components: Map<String, Value>,
    pub paths: Map<String, Value>,
    /// Empty unless webhooks were registered.
    pub webhooks: Map<String, Value>,
}

impl DocumentData {
    /// `{components, paths}`, plus `webhooks` when there are any.
    pub fn into_value(self) -> Value {
        let mut map = Map::new();
        map.insert("components".into(), Value::Object(self.components));
        map.insert("paths".into(), Value::Object(self.paths));
        if !self.webhooks.is_empty() {
            map.insert("webhooks".into(), Value::Object(self.webhooks));
        }
        Value::Object(map)
    }
}

impl OpenApiGenerator {
    pub fn new(definitions: Vec<Definition>, version: OpenApiVersion) -> Self {
        Self::with_adapter(definitions, version.adapter())
    }

    /// Generator with a caller-supplied version adapter.
    pub fn with_adapter(mut definitions: Vec<Definition>, adapter: Box<dyn VersionAdapter>) -> Self {
        // Stable: definitions of the same kind keep their submission order.
        definitions.sort_by_key(Definition::rank);
        debug!(count = definitions.len(), "sorted definitions");

        Self {
            definitions,
            adapter,
            schema_refs: RefRegistry::default(),
            param_refs: Map::new(),
            path_refs: IndexMap::new(),
            webhook_refs: IndexMap::new(),
            raw_components: Vec::new(),
        }
    }

    /// Compiles everything and returns components, paths and webhooks.
    pub fn generate_document_data(mut self) -> Result<DocumentData> {
        self.run()?;
        let components = self.build_components();
        Ok(DocumentData {
            components,
            paths: into_object_map(mem::take(&mut self.path_refs)),
            webhooks: into_object_map(mem::take(&mut self.webhook_refs)),
        })
    }

    /// Compiles everything and returns `{components}` only.
    pub fn generate_components(mut self) -> Result<Value> {
        self.run()?;
        let mut map = Map::new();
        map.insert("components".into(), Value::Object(self.build_components()));
        Ok(Value::Object(map))
    }

    fn run(&mut self) -> Result<()> {
        for definition in mem::take(&mut self.definitions) {
            self.generate_single(definition)?;
        }
        Ok(())
    }

    fn generate_single(&mut self, definition: Definition) -> Result<()> {
        match definition {
            Definition::Plain(schema) | Definition::Schema { schema } => {
                self.generate_schema(&schema)?;
            }
            Definition::Parameter { schema } => {
                self.generate_parameter_definition(&schema)?;
            }
            Definition::Component(component) => self.raw_components.push(component),
            Definition::Route { route } => self.generate_single_route(&route)?,
            Definition::Webhook { webhook } => {
                if !self.adapter.supports_webhooks() {
                    return Err(GenerateError::unsupported(format!(
                        "webhook '{}' requires OpenAPI 3.1 or later",
                        webhook.path
                    )));
                }
                self.generate_single_webhook(&webhook)?;
            }
        }
        Ok(())
    }

    /// Groups raw components by type; compiled schemas and parameters win on
    /// key collisions. `schemas` and `parameters` are always present.
    fn build_components(&mut self) -> Map<String, Value> {
        let mut components = Map::new();
        for RawComponent {
            component_type,
            name,
            component,
        } in self.raw_components.drain(..)
        {
            if let Value::Object(group) = components
                .entry(component_type)
                .or_insert_with(|| Value::Object(Map::new()))
            {
                group.insert(name, component);
            }
        }

        let compiled = [
            ("schemas", mem::take(&mut self.schema_refs).into_map()),
            ("parameters", mem::take(&mut self.param_refs)),
        ];
        for (key, entries) in compiled {
            if let Value::Object(group) = components
                .entry(key)
                .or_insert_with(|| Value::Object(Map::new()))
            {
                group.extend(entries);
            }
        }
        components
    }
}

fn into_object_map(items: IndexMap<String, Map<String, Value>>) -> Map<String, Value> {
    items
        .into_iter()
        .map(|(key, item)| (key, Value::Object(item)))
        .collect()
}

/// Generates a full document: `config` fields plus components, paths and,
/// for 3.1 targets, webhooks.
///
/// # Errors
///
/// Returns `GenerateError::UnsupportedVersion` if `config.openapi` is not a
/// supported version, or the first error raised while compiling a definition.
pub fn generate_document(definitions: Vec<Definition>, config: &DocumentConfig) -> Result<Value> {
    let version: OpenApiVersion = config.openapi.parse()?;
    let data = OpenApiGenerator::new(definitions, version).generate_document_data()?;

    let mut document = config.to_map();
    document.insert("components".into(), Value::Object(data.components));
    document.insert("paths".into(), Value::Object(data.paths));
    if !data.webhooks.is_empty() {
        document.insert("webhooks".into(), Value::Object(data.webhooks));
    }
    Ok(Value::Object(document))
}
