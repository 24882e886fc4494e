//! Definitions submitted for generation, and a registry that collects them.

use serde::Deserialize;
use serde_json::Value;

use crate::metadata::{get_metadata, ParamMetadata};
use crate::routes::RouteConfig;
use crate::schema::Schema;

/// One unit of input to the generator.
///
/// Deserialized definitions are tagged by `type`. An entry without a known
/// `type` is read as a bare schema node.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Definition {
    Schema {
        schema: Schema,
    },
    Parameter {
        schema: Schema,
    },
    Component(RawComponent),
    Route {
        route: RouteConfig,
    },
    Webhook {
        webhook: RouteConfig,
    },
    #[serde(untagged)]
    Plain(Schema),
}

impl Definition {
    /// Generation order. Everything a route may reference is compiled first.
    pub fn rank(&self) -> u8 {
        match self {
            Definition::Plain(_) => 0,
            Definition::Schema { .. } => 1,
            Definition::Parameter { .. } => 2,
            Definition::Component(_) => 3,
            Definition::Route { .. } => 4,
            Definition::Webhook { .. } => 5,
        }
    }
}

impl From<Schema> for Definition {
    fn from(schema: Schema) -> Self {
        Definition::Plain(schema)
    }
}

/// A pre-built component copied into `components.<component_type>.<name>`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawComponent {
    pub component_type: String,
    pub name: String,
    pub component: Value,
}

impl RawComponent {
    pub fn new(component_type: impl Into<String>, name: impl Into<String>, component: Value) -> Self {
        Self {
            component_type: component_type.into(),
            name: name.into(),
            component,
        }
    }
}

/// Collects definitions in submission order.
///
/// # Example
///
/// ```
/// use schema_openapi::{OpenApiGenerator, OpenApiRegistry, OpenApiVersion, Schema};
///
/// let mut registry = OpenApiRegistry::new();
/// registry.register("User", Schema::object([("id", Schema::string().uuid())]));
///
/// let components = OpenApiGenerator::new(registry.into_definitions(), OpenApiVersion::V3_0_3)
///     .generate_components()
///     .unwrap();
/// assert_eq!(components["components"]["schemas"]["User"]["type"], "object");
/// ```
#[derive(Debug, Clone, Default)]
pub struct OpenApiRegistry {
    definitions: Vec<Definition>,
}

impl OpenApiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a reusable schema under `ref_id` and returns the named schema,
    /// which should be used wherever the component is referenced.
    pub fn register(&mut self, ref_id: &str, schema: Schema) -> Schema {
        let named = schema.named(ref_id);
        self.definitions.push(Definition::Schema {
            schema: named.clone(),
        });
        named
    }

    /// Registers a reusable parameter. Its `name` defaults to `ref_id`.
    pub fn register_parameter(&mut self, ref_id: &str, schema: Schema) -> Schema {
        let has_name = get_metadata(&schema)
            .param()
            .and_then(|p| p.name.as_ref())
            .is_some();
        let mut named = schema.named(ref_id);
        if !has_name {
            named = named.param(ParamMetadata::named(ref_id));
        }
        self.definitions.push(Definition::Parameter {
            schema: named.clone(),
        });
        named
    }

    pub fn register_path(&mut self, route: RouteConfig) {
        self.definitions.push(Definition::Route { route });
    }

    /// Registers a webhook keyed by `webhook.path`. Requires a 3.1 target.
    pub fn register_webhook(&mut self, webhook: RouteConfig) {
        self.definitions.push(Definition::Webhook { webhook });
    }

    /// Registers a raw component and returns its `$ref` path.
    pub fn register_component(
        &mut self,
        component_type: &str,
        name: &str,
        component: Value,
    ) -> String {
        self.definitions
            .push(Definition::Component(RawComponent::new(component_type, name, component)));
        format!("#/components/{component_type}/{name}")
    }

    /// Adds a schema without an identifier. It is compiled but only stored when
    /// it carries one of its own.
    pub fn add(&mut self, schema: Schema) {
        self.definitions.push(schema.into());
    }

    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    pub fn into_definitions(self) -> Vec<Definition> {
        self.definitions
    }
}
