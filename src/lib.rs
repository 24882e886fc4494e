//! Schema to OpenAPI compiler
//!
//! Compiles trees of schema nodes, annotated with optional metadata, into
//! OpenAPI 3.0 / 3.1 `components`, `paths` and `webhooks`.
//!
//! Schemas that carry a stable identifier become named components and are
//! referenced with `$ref` wherever they are reused. Routes are compiled into
//! path items, with request schemas expanded into parameter objects.
//!
//! # Example
//!
//! ```
//! use schema_openapi::{
//!     generate_document, DocumentConfig, HttpMethod, Info, OpenApiRegistry, RequestConfig,
//!     ResponseConfig, RouteConfig, Schema,
//! };
//!
//! let mut registry = OpenApiRegistry::new();
//! let widget = registry.register(
//!     "Widget",
//!     Schema::object([
//!         ("id", Schema::string().uuid()),
//!         ("name", Schema::string().max_length(64)),
//!     ]),
//! );
//! registry.register_path(
//!     RouteConfig::new(HttpMethod::Get, "/widgets/{id}")
//!         .request(RequestConfig::new().params(Schema::object([("id", Schema::string())])))
//!         .response("200", ResponseConfig::new("A widget").json(widget)),
//! );
//!
//! let config = DocumentConfig::new("3.1.0", Info::new("Widgets", "1.0.0"));
//! let document = generate_document(registry.into_definitions(), &config).unwrap();
//!
//! assert_eq!(
//!     document["paths"]["/widgets/{id}"]["get"]["responses"]["200"]["content"]
//!         ["application/json"]["schema"]["$ref"],
//!     "#/components/schemas/Widget"
//! );
//! assert_eq!(document["paths"]["/widgets/{id}"]["get"]["parameters"][0]["in"], "path");
//! ```
//!
//! # Versions
//!
//! | Target | `null` | Nullable type | Exclusive bound |
//! |--------|--------|---------------|-----------------|
//! | 3.0.x | `{"nullable": true}` | `nullable: true` | `exclusiveMinimum: true` + `minimum` |
//! | 3.1.0 | `{"type": "null"}` | `type: [T, "null"]` | `exclusiveMinimum: <n>` |

mod error;
mod generator;
mod loader;
mod metadata;
mod parameters;
mod refs;
mod registry;
mod routes;
mod schema;
mod types;
mod version;
mod walker;

pub use error::{GenerateError, LoadError, MissingParameterData};
pub use generator::{generate_document, DocumentData, OpenApiGenerator};
pub use loader::{load_definitions, load_definitions_str, DefinitionsFile};
pub use metadata::{
    ExtendedFrom, InternalMetadata, OpenApiMetadata, ParamMetadata, ResolvedMetadata,
    SchemaMetadata,
};
pub use metadata::{get_metadata, get_param_metadata, get_ref_id};
pub use refs::RefRegistry;
pub use registry::{Definition, OpenApiRegistry, RawComponent};
pub use routes::{
    BodySchema, MediaTypeConfig, RequestBody, RequestConfig, RequestHeaders, ResponseConfig,
    ResponseHeaders, RouteConfig,
};
pub use schema::{
    ArrayDef, NumberCheck, NumberDef, ObjectDef, Schema, SchemaKind, SchemaNode, StringCheck,
    StringDef, UnknownKeys,
};
pub use types::{DocumentConfig, HttpMethod, Info, ParameterLocation};
pub use version::{OpenApi30, OpenApi31, OpenApiVersion, VersionAdapter, SUPPORTED_VERSIONS};
