//! Route definitions and their compilation into path items.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::GenerateError;
use crate::generator::{OpenApiGenerator, Result};
use crate::schema::{Schema, SchemaKind};
use crate::types::{HttpMethod, ParameterLocation};

/// One operation: method, path template, request and responses.
///
/// Any other key (`summary`, `operationId`, `tags`, raw `parameters`, ...) is
/// copied into the operation object.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    pub method: HttpMethod,
    pub path: String,
    #[serde(default)]
    pub request: Option<RequestConfig>,
    pub responses: IndexMap<String, ResponseConfig>,
    #[serde(flatten)]
    pub operation: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestConfig {
    #[serde(default)]
    pub body: Option<RequestBody>,
    /// Path parameters.
    #[serde(default)]
    pub params: Option<Schema>,
    #[serde(default)]
    pub query: Option<Schema>,
    #[serde(default)]
    pub cookies: Option<Schema>,
    #[serde(default)]
    pub headers: Option<RequestHeaders>,
}

/// Request headers: one object schema, or a list of single header schemas.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RequestHeaders {
    List(Vec<Schema>),
    Schema(Schema),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestBody {
    pub content: IndexMap<String, MediaTypeConfig>,
    /// `description`, `required`, ...
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaTypeConfig {
    pub schema: BodySchema,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A schema node to compile, or a document schema used as is.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BodySchema {
    Schema(Schema),
    Raw(Value),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseConfig {
    pub description: String,
    #[serde(default)]
    pub headers: Option<ResponseHeaders>,
    #[serde(default)]
    pub content: Option<IndexMap<String, MediaTypeConfig>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response headers: an object schema expanded per property, or a raw
/// headers map.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResponseHeaders {
    Schema(Schema),
    Raw(Map<String, Value>),
}

impl RouteConfig {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            request: None,
            responses: IndexMap::new(),
            operation: Map::new(),
        }
    }

    pub fn request(mut self, request: RequestConfig) -> Self {
        self.request = Some(request);
        self
    }

    /// Adds a response for a status code or `default`.
    pub fn response(mut self, status: impl Into<String>, response: ResponseConfig) -> Self {
        self.responses.insert(status.into(), response);
        self
    }

    /// Adds an operation key.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.operation.insert(key.into(), value.into());
        self
    }

    pub fn summary(self, summary: impl Into<String>) -> Self {
        self.with("summary", summary.into())
    }
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn params(mut self, schema: Schema) -> Self {
        self.params = Some(schema);
        self
    }

    pub fn query(mut self, schema: Schema) -> Self {
        self.query = Some(schema);
        self
    }

    pub fn cookies(mut self, schema: Schema) -> Self {
        self.cookies = Some(schema);
        self
    }

    pub fn headers(mut self, schema: Schema) -> Self {
        self.headers = Some(RequestHeaders::Schema(schema));
        self
    }

    pub fn header_list(mut self, headers: impl IntoIterator<Item = Schema>) -> Self {
        self.headers = Some(RequestHeaders::List(headers.into_iter().collect()));
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }
}

impl RequestBody {
    /// Body with a single `application/json` entry.
    pub fn json(schema: Schema) -> Self {
        let mut content = IndexMap::new();
        content.insert("application/json".to_string(), MediaTypeConfig::new(schema));
        Self {
            content,
            extra: Map::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

impl MediaTypeConfig {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema: BodySchema::Schema(schema),
            extra: Map::new(),
        }
    }

    /// Media type whose schema is already a document schema.
    pub fn raw(schema: Value) -> Self {
        Self {
            schema: BodySchema::Raw(schema),
            extra: Map::new(),
        }
    }
}

impl ResponseConfig {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            headers: None,
            content: None,
            extra: Map::new(),
        }
    }

    pub fn content(mut self, media_type: impl Into<String>, config: MediaTypeConfig) -> Self {
        self.content
            .get_or_insert_with(IndexMap::new)
            .insert(media_type.into(), config);
        self
    }

    /// Shorthand for an `application/json` body.
    pub fn json(self, schema: Schema) -> Self {
        self.content("application/json", MediaTypeConfig::new(schema))
    }

    pub fn headers(mut self, schema: Schema) -> Self {
        self.headers = Some(ResponseHeaders::Schema(schema));
        self
    }
}

impl OpenApiGenerator {
    pub(crate) fn generate_single_route(&mut self, route: &RouteConfig) -> Result<()> {
        let item = self.generate_path(route)?;
        merge_path_item(&mut self.path_refs, &route.path, item);
        Ok(())
    }

    pub(crate) fn generate_single_webhook(&mut self, webhook: &RouteConfig) -> Result<()> {
        let item = self.generate_path(webhook)?;
        merge_path_item(&mut self.webhook_refs, &webhook.path, item);
        Ok(())
    }

    /// `{<method>: operation}` for one route.
    fn generate_path(&mut self, route: &RouteConfig) -> Result<Map<String, Value>> {
        let mut responses = Map::new();
        for (status, response) in &route.responses {
            responses.insert(status.clone(), self.get_response(response)?);
        }

        let route_name = format!("{} {}", route.method, route.path);
        let parameters = self
            .get_parameters(route.request.as_ref())
            .map_err(move |e| e.with_parameter_context(|d| d.route = Some(route_name)))?;

        let request_body = match route.request.as_ref().and_then(|r| r.body.as_ref()) {
            Some(body) => Some(self.get_request_body(body)?),
            None => None,
        };

        let mut operation = route.operation.clone();
        if !parameters.is_empty() {
            let mut all = match operation.get("parameters") {
                Some(Value::Array(raw)) => raw.clone(),
                _ => Vec::new(),
            };
            all.extend(parameters);
            operation.insert("parameters".into(), Value::Array(all));
        }
        if let Some(body) = request_body {
            operation.insert("requestBody".into(), body);
        }
        operation.insert("responses".into(), Value::Object(responses));

        let mut item = Map::new();
        item.insert(route.method.as_str().into(), Value::Object(operation));
        Ok(item)
    }

    /// Request parameters in path, query, header, cookie order.
    fn get_parameters(&mut self, request: Option<&RequestConfig>) -> Result<Vec<Value>> {
        let Some(request) = request else {
            return Ok(Vec::new());
        };

        let query = self.parameters_at(request.query.iter(), ParameterLocation::Query)?;
        let path = self.parameters_at(request.params.iter(), ParameterLocation::Path)?;
        let cookies = self.parameters_at(request.cookies.iter(), ParameterLocation::Cookie)?;
        let header_schemas: Vec<&Schema> = match &request.headers {
            Some(RequestHeaders::Schema(schema)) => vec![schema],
            Some(RequestHeaders::List(list)) => list.iter().collect(),
            None => Vec::new(),
        };
        let headers = self.parameters_at(header_schemas, ParameterLocation::Header)?;

        Ok([path, query, headers, cookies].concat())
    }

    fn parameters_at<'a>(
        &mut self,
        schemas: impl IntoIterator<Item = &'a Schema>,
        location: ParameterLocation,
    ) -> Result<Vec<Value>> {
        let mut parameters = Vec::new();
        for schema in schemas {
            let compiled = self
                .generate_inline_parameters(schema, location)
                .map_err(|e| e.with_parameter_context(|d| d.location = Some(location)))?;
            parameters.extend(compiled);
        }
        Ok(parameters)
    }

    fn get_request_body(&mut self, body: &RequestBody) -> Result<Value> {
        let mut result = body.extra.clone();
        result.insert("content".into(), self.get_body_content(&body.content)?);
        Ok(Value::Object(result))
    }

    fn get_body_content(&mut self, content: &IndexMap<String, MediaTypeConfig>) -> Result<Value> {
        let mut result = Map::new();
        for (media_type, config) in content {
            let schema = match &config.schema {
                BodySchema::Schema(schema) => self.generate_schema_with_ref(schema)?,
                BodySchema::Raw(raw) => raw.clone(),
            };
            let mut entry = Map::new();
            entry.insert("schema".into(), schema);
            entry.extend(config.extra.clone());
            result.insert(media_type.clone(), Value::Object(entry));
        }
        Ok(Value::Object(result))
    }

    fn get_response(&mut self, response: &ResponseConfig) -> Result<Value> {
        let mut result = Map::new();
        result.insert(
            "description".into(),
            Value::from(response.description.as_str()),
        );
        result.extend(response.extra.clone());

        match &response.headers {
            Some(ResponseHeaders::Schema(schema)) => {
                let headers = self.get_response_headers(schema)?;
                result.insert("headers".into(), Value::Object(headers));
            }
            Some(ResponseHeaders::Raw(raw)) => {
                result.insert("headers".into(), Value::Object(raw.clone()));
            }
            None => {}
        }
        if let Some(content) = &response.content {
            result.insert("content".into(), self.get_body_content(content)?);
        }
        Ok(Value::Object(result))
    }

    /// Header objects keyed by property name. Header objects carry neither
    /// `name` nor `in`.
    fn get_response_headers(&mut self, schema: &Schema) -> Result<Map<String, Value>> {
        let SchemaKind::Object(def) = schema.kind() else {
            return Err(GenerateError::unsupported(format!(
                "response headers must be an object schema, got {}",
                schema.kind().name()
            )));
        };

        let mut headers = Map::new();
        for (key, property) in &def.shape {
            let mut header = self.generate_simple_parameter(property)?;
            header.remove("name");
            header.remove("in");
            headers.insert(key.clone(), Value::Object(header));
        }
        Ok(headers)
    }
}

/// Merges one `{method: operation}` item into the entry for `path`. Existing
/// methods are replaced, others kept.
fn merge_path_item(
    registry: &mut IndexMap<String, Map<String, Value>>,
    path: &str,
    item: Map<String, Value>,
) {
    let entry = registry.entry(path.to_string()).or_default();
    for (method, operation) in item {
        if entry.insert(method.clone(), operation).is_some() {
            debug!(path, method = %method, "replaced operation");
        } else {
            debug!(path, method = %method, "added operation");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MissingParameterData;
    use crate::metadata::ParamMetadata;
    use crate::version::OpenApiVersion;
    use serde_json::json;

    fn generator() -> OpenApiGenerator {
        OpenApiGenerator::new(Vec::new(), OpenApiVersion::V3_1_0)
    }

    #[test]
    fn operation_keys_and_parameter_order() {
        let route = RouteConfig::new(HttpMethod::Get, "/widgets/{id}")
            .summary("Get a widget")
            .with("parameters", json!([{ "$ref": "#/components/parameters/Trace" }]))
            .request(
                RequestConfig::new()
                    .cookies(Schema::object([("session", Schema::string())]))
                    .headers(Schema::object([("x-tenant", Schema::string())]))
                    .query(Schema::object([("expand", Schema::boolean().optional())]))
                    .params(Schema::object([("id", Schema::string())])),
            )
            .response("200", ResponseConfig::new("A widget"));

        let item = generator().generate_path(&route).unwrap();
        let operation = &item["get"];
        assert_eq!(operation["summary"], json!("Get a widget"));

        let names: Vec<&str> = operation["parameters"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p.get("name").and_then(Value::as_str).unwrap_or("$ref"))
            .collect();
        assert_eq!(names, vec!["$ref", "id", "expand", "x-tenant", "session"]);
        assert_eq!(operation["responses"], json!({ "200": { "description": "A widget" } }));
    }

    #[test]
    fn header_list_expands_each_schema() {
        let route = RouteConfig::new(HttpMethod::Post, "/upload")
            .request(RequestConfig::new().header_list([
                Schema::string().param(ParamMetadata::named("x-a")),
                Schema::string().param(ParamMetadata::named("x-b")),
            ]))
            .response("204", ResponseConfig::new("Done"));

        let item = generator().generate_path(&route).unwrap();
        let params = item["post"]["parameters"].as_array().unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params[1]["in"], json!("header"));
        assert_eq!(params[1]["name"], json!("x-b"));
    }

    #[test]
    fn request_body_and_raw_media_type() {
        let route = RouteConfig::new(HttpMethod::Post, "/files")
            .request(
                RequestConfig::new().body(
                    RequestBody::json(Schema::object([("name", Schema::string())]))
                        .with("required", true),
                ),
            )
            .response(
                "201",
                ResponseConfig::new("Created")
                    .content("text/plain", MediaTypeConfig::raw(json!({ "type": "string" }))),
            );

        let item = generator().generate_path(&route).unwrap();
        assert_eq!(
            item["post"]["requestBody"],
            json!({
                "required": true,
                "content": {
                    "application/json": {
                        "schema": {
                            "type": "object",
                            "properties": { "name": { "type": "string" } },
                            "required": ["name"]
                        }
                    }
                }
            })
        );
        assert_eq!(
            item["post"]["responses"]["201"]["content"],
            json!({ "text/plain": { "schema": { "type": "string" } } })
        );
    }

    #[test]
    fn response_headers_are_inline_without_name_or_location() {
        let response = ResponseConfig::new("ok").headers(Schema::object([(
            "x-rate-limit",
            Schema::integer().describe("Requests left"),
        )]));
        let result = generator().get_response(&response).unwrap();
        assert_eq!(
            result["headers"],
            json!({
                "x-rate-limit": {
                    "schema": { "type": "integer", "description": "Requests left" },
                    "required": true,
                    "description": "Requests left"
                }
            })
        );
    }

    #[test]
    fn non_object_response_headers_rejected() {
        let response = ResponseConfig::new("ok").headers(Schema::string());
        assert!(matches!(
            generator().get_response(&response),
            Err(GenerateError::UnsupportedConfiguration { .. })
        ));
    }

    #[test]
    fn missing_parameter_data_gets_route_and_location() {
        let route = RouteConfig::new(HttpMethod::Get, "/search")
            .request(RequestConfig::new().query(Schema::string()))
            .response("200", ResponseConfig::new("ok"));

        match generator().generate_path(&route).unwrap_err() {
            GenerateError::MissingParameterData(MissingParameterData {
                missing_field,
                route,
                location,
                ..
            }) => {
                assert_eq!(missing_field, "name");
                assert_eq!(route.as_deref(), Some("get /search"));
                assert_eq!(location, Some(ParameterLocation::Query));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn same_path_merges_methods() {
        let mut generator = generator();
        let get = RouteConfig::new(HttpMethod::Get, "/widgets")
            .response("200", ResponseConfig::new("list"));
        let post = RouteConfig::new(HttpMethod::Post, "/widgets")
            .response("201", ResponseConfig::new("created"));
        let get_again = RouteConfig::new(HttpMethod::Get, "/widgets")
            .response("200", ResponseConfig::new("list v2"));

        generator.generate_single_route(&get).unwrap();
        generator.generate_single_route(&post).unwrap();
        generator.generate_single_route(&get_again).unwrap();

        let item = &generator.path_refs["/widgets"];
        assert_eq!(item.len(), 2);
        assert_eq!(item["get"]["responses"]["200"]["description"], json!("list v2"));
        assert_eq!(item["post"]["responses"]["201"]["description"], json!("created"));
    }

    #[test]
    fn route_deserializes_from_json() {
        let route: RouteConfig = serde_json::from_value(json!({
            "method": "put",
            "path": "/widgets/{id}",
            "operationId": "updateWidget",
            "request": {
                "params": { "kind": "object", "shape": { "id": { "kind": "string" } } },
                "headers": [
                    { "kind": "string", "openapi": { "metadata": { "param": { "name": "x-a" } } } }
                ],
                "body": {
                    "content": {
                        "application/json": { "schema": { "$ref": "#/components/schemas/Widget" } }
                    }
                }
            },
            "responses": { "204": { "description": "Updated" } }
        }))
        .unwrap();

        assert_eq!(route.method, HttpMethod::Put);
        assert_eq!(route.operation["operationId"], json!("updateWidget"));
        let request = route.request.as_ref().unwrap();
        assert!(matches!(request.headers, Some(RequestHeaders::List(ref l)) if l.len() == 1));
        assert!(matches!(
            request.body.as_ref().unwrap().content["application/json"].schema,
            BodySchema::Raw(_)
        ));
    }
}
