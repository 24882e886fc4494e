//! Core types shared by the compiler stages.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where a parameter is carried in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    /// Returns the value used for the `in` key of a parameter object.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Cookie => "cookie",
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP method of an operation. Serialized lowercase, as path-item keys are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Put => "put",
            HttpMethod::Post => "post",
            HttpMethod::Delete => "delete",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
            HttpMethod::Patch => "patch",
            HttpMethod::Trace => "trace",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `info` object of a document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Info {
    pub title: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    /// `termsOfService`, `contact`, `license`, ...
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Info {
    pub fn new(title: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            description: None,
            extra: Map::new(),
        }
    }

    fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("title".into(), Value::from(self.title.as_str()));
        map.insert("version".into(), Value::from(self.version.as_str()));
        if let Some(description) = &self.description {
            map.insert("description".into(), Value::from(description.as_str()));
        }
        map.extend(self.extra.clone());
        Value::Object(map)
    }
}

/// Document-level fields of a full API description.
///
/// Only `openapi` influences generation: it selects the version adapter.
/// Everything else is copied into the document as given.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentConfig {
    pub openapi: String,
    pub info: Info,
    #[serde(default)]
    pub servers: Vec<Value>,
    #[serde(default)]
    pub security: Vec<Value>,
    #[serde(default)]
    pub tags: Vec<Value>,
    #[serde(default)]
    pub external_docs: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DocumentConfig {
    pub fn new(openapi: impl Into<String>, info: Info) -> Self {
        Self {
            openapi: openapi.into(),
            info,
            servers: Vec::new(),
            security: Vec::new(),
            tags: Vec::new(),
            external_docs: None,
            extra: Map::new(),
        }
    }

    /// Set the target version string.
    pub fn openapi(mut self, version: impl Into<String>) -> Self {
        self.openapi = version.into();
        self
    }

    pub fn server(mut self, url: impl Into<String>) -> Self {
        self.servers
            .push(serde_json::json!({ "url": url.into() }));
        self
    }

    /// Document skeleton without `components` / `paths`.
    pub(crate) fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("openapi".into(), Value::from(self.openapi.as_str()));
        map.insert("info".into(), self.info.to_value());
        if !self.servers.is_empty() {
            map.insert("servers".into(), Value::Array(self.servers.clone()));
        }
        if !self.security.is_empty() {
            map.insert("security".into(), Value::Array(self.security.clone()));
        }
        if !self.tags.is_empty() {
            map.insert("tags".into(), Value::Array(self.tags.clone()));
        }
        if let Some(docs) = &self.external_docs {
            map.insert("externalDocs".into(), docs.clone());
        }
        map.extend(self.extra.clone());
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parameter_location_from_in_value() {
        for location in [
            ParameterLocation::Path,
            ParameterLocation::Query,
            ParameterLocation::Header,
            ParameterLocation::Cookie,
        ] {
            let parsed: ParameterLocation = serde_json::from_value(json!(location.as_str())).unwrap();
            assert_eq!(parsed, location);
        }
    }

    #[test]
    fn parameter_location_rejects_unknown_values() {
        for value in ["body", "Query", ""] {
            assert!(serde_json::from_value::<ParameterLocation>(json!(value)).is_err());
        }
    }

    #[test]
    fn http_method_display_is_lowercase() {
        assert_eq!(HttpMethod::Get.to_string(), "get");
        assert_eq!(HttpMethod::Delete.to_string(), "delete");
    }

    #[test]
    fn document_config_skeleton() {
        let config = DocumentConfig::new("3.1.0", Info::new("Widgets", "1.0.0"))
            .server("https://api.example.com");
        assert_eq!(
            Value::Object(config.to_map()),
            json!({
                "openapi": "3.1.0",
                "info": { "title": "Widgets", "version": "1.0.0" },
                "servers": [{ "url": "https://api.example.com" }]
            })
        );
    }

    #[test]
    fn document_config_deserializes_extra_keys() {
        let config: DocumentConfig = serde_json::from_value(json!({
            "openapi": "3.0.3",
            "info": { "title": "T", "version": "0", "license": { "name": "MIT" } },
            "externalDocs": { "url": "https://docs.example.com" },
            "x-audience": "internal"
        }))
        .unwrap();

        assert_eq!(config.info.extra["license"], json!({ "name": "MIT" }));
        assert!(config.external_docs.is_some());
        assert_eq!(config.extra["x-audience"], json!("internal"));
    }
}
