//! Definitions loading from files and strings.

use std::path::Path;

use serde::Deserialize;

use crate::error::LoadError;
use crate::registry::Definition;
use crate::types::DocumentConfig;

/// Contents of a definitions file.
///
/// ```json
/// {
///   "document": { "openapi": "3.1.0", "info": { "title": "Widgets", "version": "1.0.0" } },
///   "definitions": [
///     { "type": "schema", "schema": { "kind": "string", "openapi": { "internal": { "refId": "Name" } } } }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct DefinitionsFile {
    /// Document-level fields. Without them only components can be generated.
    #[serde(default)]
    pub document: Option<DocumentConfig>,
    pub definitions: Vec<Definition>,
}

/// Load definitions from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't a valid definitions file.
pub fn load_definitions(path: &Path) -> Result<DefinitionsFile, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_definitions_str(&content)
}

/// Load definitions from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't a valid definitions file.
pub fn load_definitions_str(content: &str) -> Result<DefinitionsFile, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn missing_file() {
        let result = load_definitions(&PathBuf::from("/nonexistent/definitions.json"));
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }

    #[test]
    fn document_is_optional() {
        let file = load_definitions_str(r#"{ "definitions": [] }"#).unwrap();
        assert!(file.document.is_none());
        assert!(file.definitions.is_empty());
    }

    #[test]
    fn unknown_schema_kind_is_invalid() {
        let result = load_definitions_str(
            r#"{ "definitions": [{ "type": "schema", "schema": { "kind": "tensor" } }] }"#,
        );
        assert!(matches!(result, Err(LoadError::InvalidJson { .. })));
    }

    #[test]
    fn reads_document_and_definitions() {
        let file = load_definitions_str(
            r#"{
                "document": { "openapi": "3.0.3", "info": { "title": "T", "version": "1" } },
                "definitions": [
                    { "type": "schema", "schema": { "kind": "string", "openapi": { "internal": { "refId": "Name" } } } }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(file.document.unwrap().openapi, "3.0.3");
        assert_eq!(file.definitions.len(), 1);
    }

    #[test]
    fn reads_bare_schema_nodes() {
        let file = load_definitions_str(
            r#"{
                "definitions": [
                    { "kind": "boolean", "openapi": { "internal": { "refId": "Flag" } } },
                    { "type": "schema", "schema": { "kind": "string" } }
                ]
            }"#,
        )
        .unwrap();
        assert!(matches!(file.definitions[0], Definition::Plain(_)));
        assert!(matches!(file.definitions[1], Definition::Schema { .. }));
    }
}
