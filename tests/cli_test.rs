//! CLI integration tests for schema-openapi binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("schema-openapi"))
}

// Helper to create a temp definitions file
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const WIDGETS: &str = r#"{
    "document": {
        "openapi": "3.1.0",
        "info": { "title": "Widgets", "version": "1.0.0" }
    },
    "definitions": [
        {
            "type": "route",
            "route": {
                "method": "get",
                "path": "/widgets/{id}",
                "request": {
                    "params": { "kind": "object", "shape": { "id": { "kind": "string" } } }
                },
                "responses": {
                    "200": {
                        "description": "A widget",
                        "content": {
                            "application/json": {
                                "schema": {
                                    "kind": "object",
                                    "openapi": { "internal": { "refId": "Widget" } },
                                    "shape": {
                                        "id": { "kind": "string" },
                                        "size": { "kind": "nullable", "inner": { "kind": "number" } }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    ]
}"#;

fn stdout_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).unwrap()
}

mod generate_command {
    use super::*;

    #[test]
    fn full_document() {
        let dir = TempDir::new().unwrap();
        let file = write_temp_file(&dir, "defs.json", WIDGETS);

        let output = cmd()
            .args(["generate", file.to_str().unwrap()])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let document = stdout_json(&output);
        assert_eq!(document["openapi"], "3.1.0");
        assert_eq!(document["info"]["title"], "Widgets");
        assert_eq!(
            document["components"]["schemas"]["Widget"]["properties"]["size"]["type"],
            serde_json::json!(["number", "null"])
        );
        assert_eq!(
            document["paths"]["/widgets/{id}"]["get"]["parameters"][0]["name"],
            "id"
        );
    }

    #[test]
    fn openapi_flag_overrides_document_version() {
        let dir = TempDir::new().unwrap();
        let file = write_temp_file(&dir, "defs.json", WIDGETS);

        let output = cmd()
            .args(["generate", file.to_str().unwrap(), "--openapi", "3.0.3"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let document = stdout_json(&output);
        assert_eq!(document["openapi"], "3.0.3");
        assert_eq!(
            document["components"]["schemas"]["Widget"]["properties"]["size"],
            serde_json::json!({ "type": "number", "nullable": true })
        );
    }

    #[test]
    fn components_only() {
        let dir = TempDir::new().unwrap();
        let file = write_temp_file(&dir, "defs.json", WIDGETS);

        let output = cmd()
            .args(["generate", file.to_str().unwrap(), "--components-only"])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();

        let document = stdout_json(&output);
        assert!(document.get("paths").is_none());
        assert!(document.get("openapi").is_none());
        assert!(document["components"]["schemas"].get("Widget").is_some());
    }

    #[test]
    fn without_document_emits_components() {
        let dir = TempDir::new().unwrap();
        let file = write_temp_file(
            &dir,
            "defs.json",
            r#"{
                "definitions": [
                    { "type": "schema", "schema": { "kind": "string", "openapi": { "internal": { "refId": "Name" } } } }
                ]
            }"#,
        );

        cmd()
            .args(["generate", file.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                r#"{"components":{"schemas":{"Name":{"type":"string"}},"parameters":{}}}"#,
            ));
    }

    #[test]
    fn generate_with_pretty() {
        let dir = TempDir::new().unwrap();
        let file = write_temp_file(&dir, "defs.json", WIDGETS);

        cmd()
            .args(["generate", file.to_str().unwrap(), "--pretty"])
            .assert()
            .success()
            // Pretty output has newlines and indentation
            .stdout(predicate::str::contains("{\n"));
    }

    #[test]
    fn generate_with_output_file() {
        let dir = TempDir::new().unwrap();
        let file = write_temp_file(&dir, "defs.json", WIDGETS);
        let out = dir.path().join("openapi.json");

        cmd()
            .args([
                "generate",
                file.to_str().unwrap(),
                "--output",
                out.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());

        let written: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written["info"]["version"], "1.0.0");
    }
}

mod versions_command {
    use super::*;

    #[test]
    fn lists_supported_versions() {
        cmd()
            .arg("versions")
            .assert()
            .success()
            .stdout("3.0.0\n3.0.1\n3.0.2\n3.0.3\n3.1.0\n");
    }
}

mod error_handling {
    use super::*;

    #[test]
    fn file_not_found() {
        cmd()
            .args(["generate", "/nonexistent/defs.json"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("not found"));
    }

    #[test]
    fn invalid_json() {
        let dir = TempDir::new().unwrap();
        let file = write_temp_file(&dir, "bad.json", r#"{ not valid json"#);

        cmd()
            .args(["generate", file.to_str().unwrap()])
            .assert()
            .code(2);
    }

    #[test]
    fn unsupported_version() {
        let dir = TempDir::new().unwrap();
        let file = write_temp_file(&dir, "defs.json", WIDGETS);

        cmd()
            .args(["generate", file.to_str().unwrap(), "--openapi", "2.0"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("unsupported OpenAPI version"));
    }

    #[test]
    fn unsupported_schema_variant() {
        let dir = TempDir::new().unwrap();
        let file = write_temp_file(
            &dir,
            "defs.json",
            r#"{
                "definitions": [
                    { "type": "schema", "schema": { "kind": "never", "openapi": { "internal": { "refId": "Nothing" } } } }
                ]
            }"#,
        );

        cmd()
            .args(["generate", file.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("unknown schema variant 'never'"))
            .stderr(predicate::str::contains("Nothing"));
    }

    #[test]
    fn missing_parameter_name() {
        let dir = TempDir::new().unwrap();
        let file = write_temp_file(
            &dir,
            "defs.json",
            r#"{
                "definitions": [
                    {
                        "type": "route",
                        "route": {
                            "method": "get",
                            "path": "/search",
                            "request": { "query": { "kind": "string" } },
                            "responses": { "200": { "description": "ok" } }
                        }
                    }
                ]
            }"#,
        );

        cmd()
            .args(["generate", file.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("`name`"))
            .stderr(predicate::str::contains("get /search"));
    }
}

mod help_and_version {
    use super::*;

    #[test]
    fn help_flag() {
        cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Generate OpenAPI documents"));
    }

    #[test]
    fn version_flag() {
        cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("schema-openapi"));
    }

    #[test]
    fn generate_help() {
        cmd()
            .args(["generate", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--openapi"))
            .stdout(predicate::str::contains("--components-only"));
    }

    #[test]
    fn missing_definitions_path() {
        cmd().arg("generate").assert().failure();
    }
}
