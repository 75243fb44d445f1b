//! Endpoint extraction from a loaded specification document
//!
//! Walks `paths` → methods → operations and builds one [`Endpoint`] per
//! (path, method) pair. Request bodies are pulled from OpenAPI 3.0
//! `requestBody` content or synthesized from 2.0 body/query/formData
//! parameters; a malformed operation degrades to a `None` body instead of
//! aborting the rest of the extraction.

use serde_json::{Map, Value};
use tracing::warn;

use super::{resolve_reference, Endpoint, SchemaSource};

/// Extracts endpoint records from one specification document.
///
/// Owns the document for the duration of one extraction session.
pub struct SpecExtractor {
    document: Value,
}

impl SpecExtractor {
    pub fn new(document: Value) -> Self {
        Self { document }
    }

    /// Build an extractor from a live application's schema source.
    pub fn from_source(source: &dyn SchemaSource) -> anyhow::Result<Self> {
        Ok(Self::new(source.openapi()?))
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Extract every endpoint in the document, in document order.
    pub fn extract(&self) -> Vec<Endpoint> {
        self.extract_filtered(None)
    }

    /// Extract endpoints, optionally restricted to the named paths.
    ///
    /// Filter entries absent from the document are skipped with a warning.
    pub fn extract_filtered(&self, filter: Option<&[String]>) -> Vec<Endpoint> {
        let Some(paths) = self.document.get("paths").and_then(Value::as_object) else {
            return Vec::new();
        };

        let selected: Vec<(&String, &Value)> = match filter {
            Some(names) => names
                .iter()
                .filter_map(|name| match paths.get_key_value(name) {
                    Some(entry) => Some(entry),
                    None => {
                        warn!(path = %name, "Path not found in OpenAPI specification");
                        None
                    }
                })
                .collect(),
            None => paths.iter().collect(),
        };

        let mut endpoints = Vec::new();
        for (path, path_item) in selected {
            let Some(operations) = path_item.as_object() else {
                continue;
            };
            for (method, operation) in operations {
                endpoints.push(Endpoint {
                    path: path.clone(),
                    method: method.to_uppercase(),
                    request_body: self.extract_request_body(operation),
                    response_schema: Self::extract_response_schema(operation),
                });
            }
        }
        endpoints
    }

    /// Request-body extraction policy, tried in order:
    /// 3.0 `requestBody` JSON content, 2.0 body parameter, synthesized query
    /// parameter schema, synthesized formData schema, then `None`.
    fn extract_request_body(&self, operation: &Value) -> Option<Value> {
        // OpenAPI 3.0 style requestBody short-circuits even when its content
        // is missing or empty.
        if let Some(request_body) = operation.get("requestBody") {
            let schema = request_body
                .get("content")
                .and_then(|c| c.get("application/json"))
                .and_then(|c| c.get("schema"))?;
            return self.inline_or_clone(schema);
        }

        let parameters: &[Value] = operation
            .get("parameters")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        if let Some(body_param) = parameters.iter().find(|p| param_in(p) == Some("body")) {
            let schema = body_param.get("schema")?;
            return self.inline_or_clone(schema);
        }

        if parameters.iter().any(|p| param_in(p) == Some("query")) {
            return synthesize_parameter_schema(parameters, "query");
        }

        if parameters.iter().any(|p| param_in(p) == Some("formData")) {
            return synthesize_parameter_schema(parameters, "formData");
        }

        None
    }

    /// Resolve a `$ref` schema, or clone a literal one. Empty schema objects
    /// and failed resolutions both degrade to `None`.
    fn inline_or_clone(&self, schema: &Value) -> Option<Value> {
        if let Some(Value::String(reference)) = schema.get("$ref") {
            return match resolve_reference(reference, &self.document) {
                Ok(resolved) => Some(resolved),
                Err(err) => {
                    warn!(reference = %reference, error = %err, "Failed to resolve request body reference");
                    None
                }
            };
        }
        match schema {
            Value::Object(map) if map.is_empty() => None,
            other => Some(other.clone()),
        }
    }

    /// The 200-response JSON schema, verbatim (references left unresolved).
    fn extract_response_schema(operation: &Value) -> Option<Value> {
        operation
            .get("responses")
            .and_then(|r| r.get("200"))
            .and_then(|r| r.get("content"))
            .and_then(|c| c.get("application/json"))
            .and_then(|c| c.get("schema"))
            .cloned()
    }
}

fn param_in(param: &Value) -> Option<&str> {
    param.get("in").and_then(Value::as_str)
}

/// Build a `{type: object, properties: {..}}` schema from every parameter
/// with the given `in` location.
fn synthesize_parameter_schema(parameters: &[Value], location: &str) -> Option<Value> {
    let mut properties = Map::new();
    for param in parameters.iter().filter(|p| param_in(p) == Some(location)) {
        let Some(name) = param.get("name").and_then(Value::as_str) else {
            continue;
        };
        let declared_type = param.get("type").and_then(Value::as_str).unwrap_or("string");

        let mut schema = Map::new();
        schema.insert("type".to_string(), Value::String(declared_type.to_string()));
        schema.insert(
            "description".to_string(),
            param.get("description").cloned().unwrap_or_else(|| Value::String(String::new())),
        );
        schema.insert(
            "required".to_string(),
            param.get("required").cloned().unwrap_or(Value::Bool(false)),
        );
        if declared_type == "array" {
            schema.insert(
                "items".to_string(),
                param.get("items").cloned().unwrap_or_else(|| Value::Object(Map::new())),
            );
        }
        if location == "formData" && declared_type == "file" {
            schema.insert("format".to_string(), Value::String("binary".to_string()));
        }
        properties.insert(name.to_string(), Value::Object(schema));
    }

    if properties.is_empty() {
        return None;
    }
    let mut schema = Map::new();
    schema.insert("type".to_string(), Value::String("object".to_string()));
    schema.insert("properties".to_string(), Value::Object(properties));
    Some(Value::Object(schema))
}
