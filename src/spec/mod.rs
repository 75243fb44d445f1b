//! API specification handling
//!
//! Acquires OpenAPI/Swagger documents, resolves schema references, and
//! extracts canonical endpoint records from them.

pub mod acquire;
pub mod extract;
pub mod resolve;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use acquire::{SpecAcquirer, SpecScraper};
pub use extract::SpecExtractor;
pub use resolve::resolve_reference;

/// One (path, HTTP method) pair from an API specification.
///
/// `request_body` is fully reference-resolved; `response_schema` is the raw
/// 200-response JSON schema as found in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    /// URL template, may contain `{param}` placeholders
    pub path: String,
    /// Uppercased HTTP verb
    pub method: String,
    /// Request body schema with all `$ref`s inlined
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,
    /// 200-response schema, verbatim from the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

/// A live application that can produce its own OpenAPI document on demand.
///
/// The framework-introspection counterpart to fetching a document over HTTP:
/// anything that can hand us `{paths: .., components: {schemas: ..}}` works.
pub trait SchemaSource {
    fn openapi(&self) -> anyhow::Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoint_serializes_without_empty_schemas() {
        let ep = Endpoint {
            path: "/pets".to_string(),
            method: "GET".to_string(),
            request_body: None,
            response_schema: None,
        };
        let v = serde_json::to_value(&ep).unwrap();
        assert_eq!(v, json!({"path": "/pets", "method": "GET"}));
    }

    #[test]
    fn endpoint_round_trips() {
        let ep = Endpoint {
            path: "/pets/{petId}".to_string(),
            method: "POST".to_string(),
            request_body: Some(json!({"type": "object"})),
            response_schema: None,
        };
        let text = serde_json::to_string(&ep).unwrap();
        let back: Endpoint = serde_json::from_str(&text).unwrap();
        assert_eq!(back, ep);
    }
}
