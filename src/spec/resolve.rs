//! Recursive `$ref` resolution
//!
//! Inlines OpenAPI 2.0 (`#/definitions/<Name>`) and 3.0
//! (`#/components/schemas/<Name>`) schema references, producing independent
//! copies that no longer contain `$ref` keys. A visited stack converts
//! reference cycles into an error instead of unbounded recursion.

use serde_json::Value;

use crate::error::QuiverError;

/// Resolve a schema reference against a loaded specification document.
///
/// The returned schema is a copy with every nested `$ref` inlined; the
/// document itself is never mutated. Resolving an already-resolved schema
/// is a no-op.
pub fn resolve_reference(reference: &str, document: &Value) -> Result<Value, QuiverError> {
    let target = lookup(reference, document)?;
    let mut visited = vec![reference.to_string()];
    resolve_nested(target, document, &mut visited)
}

/// Locate the schema object a reference points at.
fn lookup<'a>(reference: &str, document: &'a Value) -> Result<&'a Value, QuiverError> {
    let mut parts = reference.split('/');
    let _anchor = parts.next();

    let found = match parts.next() {
        Some("definitions") => parts
            .next()
            .and_then(|name| document.get("definitions").and_then(|d| d.get(name))),
        Some("components") => match (parts.next(), parts.next()) {
            (Some("schemas"), Some(name)) => document
                .get("components")
                .and_then(|c| c.get("schemas"))
                .and_then(|s| s.get(name)),
            _ => {
                return Err(QuiverError::UnsupportedReference {
                    reference: reference.to_string(),
                })
            }
        },
        _ => {
            return Err(QuiverError::UnsupportedReference {
                reference: reference.to_string(),
            })
        }
    };

    found.ok_or_else(|| QuiverError::UnknownDefinition {
        reference: reference.to_string(),
    })
}

/// Walk a schema value, replacing `$ref` mappings with their resolved targets.
///
/// `visited` holds the chain of references currently being expanded. It is a
/// stack (popped on exit), so a definition referenced twice by sibling fields
/// resolves fine while a true cycle errors out.
fn resolve_nested(
    value: &Value,
    document: &Value,
    visited: &mut Vec<String>,
) -> Result<Value, QuiverError> {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                if visited.iter().any(|seen| seen == reference) {
                    let mut chain = visited.clone();
                    chain.push(reference.clone());
                    return Err(QuiverError::ReferenceCycle {
                        reference: reference.clone(),
                        chain: chain.join(" -> "),
                    });
                }
                let target = lookup(reference, document)?;
                visited.push(reference.clone());
                let resolved = resolve_nested(target, document, visited)?;
                visited.pop();
                return Ok(resolved);
            }

            let mut resolved = serde_json::Map::with_capacity(map.len());
            for (key, nested) in map {
                resolved.insert(key.clone(), resolve_nested(nested, document, visited)?);
            }
            Ok(Value::Object(resolved))
        }
        Value::Array(items) => {
            let mut resolved = Vec::with_capacity(items.len());
            for item in items {
                resolved.push(resolve_nested(item, document, visited)?);
            }
            Ok(Value::Array(resolved))
        }
        scalar => Ok(scalar.clone()),
    }
}
