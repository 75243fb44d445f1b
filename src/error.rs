//! Error types with fix suggestions

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

#[derive(Error, Debug)]
pub enum QuiverError {
    // ─────────────────────────────────────────────────────────────
    // Spec acquisition
    // ─────────────────────────────────────────────────────────────
    #[error("No OpenAPI specification found at '{url}' (direct probing and scraping both failed)")]
    SpecUnavailable { url: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // ─────────────────────────────────────────────────────────────
    // Reference resolution
    // ─────────────────────────────────────────────────────────────
    #[error("Unsupported reference format: {reference}")]
    UnsupportedReference { reference: String },

    #[error("Reference '{reference}' has no matching definition in the specification")]
    UnknownDefinition { reference: String },

    #[error("Reference cycle detected while resolving '{reference}': {chain}")]
    ReferenceCycle { reference: String, chain: String },

    // ─────────────────────────────────────────────────────────────
    // Agent pipeline
    // ─────────────────────────────────────────────────────────────
    #[error("Provider error: {0}")]
    Provider(String),

    // ─────────────────────────────────────────────────────────────
    // Test case execution
    // ─────────────────────────────────────────────────────────────
    #[error("Test case '{name}' has no object-shaped input_json")]
    MalformedInput { name: String },

    #[error("Non-numeric value for input field '{field}' in test case '{name}'")]
    NonNumericInput { name: String, field: String },

    #[error("Model error: {0}")]
    Model(String),

    // ─────────────────────────────────────────────────────────────
    // Parsing and IO
    // ─────────────────────────────────────────────────────────────
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FixSuggestion for QuiverError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            QuiverError::SpecUnavailable { .. } => {
                Some("Check the base URL, or pass the documentation page of a Swagger UI deployment")
            }
            QuiverError::Http(_) => Some("Check network connectivity and the base URL"),
            QuiverError::UnsupportedReference { .. } => {
                Some("Only #/definitions/<Name> and #/components/schemas/<Name> references are supported")
            }
            QuiverError::UnknownDefinition { .. } => {
                Some("The spec references a schema it never defines - verify the document is complete")
            }
            QuiverError::ReferenceCycle { .. } => {
                Some("Break the cycle in the spec's schema definitions")
            }
            QuiverError::Provider(_) => {
                Some("Check the API key env var is set (OPENAI_API_KEY)")
            }
            QuiverError::MalformedInput { .. } => {
                Some("input_json must be a JSON object of field -> numeric value")
            }
            QuiverError::NonNumericInput { .. } => {
                Some("Predictive execution requires numeric (or boolean) input fields")
            }
            QuiverError::Model(_) => Some("Check the model accepts a single-row numeric matrix"),
            QuiverError::JsonParse(_) => Some("Ensure the document is valid JSON (try jq)"),
            QuiverError::YamlParse(_) => Some("Check YAML syntax: indentation and quoting"),
            QuiverError::Io(_) => Some("Check file path and permissions"),
        }
    }
}
