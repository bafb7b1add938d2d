//! Model name routing
//!
//! Client-facing Gemini model ids are rewritten to ids the backend serves.
//! Config-supplied custom mappings take precedence over the built-in table.

use std::collections::HashMap;

/// Built-in aliases for Gemini variants the backend does not serve directly
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("gemini-2.5-flash", "gemini-2.0-flash-001"),
    ("gemini-2.0-flash", "gemini-2.0-flash-001"),
    ("gemini-2.5-flash-lite", "gemini-2.0-flash-001"),
];

/// Apply the built-in alias table; unknown names pass through unchanged
pub fn map_builtin_model(model: &str) -> String {
    BUILTIN_ALIASES
        .iter()
        .find(|(from, _)| *from == model)
        .map(|(_, to)| to.to_string())
        .unwrap_or_else(|| model.to_string())
}

/// Strip a `models/` prefix and apply the custom mapping.
///
/// The result still goes through [`map_builtin_model`] during translation.
pub fn resolve_model_route(model: &str, custom_mapping: &HashMap<String, String>) -> String {
    let model = model.trim();
    let model = model.strip_prefix("models/").unwrap_or(model);
    custom_mapping
        .get(model)
        .cloned()
        .unwrap_or_else(|| model.to_string())
}
