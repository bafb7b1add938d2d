//! Tool declarations and tool-choice policy

use serde_json::{json, Value};

use super::super::models::gemini::{ContentEntry, FunctionDeclaration, Part, Tool as GeminiTool, ToolConfig};
use super::super::models::openai::{Tool, ToolChoice};

pub const WEB_SEARCH_TOOL_NAME: &str = "google_web_search";

fn empty_object_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

fn web_search_tool() -> Tool {
    Tool::function(
        WEB_SEARCH_TOOL_NAME,
        Some(
            "Performs a web search using Google Search (via the Gemini API) and returns the results. \
             This tool is useful for finding information on the internet based on a query."
                .to_string(),
        ),
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query to find information on the web."
                }
            },
            "required": ["query"]
        }),
    )
}

fn declared_name(decl: &FunctionDeclaration) -> Option<&str> {
    decl.name.as_str().filter(|name| !name.trim().is_empty())
}

/// Convert Gemini tool declarations to OpenAI function tools.
///
/// `googleSearch` becomes a synthetic `google_web_search` function;
/// `urlContext` has no backend equivalent and is dropped. Returns `None`
/// rather than an empty list.
pub fn translate_tools(tools: Option<&[GeminiTool]>) -> Option<Vec<Tool>> {
    let mut out = Vec::new();

    for tool in tools.unwrap_or_default() {
        for decl in tool.function_declarations.iter().flatten() {
            let Some(name) = declared_name(decl) else {
                tracing::warn!("Skipping function declaration without a usable name");
                continue;
            };
            let parameters = decl
                .parameters_json_schema
                .clone()
                .or_else(|| decl.parameters.clone())
                .unwrap_or_else(empty_object_schema);
            out.push(Tool::function(name, decl.description.clone(), parameters));
        }

        if tool.google_search.is_some() {
            out.push(web_search_tool());
        }

        if tool.url_context.is_some() {
            tracing::debug!("Dropping unsupported urlContext tool");
        }
    }

    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// AUTO -> auto, ANY -> required, NONE -> none
pub fn translate_tool_choice(config: Option<&ToolConfig>) -> Option<ToolChoice> {
    let mode = config?.function_calling_config.as_ref()?.mode.as_deref()?;
    match mode {
        "AUTO" => Some(ToolChoice::Auto),
        "ANY" => Some(ToolChoice::Required),
        "NONE" => Some(ToolChoice::None),
        _ => None,
    }
}

/// Minimal manifest for histories that already contain function calls but
/// came without tool declarations; the backend rejects tool-call history
/// with no tools defined.
pub fn synthesize_tools(contents: &[ContentEntry]) -> Option<Vec<Tool>> {
    let mut names: Vec<&str> = Vec::new();

    for entry in contents {
        let ContentEntry::Turn(turn) = entry else {
            continue;
        };
        for part in &turn.parts {
            if let Part::FunctionCall { function_call } = part {
                let name = function_call.name.as_str();
                if !name.is_empty() && !names.contains(&name) {
                    names.push(name);
                }
            }
        }
    }

    if names.is_empty() {
        return None;
    }
    Some(
        names
            .into_iter()
            .map(|name| Tool::function(name, None, empty_object_schema()))
            .collect(),
    )
}

/// Explicit declarations win; synthesis only when none survive translation.
pub fn select_tools(tools: Option<&[GeminiTool]>, contents: &[ContentEntry]) -> Option<Vec<Tool>> {
    translate_tools(tools).or_else(|| synthesize_tools(contents))
}
