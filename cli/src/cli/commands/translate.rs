use std::path::PathBuf;

use anyhow::Context;
use gembridge_core::config::Config;
use gembridge_core::proxy::common::model_mapping::resolve_model_route;
use gembridge_core::proxy::mappers::{self, models::gemini::GenerateContentRequest};

/// Dry run: translate a request file and print the backend payload.
pub fn run(config: &Config, file: PathBuf, model: String, stream: bool) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {:?}", file))?;
    let request: GenerateContentRequest = serde_json::from_str(&content)
        .with_context(|| format!("{:?} is not a Gemini generateContent request", file))?;

    let model = resolve_model_route(&model, &config.model_mapping.custom);
    let payload = mappers::translate_request(&request, &model, stream);
    tracing::debug!("Translated {} contents into {} messages", request.contents.len(), payload.messages.len());

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}
