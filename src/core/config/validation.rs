use serde_json::{Map, Value};

use crate::core::errors::RagError;

pub fn validate_config(config: &Value) -> Result<(), RagError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(documents) = expect_optional_object(root, "documents")? {
        validate_required_string_field(documents, "documents.dir", "dir")?;
        validate_u64_field(
            documents,
            "documents.max_file_bytes",
            "max_file_bytes",
            1,
            1_000_000_000,
        )?;
    }

    if let Some(store) = expect_optional_object(root, "store")? {
        validate_required_string_field(store, "store.path", "path")?;
        validate_required_string_field(store, "store.collection", "collection")?;
    }

    if let Some(chunking) = expect_optional_object(root, "chunking")? {
        validate_u64_field(chunking, "chunking.chunk_size", "chunk_size", 16, 100_000)?;
        validate_u64_field(
            chunking,
            "chunking.chunk_overlap",
            "chunk_overlap",
            0,
            100_000,
        )?;
        let size = chunking.get("chunk_size").and_then(Value::as_u64);
        let overlap = chunking.get("chunk_overlap").and_then(Value::as_u64);
        if let (Some(size), Some(overlap)) = (size, overlap) {
            if overlap >= size {
                return Err(RagError::Configuration(
                    "Invalid config at 'chunking.chunk_overlap': must be smaller than chunk_size"
                        .to_string(),
                ));
            }
        }
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(retrieval, "retrieval.top_k", "top_k", 1, 100)?;
        validate_u64_field(
            retrieval,
            "retrieval.max_context_chars",
            "max_context_chars",
            1,
            1_000_000,
        )?;
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        validate_choice_field(
            embedding,
            "embedding.provider",
            "provider",
            &["local", "remote"],
        )?;
        validate_u64_field(embedding, "embedding.dimension", "dimension", 8, 8192)?;
        validate_optional_string_field(embedding, "embedding.model", "model")?;
        validate_optional_string_field(embedding, "embedding.base_url", "base_url")?;
        validate_optional_string_field(embedding, "embedding.api_key_env", "api_key_env")?;
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        validate_required_string_field(llm, "llm.provider", "provider")?;
        validate_required_string_field(llm, "llm.model", "model")?;
        validate_required_string_field(llm, "llm.base_url", "base_url")?;
        validate_required_string_field(llm, "llm.api_key_env", "api_key_env")?;
        validate_optional_string_field(llm, "llm.api_key", "api_key")?;
        validate_f64_field(llm, "llm.temperature", "temperature", 0.0, 2.0)?;
        validate_u64_field(llm, "llm.max_tokens", "max_tokens", 1, 1_000_000)?;
        validate_u64_field(
            llm,
            "llm.request_timeout_secs",
            "request_timeout_secs",
            1,
            86_400,
        )?;
    }

    if let Some(agent) = expect_optional_object(root, "agent")? {
        validate_required_string_field(agent, "agent.name", "name")?;
        validate_optional_string_field(agent, "agent.system_message", "system_message")?;
    }

    if let Some(pipeline) = expect_optional_object(root, "pipeline")? {
        validate_u64_field(pipeline, "pipeline.timeout_secs", "timeout_secs", 1, 86_400)?;
        // A first run over an empty collection takes five steps.
        validate_u64_field(pipeline, "pipeline.max_steps", "max_steps", 5, 1_000)?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, RagError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(RagError::Configuration(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() {
        return Ok(());
    }
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(RagError::Configuration(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_required_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), RagError> {
    let value = section.get(key).ok_or_else(|| {
        RagError::Configuration(format!("Invalid config at '{}': value is required", path))
    })?;
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(RagError::Configuration(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_choice_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    choices: &[&str],
) -> Result<(), RagError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if choices.contains(&text) {
        return Ok(());
    }
    Err(RagError::Configuration(format!(
        "Invalid config at '{}': expected one of {}",
        path,
        choices.join(", ")
    )))
}

fn config_type_error(path: &str, expected: &str) -> RagError {
    RagError::Configuration(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::defaults::default_config;
    use serde_json::json;

    #[test]
    fn defaults_are_valid() {
        validate_config(&default_config()).unwrap();
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let config = json!({ "chunking": { "chunk_size": 100, "chunk_overlap": 100 } });
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("chunking.chunk_overlap"));
    }

    #[test]
    fn rejects_unknown_embedding_provider() {
        let config = json!({ "embedding": { "provider": "quantum" } });
        assert!(matches!(
            validate_config(&config),
            Err(RagError::Configuration(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_timeout() {
        let config = json!({ "pipeline": { "timeout_secs": 0 } });
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("pipeline.timeout_secs"));
    }

    #[test]
    fn step_budget_must_fit_a_first_run() {
        let config = json!({ "pipeline": { "max_steps": 4 } });
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("pipeline.max_steps"));

        validate_config(&json!({ "pipeline": { "max_steps": 5 } })).unwrap();
    }

    #[test]
    fn rejects_non_object_sections() {
        let config = json!({ "llm": "groq" });
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("expected object"));
    }
}
