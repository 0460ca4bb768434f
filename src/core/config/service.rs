use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::defaults::default_config;
use super::paths::AppPaths;
use super::settings::AppConfig;
use super::validation::validate_config;
use crate::core::errors::RagError;

const REDACT_PLACEHOLDER: &str = "****";

/// Environment variables with this prefix override config keys, using `__`
/// between path segments: `RAGBOT_LLM__MODEL=llama3-70b-8192`.
const ENV_OVERRIDE_PREFIX: &str = "RAGBOT_";

const SENSITIVE_PATTERNS: [&str; 8] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "token_",
    "credential",
    "private_key",
    "bearer",
];

const SENSITIVE_WHITELIST: [&str; 3] = ["api_key_env", "max_tokens", "tokens"];

/// Env vars with the override prefix that are not config keys.
const RESERVED_ENV: [&str; 3] = ["RAGBOT_ROOT", "RAGBOT_DATA_DIR", "RAGBOT_CONFIG_PATH"];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("RAGBOT_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.user_data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Defaults, then `config.yml`, then `secrets.yaml`, then `RAGBOT_*` vars.
    pub fn load_config(&self) -> Result<Value, RagError> {
        let public_config = load_yaml_file(&self.config_path());
        let secrets_config = load_yaml_file(&self.secrets_path());
        let merged = deep_merge(&default_config(), &public_config);
        let mut merged = deep_merge(&merged, &secrets_config);
        apply_env_overrides(&mut merged, env::vars());
        validate_config(&merged)?;
        Ok(merged)
    }

    pub fn load(&self) -> Result<AppConfig, RagError> {
        let value = self.load_config()?;
        tracing::debug!(
            config = %self.redact_sensitive_values(&value),
            "Loaded configuration"
        );
        AppConfig::from_value(value)
    }

    pub fn redact_sensitive_values(&self, value: &Value) -> Value {
        redact_sensitive_values(value)
    }
}

fn load_yaml_file(path: &Path) -> Value {
    if !path.exists() {
        return Value::Object(Map::new());
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<Value>(&contents) {
            Ok(value) => match value {
                Value::Object(_) => value,
                _ => Value::Object(Map::new()),
            },
            Err(e) => {
                tracing::warn!("Ignoring malformed config {}: {}", path.display(), e);
                Value::Object(Map::new())
            }
        },
        Err(e) => {
            tracing::warn!("Failed to read config {}: {}", path.display(), e);
            Value::Object(Map::new())
        }
    }
}

fn apply_env_overrides(config: &mut Value, vars: impl IntoIterator<Item = (String, String)>) {
    for (name, raw) in vars {
        if RESERVED_ENV.contains(&name.as_str()) {
            continue;
        }
        let Some(path) = name.strip_prefix(ENV_OVERRIDE_PREFIX) else {
            continue;
        };
        let segments: Vec<String> = path
            .split("__")
            .map(|segment| segment.to_lowercase())
            .filter(|segment| !segment.is_empty())
            .collect();
        if segments.is_empty() {
            continue;
        }

        // Numbers and booleans arrive as strings; keep anything else verbatim.
        let value = match serde_json::from_str::<Value>(&raw) {
            Ok(parsed @ (Value::Number(_) | Value::Bool(_))) => parsed,
            _ => Value::String(raw),
        };
        set_path(config, &segments, value);
    }
}

fn set_path(target: &mut Value, segments: &[String], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut current = target;
    for segment in parents {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Some(map) = current.as_object_mut() else {
            return;
        };
        current = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Some(map) = current.as_object_mut() {
        map.insert(last.clone(), value);
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, val) in map {
                if is_sensitive_key(key) && !val.is_null() {
                    redacted.insert(key.clone(), Value::String(REDACT_PLACEHOLDER.to_string()));
                } else {
                    redacted.insert(key.clone(), redact_sensitive_values(val));
                }
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lower = key.to_lowercase();
    if SENSITIVE_WHITELIST
        .iter()
        .any(|allowed| *allowed == key_lower)
    {
        return false;
    }
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| key_lower.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deep_merge_merges_objects_and_overrides_scalars() {
        let base = json!({
            "a": 1,
            "b": { "c": 2, "d": 3 },
            "arr": [1, 2]
        });
        let override_value = json!({
            "b": { "c": 99 },
            "arr": [3],
            "e": "x"
        });

        let merged = deep_merge(&base, &override_value);

        assert_eq!(
            merged,
            json!({
                "a": 1,
                "b": { "c": 99, "d": 3 },
                "arr": [3],
                "e": "x"
            })
        );
    }

    #[test]
    fn env_overrides_set_nested_keys_with_typed_values() {
        let mut config = json!({ "llm": { "model": "a" }, "pipeline": { "timeout_secs": 10 } });
        let vars = vec![
            ("RAGBOT_LLM__MODEL".to_string(), "llama3-70b-8192".to_string()),
            ("RAGBOT_PIPELINE__TIMEOUT_SECS".to_string(), "30".to_string()),
            ("RAGBOT_AGENT__SYSTEM_MESSAGE".to_string(), "You are a RAG chatbot".to_string()),
            ("RAGBOT_DATA_DIR".to_string(), "/tmp/ignored".to_string()),
            ("HOME".to_string(), "/root".to_string()),
        ];

        apply_env_overrides(&mut config, vars);

        assert_eq!(
            config,
            json!({
                "llm": { "model": "llama3-70b-8192" },
                "pipeline": { "timeout_secs": 30 },
                "agent": { "system_message": "You are a RAG chatbot" }
            })
        );
    }

    #[test]
    fn redact_sensitive_values_replaces_secrets_only() {
        let input = json!({
            "llm": {
                "api_key": "gsk_secret",
                "api_key_env": "GROQ_API_KEY",
                "max_tokens": 42
            }
        });

        let redacted = redact_sensitive_values(&input);

        assert_eq!(
            redacted,
            json!({
                "llm": {
                    "api_key": "****",
                    "api_key_env": "GROQ_API_KEY",
                    "max_tokens": 42
                }
            })
        );
    }

    #[test]
    fn load_merges_yaml_files_over_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = Arc::new(AppPaths::with_root(tmp.path()));
        fs::write(
            tmp.path().join("config.yml"),
            "store:\n  collection: notes\nretrieval:\n  top_k: 5\n",
        )
        .unwrap();
        fs::write(&paths.secrets_path, "llm:\n  api_key: gsk_from_file\n").unwrap();

        let service = ConfigService::new(paths);
        let config = service.load().unwrap();

        assert_eq!(config.store.collection, "notes");
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.llm.api_key.as_deref(), Some("gsk_from_file"));
    }

    #[test]
    fn malformed_yaml_falls_back_to_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("broken.yml");
        fs::write(&path, "store: [unclosed").unwrap();

        assert_eq!(load_yaml_file(&path), json!({}));
    }
}
