//! Dataset loading and control construction for the CLI host

use anyhow::{anyhow, Context, Result};
use pickr_core::{FieldAdapter, InMemorySource, RawEntity, SelectBuilder, SelectConfig, SelectHandle};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Where the entities come from and how to read them
#[derive(Debug, Clone)]
pub struct DataOptions {
    /// JSON file holding an array of entities; a built-in list when unset
    pub path: Option<PathBuf>,
    pub id_field: String,
    pub text_field: String,
    /// Simulated backend latency
    pub latency: Option<Duration>,
}

impl Default for DataOptions {
    fn default() -> Self {
        Self {
            path: None,
            id_field: "id".to_string(),
            text_field: "text".to_string(),
            latency: None,
        }
    }
}

impl DataOptions {
    /// Load the entities and start a control over them
    pub async fn spawn_control(&self, config: SelectConfig) -> Result<SelectHandle> {
        let entities = match &self.path {
            Some(path) => load_entities(path).await?,
            None => sample_entities(),
        };
        debug!(count = entities.len(), "Dataset ready");

        let mut source =
            InMemorySource::with_fields(entities, self.id_field.clone(), self.text_field.clone());
        if let Some(latency) = self.latency {
            source = source.with_latency(latency);
        }
        let source = Arc::new(source);

        let handle = SelectBuilder::new(config, source.clone())
            .with_lookup(source)
            .with_adapter(Arc::new(FieldAdapter::new(
                self.id_field.clone(),
                self.text_field.clone(),
            )))
            .spawn()?;
        Ok(handle)
    }
}

/// Read a JSON array of entities from `path`
pub async fn load_entities(path: &Path) -> Result<Vec<RawEntity>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read data file: {}", path.display()))?;

    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse data file: {}", path.display()))?;

    match value {
        serde_json::Value::Array(entities) => Ok(entities),
        _ => Err(anyhow!(
            "Data file must contain a JSON array of entities: {}",
            path.display()
        )),
    }
}

/// Built-in entities used when no data file is given
pub fn sample_entities() -> Vec<RawEntity> {
    [
        "Argentina",
        "Australia",
        "Austria",
        "Belgium",
        "Brazil",
        "Canada",
        "Chile",
        "Denmark",
        "Finland",
        "France",
        "Germany",
        "Greece",
        "Iceland",
        "India",
        "Ireland",
        "Italy",
        "Japan",
        "Mexico",
        "Netherlands",
        "New Zealand",
        "Norway",
        "Portugal",
        "Spain",
        "Sweden",
        "Switzerland",
    ]
    .iter()
    .enumerate()
    .map(|(index, name)| json!({"id": index + 1, "text": name}))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_entities_requires_array() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.json");
        let bad = dir.path().join("bad.json");
        std::fs::write(&good, r#"[{"id": 1, "text": "One"}]"#).unwrap();
        std::fs::write(&bad, r#"{"id": 1}"#).unwrap();

        assert_eq!(load_entities(&good).await.unwrap().len(), 1);
        assert!(load_entities(&bad).await.is_err());
    }

    #[test]
    fn test_sample_entities_have_unique_ids() {
        let entities = sample_entities();
        let mut ids: Vec<_> = entities.iter().map(|e| e["id"].as_u64()).collect();
        ids.dedup();

        assert_eq!(ids.len(), entities.len());
        assert_eq!(entities[0]["text"], "Argentina");
    }

    #[tokio::test]
    async fn test_spawn_control_with_custom_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, r#"[{"code": "de", "name": "Germany"}]"#).unwrap();

        let options = DataOptions {
            path: Some(path),
            id_field: "code".to_string(),
            text_field: "name".to_string(),
            latency: None,
        };
        let handle = options
            .spawn_control(SelectConfig::new().with_reference_mode(pickr_core::ReferenceMode::Id))
            .await
            .unwrap();

        handle
            .write_value(Some(pickr_core::ExternalValue::One(json!("de"))))
            .await
            .unwrap();
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.selected_texts(), vec!["Germany"]);
    }
}
