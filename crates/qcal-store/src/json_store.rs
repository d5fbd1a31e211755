//! JSON file-based persistence for development and testing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use qcal_types::{CalibrationStatus, Component, ParamValue};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;

use crate::CalibrationStore;
use crate::error::{StoreError, StoreResult};

/// On-disk document layout.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    components: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default)]
    status: BTreeMap<String, BTreeMap<String, CalibrationStatus>>,
}

/// JSON file-based calibration store.
///
/// Keeps the whole state in memory and rewrites a single pretty-printed
/// document after every change. Suitable for development and for editing
/// calibration values by hand, not recommended for production use.
pub struct JsonStore {
    path: PathBuf,
    doc: RwLock<Document>,
}

impl JsonStore {
    /// Open (or create) a JSON store at the given file path.
    pub async fn new(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let doc = match fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Document::default(),
            Err(e) => return Err(StoreError::IoError(e)),
        };

        Ok(Self {
            path,
            doc: RwLock::new(doc),
        })
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, doc: &Document) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(doc)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl CalibrationStore for JsonStore {
    async fn get(&self, component: &Component, field: &str) -> StoreResult<Option<ParamValue>> {
        let doc = self.doc.read().await;
        Ok(doc
            .components
            .get(component.as_str())
            .and_then(|fields| fields.get(field))
            .map(|raw| ParamValue::parse(raw)))
    }

    async fn set(
        &self,
        component: &Component,
        field: &str,
        value: &ParamValue,
    ) -> StoreResult<()> {
        let mut doc = self.doc.write().await;
        doc.components
            .entry(component.to_string())
            .or_default()
            .insert(field.to_string(), value.to_stored());
        self.flush(&doc).await
    }

    async fn delete(&self, component: &Component, field: &str) -> StoreResult<bool> {
        let mut doc = self.doc.write().await;
        let removed = doc
            .components
            .get_mut(component.as_str())
            .is_some_and(|fields| fields.remove(field).is_some());
        if removed {
            self.flush(&doc).await?;
        }
        Ok(removed)
    }

    async fn fields(&self, component: &Component) -> StoreResult<Vec<(String, ParamValue)>> {
        let doc = self.doc.read().await;
        Ok(doc
            .components
            .get(component.as_str())
            .map(|fields| {
                fields
                    .iter()
                    .map(|(k, raw)| (k.clone(), ParamValue::parse(raw)))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_status(
        &self,
        component: &Component,
        node: &str,
    ) -> StoreResult<CalibrationStatus> {
        let doc = self.doc.read().await;
        Ok(doc
            .status
            .get(component.as_str())
            .and_then(|nodes| nodes.get(node))
            .copied()
            .unwrap_or_default())
    }

    async fn set_status(
        &self,
        component: &Component,
        node: &str,
        status: CalibrationStatus,
    ) -> StoreResult<()> {
        let mut doc = self.doc.write().await;
        doc.status
            .entry(component.to_string())
            .or_default()
            .insert(node.to_string(), status);
        self.flush(&doc).await
    }

    async fn clear_status(&self, component: &Component, node: &str) -> StoreResult<bool> {
        let mut doc = self.doc.write().await;
        let removed = doc
            .status
            .get_mut(component.as_str())
            .is_some_and(|nodes| nodes.remove(node).is_some());
        if removed {
            self.flush(&doc).await?;
        }
        Ok(removed)
    }

    async fn statuses(
        &self,
        component: &Component,
    ) -> StoreResult<Vec<(String, CalibrationStatus)>> {
        let doc = self.doc.read().await;
        Ok(doc
            .status
            .get(component.as_str())
            .map(|nodes| nodes.iter().map(|(k, s)| (k.clone(), *s)).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_json_store_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("calibration.json");
        let q1 = Component::qubit("q1");

        {
            let store = JsonStore::new(&path).await.unwrap();
            store
                .set(&q1, "clock_freqs:readout", &ParamValue::Float(6.9e9))
                .await
                .unwrap();
            store
                .set_status(&q1, "resonator_spectroscopy", CalibrationStatus::Calibrated)
                .await
                .unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"calibrated\""));

        let store = JsonStore::new(&path).await.unwrap();
        assert_eq!(
            store.get(&q1, "clock_freqs:readout").await.unwrap(),
            Some(ParamValue::Float(6.9e9))
        );
        assert!(store
            .get_status(&q1, "resonator_spectroscopy")
            .await
            .unwrap()
            .is_calibrated());
    }

    #[tokio::test]
    async fn test_json_store_clear_status() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().join("calibration.json"))
            .await
            .unwrap();
        let q1 = Component::qubit("q1");

        assert!(!store.clear_status(&q1, "t1").await.unwrap());
        store
            .set_status(&q1, "t1", CalibrationStatus::Calibrated)
            .await
            .unwrap();
        assert!(store.clear_status(&q1, "t1").await.unwrap());
        assert!(store.statuses(&q1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_json_store_rejects_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            JsonStore::new(&path).await,
            Err(StoreError::JsonError(_))
        ));
    }
}
