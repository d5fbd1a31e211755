//! In-memory store for tests and dry runs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use qcal_types::{CalibrationStatus, Component, ParamValue};
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::{CalibrationStore, components_key, status_key};

type Hash = BTreeMap<String, String>;

/// In-memory state store.
///
/// Keeps the Redis-like layout (`components:{id}` / `status:{id}` hashes of
/// strings) so its behavior matches the persistent stores exactly.
#[derive(Default)]
pub struct MemoryStore {
    hashes: RwLock<FxHashMap<String, Hash>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with parameters.
    pub async fn with_parameters<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Component, String, ParamValue)>,
    {
        let store = Self::new();
        {
            let mut hashes = store.hashes.write().await;
            for (component, field, value) in entries {
                hashes
                    .entry(components_key(&component))
                    .or_default()
                    .insert(field, value.to_stored());
            }
        }
        store
    }

    async fn hget(&self, key: &str, field: &str) -> Option<String> {
        self.hashes
            .read()
            .await
            .get(key)
            .and_then(|h| h.get(field).cloned())
    }

    async fn hset(&self, key: String, field: &str, value: String) {
        self.hashes
            .write()
            .await
            .entry(key)
            .or_default()
            .insert(field.to_string(), value);
    }

    async fn hdel(&self, key: &str, field: &str) -> bool {
        let mut hashes = self.hashes.write().await;
        let Some(hash) = hashes.get_mut(key) else {
            return false;
        };
        let removed = hash.remove(field).is_some();
        if hash.is_empty() {
            hashes.remove(key);
        }
        removed
    }

    async fn hgetall(&self, key: &str) -> Hash {
        self.hashes
            .read()
            .await
            .get(key)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl CalibrationStore for MemoryStore {
    async fn get(&self, component: &Component, field: &str) -> StoreResult<Option<ParamValue>> {
        Ok(self
            .hget(&components_key(component), field)
            .await
            .map(|raw| ParamValue::parse(&raw)))
    }

    async fn set(
        &self,
        component: &Component,
        field: &str,
        value: &ParamValue,
    ) -> StoreResult<()> {
        self.hset(components_key(component), field, value.to_stored())
            .await;
        Ok(())
    }

    async fn delete(&self, component: &Component, field: &str) -> StoreResult<bool> {
        Ok(self.hdel(&components_key(component), field).await)
    }

    async fn fields(&self, component: &Component) -> StoreResult<Vec<(String, ParamValue)>> {
        Ok(self
            .hgetall(&components_key(component))
            .await
            .into_iter()
            .map(|(field, raw)| (field, ParamValue::parse(&raw)))
            .collect())
    }

    async fn get_status(
        &self,
        component: &Component,
        node: &str,
    ) -> StoreResult<CalibrationStatus> {
        let key = status_key(component);
        match self.hget(&key, node).await {
            Some(raw) => raw.parse::<CalibrationStatus>().map_err(|e| StoreError::CorruptEntry {
                key,
                message: format!("{e}"),
            }),
            None => Ok(CalibrationStatus::NotCalibrated),
        }
    }

    async fn set_status(
        &self,
        component: &Component,
        node: &str,
        status: CalibrationStatus,
    ) -> StoreResult<()> {
        self.hset(status_key(component), node, status.as_str().to_string())
            .await;
        Ok(())
    }

    async fn clear_status(&self, component: &Component, node: &str) -> StoreResult<bool> {
        Ok(self.hdel(&status_key(component), node).await)
    }

    async fn statuses(
        &self,
        component: &Component,
    ) -> StoreResult<Vec<(String, CalibrationStatus)>> {
        let key = status_key(component);
        self.hgetall(&key)
            .await
            .into_iter()
            .map(|(node, raw)| {
                raw.parse::<CalibrationStatus>()
                    .map(|status| (node, status))
                    .map_err(|e| StoreError::CorruptEntry {
                        key: key.clone(),
                        message: format!("{e}"),
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_parameters() {
        let store = MemoryStore::new();
        let q1 = Component::qubit("q1");

        assert_eq!(store.get(&q1, "clock_freqs:f01").await.unwrap(), None);

        store
            .set(&q1, "clock_freqs:f01", &ParamValue::Float(4.5e9))
            .await
            .unwrap();
        assert_eq!(
            store.get(&q1, "clock_freqs:f01").await.unwrap(),
            Some(ParamValue::Float(4.5e9))
        );
        assert!(store.exists(&q1, "clock_freqs:f01").await.unwrap());

        assert!(store.delete(&q1, "clock_freqs:f01").await.unwrap());
        assert!(!store.delete(&q1, "clock_freqs:f01").await.unwrap());
    }

    #[tokio::test]
    async fn test_memory_store_status_defaults() {
        let store = MemoryStore::new();
        let q1 = Component::qubit("q1");

        assert_eq!(
            store.get_status(&q1, "rabi_oscillations").await.unwrap(),
            CalibrationStatus::NotCalibrated
        );

        store
            .set_status(&q1, "rabi_oscillations", CalibrationStatus::Calibrated)
            .await
            .unwrap();
        store
            .set_status(&q1, "qubit_01_spectroscopy", CalibrationStatus::Calibrated)
            .await
            .unwrap();

        let statuses = store.statuses(&q1).await.unwrap();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].0, "qubit_01_spectroscopy");

        assert!(store.clear_status(&q1, "rabi_oscillations").await.unwrap());
        assert_eq!(
            store.get_status(&q1, "rabi_oscillations").await.unwrap(),
            CalibrationStatus::NotCalibrated
        );
    }

    #[tokio::test]
    async fn test_memory_store_prepopulated() {
        let q1 = Component::qubit("q1");
        let store = MemoryStore::with_parameters([(
            q1.clone(),
            "t1_time".to_string(),
            ParamValue::Float(5e-6),
        )])
        .await;

        let fields = store.fields(&q1).await.unwrap();
        assert_eq!(fields, vec![("t1_time".to_string(), ParamValue::Float(5e-6))]);
        assert!(store.fields(&Component::qubit("q2")).await.unwrap().is_empty());
    }
}
