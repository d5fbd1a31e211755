//! Calibration state persistence.
//!
//! The [`CalibrationStore`] trait is the single mutable resource shared by
//! a calibration run. It holds two logical namespaces:
//!
//! ```text
//!   components:{id} -> { field: value }
//!   status:{id}     -> { node: "calibrated" | "not_calibrated" }
//! ```
//!
//! Writes take effect immediately; there are no transactions. Callers order
//! their writes (backup before overwrite) themselves.
//!
//! | Store | Medium | Use |
//! |-------|--------|-----|
//! | [`MemoryStore`] | process memory | tests, dry runs |
//! | [`SqliteStore`] | SQLite file | production |
//! | [`JsonStore`] | single JSON document | development, inspection by hand |
//!
//! # Example
//!
//! ```ignore
//! use qcal_store::{CalibrationStore, MemoryStore};
//! use qcal_types::{Component, ParamValue};
//!
//! let store = MemoryStore::new();
//! let q1 = Component::qubit("q1");
//! store.set(&q1, "t1_time", &ParamValue::Float(5e-6)).await?;
//! assert!(store.backup_field(&q1, "t1_time").await?);
//! assert!(store.get(&q1, "t1_time").await?.unwrap().is_nan_sentinel());
//! ```

pub mod error;
mod json_store;
mod memory_store;
mod sqlite_store;

pub use error::{StoreError, StoreResult};
pub use json_store::JsonStore;
pub use memory_store::MemoryStore;
pub use sqlite_store::SqliteStore;

use async_trait::async_trait;
use qcal_types::{CalibrationStatus, Component, ParamValue};

/// Suffix of the shadow field holding a superseded value.
pub const BACKUP_SUFFIX: &str = "_backup";

/// Name of the shadow field for `field`.
pub fn backup_key(field: &str) -> String {
    format!("{field}{BACKUP_SUFFIX}")
}

/// Key of a component's parameter hash.
pub fn components_key(component: &Component) -> String {
    format!("components:{component}")
}

/// Key of a component's status hash.
pub fn status_key(component: &Component) -> String {
    format!("status:{component}")
}

/// Trait for calibration state storage.
///
/// A missing field reads as `None`, never as an error, so callers can apply
/// defaults. A missing status reads as [`CalibrationStatus::NotCalibrated`].
#[async_trait]
pub trait CalibrationStore: Send + Sync {
    /// Read a parameter.
    async fn get(&self, component: &Component, field: &str) -> StoreResult<Option<ParamValue>>;

    /// Write a parameter.
    async fn set(&self, component: &Component, field: &str, value: &ParamValue)
    -> StoreResult<()>;

    /// Remove a parameter. Returns whether it existed.
    async fn delete(&self, component: &Component, field: &str) -> StoreResult<bool>;

    /// All parameters of a component, sorted by field name.
    async fn fields(&self, component: &Component) -> StoreResult<Vec<(String, ParamValue)>>;

    /// Read the status of a `(component, node)` pair.
    async fn get_status(&self, component: &Component, node: &str)
    -> StoreResult<CalibrationStatus>;

    /// Write the status of a `(component, node)` pair.
    async fn set_status(
        &self,
        component: &Component,
        node: &str,
        status: CalibrationStatus,
    ) -> StoreResult<()>;

    /// Forget the status of a `(component, node)` pair. Returns whether it existed.
    async fn clear_status(&self, component: &Component, node: &str) -> StoreResult<bool>;

    /// All recorded node statuses of a component, sorted by node name.
    async fn statuses(&self, component: &Component)
    -> StoreResult<Vec<(String, CalibrationStatus)>>;

    /// Check if a parameter exists.
    async fn exists(&self, component: &Component, field: &str) -> StoreResult<bool> {
        Ok(self.get(component, field).await?.is_some())
    }

    /// Write a parameter only if it is absent. Returns whether it was written.
    async fn set_default(
        &self,
        component: &Component,
        field: &str,
        value: &ParamValue,
    ) -> StoreResult<bool> {
        if self.exists(component, field).await? {
            return Ok(false);
        }
        self.set(component, field, value).await?;
        Ok(true)
    }

    /// Snapshot a field into its `_backup` shadow and mark it as being
    /// recalibrated with the NaN sentinel.
    ///
    /// Returns `false` (and writes nothing) when the field does not exist.
    async fn backup_field(&self, component: &Component, field: &str) -> StoreResult<bool> {
        let Some(current) = self.get(component, field).await? else {
            return Ok(false);
        };
        self.set(component, &backup_key(field), &current).await?;
        self.set(component, field, &ParamValue::nan()).await?;
        Ok(true)
    }

    /// Check if a backup shadow exists for a field.
    async fn has_backup(&self, component: &Component, field: &str) -> StoreResult<bool> {
        self.exists(component, &backup_key(field)).await
    }

    /// Copy the `_backup` shadow back into the live field and drop the shadow.
    ///
    /// Returns `false` when no backup exists. Never called automatically by
    /// the supervisor.
    async fn restore_backup(&self, component: &Component, field: &str) -> StoreResult<bool> {
        let key = backup_key(field);
        let Some(saved) = self.get(component, &key).await? else {
            return Ok(false);
        };
        self.set(component, field, &saved).await?;
        self.delete(component, &key).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys() {
        let q = Component::qubit("q1");
        assert_eq!(backup_key("t1_time"), "t1_time_backup");
        assert_eq!(components_key(&q), "components:q1");
        assert_eq!(status_key(&q), "status:q1");
    }

    #[tokio::test]
    async fn test_backup_and_restore() {
        let store = MemoryStore::new();
        let q1 = Component::qubit("q1");
        store
            .set(&q1, "t1_time", &ParamValue::Float(5e-6))
            .await
            .unwrap();

        assert!(store.backup_field(&q1, "t1_time").await.unwrap());
        assert_eq!(
            store.get(&q1, "t1_time_backup").await.unwrap(),
            Some(ParamValue::Float(5e-6))
        );
        let live = store.get(&q1, "t1_time").await.unwrap().unwrap();
        assert_eq!(live.to_stored(), "nan");

        assert!(store.restore_backup(&q1, "t1_time").await.unwrap());
        assert_eq!(
            store.get(&q1, "t1_time").await.unwrap(),
            Some(ParamValue::Float(5e-6))
        );
        assert!(!store.has_backup(&q1, "t1_time").await.unwrap());
    }

    #[tokio::test]
    async fn test_backup_missing_field_is_noop() {
        let store = MemoryStore::new();
        let q1 = Component::qubit("q1");
        assert!(!store.backup_field(&q1, "t1_time").await.unwrap());
        assert!(!store.exists(&q1, "t1_time").await.unwrap());
        assert!(!store.has_backup(&q1, "t1_time").await.unwrap());
        assert!(!store.restore_backup(&q1, "t1_time").await.unwrap());
    }

    #[tokio::test]
    async fn test_set_default_never_overwrites() {
        let store = MemoryStore::new();
        let q1 = Component::qubit("q1");
        assert!(store
            .set_default(&q1, "rxy:amp180", &ParamValue::Float(0.1))
            .await
            .unwrap());
        store
            .set(&q1, "rxy:amp180", &ParamValue::Float(0.42))
            .await
            .unwrap();
        assert!(!store
            .set_default(&q1, "rxy:amp180", &ParamValue::Float(0.1))
            .await
            .unwrap());
        assert_eq!(
            store.get(&q1, "rxy:amp180").await.unwrap(),
            Some(ParamValue::Float(0.42))
        );
    }
}
