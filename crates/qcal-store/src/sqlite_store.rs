//! SQLite-based persistence for production use.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use qcal_types::{CalibrationStatus, Component, ParamValue};
use rusqlite::{Connection, OptionalExtension};

use crate::CalibrationStore;
use crate::error::{StoreError, StoreResult};

/// SQLite-based calibration store.
///
/// Parameters live in `components (component, field, value)` and statuses
/// in `status (component, node, status)`, both keyed by their first two
/// columns so every write is an atomic per-field upsert.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Create a new SQLite store at the given path.
    pub fn new(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            StoreError::Unreachable(format!("cannot open {}: {e}", path.display()))
        })?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema_sync()?;
        Ok(store)
    }

    /// Create a new in-memory SQLite store.
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema_sync()?;
        Ok(store)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))
    }

    fn init_schema_sync(&self) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            PRAGMA busy_timeout=10000;

            CREATE TABLE IF NOT EXISTS components (
                component TEXT NOT NULL,
                field TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (component, field)
            );

            CREATE TABLE IF NOT EXISTS status (
                component TEXT NOT NULL,
                node TEXT NOT NULL,
                status TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (component, node)
            );
            "#,
        )?;
        Ok(())
    }
}

fn decode_status(component: &Component, raw: &str) -> StoreResult<CalibrationStatus> {
    raw.parse::<CalibrationStatus>()
        .map_err(|e| StoreError::CorruptEntry {
            key: crate::status_key(component),
            message: e.to_string(),
        })
}

#[async_trait]
impl CalibrationStore for SqliteStore {
    async fn get(&self, component: &Component, field: &str) -> StoreResult<Option<ParamValue>> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM components WHERE component = ?1 AND field = ?2",
                rusqlite::params![component.as_str(), field],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.map(|r| ParamValue::parse(&r)))
    }

    async fn set(
        &self,
        component: &Component,
        field: &str,
        value: &ParamValue,
    ) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO components (component, field, value, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            rusqlite::params![
                component.as_str(),
                field,
                value.to_stored(),
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn delete(&self, component: &Component, field: &str) -> StoreResult<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM components WHERE component = ?1 AND field = ?2",
            rusqlite::params![component.as_str(), field],
        )?;
        Ok(deleted > 0)
    }

    async fn fields(&self, component: &Component) -> StoreResult<Vec<(String, ParamValue)>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT field, value FROM components WHERE component = ?1 ORDER BY field")?;
        let mut rows = stmt.query(rusqlite::params![component.as_str()])?;

        let mut fields = Vec::new();
        while let Some(row) = rows.next()? {
            let field: String = row.get(0)?;
            let raw: String = row.get(1)?;
            fields.push((field, ParamValue::parse(&raw)));
        }
        Ok(fields)
    }

    async fn get_status(
        &self,
        component: &Component,
        node: &str,
    ) -> StoreResult<CalibrationStatus> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT status FROM status WHERE component = ?1 AND node = ?2",
                rusqlite::params![component.as_str(), node],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(raw) => decode_status(component, &raw),
            None => Ok(CalibrationStatus::NotCalibrated),
        }
    }

    async fn set_status(
        &self,
        component: &Component,
        node: &str,
        status: CalibrationStatus,
    ) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO status (component, node, status, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            rusqlite::params![
                component.as_str(),
                node,
                status.as_str(),
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn clear_status(&self, component: &Component, node: &str) -> StoreResult<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM status WHERE component = ?1 AND node = ?2",
            rusqlite::params![component.as_str(), node],
        )?;
        Ok(deleted > 0)
    }

    async fn statuses(
        &self,
        component: &Component,
    ) -> StoreResult<Vec<(String, CalibrationStatus)>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT node, status FROM status WHERE component = ?1 ORDER BY node")?;
        let mut rows = stmt.query(rusqlite::params![component.as_str()])?;

        let mut statuses = Vec::new();
        while let Some(row) = rows.next()? {
            let node: String = row.get(0)?;
            let raw: String = row.get(1)?;
            statuses.push((node, decode_status(component, &raw)?));
        }
        Ok(statuses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_store_basic() {
        let store = SqliteStore::in_memory().unwrap();
        let q1 = Component::qubit("q1");

        store
            .set(&q1, "rxy:amp180", &ParamValue::Float(0.31))
            .await
            .unwrap();
        assert_eq!(
            store.get(&q1, "rxy:amp180").await.unwrap(),
            Some(ParamValue::Float(0.31))
        );

        // Upsert
        store
            .set(&q1, "rxy:amp180", &ParamValue::Float(0.29))
            .await
            .unwrap();
        assert_eq!(store.fields(&q1).await.unwrap().len(), 1);

        assert!(store.delete(&q1, "rxy:amp180").await.unwrap());
        assert_eq!(store.get(&q1, "rxy:amp180").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sqlite_store_status() {
        let store = SqliteStore::in_memory().unwrap();
        let q1 = Component::qubit("q1");

        assert_eq!(
            store.get_status(&q1, "t1").await.unwrap(),
            CalibrationStatus::NotCalibrated
        );
        store
            .set_status(&q1, "t1", CalibrationStatus::Calibrated)
            .await
            .unwrap();
        assert!(store.get_status(&q1, "t1").await.unwrap().is_calibrated());
        assert_eq!(
            store.statuses(&q1).await.unwrap(),
            vec![("t1".to_string(), CalibrationStatus::Calibrated)]
        );
    }

    #[tokio::test]
    async fn test_sqlite_store_backup_scenario() {
        let store = SqliteStore::in_memory().unwrap();
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
        assert_eq!(
            store.get(&q1, "t1_time").await.unwrap().unwrap().to_stored(),
            "nan"
        );
    }

    #[tokio::test]
    async fn test_sqlite_store_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.db");
        let q2 = Component::qubit("q2");

        {
            let store = SqliteStore::new(&path).unwrap();
            store
                .set(&q2, "clock_freqs:f01", &ParamValue::Float(4.2e9))
                .await
                .unwrap();
            store
                .set_status(&q2, "qubit_01_spectroscopy", CalibrationStatus::Calibrated)
                .await
                .unwrap();
        }

        let reopened = SqliteStore::new(&path).unwrap();
        assert_eq!(
            reopened.get(&q2, "clock_freqs:f01").await.unwrap(),
            Some(ParamValue::Float(4.2e9))
        );
        assert!(reopened
            .get_status(&q2, "qubit_01_spectroscopy")
            .await
            .unwrap()
            .is_calibrated());
    }

    #[test]
    fn test_sqlite_store_unreachable_path() {
        let result = SqliteStore::new("/nonexistent-dir/qcal/calibration.db");
        assert!(matches!(result, Err(StoreError::Unreachable(_))));
    }
}
