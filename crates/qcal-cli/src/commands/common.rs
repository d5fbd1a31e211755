//! Shared helpers for CLI commands.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use qcal_adapter_sim::{PeakAnalyzer, SimulatedInstrument};
use qcal_store::SqliteStore;
use qcal_supervisor::{CalibrationSupervisor, SupervisorConfig};

/// Name of the calibration database inside the state directory.
pub const DATABASE_FILE: &str = "calibration.db";

/// Name of the run configuration looked up in the state directory.
pub const CONFIG_FILE: &str = "calibration.yaml";

/// Config and state locations given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Paths {
    config: Option<PathBuf>,
    state_dir: Option<PathBuf>,
}

impl Paths {
    pub fn resolve(config: Option<&str>, state_dir: Option<&str>) -> Self {
        Self {
            config: config.map(PathBuf::from),
            state_dir: state_dir.map(PathBuf::from),
        }
    }

    /// The state directory, created if missing. Defaults to `~/.qcal/`.
    pub fn state_dir(&self) -> Result<PathBuf> {
        let dir = match &self.state_dir {
            Some(dir) => dir.clone(),
            None => dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
                .join(".qcal"),
        };
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }
        Ok(dir)
    }

    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Ok(self.state_dir()?.join(CONFIG_FILE)),
        }
    }

    /// Load the run configuration with `QCAL_*` overrides applied.
    pub fn load_config(&self) -> Result<SupervisorConfig> {
        let path = self.config_path()?;
        if !path.exists() {
            anyhow::bail!(
                "Config not found: {} (pass --config or set QCAL_CONFIG)",
                path.display()
            );
        }
        let config = SupervisorConfig::from_file(&path)?.merge_env()?;
        Ok(config)
    }

    pub fn open_store(&self) -> Result<SqliteStore> {
        let db_path = self.state_dir()?.join(DATABASE_FILE);
        SqliteStore::new(&db_path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to open calibration store at {}: {}",
                db_path.display(),
                e
            )
        })
    }
}

/// Build a supervisor over the local store and the simulated instrument.
pub fn create_supervisor(
    paths: &Paths,
    config: SupervisorConfig,
    instrument: SimulatedInstrument,
) -> Result<CalibrationSupervisor> {
    let store = paths.open_store()?;
    let instrument = Arc::new(instrument);
    let supervisor = CalibrationSupervisor::new(
        config,
        Arc::new(store),
        instrument.clone(),
        instrument,
        Arc::new(PeakAnalyzer::new()),
    )?;
    Ok(supervisor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_state_dir_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("state");
        let paths = Paths::resolve(None, dir.to_str());

        assert_eq!(paths.state_dir().unwrap(), dir);
        assert!(dir.is_dir());
        assert_eq!(paths.config_path().unwrap(), dir.join(CONFIG_FILE));
    }

    #[test]
    fn test_missing_config() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = Paths::resolve(None, tmp.path().to_str());
        let err = paths.load_config().unwrap_err();
        assert!(err.to_string().contains("Config not found"));
    }

    #[test]
    fn test_open_store_in_state_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = Paths::resolve(None, tmp.path().to_str());
        paths.open_store().unwrap();
        assert!(tmp.path().join(DATABASE_FILE).exists());
    }
}
