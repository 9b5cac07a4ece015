/*!
 * Configuration
 *
 * Where the CCA host library lives and which key pair to generate by default.
 * Stored as JSON, by default in `<config dir>/cca-pka/config.json`.
 */

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CcaError, CcaResult};
use crate::keygen::KeySpec;

/// Shared object name of the CCA host library
pub const DEFAULT_LIBRARY: &str = "libcsulcca.so";

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CcaConfig {
    /// Path or shared object name of the CCA host library
    pub library_path: PathBuf,
    /// Key pair generated when no other parameters are given
    pub key_spec: KeySpec,
}

impl Default for CcaConfig {
    fn default() -> Self {
        Self {
            library_path: PathBuf::from(DEFAULT_LIBRARY),
            key_spec: KeySpec::default(),
        }
    }
}

impl fmt::Debug for CcaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CcaConfig")
            .field("library_path", &self.library_path.display().to_string())
            .field("key_spec", &self.key_spec)
            .finish()
    }
}

impl CcaConfig {
    /// `<config dir>/cca-pka/config.json`, or relative to the working directory
    /// if the platform has no config directory
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("cca-pka");
        path.push("config.json");
        path
    }

    /// Read and validate a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> CcaResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config: CcaConfig = serde_json::from_str(&contents)?;
        config.validate()?;

        log::debug!("Loaded configuration from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Read the configuration at `path`, or the defaults if there is no file
    pub fn load<P: AsRef<Path>>(path: P) -> CcaResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            log::debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Write the configuration, creating parent directories as needed
    pub fn save<P: AsRef<Path>>(&self, path: P) -> CcaResult<()> {
        self.validate()?;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)?;

        log::info!("Saved configuration to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> CcaResult<()> {
        if self.library_path.as_os_str().is_empty() {
            return Err(CcaError::ConfigError(
                "library_path must not be empty".to_string(),
            ));
        }

        self.key_spec
            .validate()
            .map_err(|e| CcaError::ConfigError(format!("key_spec: {}", e)))
    }
}
