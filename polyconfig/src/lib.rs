//! # polyconfig
//!
//! YAML configuration shared by every Polyphon crate.
//!
//! The effective document is built from three layers: the defaults embedded
//! in the binary, the user's `config.yaml`, then `POLYPHON_CONFIG__A__B=value`
//! environment overrides. The merged document is written back on load and on
//! every change, so `config.yaml` always shows the values in force.
//!
//! Crates that own settings extend [`Config`] with an extension trait (see
//! `polycore::preferences` or `polysubsonic::config_ext`) instead of growing
//! this file.
//!
//! ```no_run
//! use polyconfig::get_config;
//!
//! let config = get_config();
//! let timeout = config.get_http_timeout_secs()?;
//! config.set_http_timeout_secs(timeout * 2)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Result, bail};
use lazy_static::lazy_static;
use serde_yaml::{Number, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::{debug, info};
use uuid::Uuid;

pub mod encryption;
mod tree;

const EMBEDDED_DEFAULTS: &str = include_str!("polyphon.yaml");

const ENV_CONFIG_DIR: &str = "POLYPHON_CONFIG";
const ENV_OVERRIDE_PREFIX: &str = "POLYPHON_CONFIG__";
const CONFIG_FILE: &str = "config.yaml";
const LOCAL_DIR_NAME: &str = ".polyphon";

const DEFAULT_HTTP_TIMEOUT_SECS: usize = 30;
const DEFAULT_GC_INTERVAL_SECS: usize = 3600;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_CLIENT_NAME: &str = "Polyphon";

lazy_static! {
    static ref GLOBAL: Arc<Config> =
        Arc::new(Config::load_config("").expect("Polyphon configuration cannot be loaded"));
}

/// Returns the process-wide configuration, loading it on first use
///
/// Tests and embedders wanting an isolated configuration call
/// [`Config::load_config`] with their own directory.
pub fn get_config() -> Arc<Config> {
    GLOBAL.clone()
}

/// Typed accessor pair over a numeric entry
macro_rules! count_setting {
    ($get:ident, $set:ident, $path:expr, $default:expr) => {
        pub fn $get(&self) -> Result<usize> {
            Ok(self
                .get_value($path)
                .ok()
                .and_then(|v| v.as_u64())
                .map_or($default, |n| n as usize))
        }

        pub fn $set(&self, value: usize) -> Result<()> {
            self.set_value($path, Value::Number(Number::from(value)))
        }
    };
}

/// Typed accessor pair over a boolean entry
macro_rules! flag_setting {
    ($get:ident, $set:ident, $path:expr, $default:expr) => {
        pub fn $get(&self) -> Result<bool> {
            Ok(self
                .get_value($path)
                .ok()
                .and_then(|v| v.as_bool())
                .unwrap_or($default))
        }

        pub fn $set(&self, value: bool) -> Result<()> {
            self.set_value($path, Value::Bool(value))
        }
    };
}

/// Merged configuration document backed by `config.yaml`
#[derive(Debug)]
pub struct Config {
    directory: String,
    file: PathBuf,
    document: Mutex<Value>,
}

impl Clone for Config {
    fn clone(&self) -> Self {
        Self {
            directory: self.directory.clone(),
            file: self.file.clone(),
            document: Mutex::new(self.document.lock().unwrap().clone()),
        }
    }
}

/// Picks the configuration directory
///
/// An explicit `requested` directory wins, then `$POLYPHON_CONFIG`, then an
/// existing `.polyphon` in the working directory or in the home directory.
/// Without any of those, `.polyphon` in the working directory is used.
fn locate_directory(requested: &str) -> String {
    if !requested.is_empty() {
        return requested.to_string();
    }
    if let Ok(from_env) = env::var(ENV_CONFIG_DIR) {
        info!(env_var = ENV_CONFIG_DIR, path = %from_env, "Configuration directory from environment");
        return from_env;
    }

    let mut candidates = vec![PathBuf::from(LOCAL_DIR_NAME)];
    candidates.extend(dirs::home_dir().map(|home| home.join(LOCAL_DIR_NAME)));
    candidates
        .into_iter()
        .find(|candidate| candidate.is_dir())
        .map(|dir| dir.to_string_lossy().into_owned())
        .unwrap_or_else(|| LOCAL_DIR_NAME.to_string())
}

/// Creates `dir` if needed and checks it is readable and writable
fn ensure_writable_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let probe = dir.join(".polyphon-probe");
    fs::write(&probe, b"")?;
    fs::remove_file(&probe)?;
    fs::read_dir(dir)?;
    Ok(())
}

impl Config {
    /// Resolves and prepares the configuration directory
    pub fn config_dir(requested: &str) -> Result<String> {
        let directory = locate_directory(requested);
        ensure_writable_dir(Path::new(&directory))?;
        Ok(directory)
    }

    /// Loads the configuration found in `directory` (empty string: search)
    ///
    /// Keys are lowercased, the user's `config.yaml` is overlaid on the
    /// embedded defaults, environment overrides are applied, and the result
    /// is written back.
    pub fn load_config(directory: &str) -> Result<Self> {
        let directory = Self::config_dir(directory)?;
        let file = Path::new(&directory).join(CONFIG_FILE);
        info!(config_dir = %directory, "Using configuration directory");

        let mut document = tree::normalize_keys(serde_yaml::from_str(EMBEDDED_DEFAULTS)?);
        match fs::read(&file) {
            Ok(bytes) => {
                debug!(file = %file.display(), "Reading configuration file");
                let user = tree::normalize_keys(serde_yaml::from_slice(&bytes)?);
                tree::overlay(&mut document, &user);
            }
            Err(_) => info!(file = %file.display(), "No configuration file yet, using defaults"),
        }

        tree::apply_overrides(&mut document, ENV_OVERRIDE_PREFIX, env::vars());

        let config = Config {
            directory,
            file,
            document: Mutex::new(document),
        };
        config.save()?;
        Ok(config)
    }

    /// Directory holding `config.yaml`
    pub fn directory(&self) -> &str {
        &self.directory
    }

    /// Writes the current document to `config.yaml`
    pub fn save(&self) -> Result<()> {
        let text = serde_yaml::to_string(&*self.document.lock().unwrap())?;
        fs::write(&self.file, text)?;
        Ok(())
    }

    /// Value at `path` (e.g. `&["host", "http", "timeout_secs"]`)
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let document = self.document.lock().unwrap();
        tree::lookup(&document, path).cloned()
    }

    /// Stores `value` at `path` and saves
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        tree::insert(&mut self.document.lock().unwrap(), path, value)?;
        self.save()
    }

    /// Removes the value at `path`; missing paths are not an error
    pub fn remove_value(&self, path: &[&str]) -> Result<()> {
        let removed = tree::remove(&mut self.document.lock().unwrap(), path)?;
        if removed { self.save() } else { Ok(()) }
    }

    /// Directory named at `path`, created on demand
    ///
    /// Relative directories live under the configuration directory. When the
    /// entry is missing, `default` is recorded first.
    pub fn get_managed_dir(&self, path: &[&str], default: &str) -> Result<String> {
        let configured = match self.get_value(path) {
            Ok(Value::String(dir)) => dir,
            _ => {
                self.set_managed_dir(path, default.to_string())?;
                default.to_string()
            }
        };

        let resolved = Path::new(&self.directory).join(&configured);
        if !resolved.exists() {
            fs::create_dir_all(&resolved)?;
            info!(directory = %resolved.display(), "Created managed directory");
        }
        Ok(resolved.to_string_lossy().into_owned())
    }

    pub fn set_managed_dir(&self, path: &[&str], directory: String) -> Result<()> {
        self.set_value(path, Value::String(directory))
    }

    /// Directory holding the SQLite database
    pub fn get_database_dir(&self) -> Result<String> {
        self.get_managed_dir(&["database", "directory"], "data")
    }

    /// Full path of the SQLite database file
    pub fn get_database_path(&self) -> Result<PathBuf> {
        Ok(PathBuf::from(self.get_database_dir()?).join("polyphon.db"))
    }

    /// Root directory of the primary storage volume
    pub fn get_primary_volume_dir(&self) -> Result<String> {
        self.get_managed_dir(&["library", "primary_volume"], "music")
    }

    fn non_empty_string(&self, path: &[&str]) -> Option<String> {
        match self.get_value(path) {
            Ok(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        }
    }

    /// Name this client announces to remote servers
    pub fn get_client_name(&self) -> String {
        self.non_empty_string(&["client", "name"])
            .unwrap_or_else(|| DEFAULT_CLIENT_NAME.to_string())
    }

    /// Version this client announces to remote servers
    pub fn get_client_version(&self) -> String {
        self.non_empty_string(&["client", "version"])
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string())
    }

    /// Stable identifier of this installation, generated on first use
    pub fn get_device_id(&self) -> Result<String> {
        const PATH: &[&str] = &["client", "device_id"];
        if let Some(id) = self.non_empty_string(PATH) {
            return Ok(id);
        }
        let generated = Uuid::new_v4().to_string();
        self.set_value(PATH, Value::String(generated.clone()))?;
        Ok(generated)
    }

    count_setting!(
        get_http_timeout_secs,
        set_http_timeout_secs,
        &["host", "http", "timeout_secs"],
        DEFAULT_HTTP_TIMEOUT_SECS
    );

    count_setting!(
        get_gc_interval_secs,
        set_gc_interval_secs,
        &["library", "gc_interval_secs"],
        DEFAULT_GC_INTERVAL_SECS
    );

    flag_setting!(
        get_log_enable_console,
        set_log_enable_console,
        &["host", "logger", "enable_console"],
        true
    );

    /// Minimum log level (`TRACE`, `DEBUG`, `INFO`, `WARN`, `ERROR`)
    pub fn get_log_min_level(&self) -> Result<String> {
        Ok(self
            .non_empty_string(&["host", "logger", "min_level"])
            .unwrap_or_else(|| DEFAULT_LOG_MIN_LEVEL.to_string()))
    }

    pub fn set_log_min_level(&self, level: String) -> Result<()> {
        self.set_value(&["host", "logger", "min_level"], Value::String(level))
    }
}
