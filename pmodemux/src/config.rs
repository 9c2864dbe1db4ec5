//! # Demultiplexer configuration
//!
//! Settings are read the same way as the rest of PMOMusic: an embedded
//! default YAML document, merged with an optional user file, then with
//! environment overrides.
//!
//! Environment overrides use the `PMODEMUX__` prefix with `__` separating
//! path components, e.g. `PMODEMUX__STAGING__INITIAL_CAPACITY=4096`. Keys are
//! case-insensitive and values are parsed as YAML scalars.
//!
//! ```no_run
//! use pmodemux::DemuxOptions;
//!
//! let options = DemuxOptions::load(Some("demux.yaml".as_ref()))?;
//! assert!(options.staging.initial_capacity > 0);
//! # Ok::<(), pmodemux::DemuxError>(())
//! ```

use std::{env, fs, path::Path};

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::{info, warn};

use crate::error::DemuxError;

const DEFAULT_CONFIG: &str = include_str!("pmodemux.yaml");
const ENV_PREFIX: &str = "PMODEMUX__";

pub const DEFAULT_STAGING_CAPACITY: usize = 32;
pub const DEFAULT_MAX_SYNC_SEARCH: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingOptions {
    /// Capacity of the compressed staging buffer before any growth.
    pub initial_capacity: usize,
}

impl Default for StagingOptions {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_STAGING_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResyncOptions {
    /// Bytes the decoder may skip while looking for one frame before the
    /// stream is declared corrupt. `None` never gives up.
    pub max_skipped_bytes: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OggOptions {
    pub validate_crc: bool,
    /// Skip bytes preceding the first `OggS` page when opening.
    pub find_sync: bool,
    pub max_sync_search: usize,
}

impl Default for OggOptions {
    fn default() -> Self {
        Self {
            validate_crc: true,
            find_sync: true,
            max_sync_search: DEFAULT_MAX_SYNC_SEARCH,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemuxOptions {
    pub staging: StagingOptions,
    pub resync: ResyncOptions,
    pub ogg: OggOptions,
}

impl DemuxOptions {
    /// Loads the defaults, merges `path` when it exists, then applies
    /// `PMODEMUX__*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, DemuxError> {
        let mut config: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        if let Some(path) = path {
            match fs::read(path) {
                Ok(data) => {
                    info!(config_file = %path.display(), "Loaded demux config file");
                    let external: Value = serde_yaml::from_slice(&data)?;
                    merge_yaml(&mut config, &lower_keys_value(external));
                }
                Err(err) => {
                    info!(config_file = %path.display(), error = %err, "Demux config file not readable, using defaults");
                }
            }
        }

        apply_env_overrides(&mut config, env::vars());
        Self::from_value(config)
    }

    /// Parses a YAML document on top of the defaults. Environment variables
    /// are not consulted.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, DemuxError> {
        let mut config: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;
        let external: Value = serde_yaml::from_str(yaml)?;
        merge_yaml(&mut config, &lower_keys_value(external));
        Self::from_value(config)
    }

    fn from_value(value: Value) -> Result<Self, DemuxError> {
        let options: DemuxOptions = serde_yaml::from_value(value)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), DemuxError> {
        if self.staging.initial_capacity == 0 {
            return Err(DemuxError::Config(
                "staging.initial_capacity must be greater than 0".into(),
            ));
        }
        if self.ogg.find_sync && self.ogg.max_sync_search < 4 {
            return Err(DemuxError::Config(
                "ogg.max_sync_search must cover at least one capture pattern".into(),
            ));
        }
        Ok(())
    }
}

/// Applies `PMODEMUX__` variables and returns how many were rejected.
fn apply_env_overrides<I>(config: &mut Value, vars: I) -> usize
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut rejected = 0;
    for (key, value) in vars {
        let Some(path) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let key_path: Vec<&str> = path.split("__").collect();
        if let Err(err) = set_value(config, &key_path, convert_env_value(&value)) {
            warn!(key = %key, error = %err, "ignoring environment override");
            rejected += 1;
        }
    }
    rejected
}

fn convert_env_value(value: &str) -> Value {
    if let Ok(parsed) = serde_yaml::from_str::<Value>(value) {
        return parsed;
    }
    Value::String(value.to_string())
}

fn set_value(data: &mut Value, path: &[&str], value: Value) -> Result<(), DemuxError> {
    if path.is_empty() {
        *data = value;
        return Ok(());
    }
    let Value::Mapping(map) = data else {
        return Err(DemuxError::Config(format!(
            "cannot set {}: parent is not a mapping",
            path.join(".")
        )));
    };
    let key = Value::String(path[0].to_lowercase());
    if path.len() == 1 {
        map.insert(key, value);
        Ok(())
    } else {
        let entry = map.entry(key).or_insert(Value::Mapping(Mapping::new()));
        set_value(entry, &path[1..], value)
    }
}

fn lower_keys_value(value: Value) -> Value {
    match value {
        Value::Mapping(map) => {
            let mut new_map = Mapping::new();
            for (k, v) in map {
                let key = match k {
                    Value::String(s) => Value::String(s.to_lowercase()),
                    other => other,
                };
                new_map.insert(key, lower_keys_value(v));
            }
            Value::Mapping(new_map)
        }
        other => other,
    }
}

fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}
