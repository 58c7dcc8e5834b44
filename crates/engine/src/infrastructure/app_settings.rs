//! Engine configuration.
//!
//! Settings come from `MUDMESH_*` environment variables (after `.env.local`
//! and `.env` are loaded by the binary). The cluster topology lives in a
//! JSON file named by `MUDMESH_TOPOLOGY_PATH`:
//!
//! ```json
//! { "mode": "classic",
//!   "engines": [ { "engineId": "engine-1", "host": "127.0.0.1", "port": 7001,
//!                  "zones": ["town", "forest"] } ] }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use mudmesh_domain::{EngineAddress, EngineId, ZoneAssignment, ZoneMode};
use serde::Deserialize;

use crate::use_cases::handoff::HandoffConfig;
use crate::use_cases::scaling::ScalingConfig;

pub const TOPOLOGY_PATH: &str = "MUDMESH_TOPOLOGY_PATH";
pub const HANDOFF_ACK_TIMEOUT_MS: &str = "MUDMESH_HANDOFF_ACK_TIMEOUT_MS";
pub const HANDOFF_SWEEP_INTERVAL_MS: &str = "MUDMESH_HANDOFF_SWEEP_INTERVAL_MS";
pub const LOAD_REPORT_INTERVAL_MS: &str = "MUDMESH_LOAD_REPORT_INTERVAL_MS";
pub const SCALER_INTERVAL_MS: &str = "MUDMESH_SCALER_INTERVAL_MS";
pub const SCALER_CAPACITY_PER_INSTANCE: &str = "MUDMESH_SCALER_CAPACITY_PER_INSTANCE";
pub const SCALER_UP_THRESHOLD: &str = "MUDMESH_SCALER_UP_THRESHOLD";
pub const SCALER_DOWN_THRESHOLD: &str = "MUDMESH_SCALER_DOWN_THRESHOLD";
pub const SCALER_COOLDOWN_MS: &str = "MUDMESH_SCALER_COOLDOWN_MS";
pub const SCALER_DEFAULT_MIN_INSTANCES: &str = "MUDMESH_SCALER_DEFAULT_MIN_INSTANCES";
pub const SCALER_MIN_INSTANCES: &str = "MUDMESH_SCALER_MIN_INSTANCES";
pub const BUS_MODE: &str = "MUDMESH_BUS_MODE";
pub const BUS_SECRET: &str = "MUDMESH_BUS_SECRET";
pub const BUS_CHANNEL_PREFIX: &str = "MUDMESH_BUS_CHANNEL_PREFIX";
pub const BUS_CAPACITY: &str = "MUDMESH_BUS_CAPACITY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("MUDMESH_BUS_SECRET is required when MUDMESH_BUS_MODE=distributed")]
    MissingBusSecret,

    #[error("Failed to read topology file {path}: {source}")]
    TopologyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse topology file {path}: {source}")]
    TopologyParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str, reason: impl ToString) -> Self {
        Self::Invalid {
            key,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

// =============================================================================
// Bus Settings
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BusMode {
    /// Engines share one process and talk over in-memory channels.
    #[default]
    InProcess,
    /// Engines talk over signed publish/subscribe envelopes.
    Distributed,
}

impl FromStr for BusMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in_process" | "inprocess" | "local" => Ok(BusMode::InProcess),
            "distributed" | "pubsub" => Ok(BusMode::Distributed),
            other => Err(format!("unknown bus mode '{other}'")),
        }
    }
}

impl fmt::Display for BusMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusMode::InProcess => write!(f, "in_process"),
            BusMode::Distributed => write!(f, "distributed"),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct BusSettings {
    pub mode: BusMode,
    pub secret: Option<String>,
    pub channel_prefix: String,
    pub capacity: usize,
}

// Keeps the shared secret out of logs.
impl fmt::Debug for BusSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusSettings")
            .field("mode", &self.mode)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("channel_prefix", &self.channel_prefix)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            mode: BusMode::InProcess,
            secret: None,
            channel_prefix: "mudmesh".to_string(),
            capacity: 1024,
        }
    }
}

// =============================================================================
// App Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct AppSettings {
    pub topology_path: PathBuf,
    pub handoff: HandoffConfig,
    pub sweep_interval: Duration,
    pub load_report_interval: Duration,
    pub scaler_interval: Duration,
    pub scaling: ScalingConfig,
    pub bus: BusSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            topology_path: PathBuf::from("topology.json"),
            handoff: HandoffConfig::default(),
            sweep_interval: Duration::from_millis(500),
            load_report_interval: Duration::from_millis(5_000),
            scaler_interval: Duration::from_millis(10_000),
            scaling: ScalingConfig::default(),
            bus: BusSettings::default(),
        }
    }
}

impl AppSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup; unset or blank keys keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let mut scaling = defaults.scaling.clone();
        scaling.per_instance_capacity = parse_or(
            &get,
            SCALER_CAPACITY_PER_INSTANCE,
            scaling.per_instance_capacity,
        )?;
        scaling.scale_up_threshold =
            parse_or(&get, SCALER_UP_THRESHOLD, scaling.scale_up_threshold)?;
        scaling.scale_down_threshold =
            parse_or(&get, SCALER_DOWN_THRESHOLD, scaling.scale_down_threshold)?;
        scaling.cooldown_ms = parse_or(&get, SCALER_COOLDOWN_MS, scaling.cooldown_ms)?;
        scaling.default_min_instances = parse_or(
            &get,
            SCALER_DEFAULT_MIN_INSTANCES,
            scaling.default_min_instances,
        )?;
        if let Some(raw) = get(SCALER_MIN_INSTANCES) {
            scaling.min_instances = parse_min_instances(&raw)?;
        }
        validate_scaling(&scaling)?;

        let mut bus = defaults.bus.clone();
        if let Some(raw) = get(BUS_MODE) {
            bus.mode = raw
                .parse::<BusMode>()
                .map_err(|reason| ConfigError::invalid(BUS_MODE, &raw, reason))?;
        }
        bus.secret = get(BUS_SECRET);
        if let Some(prefix) = get(BUS_CHANNEL_PREFIX) {
            bus.channel_prefix = prefix;
        }
        bus.capacity = parse_or(&get, BUS_CAPACITY, bus.capacity)?;
        if bus.capacity == 0 {
            return Err(ConfigError::invalid(BUS_CAPACITY, "0", "must be positive"));
        }
        if bus.mode == BusMode::Distributed && bus.secret.is_none() {
            return Err(ConfigError::MissingBusSecret);
        }

        let ack_timeout_ms = parse_or(
            &get,
            HANDOFF_ACK_TIMEOUT_MS,
            defaults.handoff.ack_timeout_ms,
        )?;
        if ack_timeout_ms <= 0 {
            return Err(ConfigError::invalid(
                HANDOFF_ACK_TIMEOUT_MS,
                &ack_timeout_ms.to_string(),
                "must be positive",
            ));
        }

        Ok(Self {
            topology_path: get(TOPOLOGY_PATH)
                .map(PathBuf::from)
                .unwrap_or(defaults.topology_path),
            handoff: HandoffConfig { ack_timeout_ms },
            sweep_interval: interval_or(&get, HANDOFF_SWEEP_INTERVAL_MS, defaults.sweep_interval)?,
            load_report_interval: interval_or(
                &get,
                LOAD_REPORT_INTERVAL_MS,
                defaults.load_report_interval,
            )?,
            scaler_interval: interval_or(&get, SCALER_INTERVAL_MS, defaults.scaler_interval)?,
            scaling,
            bus,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(key, &raw, e)),
        None => Ok(default),
    }
}

fn interval_or<G>(get: &G, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let millis: u64 = parse_or(get, key, default.as_millis() as u64)?;
    if millis == 0 {
        return Err(ConfigError::invalid(key, "0", "must be positive"));
    }
    Ok(Duration::from_millis(millis))
}

/// Parse `"zone=n,zone=n"`.
fn parse_min_instances(raw: &str) -> Result<HashMap<String, usize>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (zone, count) = entry.split_once('=').ok_or_else(|| {
                ConfigError::invalid(SCALER_MIN_INSTANCES, entry, "expected zone=count")
            })?;
            let zone = zone.trim();
            if zone.is_empty() {
                return Err(ConfigError::invalid(
                    SCALER_MIN_INSTANCES,
                    entry,
                    "zone name is empty",
                ));
            }
            let count = count
                .trim()
                .parse::<usize>()
                .map_err(|e| ConfigError::invalid(SCALER_MIN_INSTANCES, entry, e))?;
            Ok((zone.to_string(), count))
        })
        .collect()
}

fn validate_scaling(scaling: &ScalingConfig) -> Result<(), ConfigError> {
    if scaling.per_instance_capacity == 0 {
        return Err(ConfigError::invalid(
            SCALER_CAPACITY_PER_INSTANCE,
            "0",
            "must be positive",
        ));
    }
    if !(0.0..=1.0).contains(&scaling.scale_down_threshold)
        || scaling.scale_down_threshold >= scaling.scale_up_threshold
    {
        return Err(ConfigError::invalid(
            SCALER_DOWN_THRESHOLD,
            &scaling.scale_down_threshold.to_string(),
            format!(
                "must be within 0..=1 and below the scale-up threshold {}",
                scaling.scale_up_threshold
            ),
        ));
    }
    if scaling.cooldown_ms < 0 {
        return Err(ConfigError::invalid(
            SCALER_COOLDOWN_MS,
            &scaling.cooldown_ms.to_string(),
            "cannot be negative",
        ));
    }
    Ok(())
}

// =============================================================================
// Topology File
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineEntry {
    pub engine_id: EngineId,
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub zones: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyFile {
    #[serde(default)]
    pub mode: ZoneMode,
    pub engines: Vec<EngineEntry>,
}

impl TopologyFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::TopologyRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::TopologyParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn assignments(&self) -> Vec<ZoneAssignment> {
        self.engines
            .iter()
            .map(|entry| {
                ZoneAssignment::new(
                    EngineAddress::new(entry.engine_id.clone(), entry.host.clone(), entry.port),
                    entry.zones.iter().map(|z| z.trim().to_string()),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let settings = AppSettings::from_lookup(lookup(&[])).expect("settings");
        assert_eq!(settings, AppSettings::default());
        assert_eq!(settings.handoff.ack_timeout_ms, 2_000);
        assert_eq!(settings.scaling.per_instance_capacity, 200);
        assert_eq!(settings.bus.mode, BusMode::InProcess);
    }

    #[test]
    fn overrides_are_applied() {
        let settings = AppSettings::from_lookup(lookup(&[
            (TOPOLOGY_PATH, "/etc/mudmesh/topology.json"),
            (HANDOFF_ACK_TIMEOUT_MS, "1500"),
            (SCALER_UP_THRESHOLD, "0.9"),
            (SCALER_MIN_INSTANCES, "town=2, forest=1"),
            (BUS_MODE, "distributed"),
            (BUS_SECRET, "hunter2"),
            (BUS_CHANNEL_PREFIX, "prod"),
        ]))
        .expect("settings");

        assert_eq!(settings.topology_path, PathBuf::from("/etc/mudmesh/topology.json"));
        assert_eq!(settings.handoff.ack_timeout_ms, 1_500);
        assert_eq!(settings.scaling.scale_up_threshold, 0.9);
        assert_eq!(
            settings.scaling.min_instances,
            HashMap::from([("town".to_string(), 2), ("forest".to_string(), 1)])
        );
        assert_eq!(settings.bus.mode, BusMode::Distributed);
        assert_eq!(settings.bus.secret.as_deref(), Some("hunter2"));
        assert_eq!(settings.bus.channel_prefix, "prod");
    }

    #[test]
    fn blank_values_keep_defaults() {
        let settings =
            AppSettings::from_lookup(lookup(&[(SCALER_COOLDOWN_MS, "  ")])).expect("settings");
        assert_eq!(settings.scaling.cooldown_ms, 60_000);
    }

    #[test]
    fn malformed_number_names_the_key() {
        let err = AppSettings::from_lookup(lookup(&[(SCALER_COOLDOWN_MS, "soon")]))
            .expect_err("invalid");
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == SCALER_COOLDOWN_MS));
    }

    #[test]
    fn distributed_bus_requires_secret() {
        let err = AppSettings::from_lookup(lookup(&[(BUS_MODE, "distributed")]))
            .expect_err("missing secret");
        assert!(matches!(err, ConfigError::MissingBusSecret));
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let err = AppSettings::from_lookup(lookup(&[
            (SCALER_UP_THRESHOLD, "0.3"),
            (SCALER_DOWN_THRESHOLD, "0.5"),
        ]))
        .expect_err("inverted");
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == SCALER_DOWN_THRESHOLD));
    }

    #[test]
    fn malformed_min_instances_are_rejected() {
        assert!(AppSettings::from_lookup(lookup(&[(SCALER_MIN_INSTANCES, "town")])).is_err());
        assert!(AppSettings::from_lookup(lookup(&[(SCALER_MIN_INSTANCES, "town=x")])).is_err());
        assert!(AppSettings::from_lookup(lookup(&[(SCALER_MIN_INSTANCES, "=2")])).is_err());
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = AppSettings::from_lookup(lookup(&[(HANDOFF_SWEEP_INTERVAL_MS, "0")]))
            .expect_err("zero interval");
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == HANDOFF_SWEEP_INTERVAL_MS));
    }

    #[test]
    fn bus_settings_debug_hides_secret() {
        let bus = BusSettings {
            secret: Some("hunter2".to_string()),
            ..BusSettings::default()
        };
        let rendered = format!("{bus:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn topology_file_loads_assignments() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{
                "mode": "instanced",
                "engines": [
                    {{ "engineId": "engine-1", "host": "10.0.0.1", "port": 7001, "zones": ["town"] }},
                    {{ "engineId": "engine-2", "port": 7002, "zones": ["town", "forest"] }}
                ]
            }}"#
        )
        .expect("write");

        let topology = TopologyFile::load(file.path()).expect("load");

        assert_eq!(topology.mode, ZoneMode::Instanced);
        let assignments = topology.assignments();
        assert_eq!(assignments.len(), 2);
        assert_eq!(assignments[0].address.host, "10.0.0.1");
        assert_eq!(assignments[1].address.host, "127.0.0.1");
        assert!(assignments[1].zones.contains("forest"));
    }

    #[test]
    fn topology_mode_defaults_to_classic() {
        let topology: TopologyFile =
            serde_json::from_str(r#"{"engines":[]}"#).expect("parse");
        assert_eq!(topology.mode, ZoneMode::Classic);
    }

    #[test]
    fn topology_errors_are_typed() {
        let missing = TopologyFile::load(Path::new("/definitely/not/here.json"))
            .expect_err("missing file");
        assert!(matches!(missing, ConfigError::TopologyRead { .. }));

        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"engines":[{{"engineId":"","port":1}}]}}"#).expect("write");
        let invalid = TopologyFile::load(file.path()).expect_err("empty engine id");
        assert!(matches!(invalid, ConfigError::TopologyParse { .. }));
    }
}
