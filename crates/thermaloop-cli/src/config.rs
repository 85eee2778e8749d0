//! Session configuration – reads `thermaloop.toml`.
//!
//! The control core defines no defaults of its own; everything the loop needs
//! (gains, setpoint, limits, timing, camera selection) comes from this file,
//! with the fallbacks below applied for missing keys and `THERMALOOP_*`
//! environment variables applied last.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Persisted session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Proportional gain.
    #[serde(default = "default_kp")]
    pub kp: f32,

    /// Integral gain.
    #[serde(default = "default_ki")]
    pub ki: f32,

    /// Derivative gain.
    #[serde(default = "default_kd")]
    pub kd: f32,

    /// Target temperature in °C.
    #[serde(default = "default_setpoint")]
    pub setpoint: f32,

    /// Lower actuator voltage limit.
    #[serde(default)]
    pub min_voltage: f32,

    /// Upper actuator voltage limit.
    #[serde(default = "default_max_voltage")]
    pub max_voltage: f32,

    /// Minimum time between effective PID ticks, in milliseconds.
    #[serde(default = "default_sample_time_ms")]
    pub sample_time_ms: u64,

    /// Driver period: how often the demo loop ticks, in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Aggregation mode string, e.g. `"average_mean"` or `"overall_max"`.
    #[serde(default = "default_aggregation_mode")]
    pub aggregation_mode: String,

    /// Optional camera selection; absent means "all cameras".
    #[serde(default)]
    pub camera_indices: Option<Vec<usize>>,

    /// Number of simulated cameras in the demo rig.
    #[serde(default = "default_cameras")]
    pub cameras: usize,

    /// How many control samples the trend history retains.
    #[serde(default = "default_trend_capacity")]
    pub trend_capacity: usize,
}

fn default_kp() -> f32 {
    1.0
}
fn default_ki() -> f32 {
    0.1
}
fn default_kd() -> f32 {
    0.05
}
fn default_setpoint() -> f32 {
    60.0
}
fn default_max_voltage() -> f32 {
    5.0
}
fn default_sample_time_ms() -> u64 {
    100
}
fn default_tick_interval_ms() -> u64 {
    200
}
fn default_aggregation_mode() -> String {
    "average_mean".to_string()
}
fn default_cameras() -> usize {
    2
}
fn default_trend_capacity() -> usize {
    600
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kp: default_kp(),
            ki: default_ki(),
            kd: default_kd(),
            setpoint: default_setpoint(),
            min_voltage: 0.0,
            max_voltage: default_max_voltage(),
            sample_time_ms: default_sample_time_ms(),
            tick_interval_ms: default_tick_interval_ms(),
            aggregation_mode: default_aggregation_mode(),
            camera_indices: None,
            cameras: default_cameras(),
            trend_capacity: default_trend_capacity(),
        }
    }
}

/// Load the config from `path`.  Returns `None` if the file does not exist.
pub fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `THERMALOOP_*` environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `THERMALOOP_SETPOINT` | `setpoint` |
/// | `THERMALOOP_MAX_VOLTAGE` | `max_voltage` |
/// | `THERMALOOP_MODE` | `aggregation_mode` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("THERMALOOP_SETPOINT")
        && let Ok(sp) = v.parse::<f32>()
    {
        cfg.setpoint = sp;
    }
    if let Ok(v) = std::env::var("THERMALOOP_MAX_VOLTAGE")
        && let Ok(max) = v.parse::<f32>()
    {
        cfg.max_voltage = max;
    }
    if let Ok(v) = std::env::var("THERMALOOP_MODE") {
        cfg.aggregation_mode = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("thermaloop.toml");
        let mut f = fs::File::create(&path).expect("create config");
        f.write_all(body.as_bytes()).expect("write config");
        path
    }

    #[test]
    fn missing_file_returns_none() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let result = load_from(&dir.path().join("nope.toml")).expect("no error");
        assert!(result.is_none());
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = write_config(&dir, "setpoint = 85.0\n");
        let cfg = load_from(&path).expect("load ok").expect("some");
        assert_eq!(cfg.setpoint, 85.0);
        assert_eq!(cfg.kp, 1.0);
        assert_eq!(cfg.max_voltage, 5.0);
        assert_eq!(cfg.aggregation_mode, "average_mean");
        assert_eq!(cfg.camera_indices, None);
    }

    #[test]
    fn full_config_roundtrips_through_toml() {
        let cfg = Config {
            kp: 2.5,
            ki: 0.2,
            kd: 0.01,
            setpoint: 120.0,
            min_voltage: 0.5,
            max_voltage: 9.5,
            sample_time_ms: 50,
            tick_interval_ms: 100,
            aggregation_mode: "overall_max".to_string(),
            camera_indices: Some(vec![0, 2]),
            cameras: 3,
            trend_capacity: 1200,
        };
        let raw = toml::to_string_pretty(&cfg).expect("serialize");
        let back: Config = toml::from_str(&raw).expect("parse");
        assert_eq!(back, cfg);
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = write_config(&dir, "setpoint = \"very hot\"\n");
        assert!(load_from(&path).is_err());
    }

    #[test]
    fn env_overrides_take_precedence() {
        // SAFETY: single-threaded test; no other thread reads these env vars.
        unsafe {
            std::env::set_var("THERMALOOP_SETPOINT", "95.5");
            std::env::set_var("THERMALOOP_MODE", "overall_max");
        }
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.setpoint, 95.5);
        assert_eq!(cfg.aggregation_mode, "overall_max");
        unsafe {
            std::env::remove_var("THERMALOOP_SETPOINT");
            std::env::remove_var("THERMALOOP_MODE");
        }
    }

    #[test]
    fn invalid_env_override_is_ignored() {
        // SAFETY: single-threaded test; no other thread reads this env var.
        unsafe { std::env::set_var("THERMALOOP_SETPOINT", "not-a-number") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.setpoint, 60.0);
        unsafe { std::env::remove_var("THERMALOOP_SETPOINT") };
    }
}
