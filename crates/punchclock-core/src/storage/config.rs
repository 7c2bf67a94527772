//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - The local owner id tasks are filed under
//! - Auto check-in settings (office geofence, office Wi-Fi, notifications)
//! - Signal monitoring intervals
//! - Shift start and grace period used for lateness
//!
//! Configuration is stored at `~/.config/punchclock/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::attendance::ShiftPolicy;
use crate::checkin::{AutoCheckInSettings, MonitoringConfig, SettingsStore};
use crate::error::ConfigError;

/// Identity of the local user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerConfig {
    #[serde(default = "default_owner_id")]
    pub id: String,
}

fn default_owner_id() -> String {
    "me".into()
}

impl Default for OwnerConfig {
    fn default() -> Self {
        Self {
            id: default_owner_id(),
        }
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/punchclock/config.toml`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub owner: OwnerConfig,
    #[serde(default)]
    pub auto_check_in: AutoCheckInSettings,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub shift: ShiftPolicy,
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<i64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    // Optional sections (`null`) and tables take JSON.
                    serde_json::Value::Null
                    | serde_json::Value::Object(_)
                    | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    serde_json::Value::String(_) => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// `<data dir>/config.toml`.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::path()?)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::path()?)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "falling back to default configuration");
                Self::default()
            }
        }
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. The value is parsed according
    /// to the type of the current value; the result must still validate.
    /// Nothing is written to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Every leaf key with its current value, in dot-path form.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let key = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&key, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out
    }

    /// Reject values serde accepts but the app cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shift.start_time()?;
        self.shift.offset()?;
        if let Some(office) = &self.auto_check_in.office_location {
            if !office.center().is_valid()
                || office.radius_meters.is_nan()
                || office.radius_meters < 0.0
            {
                return Err(ConfigError::InvalidValue {
                    key: "auto_check_in.office_location".into(),
                    message: "coordinates out of range or negative radius".into(),
                });
            }
        }
        Ok(())
    }
}

/// [`SettingsStore`] backed by the `[auto_check_in]` table of a config file.
#[derive(Debug, Clone)]
pub struct ConfigSettingsStore {
    path: PathBuf,
}

impl ConfigSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default config location.
    pub fn open() -> Result<Self, ConfigError> {
        Ok(Self::new(Config::path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for ConfigSettingsStore {
    fn load(&self) -> Result<Option<AutoCheckInSettings>, ConfigError> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(Config::load_from(&self.path)?.auto_check_in))
    }

    fn save(&self, settings: &AutoCheckInSettings) -> Result<(), ConfigError> {
        let mut cfg = Config::load_from(&self.path)?;
        cfg.auto_check_in = settings.clone();
        cfg.save_to(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkin::{OfficeLocation, OfficeWifi};

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_default_values() {
        let cfg = Config::default();
        assert_eq!(cfg.owner.id, "me");
        assert!(!cfg.auto_check_in.enabled);
        assert!(cfg.auto_check_in.notifications_enabled);
        assert!(cfg.auto_check_in.office_location.is_none());
        assert_eq!(cfg.monitoring.location_interval_secs, 300);
        assert_eq!(cfg.monitoring.wifi_poll_secs, 30);
        assert_eq!(cfg.shift.start, "09:00");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[shift]\ngrace_minutes = 5\n").unwrap();
        assert_eq!(parsed.shift.grace_minutes, 5);
        assert_eq!(parsed.shift.start, "09:00");
        assert_eq!(parsed.owner.id, "me");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("auto_check_in.enabled").as_deref(), Some("false"));
        assert_eq!(cfg.get("monitoring.wifi_poll_secs").as_deref(), Some("30"));
        assert_eq!(cfg.get("owner.id").as_deref(), Some("me"));
        assert!(cfg.get("shift.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn set_updates_typed_values() {
        let mut cfg = Config::default();
        cfg.set("auto_check_in.enabled", "true").unwrap();
        cfg.set("shift.grace_minutes", "10").unwrap();
        cfg.set("shift.utc_offset_minutes", "-300").unwrap();
        cfg.set("owner.id", "alice").unwrap();

        assert!(cfg.auto_check_in.enabled);
        assert_eq!(cfg.shift.grace_minutes, 10);
        assert_eq!(cfg.shift.utc_offset_minutes, -300);
        assert_eq!(cfg.owner.id, "alice");
    }

    #[test]
    fn set_optional_section_from_json() {
        let mut cfg = Config::default();
        cfg.set(
            "auto_check_in.office_location",
            r#"{"latitude": 52.52, "longitude": 13.405, "radius_meters": 150}"#,
        )
        .unwrap();
        let office = cfg.auto_check_in.office_location.as_ref().unwrap();
        assert_eq!(office.radius_meters, 150.0);

        cfg.set("auto_check_in.office_location.radius_meters", "200.5")
            .unwrap();
        assert_eq!(
            cfg.auto_check_in.office_location.unwrap().radius_meters,
            200.5
        );
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("shift.nonexistent_key", "value"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(cfg.set("", "value"), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = Config::default();
        let result = cfg.set("auto_check_in.enabled", "not_a_bool");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn set_rejects_unparseable_shift_start() {
        let mut cfg = Config::default();
        assert!(cfg.set("shift.start", "25:99").is_err());
        assert_eq!(cfg.shift.start, "09:00");
    }

    #[test]
    fn entries_list_leaf_keys() {
        let entries = Config::default().entries();
        assert!(entries
            .iter()
            .any(|(k, v)| k == "monitoring.location_interval_secs" && v == "300"));
        assert!(entries
            .iter()
            .any(|(k, v)| k == "auto_check_in.office_wifi" && v == "null"));
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn load_from_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "owner = [").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }

    #[test]
    fn settings_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigSettingsStore::new(dir.path().join("config.toml"));
        assert_eq!(store.load().unwrap(), None);

        let settings = AutoCheckInSettings {
            enabled: true,
            notifications_enabled: false,
            office_location: Some(OfficeLocation {
                latitude: 52.52,
                longitude: 13.405,
                radius_meters: 200.0,
            }),
            office_wifi: Some(OfficeWifi {
                ssid: "Office-5G".into(),
                enabled: true,
            }),
        };
        store.save(&settings).unwrap();
        assert_eq!(store.load().unwrap(), Some(settings));

        // Other sections survive a settings save.
        let cfg = Config::load_from(store.path()).unwrap();
        assert_eq!(cfg.shift, ShiftPolicy::default());
    }
}
