#![forbid(unsafe_code)]

//! Recorder configuration.
//!
//! | variable | default | effect |
//! |----------|---------|--------|
//! | `WALKREC_STORAGE_KEY` | `WALKREC_STATE` | key the session is persisted under |
//! | `WALKREC_ROOT_PATH` | `/html/body/div` | path id of the instrumentation root |
//! | `WALKREC_DETERMINISTIC` | `false` | timestamps become `seq * 1000` |
//! | `WALKREC_STATE_FILE` | unset | persist to this JSON file instead of memory |
//! | `WALKREC_PERSIST` | `true` | set to `false` to disable persistence |

use std::env;
use std::path::PathBuf;

use walkrec_core::PathId;

/// Default persistence key.
pub const DEFAULT_STORAGE_KEY: &str = "WALKREC_STATE";

/// Default path id of the instrumentation root.
pub const DEFAULT_ROOT_PATH: &str = "/html/body/div";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderConfig {
    pub storage_key: String,
    pub root_path: PathId,
    pub deterministic: bool,
    pub state_file: Option<PathBuf>,
    pub persist: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            root_path: PathId::from(DEFAULT_ROOT_PATH),
            deterministic: false,
            state_file: None,
            persist: true,
        }
    }
}

impl RecorderConfig {
    /// Read configuration from `WALKREC_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read configuration through `lookup`, falling back to defaults for
    /// unset or empty values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            storage_key: get("WALKREC_STORAGE_KEY").unwrap_or(defaults.storage_key),
            root_path: get("WALKREC_ROOT_PATH")
                .map(PathId::from)
                .unwrap_or(defaults.root_path),
            deterministic: get("WALKREC_DETERMINISTIC")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.deterministic),
            state_file: get("WALKREC_STATE_FILE").map(PathBuf::from),
            persist: get("WALKREC_PERSIST")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.persist),
        }
    }

    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    #[must_use]
    pub fn with_root_path(mut self, root: impl Into<PathId>) -> Self {
        self.root_path = root.into();
        self
    }

    #[must_use]
    pub fn with_deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }

    #[must_use]
    pub fn with_state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }
}

fn parse_flag(value: &str) -> bool {
    let v = value.trim();
    v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = RecorderConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg, RecorderConfig::default());
        assert_eq!(cfg.root_path.as_str(), "/html/body/div");
        assert!(cfg.persist);
        assert!(!cfg.deterministic);
    }

    #[test]
    fn reads_all_variables() {
        let cfg = RecorderConfig::from_lookup(lookup(&[
            ("WALKREC_STORAGE_KEY", "demo"),
            ("WALKREC_ROOT_PATH", "/app"),
            ("WALKREC_DETERMINISTIC", "TRUE"),
            ("WALKREC_STATE_FILE", "/tmp/walkrec.json"),
            ("WALKREC_PERSIST", "0"),
        ]));
        assert_eq!(cfg.storage_key, "demo");
        assert_eq!(cfg.root_path.as_str(), "/app");
        assert!(cfg.deterministic);
        assert_eq!(cfg.state_file, Some(PathBuf::from("/tmp/walkrec.json")));
        assert!(!cfg.persist);
    }

    #[test]
    fn empty_values_fall_back() {
        let cfg = RecorderConfig::from_lookup(lookup(&[("WALKREC_STORAGE_KEY", "  ")]));
        assert_eq!(cfg.storage_key, DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn builders() {
        let cfg = RecorderConfig::default()
            .with_storage_key("k")
            .with_root_path("/r")
            .with_deterministic(true)
            .with_persist(false)
            .with_state_file("s.json");
        assert_eq!(cfg.storage_key, "k");
        assert_eq!(cfg.root_path, PathId::from("/r"));
        assert!(cfg.deterministic && !cfg.persist);
        assert!(cfg.state_file.is_some());
    }
}
