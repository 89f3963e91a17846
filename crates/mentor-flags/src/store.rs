//! Flag store
//!
//! JSON-encoded named values over a [`StorageBackend`]. Storage failures are
//! logged and degrade to the caller's default or a no-op; nothing here
//! returns an error for an unusable backend.

use crate::backend::StorageBackend;
use crate::error::FlagError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

const PROBE_NAME: &str = "__storage_test__";

/// Named values that survive restarts
#[derive(Debug, Clone)]
pub struct FlagStore {
    backend: Arc<dyn StorageBackend>,
}

impl FlagStore {
    /// Store over `backend`
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Backend name, for logs
    #[must_use]
    pub fn backend_kind(&self) -> &'static str {
        self.backend.kind()
    }

    /// Whether the backend accepts a probe write and remove
    #[must_use]
    pub fn is_available(&self) -> bool {
        let probe = self
            .backend
            .write(PROBE_NAME, PROBE_NAME)
            .and_then(|()| self.backend.delete(PROBE_NAME));
        match probe {
            Ok(()) => true,
            Err(e) => {
                debug!(backend = self.backend.kind(), error = %e, "storage probe failed");
                false
            }
        }
    }

    /// Value of `name`, or `default` when absent, unreadable or not decodable as `T`
    pub fn get<T: DeserializeOwned>(&self, name: &str, default: T) -> T {
        self.try_get(name).unwrap_or(default)
    }

    /// Value of `name` if present and decodable as `T`
    pub fn try_get<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let raw = match self.backend.read(name) {
            Ok(raw) => raw?,
            Err(e) => {
                self.degraded("read", name, &e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(flag = %name, error = %e, "stored flag is not valid for the requested type");
                None
            }
        }
    }

    /// Store `value` under `name`; returns whether it was persisted
    pub fn set<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> bool {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(source) => {
                let e = FlagError::Encode {
                    name: name.to_string(),
                    source,
                };
                self.degraded("encode", name, &e);
                return false;
            }
        };

        match self.backend.write(name, &encoded) {
            Ok(()) => {
                debug!(flag = %name, "flag stored");
                true
            }
            Err(e) => {
                self.degraded("write", name, &e);
                false
            }
        }
    }

    /// Whether `name` is stored
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        match self.backend.read(name) {
            Ok(raw) => raw.is_some(),
            Err(e) => {
                self.degraded("read", name, &e);
                false
            }
        }
    }

    /// Remove `name`; returns whether the backend accepted the removal
    pub fn remove(&self, name: &str) -> bool {
        match self.backend.delete(name) {
            Ok(()) => true,
            Err(e) => {
                self.degraded("remove", name, &e);
                false
            }
        }
    }

    /// Remove every flag
    pub fn clear(&self) -> bool {
        match self.backend.clear() {
            Ok(()) => true,
            Err(e) => {
                self.degraded("clear", "*", &e);
                false
            }
        }
    }

    /// Stored flag names, sorted
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries().into_iter().map(|(name, _)| name).collect()
    }

    /// Stored names with their raw JSON text
    #[must_use]
    pub fn entries(&self) -> Vec<(String, String)> {
        self.backend.entries().unwrap_or_else(|e| {
            self.degraded("list", "*", &e);
            Vec::new()
        })
    }

    /// Approximate footprint: name plus encoded value length of every flag
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.entries()
            .iter()
            .map(|(name, value)| name.len() + value.len())
            .sum()
    }

    /// [`size_bytes`](Self::size_bytes) for humans, e.g. `2.5 KB`
    #[must_use]
    pub fn size_formatted(&self) -> String {
        format_size(self.size_bytes())
    }

    fn degraded(&self, action: &str, name: &str, error: &FlagError) {
        warn!(
            backend = self.backend.kind(),
            action,
            flag = %name,
            error = %error,
            "flag storage degraded"
        );
    }
}

/// Format a byte count with up to two decimals: `0 Bytes`, `512 Bytes`, `1.5 KB`
#[must_use]
pub fn format_size(bytes: usize) -> String {
    const UNITS: [&str; 3] = ["Bytes", "KB", "MB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let text = format!("{value:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, UnavailableBackend};
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    fn store() -> FlagStore {
        FlagStore::new(Arc::new(MemoryBackend::new()))
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        theme: String,
        sidebar_collapsed: bool,
    }

    #[test]
    fn structured_values_round_trip() {
        let store = store();
        let prefs = Prefs {
            theme: "dark".into(),
            sidebar_collapsed: true,
        };
        assert!(store.set("prefs", &prefs));
        assert_eq!(store.try_get::<Prefs>("prefs"), Some(prefs));
    }

    #[test]
    fn missing_flag_yields_default() {
        assert_eq!(store().get("theme", "light".to_string()), "light");
    }

    #[test]
    fn wrong_type_falls_back_to_default() {
        let store = store();
        store.set("demo_mode", "yes");
        assert!(!store.get("demo_mode", false));
        assert!(store.has("demo_mode"));
    }

    #[test]
    fn remove_and_clear() {
        let store = store();
        store.set("a", &1);
        store.set("b", &2);
        assert!(store.remove("a"));
        assert!(!store.has("a"));
        assert_eq!(store.keys(), vec!["b".to_string()]);
        assert!(store.clear());
        assert!(store.keys().is_empty());
    }

    #[test]
    fn probe_leaves_nothing_behind() {
        let store = store();
        assert!(store.is_available());
        assert!(store.keys().is_empty());
    }

    #[test]
    fn unavailable_backend_degrades() {
        let store = FlagStore::new(Arc::new(UnavailableBackend::default()));
        assert!(!store.is_available());
        assert!(!store.set("theme", "dark"));
        assert_eq!(store.get("theme", "light".to_string()), "light");
        assert!(!store.has("theme"));
        assert!(!store.remove("theme"));
        assert!(store.keys().is_empty());
        assert_eq!(store.size_bytes(), 0);
    }

    #[test]
    fn size_counts_names_and_encoded_values() {
        let store = store();
        store.set("theme", "dark");
        // "theme" + "\"dark\""
        assert_eq!(store.size_bytes(), 5 + 6);
        assert_eq!(store.size_formatted(), "11 Bytes");
    }

    #[test]
    fn sizes_format_like_the_settings_page() {
        assert_eq!(format_size(0), "0 Bytes");
        assert_eq!(format_size(1023), "1023 Bytes");
        assert_eq!(format_size(1024), "1 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(2_621_440), "2.5 MB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024), "5120 MB");
    }
}
