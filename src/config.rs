use std::path::PathBuf;

use url::Url;

use crate::error::Error;
use crate::guard::GuardMode;

pub const DEFAULT_BASE_URL: &str =
    "https://hospital-device-risk-1036863235167.asia-south1.run.app/api";

/// Client configuration.
///
/// Use [`from_env()`](ClientConfig::from_env) for convention-based setup,
/// or [`new()`](ClientConfig::new) with `with_*` methods for full control.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ClientConfig {
    pub(crate) base_url: Url,
    pub(crate) storage_path: Option<PathBuf>,
    pub(crate) guard_mode: GuardMode,
}

impl ClientConfig {
    /// Production endpoint, in-memory storage, basic guard.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.parse().expect("valid default URL"),
            storage_path: None,
            guard_mode: GuardMode::Basic,
        }
    }

    /// Create config from environment variables.
    ///
    /// # Optional env vars
    /// - `DEVRISK_API_URL`: risk service base URL
    /// - `DEVRISK_STORAGE_PATH`: JSON file for the persisted session
    /// - `DEVRISK_GUARD_MODE`: `basic` or `strict`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = Self::new();

        if let Some(url_str) = lookup("DEVRISK_API_URL").filter(|s| !s.trim().is_empty()) {
            let url: Url = url_str
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("DEVRISK_API_URL: {e}")))?;
            config = config.with_base_url(url);
        }
        if let Some(path) = lookup("DEVRISK_STORAGE_PATH").filter(|s| !s.trim().is_empty()) {
            config = config.with_storage_path(path);
        }
        if let Some(mode) = lookup("DEVRISK_GUARD_MODE") {
            config = config.with_guard_mode(mode.parse()?);
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_base_url(mut self, url: Url) -> Self {
        self.base_url = url;
        self
    }

    #[must_use]
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_guard_mode(mut self, mode: GuardMode) -> Self {
        self.guard_mode = mode;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn storage_path(&self) -> Option<&PathBuf> {
        self.storage_path.as_ref()
    }

    #[must_use]
    pub fn guard_mode(&self) -> GuardMode {
        self.guard_mode
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = ClientConfig::new();
        assert_eq!(config.base_url().as_str(), DEFAULT_BASE_URL);
        assert!(config.storage_path().is_none());
        assert_eq!(config.guard_mode(), GuardMode::Basic);
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.base_url().as_str(), DEFAULT_BASE_URL);
    }

    #[test]
    fn environment_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("DEVRISK_API_URL", "http://localhost:8000/api"),
            ("DEVRISK_STORAGE_PATH", "/tmp/devrisk/session.json"),
            ("DEVRISK_GUARD_MODE", "strict"),
        ]))
        .unwrap();
        assert_eq!(config.base_url().as_str(), "http://localhost:8000/api");
        assert_eq!(
            config.storage_path(),
            Some(&PathBuf::from("/tmp/devrisk/session.json"))
        );
        assert_eq!(config.guard_mode(), GuardMode::Strict);
    }

    #[test]
    fn invalid_url_is_config_error() {
        let result = ClientConfig::from_lookup(lookup(&[("DEVRISK_API_URL", "not a url")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn invalid_guard_mode_is_config_error() {
        let result = ClientConfig::from_lookup(lookup(&[("DEVRISK_GUARD_MODE", "loose")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
