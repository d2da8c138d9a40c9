//! Read access to the step's environment
//!
//! The environment is the channel earlier pipeline steps use to hand values
//! to this one. Reading it through [`EnvRepository`] keeps the rest of the
//! crate independent of the real process environment.

use std::collections::BTreeMap;
use std::ffi::OsString;

/// Key-value view of an environment
pub trait EnvRepository: Send + Sync {
    /// Value of `key`, empty when unset or not valid UTF-8
    fn get(&self, key: &str) -> String;

    /// Every variable that is set, including ones that are not valid UTF-8
    fn environ(&self) -> Vec<(OsString, OsString)>;
}

/// The environment of the current process
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEnvRepository;

impl EnvRepository for OsEnvRepository {
    fn get(&self, key: &str) -> String {
        std::env::var(key).unwrap_or_default()
    }

    fn environ(&self) -> Vec<(OsString, OsString)> {
        std::env::vars_os().collect()
    }
}

/// An in-memory environment
#[derive(Debug, Clone, Default)]
pub struct MapEnvRepository {
    vars: BTreeMap<String, String>,
}

impl MapEnvRepository {
    /// Empty environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a variable
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapEnvRepository {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EnvRepository for MapEnvRepository {
    fn get(&self, key: &str) -> String {
        self.vars.get(key).cloned().unwrap_or_default()
    }

    fn environ(&self) -> Vec<(OsString, OsString)> {
        self.vars
            .iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect()
    }
}
