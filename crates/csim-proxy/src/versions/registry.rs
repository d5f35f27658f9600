//! API versions and the facade each one serves.

use crate::domain::{ApiVersionsConfig, ConfigError};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Endpoint groups, named by the first segment of their routes
pub const ENDPOINT_GROUPS: &[&str] = &[
    "about",
    "address",
    "block",
    "blocks",
    "hyperblock",
    "network",
    "node",
    "proof",
    "status",
    "transaction",
    "validator",
    "vm-values",
];

/// `v<digits>_<digits>` or `v_next`
pub fn looks_like_version(token: &str) -> bool {
    if token == "v_next" {
        return true;
    }
    let Some(rest) = token.strip_prefix('v') else {
        return false;
    };
    match rest.split_once('_') {
        Some((major, minor)) => {
            !major.is_empty()
                && !minor.is_empty()
                && major.bytes().all(|b| b.is_ascii_digit())
                && minor.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

/// One registered version
pub struct VersionEntry<F> {
    facade: Arc<F>,
    disabled_groups: BTreeSet<String>,
}

impl<F> VersionEntry<F> {
    pub fn new(facade: Arc<F>, disabled_groups: impl IntoIterator<Item = String>) -> Self {
        Self {
            facade,
            disabled_groups: disabled_groups.into_iter().collect(),
        }
    }

    pub fn facade(&self) -> &Arc<F> {
        &self.facade
    }

    pub fn is_group_enabled(&self, group: &str) -> bool {
        !self.disabled_groups.contains(group)
    }

    pub fn disabled_groups(&self) -> &BTreeSet<String> {
        &self.disabled_groups
    }
}

/// Version name -> facade, with a default for everything else
pub struct VersionsRegistry<F> {
    versions: BTreeMap<String, Arc<VersionEntry<F>>>,
    default_name: String,
    default_entry: Arc<VersionEntry<F>>,
}

impl<F> VersionsRegistry<F> {
    /// Build one entry per configured version, asking `facade_for` for its facade
    pub fn from_config(
        config: &ApiVersionsConfig,
        mut facade_for: impl FnMut(&str) -> Arc<F>,
    ) -> Result<Self, ConfigError> {
        let mut versions = BTreeMap::new();
        for version in &config.versions {
            if let Some(group) = version
                .disabled_groups
                .iter()
                .find(|group| !ENDPOINT_GROUPS.contains(&group.as_str()))
            {
                return Err(ConfigError::InvalidVersions(format!(
                    "version `{}` disables unknown endpoint group `{}`",
                    version.name, group
                )));
            }

            let entry = VersionEntry::new(
                facade_for(&version.name),
                version.disabled_groups.iter().cloned(),
            );
            if versions.insert(version.name.clone(), Arc::new(entry)).is_some() {
                return Err(ConfigError::InvalidVersions(format!(
                    "duplicate version `{}`",
                    version.name
                )));
            }
        }

        let default_entry = versions
            .get(&config.default_version)
            .cloned()
            .ok_or_else(|| {
                ConfigError::InvalidVersions(format!(
                    "default version `{}` is not registered",
                    config.default_version
                ))
            })?;

        Ok(Self {
            versions,
            default_name: config.default_version.clone(),
            default_entry,
        })
    }

    pub fn default_version(&self) -> &str {
        &self.default_name
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.versions.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<VersionEntry<F>>> {
        self.versions.get(name)
    }

    /// Every registered version, sorted by name
    pub fn get_all_versions(&self) -> impl Iterator<Item = (&str, &Arc<VersionEntry<F>>)> {
        self.versions.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Unknown or missing versions resolve to the default
    pub fn resolve(&self, version: Option<&str>) -> (&str, &Arc<VersionEntry<F>>) {
        match version.and_then(|name| self.versions.get_key_value(name)) {
            Some((name, entry)) => (name.as_str(), entry),
            None => (self.default_name.as_str(), &self.default_entry),
        }
    }
}
