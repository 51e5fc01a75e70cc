use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::resolve::Resolver;

/// Runtime settings loaded from an optional TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub resolve: ResolveSettings,
    pub inspect: InspectSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolveSettings {
    /// Substitute interfaces and aliases for reference tokens in output.
    pub enabled: bool,
    /// Abort when resolutions nest deeper than this; unlimited when unset.
    ///
    /// Interface and alias lookups only nest one level, so `0` turns every
    /// match into an error and any larger value has no effect.
    pub max_depth: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InspectSettings {
    /// Default depth for `inspect` when `--depth` is not given.
    pub depth: usize,
}

impl Default for ResolveSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_depth: None,
        }
    }
}

impl Default for InspectSettings {
    fn default() -> Self {
        Self { depth: 3 }
    }
}

impl Settings {
    /// Resolver honouring the configured nesting limit.
    pub fn resolver(&self) -> Resolver {
        match self.resolve.max_depth {
            Some(limit) => Resolver::with_max_depth(limit),
            None => Resolver::new(),
        }
    }
}

/// Errors returned when loading a settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Load settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<Settings, SettingsError> {
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_settings(&raw, path.display().to_string())
}

fn parse_settings(raw: &str, path: String) -> Result<Settings, SettingsError> {
    toml::from_str(raw).map_err(|source| SettingsError::Parse { path, source })
}

#[cfg(test)]
mod tests {
    use super::{parse_settings, Settings, SettingsError};

    #[test]
    fn empty_file_yields_defaults() {
        let settings = parse_settings("", "inline".to_string()).expect("parse");
        assert_eq!(settings, Settings::default());
        assert!(settings.resolve.enabled);
        assert_eq!(settings.inspect.depth, 3);
    }

    #[test]
    fn reads_partial_sections() {
        let settings = parse_settings(
            "[resolve]\nmax_depth = 8\n\n[inspect]\ndepth = 1\n",
            "inline".to_string(),
        )
        .expect("parse");
        assert!(settings.resolve.enabled);
        assert_eq!(settings.resolve.max_depth, Some(8));
        assert_eq!(settings.inspect.depth, 1);
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = parse_settings("[resolve]\ncache = true\n", "inline".to_string())
            .expect_err("unknown key");
        assert!(matches!(err, SettingsError::Parse { .. }));
    }
}
