use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use crate::model::WindowIdentity;

pub const DEFAULT_SERVICE_UUID: &str = "layouts-service";

pub fn config_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".config")
        .join("layouts")
        .join("config.toml")
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Uuid of the service's own application. Its windows never take part in
    /// groups or workspaces.
    #[serde(default = "default_service_uuid")]
    pub service_uuid: String,
    /// How long to wait for a client to answer a custom-data request.
    #[serde(default = "default_client_timeout_ms")]
    pub client_timeout_ms: u64,
    #[serde(default)]
    pub snap: SnapSettings,
    #[serde(default)]
    pub tabs: TabSettings,
    #[serde(default)]
    pub features: Features,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_uuid: default_service_uuid(),
            client_timeout_ms: default_client_timeout_ms(),
            snap: SnapSettings::default(),
            tabs: TabSettings::default(),
            features: Features::default(),
        }
    }
}

impl Settings {
    pub fn client_timeout(&self) -> Duration { Duration::from_millis(self.client_timeout_ms) }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.service_uuid.trim().is_empty() {
            issues.push("service_uuid must not be empty".to_string());
        }
        if self.client_timeout_ms == 0 {
            issues.push("client_timeout_ms must be positive".to_string());
        }

        issues.extend(self.snap.validate());
        issues.extend(self.tabs.validate());

        issues
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct SnapSettings {
    /// Two edges closer than this many pixels count as the same edge.
    #[serde(default = "default_edge_tolerance")]
    pub edge_tolerance: f64,
}

impl Default for SnapSettings {
    fn default() -> Self { Self { edge_tolerance: default_edge_tolerance() } }
}

impl SnapSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.edge_tolerance <= 0.0 {
            issues.push(format!(
                "snap.edge_tolerance must be positive, got {}",
                self.edge_tolerance
            ));
        }
        issues
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct TabSettings {
    /// Height of the tab strip placed above the active tab.
    #[serde(default = "default_tab_strip_height")]
    pub tab_strip_height: f64,
}

impl Default for TabSettings {
    fn default() -> Self { Self { tab_strip_height: default_tab_strip_height() } }
}

impl TabSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.tab_strip_height < 0.0 {
            issues.push(format!(
                "tabs.tab_strip_height must be non-negative, got {}",
                self.tab_strip_height
            ));
        }
        issues
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Features {
    #[serde(default = "yes")]
    pub dock: bool,
}

impl Default for Features {
    fn default() -> Self { Self { dock: true } }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct FeatureOverrides {
    pub dock: Option<bool>,
}

/// Overrides features for one application, or one window when `name` is set.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct ScopeRule {
    pub uuid: String,
    pub name: Option<String>,
    #[serde(default)]
    pub features: FeatureOverrides,
}

impl ScopeRule {
    fn matches(&self, identity: &WindowIdentity) -> bool {
        self.uuid == identity.uuid && self.name.as_ref().is_none_or(|name| *name == identity.name)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub scopes: Vec<ScopeRule>,
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&buf)
    }

    /// Reads `path` if it exists, otherwise the built-in defaults.
    pub fn read_or_default(path: &Path) -> anyhow::Result<Config> {
        if path.exists() { Self::read(path) } else { Self::default_config() }
    }

    pub fn default_config() -> anyhow::Result<Config> {
        Self::parse(include_str!("../../layouts.default.toml"))
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        let config: Config = match toml::from_str(buf) {
            Ok(config) => config,
            Err(e) => bail!("{e}"),
        };
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml_string.as_bytes())?;

        Ok(())
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = self.settings.validate();

        for (i, scope) in self.scopes.iter().enumerate() {
            if scope.uuid.trim().is_empty() {
                issues.push(format!("scopes[{i}].uuid must not be empty"));
            }
            if scope.uuid == self.settings.service_uuid {
                issues.push(format!(
                    "scopes[{i}] targets the service itself ({})",
                    self.settings.service_uuid
                ));
            }
        }

        issues
    }

    /// Whether `identity` may be docked into a snap group. Window scopes win
    /// over application scopes, which win over the global default.
    pub fn dock_enabled(&self, identity: &WindowIdentity) -> bool {
        let window_rule = self
            .scopes
            .iter()
            .filter(|s| s.name.is_some() && s.matches(identity))
            .find_map(|s| s.features.dock);
        let app_rule = self
            .scopes
            .iter()
            .filter(|s| s.name.is_none() && s.matches(identity))
            .find_map(|s| s.features.dock);
        window_rule.or(app_rule).unwrap_or(self.settings.features.dock)
    }
}

fn yes() -> bool { true }

fn default_service_uuid() -> String { DEFAULT_SERVICE_UUID.to_string() }

fn default_client_timeout_ms() -> u64 { 2000 }

fn default_edge_tolerance() -> f64 { 0.5 }

fn default_tab_strip_height() -> f64 { 60.0 }
