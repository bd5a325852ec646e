//! Configuration system for krane
//!
//! Loads configuration from TOML file at `~/.config/krane/config.toml`
//! Auto-generates default config file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::wm::binding::KeyBindings;
use crate::wm::decoration::{ColorScheme, Palette};
use crate::wm::layout::default_layout_dir;
use crate::wm::selector::ClientSelector;

/// Highest number of contexts; they are addressed by the letters a..i
pub const MAX_CONTEXTS: usize = 9;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub workspaces: WorkspacesConfig,
    pub colors: ColorsConfig,
    pub behavior: BehaviorConfig,
    pub consume: ConsumeConfig,
    pub keys: Vec<KeyConfig>,
}

impl Config {
    /// Load configuration from file, falling back to defaults when the
    /// file is missing or cannot be parsed
    pub fn load() -> Self {
        match Self::config_path().and_then(|path| Self::load_from(&path)) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        }
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            // Auto-generate default config file
            if let Err(e) = Self::save_default(config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Configuration loaded from {:?}", config_path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("krane");

        Ok(config_dir.join("config.toml"))
    }

    /// Save default configuration to file
    fn save_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(&Self::default())
            .context("Failed to serialize default config")?;

        fs::write(path, toml_string).context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }

    pub fn palette(&self) -> Palette {
        Palette {
            border: self.colors.border,
            frame: self.colors.frame,
        }
    }

    /// Number of contexts, clamped to 1..=9
    pub fn context_count(&self) -> usize {
        self.workspaces.contexts.clamp(1, MAX_CONTEXTS)
    }

    /// Workspace names, never empty
    pub fn workspace_names(&self) -> Vec<String> {
        if self.workspaces.names.is_empty() {
            WorkspacesConfig::default().names
        } else {
            self.workspaces.names.clone()
        }
    }

    pub fn layout_dir(&self) -> PathBuf {
        self.behavior
            .layout_dir
            .clone()
            .unwrap_or_else(default_layout_dir)
    }

    /// Key bindings from `[[keys]]`, or the built-in set when none are
    /// configured. Broken entries are skipped.
    pub fn key_bindings(&self) -> KeyBindings {
        if self.keys.is_empty() {
            return KeyBindings::defaults();
        }

        let mut bindings = KeyBindings::new();

        for entry in &self.keys {
            let result = match (&entry.command, &entry.spawn) {
                (Some(command), None) => bindings.bind_command(&entry.key, command),
                (None, Some(spawn)) => bindings.bind_spawn(&entry.key, spawn),
                _ => Err(anyhow::anyhow!("expected exactly one of command or spawn")),
            };

            if let Err(e) = result {
                warn!("Skipping key binding {}: {}", entry.key, e);
            }
        }

        bindings
    }

    pub fn ignore_producers(&self) -> Vec<ClientSelector> {
        parse_selectors(&self.consume.ignore_producers)
    }

    pub fn ignore_consumers(&self) -> Vec<ClientSelector> {
        parse_selectors(&self.consume.ignore_consumers)
    }
}

fn parse_selectors(raw: &[String]) -> Vec<ClientSelector> {
    raw.iter()
        .filter_map(|selector| match selector.parse() {
            Ok(selector) => Some(selector),
            Err(e) => {
                warn!("Skipping selector {}: {}", selector, e);
                None
            }
        })
        .collect()
}

/// Workspace and context configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspacesConfig {
    /// Workspace names, shared by every context
    pub names: Vec<String>,
    /// Number of contexts (1-9)
    pub contexts: usize,
}

impl Default for WorkspacesConfig {
    fn default() -> Self {
        Self {
            names: (1..=9).map(|i| i.to_string()).collect(),
            contexts: MAX_CONTEXTS,
        }
    }
}

/// Border and frame colors, one per client state (hex: 0xRRGGBB)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    pub border: ColorScheme,
    pub frame: ColorScheme,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self {
            border: ColorScheme::DEFAULT_BORDER,
            frame: ColorScheme::DEFAULT_FRAME,
        }
    }
}

/// Window behavior configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Focus clients when the pointer enters them
    pub focus_follows_mouse: bool,
    /// Warp the pointer into newly focused clients
    pub warp_pointer: bool,
    /// Directory for saved layout slots
    pub layout_dir: Option<PathBuf>,
}

/// Window swallowing configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumeConfig {
    /// Selectors (`class=st`, `name~vim`, ...) of clients that never
    /// get swallowed
    pub ignore_producers: Vec<String>,
    /// Selectors of clients that never swallow their producer
    pub ignore_consumers: Vec<String>,
}

/// One `[[keys]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyConfig {
    pub key: String,
    pub command: Option<String>,
    pub spawn: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::binding::{KeyAction, KeyInput, Modifiers};
    use crate::wm::command::Command;

    #[test]
    fn test_default_round_trip() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let config: Config = toml::from_str(&text).unwrap();
        assert_eq!(config.workspace_names().len(), 9);
        assert_eq!(config.context_count(), 9);
        assert_eq!(config.palette(), Palette::default());
    }

    #[test]
    fn test_partial_file() {
        let config: Config = toml::from_str(
            r#"
            [workspaces]
            contexts = 20

            [behavior]
            focus_follows_mouse = true

            [consume]
            ignore_producers = ["class=st", "bogus"]

            [[keys]]
            key = "Mod4-x"
            command = "toggle_float"

            [[keys]]
            key = "Mod4-y"
            command = "no_such_command"
            "#,
        )
        .unwrap();

        assert_eq!(config.context_count(), MAX_CONTEXTS);
        assert!(config.behavior.focus_follows_mouse);
        assert_eq!(config.workspace_names().len(), 9);
        assert_eq!(config.ignore_producers().len(), 1);

        let bindings = config.key_bindings();
        assert_eq!(bindings.len(), 1);
        assert_eq!(
            bindings.get(&KeyInput::new("x", Modifiers::SUPER)),
            Some(&KeyAction::Command(Command::ToggleFloat))
        );
    }

    #[test]
    fn test_missing_file_writes_default() {
        let dir = std::env::temp_dir().join(format!("krane-config-{}", std::process::id()));
        let path = dir.join("config.toml");
        let _ = fs::remove_dir_all(&dir);

        let config = Config::load_from(&path).unwrap();
        assert!(config.keys.is_empty());
        assert!(path.exists());

        let _ = fs::remove_dir_all(&dir);
    }
}
