//! Configuration system for Wisp
//!
//! Loads configuration from TOML file at `~/.config/wisp/config.toml`
//! Auto-generates default config file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Frame border width in pixels
    pub border_width: i32,
    /// Snap distance in pixels, 0 disables snapping
    pub snap: i32,
    /// Number of virtual desktops
    pub vdesks: u32,
    /// Move windows while dragging rather than on release
    pub solid_drag: bool,
    /// Warp the pointer into a window focused with `next`
    pub warp_pointer: bool,
    /// Font for annotations
    pub font: String,
    pub colours: ColourConfig,
    pub keys: KeysConfig,
    pub annotations: AnnotationsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            border_width: 1,
            snap: 0,
            vdesks: 8,
            solid_drag: true,
            warp_pointer: false,
            font: "fixed".to_string(),
            colours: ColourConfig::default(),
            keys: KeysConfig::default(),
            annotations: AnnotationsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, or use defaults if file doesn't exist
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            // Auto-generate default config file
            if let Err(e) = Self::save_default(&config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config = Self::parse(&content)?;

        info!("Configuration loaded from {:?}", config_path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Parse and sanity-check a configuration document.
    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content).context("Failed to parse config file")?;
        if config.vdesks == 0 {
            warn!("vdesks must be at least 1, using 1");
            config.vdesks = 1;
        }
        config.border_width = config.border_width.max(0);
        config.snap = config.snap.max(0);
        Ok(config)
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("wisp");

        Ok(config_dir.join("config.toml"))
    }

    /// Save default configuration to file
    fn save_default(path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let default_config = Self::default();
        let toml_string =
            toml::to_string_pretty(&default_config).context("Failed to serialize default config")?;

        fs::write(path, toml_string).context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }
}

/// Border colours (hex: 0xRRGGBB)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColourConfig {
    /// Focused client
    pub fg: u32,
    /// Unfocused clients
    pub bg: u32,
    /// Focused client fixed to all desktops
    pub fc: u32,
}

impl Default for ColourConfig {
    fn default() -> Self {
        Self {
            fg: 0xdaa520, // goldenrod
            bg: 0x7f7f7f, // grey50
            fc: 0x0000ff, // blue
        }
    }
}

/// Keyboard and mouse bindings
///
/// Modifier lists use X11 names: `Shift`, `Lock`, `Control`, `Mod1`..`Mod5`.
/// Key names are keysym names such as `a`, `equal` or `Insert`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// Modifiers for most key bindings
    pub modifiers: Vec<String>,
    /// Modifiers for the `next` binding
    pub next_modifiers: Vec<String>,
    /// Held during a drag to suppress snapping, or during a sweep to resize
    /// a maximised axis
    pub alt_modifiers: Vec<String>,
    /// Modifiers for the mouse buttons on client windows
    pub button_modifiers: Vec<String>,

    pub next: String,
    pub lower: String,
    /// Close the current client; with the alt modifiers, kill it
    pub close: String,
    pub info: String,
    pub fix: String,
    pub maximise: String,
    pub maximise_vert: String,
    pub fullscreen: String,
    pub exchange: String,
    pub docks: String,
    pub expand: String,
    pub prev_desktop: String,
    pub next_desktop: String,
    pub toggle_desktop: String,

    /// Move the current client; with the alt modifiers, resize it
    pub move_left: String,
    pub move_right: String,
    pub move_up: String,
    pub move_down: String,

    /// Send the current client to a corner of its output
    pub top_left: String,
    pub top_right: String,
    pub bottom_left: String,
    pub bottom_right: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        let names = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            modifiers: names(&["Control", "Mod1"]),
            next_modifiers: names(&["Mod1"]),
            alt_modifiers: names(&["Shift"]),
            button_modifiers: names(&["Mod1"]),
            next: "Tab".to_string(),
            lower: "Insert".to_string(),
            close: "Escape".to_string(),
            info: "i".to_string(),
            fix: "f".to_string(),
            maximise: "x".to_string(),
            maximise_vert: "equal".to_string(),
            fullscreen: "g".to_string(),
            exchange: "e".to_string(),
            docks: "d".to_string(),
            expand: "w".to_string(),
            prev_desktop: "Left".to_string(),
            next_desktop: "Right".to_string(),
            toggle_desktop: "a".to_string(),
            move_left: "h".to_string(),
            move_right: "l".to_string(),
            move_up: "k".to_string(),
            move_down: "j".to_string(),
            top_left: "y".to_string(),
            top_right: "u".to_string(),
            bottom_left: "b".to_string(),
            bottom_right: "n".to_string(),
        }
    }
}

/// Strategy names for each annotation slot, or `"none"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationSlots {
    pub outline: String,
    pub info: String,
    pub cog: String,
}

impl AnnotationSlots {
    fn new(outline: &str, info: &str, cog: &str) -> Self {
        Self {
            outline: outline.to_string(),
            info: info.to_string(),
            cog: cog.to_string(),
        }
    }
}

impl Default for AnnotationSlots {
    fn default() -> Self {
        Self::new("none", "none", "none")
    }
}

/// Annotation strategies per usage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationsConfig {
    /// Shown while the info key is held
    pub info: AnnotationSlots,
    pub drag: AnnotationSlots,
    pub sweep: AnnotationSlots,
}

impl Default for AnnotationsConfig {
    fn default() -> Self {
        Self {
            info: AnnotationSlots::new("none", "banner", "none"),
            drag: AnnotationSlots::new("shape-outline", "xor-info", "shape-cog"),
            sweep: AnnotationSlots::new("shape-outline", "xor-info", "shape-cog"),
        }
    }
}
