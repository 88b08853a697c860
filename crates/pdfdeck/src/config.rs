use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::geometry::Size;
use crate::render::transition::{ReversalStrategy, TransitionKind, TransitionSpec};

const FILENAME: &str = "config.yaml";
const APP_DIR: &str = "pdfdeck";

pub const DEFAULT_WINDOW: Size = Size::new(794, 1123);
pub const DEFAULT_SPOTLIGHT_RADIUS: i32 = 100;
pub const DEFAULT_CACHE_DIR: &str = "pdf_images";

/// User-level defaults, stored as YAML in the platform config directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_height: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spotlight_radius: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

/// Where a presentation opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    First,
    Overview,
    /// 1-indexed slide number.
    Slide(usize),
}

impl StartMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "first" => Some(Self::First),
            "overview" => Some(Self::Overview),
            n => n.parse().ok().filter(|&n| n > 0).map(Self::Slide),
        }
    }
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join(APP_DIR).join(FILENAME))
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::anyhow!("No config found. Run `pdfdeck config show` to see defaults.")
            } else {
                anyhow::anyhow!("Failed to read config: {e}")
            }
        })?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        let contents = format!("# pdfdeck configuration\n{yaml}");
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let pixels = |name: &str| -> Result<u32> {
            match value.parse::<u32>() {
                Ok(n) if n >= 100 => Ok(n),
                _ => anyhow::bail!("Invalid {name}: {value}. Must be a whole number of at least 100."),
            }
        };
        match key {
            "defaults.window_width" => {
                let n = pixels("window width")?;
                self.defaults
                    .get_or_insert_with(DefaultsConfig::default)
                    .window_width = Some(n);
            }
            "defaults.window_height" => {
                let n = pixels("window height")?;
                self.defaults
                    .get_or_insert_with(DefaultsConfig::default)
                    .window_height = Some(n);
            }
            "defaults.spotlight_radius" => {
                let n = match value.parse::<u32>() {
                    Ok(n) if n >= 10 => n,
                    _ => anyhow::bail!(
                        "Invalid spotlight_radius: {value}. Must be a whole number of at least 10."
                    ),
                };
                self.defaults
                    .get_or_insert_with(DefaultsConfig::default)
                    .spotlight_radius = Some(n);
            }
            "defaults.start_mode" => {
                if StartMode::parse(value).is_none() {
                    anyhow::bail!(
                        "Invalid start_mode: {value}. Must be 'first', 'overview', or a slide number."
                    );
                }
                self.defaults
                    .get_or_insert_with(DefaultsConfig::default)
                    .start_mode = Some(value.to_string());
            }
            "defaults.cache_dir" => {
                if value.trim().is_empty() {
                    anyhow::bail!("Invalid cache_dir: must not be empty.");
                }
                self.defaults
                    .get_or_insert_with(DefaultsConfig::default)
                    .cache_dir = Some(PathBuf::from(value));
            }
            _ => anyhow::bail!(
                "Unknown config key: {key}. Valid keys: defaults.window_width, defaults.window_height, defaults.spotlight_radius, defaults.start_mode, defaults.cache_dir"
            ),
        }
        Ok(())
    }

    pub fn window_size(&self) -> Size {
        let d = self.defaults.as_ref();
        let width = d.and_then(|d| d.window_width).map(|w| w as i32);
        let height = d.and_then(|d| d.window_height).map(|h| h as i32);
        Size::new(
            width.unwrap_or(DEFAULT_WINDOW.width),
            height.unwrap_or(DEFAULT_WINDOW.height),
        )
    }

    pub fn spotlight_radius(&self) -> i32 {
        self.defaults
            .as_ref()
            .and_then(|d| d.spotlight_radius)
            .map_or(DEFAULT_SPOTLIGHT_RADIUS, |r| r as i32)
    }

    pub fn start_mode(&self) -> StartMode {
        self.defaults
            .as_ref()
            .and_then(|d| d.start_mode.as_deref())
            .and_then(StartMode::parse)
            .unwrap_or(StartMode::First)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.defaults
            .as_ref()
            .and_then(|d| d.cache_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR))
    }
}

/// One entry of a transitions file, as written.
#[derive(Debug, Default, Deserialize)]
struct RawTransition {
    transition: Option<String>,
    #[serde(rename = "transition-duration")]
    duration: Option<serde_json::Value>,
    #[serde(rename = "reversal-strategy")]
    reversal: Option<String>,
}

/// Per-slide transition settings with a deck-wide default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionsConfig {
    pub general: TransitionSpec,
    /// Overrides keyed by the page index being navigated to.
    pub slides: BTreeMap<usize, TransitionSpec>,
}

impl TransitionsConfig {
    /// `<stem>.json` next to the PDF.
    pub fn path_for(pdf: &Path) -> PathBuf {
        pdf.with_extension("json")
    }

    /// Load `explicit` if given (it must exist), else the file implied by `pdf`, else the
    /// built-in defaults.
    pub fn resolve(pdf: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                anyhow::bail!("Config file '{}' does not exist.", path.display());
            }
            return Self::load(path);
        }
        let implied = Self::path_for(pdf);
        if implied.exists() {
            Self::load(&implied)
        } else {
            log::warn!(
                "No transition config at {}, using default transitions",
                implied.display()
            );
            Ok(Self::default())
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::from_json(&contents)
            .with_context(|| format!("Invalid transition config {}", path.display()))?;
        log::info!(
            "Transitions from {}: {} by default, {} going back, {} slide override(s)",
            path.display(),
            config.general.kind.name(),
            config.general.reversal.name(),
            config.slides.len()
        );
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let raw: HashMap<String, RawTransition> = serde_json::from_str(json)?;
        let builtin = TransitionSpec::default();
        let general = match raw.get("General") {
            Some(entry) => parse_entry(entry, &builtin).context("In \"General\"")?,
            None => builtin,
        };

        let mut slides = BTreeMap::new();
        for (key, entry) in &raw {
            if key == "General" {
                continue;
            }
            let Some(index) = key
                .strip_prefix("Slide ")
                .and_then(|n| n.trim().parse::<usize>().ok())
            else {
                log::warn!("Ignoring unknown transition config entry \"{key}\"");
                continue;
            };
            let spec = parse_entry(entry, &general).with_context(|| format!("In \"{key}\""))?;
            slides.insert(index, spec);
        }
        Ok(Self { general, slides })
    }

    /// Settings for navigating to `page`.
    pub fn spec_for(&self, page: usize) -> TransitionSpec {
        self.slides.get(&page).copied().unwrap_or(self.general)
    }
}

/// Fill an entry's fields, taking anything left out from `fallback`.
fn parse_entry(entry: &RawTransition, fallback: &TransitionSpec) -> Result<TransitionSpec> {
    let kind = match entry.transition.as_deref() {
        Some(name) => TransitionKind::from_name(name).ok_or_else(|| {
            let valid: Vec<_> = TransitionKind::all().iter().map(|k| k.name()).collect();
            anyhow::anyhow!("Unknown transition: {name}. Must be one of {}.", valid.join(", "))
        })?,
        None => fallback.kind,
    };
    let duration = match &entry.duration {
        Some(serde_json::Value::String(s)) => parse_duration(s)?,
        Some(serde_json::Value::Number(n)) => {
            seconds(n.as_f64().unwrap_or_default(), &n.to_string())?
        }
        Some(other) => anyhow::bail!("Invalid transition-duration: {other}"),
        None => fallback.duration,
    };
    let reversal = match entry.reversal.as_deref() {
        Some(name) => ReversalStrategy::from_name(name).ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown reversal-strategy: {name}. Must be 'invert-transition', 'keep-original', or 'none'."
            )
        })?,
        None => fallback.reversal,
    };
    Ok(TransitionSpec {
        kind,
        duration,
        reversal,
    })
}

/// Parse `"1.5s"` or `"1.5"` into a positive duration.
pub fn parse_duration(text: &str) -> Result<Duration> {
    let trimmed = text.trim();
    let number = trimmed.strip_suffix('s').unwrap_or(trimmed).trim();
    let value: f64 = number
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid transition-duration: \"{text}\""))?;
    seconds(value, text)
}

fn seconds(value: f64, text: &str) -> Result<Duration> {
    if !value.is_finite() || value <= 0.0 {
        anyhow::bail!("Invalid transition-duration: \"{text}\". Must be greater than zero.");
    }
    Ok(Duration::from_secs_f64(value))
}
