//! Configuration management.
//!
//! All application data lives under `~/.config/hoprx/`:
//!
//! ```text
//! ~/.config/hoprx/
//!   config.ini          — User configuration
//! ```
//!
//! Captures are never persisted by this tool; it only reads them.

use anyhow::{Context, Result};
use configparser::ini::Ini;
use std::fs;
use std::path::PathBuf;

// ─── Config ──────────────────────────────────────────────────────────────────

/// Record rendering selected on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pick table on a TTY, jsonl on a pipe.
    Auto,
    Table,
    Jsonl,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(OutputFormat::Auto),
            "table" => Some(OutputFormat::Table),
            "jsonl" | "json" => Some(OutputFormat::Jsonl),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Auto => "auto",
            OutputFormat::Table => "table",
            OutputFormat::Jsonl => "jsonl",
        }
    }
}

/// Application configuration loaded from `~/.config/hoprx/config.ini`
#[derive(Debug, Clone)]
pub struct Config {
    // [output]
    /// How decoded records are rendered on stdout.
    pub format: OutputFormat,

    // [decoder]
    /// Enabled profile names, in dispatch order.
    pub profiles: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            format: OutputFormat::Auto,
            profiles: vec![
                "hcs200".to_string(),
                "hcs200-fsk".to_string(),
                "intellicode".to_string(),
            ],
        }
    }
}

impl Config {
    /// Load config from an INI file, falling back to defaults for missing keys.
    fn load_from_ini(path: &std::path::Path) -> Result<Self> {
        let mut ini = Ini::new();
        ini.load(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        let defaults = Config::default();

        let format = ini
            .get("output", "format")
            .and_then(|s| OutputFormat::parse(&s))
            .unwrap_or(defaults.format);

        let profiles = ini
            .get("decoder", "profiles")
            .map(|s| {
                s.split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.profiles);

        Ok(Self { format, profiles })
    }

    /// Save config to an INI-style file with comments explaining each field.
    fn save_to_ini(&self, path: &std::path::Path) -> Result<()> {
        let content = format!(
            r#"; hoprx — KeeLoq HCS200/HCS300 remote decoder configuration
; Location: {path}
;
; Edit this file to change default settings.
; Lines starting with ; or # are comments.

[output]
; How decoded records are rendered on stdout.
;   auto  — table when stdout is a terminal, jsonl when piped
;   table — aligned key/value block per record
;   jsonl — one JSON object per record
format = {format}

[decoder]
; Decoder profiles to try, in order. Available:
;   hcs200      — standard HCS200/HCS300 timing, OOK carrier
;   hcs200-fsk  — standard timing, FSK carrier
;   intellicode — Genie / Overhead Door, double baud
profiles = {profiles}
"#,
            path = path.display(),
            format = self.format.as_str(),
            profiles = self.profiles.join(","),
        );

        fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        Ok(())
    }
}

/// Resolve the hoprx config directory to `~/.config/hoprx/` regardless of OS.
pub fn resolve_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("hoprx"))
}

// ─── Storage ─────────────────────────────────────────────────────────────────

/// Storage manager for configuration.
///
/// On construction it ensures `~/.config/hoprx/` exists, then loads
/// `config.ini` or writes a commented default one.
pub struct Storage {
    /// Base config directory (~/.config/hoprx)
    config_dir: PathBuf,
    /// Configuration
    pub config: Config,
}

impl Storage {
    pub fn new() -> Result<Self> {
        let config_dir = resolve_config_dir()
            .context("Could not determine home directory (is $HOME set?)")?;

        let config_path = config_dir.join("config.ini");

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config dir: {:?}", config_dir))?;
            tracing::info!("Created config directory: {:?}", config_dir);
        }

        let config = if config_path.exists() {
            tracing::debug!("Loading config from {:?}", config_path);
            match Config::load_from_ini(&config_path) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!("Failed to parse config.ini, using defaults: {}", e);
                    Config::default()
                }
            }
        } else {
            tracing::info!("No config.ini found — creating default at {:?}", config_path);
            let config = Config::default();
            if let Err(e) = config.save_to_ini(&config_path) {
                tracing::warn!("Could not write default config.ini: {}", e);
            }
            config
        };

        Ok(Self { config_dir, config })
    }

    /// Save the current configuration back to `config.ini`.
    #[allow(dead_code)]
    pub fn save_config(&self) -> Result<()> {
        let config_path = self.config_dir.join("config.ini");
        self.config.save_to_ini(&config_path)?;
        tracing::info!("Saved config to {:?}", config_path);
        Ok(())
    }

    #[allow(dead_code)]
    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }
}
