use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};
use crate::export::TemplateSpec;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default = "default_export_prefix")]
    pub export_prefix: String,
    #[serde(default)]
    pub template_path: Option<String>,
    #[serde(default = "default_template_sheet")]
    pub template_sheet: String,
    #[serde(default = "default_template_table")]
    pub template_table: String,
}

fn default_export_prefix() -> String {
    "Expense_Report".to_string()
}

fn default_template_sheet() -> String {
    "Data".to_string()
}

fn default_template_table() -> String {
    "DataTable".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            export_prefix: default_export_prefix(),
            template_path: None,
            template_sheet: default_template_sheet(),
            template_table: default_template_table(),
        }
    }
}

impl Settings {
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("propex.db")
    }

    pub fn export_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("exports")
    }

    pub fn template(&self) -> TemplateSpec {
        TemplateSpec {
            sheet: self.template_sheet.clone(),
            table: self.template_table.clone(),
        }
    }

    /// Read the configured template file, if one is set.
    pub fn template_bytes(&self) -> Result<Option<Vec<u8>>> {
        match &self.template_path {
            Some(path) => Ok(Some(std::fs::read(path)?)),
            None => Ok(None),
        }
    }
}

/// Overrides where settings live; handy for tests and side-by-side installs.
pub const CONFIG_DIR_ENV: &str = "PROPEX_CONFIG_DIR";

/// `$PROPEX_CONFIG_DIR`, else the platform config dir (`~/.config` on Linux,
/// `~/Library/Application Support` on macOS), each with `propex` appended.
pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("propex")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("propex")
}

/// Settings stored at `path`. A missing file gives the defaults; an
/// unreadable or malformed one is an error.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| ReportError::Settings(format!("{}: {e}", path.display())))
}

/// Settings from [`settings_path`], falling back to the defaults (with a
/// warning) when the file cannot be used.
pub fn load_settings() -> Settings {
    load_settings_from(&settings_path()).unwrap_or_else(|e| {
        warn!("ignoring settings: {e}");
        Settings::default()
    })
}

/// Write `settings` to `path` through a temp file in the same directory.
pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| ReportError::Settings(e.to_string()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    writeln!(tmp, "{json}")?;
    tmp.persist(path).map_err(|e| ReportError::Io(e.error))?;
    debug!("saved settings to {}", path.display());
    Ok(())
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(&settings_path(), settings)
}
