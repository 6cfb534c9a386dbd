use std::{fs, io, path::Path};

use anyhow::Context;
use inventory::DisplayOptions;
use serde::Deserialize;
use shared::display::{
    DateDisplay, DEFAULT_BOX_UNFINISHED_LABEL, DEFAULT_DATE_FORMAT,
    DEFAULT_PALLET_UNFINISHED_LABEL,
};

pub const DEFAULT_CONFIG_FILE: &str = "pallets.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    pub date_format: String,
    pub pallet_unfinished_label: String,
    pub box_unfinished_label: String,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://pallets.db".into(),
            date_format: DEFAULT_DATE_FORMAT.into(),
            pallet_unfinished_label: DEFAULT_PALLET_UNFINISHED_LABEL.into(),
            box_unfinished_label: DEFAULT_BOX_UNFINISHED_LABEL.into(),
            log_filter: "warn".into(),
        }
    }
}

impl Settings {
    pub fn display_options(&self) -> DisplayOptions {
        DisplayOptions {
            pallets: DateDisplay::new(&self.date_format, &self.pallet_unfinished_label),
            boxes: DateDisplay::new(&self.date_format, &self.box_unfinished_label),
        }
    }
}

/// Keys accepted in the settings file; everything is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    database_url: Option<String>,
    date_format: Option<String>,
    pallet_unfinished_label: Option<String>,
    box_unfinished_label: Option<String>,
    log: Option<String>,
}

/// Defaults, then the settings file (when present), then the environment.
pub fn load_settings(config_path: &Path) -> anyhow::Result<Settings> {
    let raw = match fs::read_to_string(config_path) {
        Ok(raw) => Some(raw),
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(err) => {
            return Err(err).with_context(|| {
                format!("failed to read settings file '{}'", config_path.display())
            })
        }
    };
    let settings = settings_from(raw.as_deref(), |key| std::env::var(key).ok())
        .with_context(|| format!("invalid settings file '{}'", config_path.display()))?;
    Ok(settings)
}

fn settings_from(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        let file_cfg: FileSettings = toml::from_str(raw)?;
        if let Some(v) = file_cfg.database_url {
            settings.database_url = v;
        }
        if let Some(v) = file_cfg.date_format {
            settings.date_format = v;
        }
        if let Some(v) = file_cfg.pallet_unfinished_label {
            settings.pallet_unfinished_label = v;
        }
        if let Some(v) = file_cfg.box_unfinished_label {
            settings.box_unfinished_label = v;
        }
        if let Some(v) = file_cfg.log {
            settings.log_filter = v;
        }
    }

    if let Some(v) = env("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = env("APP__DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = env("APP__DATE_FORMAT") {
        settings.date_format = v;
    }
    if let Some(v) = env("APP__LOG") {
        settings.log_filter = v;
    }

    Ok(settings)
}

/// Turns a bare file path into a `sqlite://` URL; other URLs pass through.
pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
