//! # Themes
//!
//! A theme is a directory under `themes.dir` holding the page assets and a
//! `theme.toml` descriptor:
//!
//! ```toml
//! name = "Agency"
//! short_name = "agency"
//! description = "One page agency theme"
//! link = "https://startbootstrap.com/theme/agency"
//! file_name = "agency.html"
//! original_file_name = "index.html"
//! ```
//!
//! Sites select a theme by `short_name`.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::common::config::load_config;
use crate::common::Result;

pub const DESCRIPTOR: &str = "theme.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub short_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
    pub file_name: String,
    #[serde(default)]
    pub original_file_name: String,
    /// Directory holding the theme, filled in when loading
    #[serde(default)]
    pub dir_name: String,
}

impl Theme {
    /// Base URL of the theme assets.
    pub fn url(&self, host: &str, url_path: &str) -> String {
        format!("{}/{}/{}/", host, url_path.trim_matches('/'), self.dir_name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ThemeRegistry {
    themes: BTreeMap<String, Theme>,
}

impl ThemeRegistry {
    /// Scan `dir` for theme directories. A missing directory gives an empty registry;
    /// unreadable descriptors are skipped with a warning.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut themes = BTreeMap::new();
        if !dir.is_dir() {
            warn!("Theme directory {} not found", dir.display());
            return Ok(Self { themes });
        }

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let descriptor = entry.path().join(DESCRIPTOR);
            if !descriptor.is_file() {
                continue;
            }

            match load_config::<Theme>(&descriptor.to_string_lossy()) {
                Ok(mut theme) => {
                    theme.dir_name = entry.file_name().to_string_lossy().into_owned();
                    themes.insert(theme.short_name.clone(), theme);
                }
                Err(e) => warn!("Skipping theme: {}", e),
            }
        }

        info!("🎨 Loaded {} themes from {}", themes.len(), dir.display());
        Ok(Self { themes })
    }

    pub fn get(&self, short_name: &str) -> Option<&Theme> {
        self.themes.get(short_name)
    }

    pub fn contains(&self, short_name: &str) -> bool {
        self.themes.contains_key(short_name)
    }

    /// Themes sorted by short name.
    pub fn list(&self) -> Vec<&Theme> {
        self.themes.values().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.themes.is_empty()
    }
}
