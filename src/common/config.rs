//! # Configuration Utilities
//!
//! Configuration structures and the TOML loader used by the server binary.
//! Every section carries defaults, so a partial (or empty) file is accepted.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use super::error::{CmsError, Result};
use crate::mail::Mailbox;
use crate::processing::ImageSizes;

/// Load a TOML configuration file and deserialize it into the specified type.
///
/// # Arguments
/// - `path`: Path to the TOML configuration file
///
/// # Returns
/// - `Ok(T)`: Successfully loaded and parsed configuration
/// - `Err`: File I/O or parsing error
///
/// # Example
/// ```ignore
/// let config: CmsConfig = load_config("config/cms.toml")?;
/// ```
pub fn load_config<T>(path: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let content = fs::read_to_string(path)?;
    let config: T = toml::from_str(&content)
        .map_err(|e| CmsError::Config(format!("{}: {}", path, e)))?;
    Ok(config)
}

/// Complete configuration tree loaded from `config/cms.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsConfig {
    pub server: ServerSection,
    pub database: DatabaseConfig,
    pub images: ImagesConfig,
    pub session: SessionConfig,
    pub mail: MailConfig,
    pub bootstrap: BootstrapConfig,
    pub themes: ThemesConfig,
}

impl CmsConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        load_config(path)
    }
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Address the HTTP listener binds to (e.g., "0.0.0.0:8080")
    pub address: String,
    /// Origins allowed to call the API with credentials. Empty disables CORS.
    pub cors_origins: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:8080".to_string(),
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/cms.sqlite"),
        }
    }
}

/// Image storage and resize settings.
///
/// Sizes are bounding boxes: an image is shrunk until it fits, keeping its aspect ratio.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Root folder; each site stores its images under `site{id}/`
    pub dir: PathBuf,
    /// Public URL segment the images are served under
    pub url_path: String,
    pub original: (u32, u32),
    pub normalized: (u32, u32),
    pub thumbnail: (u32, u32),
    pub jpeg_quality: u8,
    /// Request body limit for uploads (bytes)
    pub max_upload_bytes: usize,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/img"),
            url_path: "img".to_string(),
            original: (1440, 1440),
            normalized: (480, 480),
            thumbnail: (240, 240),
            jpeg_quality: 90,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl ImagesConfig {
    pub fn sizes(&self) -> ImageSizes {
        ImageSizes {
            original: self.original,
            normalized: self.normalized,
            thumbnail: self.thumbnail,
        }
    }

    /// Folder holding the images of one site, created on demand.
    pub fn site_dir(&self, site_id: i64) -> Result<PathBuf> {
        let dir = self.dir.join(format!("site{}", site_id));
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Public base URL for images, always ending with `/`.
    pub fn base_url(&self, host: &str) -> String {
        format!("{}/{}/", host, self.url_path.trim_matches('/'))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Sessions untouched for this long are evicted
    pub idle_timeout_secs: u64,
    /// How often the sweeper looks for idle sessions
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "cms_session".to_string(),
            idle_timeout_secs: 24 * 60 * 60,
            sweep_interval_secs: 300,
        }
    }
}

/// How outgoing mail leaves the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailTransport {
    /// Write messages to the log only
    Log,
    /// Deliver through an SMTP relay
    Smtp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub transport: MailTransport,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub helo_name: String,
    pub sender_name: String,
    pub sender_email: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            transport: MailTransport::Log,
            smtp_host: "localhost".to_string(),
            smtp_port: 25,
            helo_name: "localhost".to_string(),
            sender_name: "John Smith".to_string(),
            sender_email: "admin@localhost.com".to_string(),
        }
    }
}

impl MailConfig {
    /// Default sender for system notifications (password recovery).
    pub fn sender(&self) -> Mailbox {
        Mailbox::new(&self.sender_name, &self.sender_email)
    }
}

/// Main user and site created on first start.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            email: "admin@localhost.com".to_string(),
            password: "1234".to_string(),
            name: "John Smith".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemesConfig {
    pub dir: PathBuf,
    pub url_path: String,
}

impl Default for ThemesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("themes"),
            url_path: "templates".to_string(),
        }
    }
}
