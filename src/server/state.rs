//! Shared state handed to every handler.

use std::path::PathBuf;
use std::sync::Arc;

use super::session::SessionStore;
use super::themes::ThemeRegistry;
use crate::common::config::CmsConfig;
use crate::common::Result;
use crate::mail::Mailer;
use crate::processing::{ImageBackend, ImagePipeline};
use crate::store::Database;

pub struct AppState {
    pub config: CmsConfig,
    pub db: Arc<Database>,
    pub sessions: SessionStore,
    pub mailer: Arc<dyn Mailer>,
    pub pipeline: ImagePipeline,
    pub themes: ThemeRegistry,
}

impl AppState {
    /// # Arguments
    /// - `config`: Loaded configuration
    /// - `db`: Opened (and bootstrapped) database
    /// - `mailer`: Transport for outgoing mail
    /// - `backend`: Image backend used by the upload pipeline
    /// - `themes`: Available themes
    pub fn new(
        config: CmsConfig,
        db: Arc<Database>,
        mailer: Arc<dyn Mailer>,
        backend: Arc<dyn ImageBackend>,
        themes: ThemeRegistry,
    ) -> Self {
        let sessions = SessionStore::new(&config.session);
        let pipeline = ImagePipeline::new(backend, config.images.sizes());
        Self {
            config,
            db,
            sessions,
            mailer,
            pipeline,
            themes,
        }
    }

    /// Public base URL of the image folder, ending with `/`.
    pub fn img_url(&self, host: &str) -> String {
        self.config.images.base_url(host)
    }

    pub fn image_dir(&self, site_id: i64) -> Result<PathBuf> {
        self.config.images.site_dir(site_id)
    }
}
