//! Server state and configuration.

use std::path::PathBuf;
use std::sync::Arc;

use crate::generate::Generator;
use crate::render::{AssetCache, FontStore};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:8080")
    pub listen_addr: String,
    /// Directory of TTF families for text rendering and PDF output.
    pub fonts_dir: Option<PathBuf>,
}

/// Application state shared across handlers.
pub struct AppState {
    pub config: ServerConfig,
    pub fonts: Arc<FontStore>,
    pub assets: AssetCache,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let fonts = Arc::new(match &config.fonts_dir {
            Some(dir) => FontStore::load_dir(dir),
            None => FontStore::empty(),
        });
        Self {
            config,
            fonts,
            assets: AssetCache::new(),
        }
    }

    /// A generator wired to this server's shared resources.
    pub fn generator(&self) -> Generator {
        let generator = Generator::new(self.fonts.clone(), self.assets.clone());
        match &self.config.fonts_dir {
            Some(dir) => generator.with_pdf_fonts_dir(dir),
            None => generator,
        }
    }
}
