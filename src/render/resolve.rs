//! Asset resolution: fetches and decodes image sources before rendering.
//!
//! `AssetCache` keeps all network and caching concerns out of the renderer,
//! which stays synchronous and works from a plain map of decoded images.

use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine;
use image::DynamicImage;
use tokio::sync::RwLock;

use crate::document::{Document, ElementKind};
use crate::LaureaError;

/// Shared, clone-cheap cache of decoded images keyed by source string.
#[derive(Clone)]
pub struct AssetCache {
    client: reqwest::Client,
    cache: Arc<RwLock<HashMap<String, DynamicImage>>>,
}

impl Default for AssetCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetCache {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(concat!("laurea/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Fetch and decode every distinct image source in a document.
    ///
    /// Returns the map the synchronous renderer works from. A source that
    /// fails to fetch or decode fails the whole resolution; generation
    /// treats unreachable assets as errors, not silent gaps.
    pub async fn resolve_document(
        &self,
        doc: &Document,
    ) -> Result<HashMap<String, DynamicImage>, LaureaError> {
        let mut assets = HashMap::new();
        for el in &doc.elements {
            if let ElementKind::Image(img) = &el.kind {
                if img.source.is_empty() || assets.contains_key(&img.source) {
                    continue;
                }
                let image = self.fetch(&img.source).await?;
                assets.insert(img.source.clone(), image);
            }
        }
        Ok(assets)
    }

    /// Fetch one source: `data:` URIs are decoded inline, anything else is
    /// requested over HTTP with the shared cache consulted first.
    pub async fn fetch(&self, source: &str) -> Result<DynamicImage, LaureaError> {
        if let Some(rest) = source.strip_prefix("data:") {
            return decode_data_uri(rest);
        }

        {
            let cache = self.cache.read().await;
            if let Some(image) = cache.get(source) {
                return Ok(image.clone());
            }
        }

        tracing::debug!(url = source, "fetching image");
        let response = self
            .client
            .get(source)
            .send()
            .await
            .map_err(|e| LaureaError::Image(format!("failed to download {}: {}", source, e)))?;
        if !response.status().is_success() {
            return Err(LaureaError::Image(format!(
                "failed to download {}: HTTP {}",
                source,
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| LaureaError::Image(format!("failed to read image data: {}", e)))?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| LaureaError::Image(format!("failed to decode {}: {}", source, e)))?;

        let mut cache = self.cache.write().await;
        cache.insert(source.to_string(), image.clone());
        Ok(image)
    }
}

/// Decode the payload of a `data:<mediatype>;base64,<data>` URI.
fn decode_data_uri(rest: &str) -> Result<DynamicImage, LaureaError> {
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| LaureaError::Image("malformed data URI".into()))?;
    let bytes = if meta.ends_with(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| LaureaError::Image(format!("invalid base64 in data URI: {}", e)))?
    } else {
        return Err(LaureaError::Image(
            "only base64 data URIs are supported".into(),
        ));
    };
    image::load_from_memory(&bytes)
        .map_err(|e| LaureaError::Image(format!("failed to decode data URI image: {}", e)))
}
