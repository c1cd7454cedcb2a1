//! Image loading for move images and video thumbnails.

use crate::error::AssetError;
use async_trait::async_trait;
use std::cell::Cell;
use std::collections::HashMap;

/// Natural pixel size of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadedImage {
    pub width: f64,
    pub height: f64,
}

#[async_trait(?Send)]
pub trait ImageLoader {
    async fn load(&self, src: &str) -> Result<LoadedImage, AssetError>;
}

/// Answers from a fixed table; unknown sources fail with `NotFound`.
#[derive(Debug, Default)]
pub struct StaticImageLoader {
    images: HashMap<String, LoadedImage>,
    loads: Cell<usize>,
}

impl StaticImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_image(mut self, src: impl Into<String>, width: f64, height: f64) -> Self {
        self.insert(src, width, height);
        self
    }

    pub fn insert(&mut self, src: impl Into<String>, width: f64, height: f64) {
        self.images.insert(src.into(), LoadedImage { width, height });
    }

    /// Number of `load` calls made so far.
    pub fn load_count(&self) -> usize {
        self.loads.get()
    }
}

#[async_trait(?Send)]
impl ImageLoader for StaticImageLoader {
    async fn load(&self, src: &str) -> Result<LoadedImage, AssetError> {
        self.loads.set(self.loads.get() + 1);
        tokio::task::yield_now().await;
        self.images
            .get(src)
            .copied()
            .ok_or_else(|| AssetError::NotFound(src.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_sources_fail() {
        let loader = StaticImageLoader::new().with_image("/img/ryu.png", 200.0, 400.0);
        assert_eq!(
            loader.load("/img/ryu.png").await,
            Ok(LoadedImage { width: 200.0, height: 400.0 })
        );
        assert_eq!(
            loader.load("/img/ken.png").await,
            Err(AssetError::NotFound("/img/ken.png".into()))
        );
        assert_eq!(loader.load_count(), 2);
    }
}
