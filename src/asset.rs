//! Background and font asset sources.
//!
//! An asset is either a file path (resolved against a root directory) or an
//! http(s) URL. Loading is a single awaitable with exactly one outcome: the
//! bytes/image, or an [`Error::AssetLoad`].

use std::fmt;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use url::Url;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    Path(PathBuf),
    Url(Url),
}

impl AssetSource {
    /// `http://` and `https://` locations become URLs, anything else a path.
    pub fn parse(location: &str) -> Self {
        let lower = location.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            if let Ok(url) = Url::parse(location) {
                return AssetSource::Url(url);
            }
        }
        AssetSource::Path(PathBuf::from(location))
    }

    /// Path sources are joined onto `root` unless already absolute.
    pub fn resolve(&self, root: &Path) -> AssetSource {
        match self {
            AssetSource::Path(p) if p.is_relative() => AssetSource::Path(root.join(p)),
            other => other.clone(),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, AssetSource::Url(_))
    }

    fn load_error(&self, reason: impl fmt::Display) -> Error {
        Error::AssetLoad {
            location: self.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for AssetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetSource::Path(p) => write!(f, "{}", p.display()),
            AssetSource::Url(u) => write!(f, "{u}"),
        }
    }
}

/// Read the raw bytes behind a source.
pub async fn read_bytes(source: &AssetSource, root: &Path) -> Result<Vec<u8>> {
    let source = source.resolve(root);
    match &source {
        AssetSource::Path(path) => tokio::fs::read(path)
            .await
            .map_err(|e| source.load_error(e)),
        AssetSource::Url(url) => fetch_bytes(url).await.map_err(|e| source.load_error(e)),
    }
}

/// Load and decode an image. Resolves exactly once, with the decoded image
/// or a typed load failure.
pub async fn load_image(source: &AssetSource, root: &Path) -> Result<DynamicImage> {
    let bytes = read_bytes(source, root).await?;
    let image = image::load_from_memory(&bytes).map_err(|e| source.resolve(root).load_error(e))?;
    log::debug!(
        "loaded {} ({}x{})",
        source,
        image.width(),
        image.height()
    );
    Ok(image)
}

#[cfg(feature = "remote")]
async fn fetch_bytes(url: &Url) -> std::result::Result<Vec<u8>, String> {
    let resp = reqwest::get(url.as_str())
        .await
        .map_err(|e| format!("HTTP GET failed: {e}"))?;
    let resp = resp
        .error_for_status()
        .map_err(|e| format!("HTTP status: {e}"))?;
    let body = resp
        .bytes()
        .await
        .map_err(|e| format!("Failed to read response body: {e}"))?;
    Ok(body.to_vec())
}

#[cfg(not(feature = "remote"))]
async fn fetch_bytes(_url: &Url) -> std::result::Result<Vec<u8>, String> {
    Err("remote assets require the `remote` feature".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn parse_distinguishes_urls_and_paths() {
        assert!(AssetSource::parse("https://example.com/bg.jpg").is_remote());
        assert!(AssetSource::parse("HTTP://example.com/bg.jpg").is_remote());
        assert_eq!(
            AssetSource::parse("assets/mtfuji-bg.jpg"),
            AssetSource::Path(PathBuf::from("assets/mtfuji-bg.jpg"))
        );
    }

    #[test]
    fn resolve_joins_relative_paths_only() {
        let root = Path::new("/srv/site");
        let rel = AssetSource::parse("assets/bg.png").resolve(root);
        assert_eq!(rel, AssetSource::Path(PathBuf::from("/srv/site/assets/bg.png")));

        let url = AssetSource::parse("https://example.com/bg.png");
        assert_eq!(url.resolve(root), url);
    }

    #[tokio::test]
    async fn load_image_decodes_file() {
        let dir = tempfile::tempdir().unwrap();
        let img = RgbaImage::from_pixel(7, 5, Rgba([10, 20, 30, 255]));
        img.save(dir.path().join("bg.png")).unwrap();

        let loaded = load_image(&AssetSource::parse("bg.png"), dir.path()).await.unwrap();
        assert_eq!((loaded.width(), loaded.height()), (7, 5));
    }

    #[tokio::test]
    async fn missing_file_is_asset_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_image(&AssetSource::parse("nope.jpg"), dir.path())
            .await
            .unwrap_err();
        match err {
            Error::AssetLoad { location, .. } => assert!(location.ends_with("nope.jpg")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn undecodable_file_is_asset_load_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bg.jpg"), b"not an image").unwrap();
        let err = load_image(&AssetSource::parse("bg.jpg"), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AssetLoad { .. }));
    }
}
