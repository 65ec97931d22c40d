//! hillcard
//!
//! Composes a shareable participation card: a background picture with three
//! text layers drawn over it, exported as a PNG data URL together with a
//! pre-filled share-intent link.
//!
//! # Pipeline
//!
//! - **Font readiness**: the card's font is probed with a load attempt and,
//!   failing that, polled until available or timed out ([`font::ready`])
//! - **Composition**: the background is loaded, drawn at its natural size,
//!   and the text layers are centered over it ([`composer`])
//! - **Publishing**: the result area receives the image and share link ([`page`])
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use hillcard::{Composer, ComposerConfig, RenderRequest};
//! use hillcard::font::FontBook;
//! use hillcard::page::ResultArea;
//! use hillcard::rendering::RasterCanvas;
//!
//! # async fn run() -> hillcard::Result<()> {
//! let fonts = Arc::new(FontBook::new("."));
//! fonts.add("Zen Maru Gothic=fonts/ZenMaruGothic-Medium.ttf".parse()?);
//!
//! let composer = Composer::new(
//!     ComposerConfig::default(),
//!     fonts.clone(),
//!     RasterCanvas::new(fonts),
//!     ResultArea::new(),
//! );
//! let card = composer.generate(&RenderRequest::new("A", "3000m")).await?;
//! println!("{}", card.intent_url);
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Error, Result};

pub mod asset;
pub mod composer;
pub mod font;
pub mod page;
pub mod rendering;
pub mod share;

pub use composer::{Composer, RenderRequest, TextLayer};
pub use rendering::Composite;

/// Configuration for a [`Composer`]
///
/// Defaults reproduce the published card: the Mt. Fuji background, Zen Maru
/// Gothic at weight 500, a 15 second font budget polled every 100ms and a
/// 50ms settle delay before drawing.
///
/// # Examples
///
/// ```
/// let cfg = hillcard::ComposerConfig::default();
/// assert_eq!(cfg.font_timeout_ms, 15000);
/// assert_eq!(cfg.background, "assets/mtfuji-bg.jpg");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Background image: a path (relative to `asset_root`) or http(s) URL
    pub background: String,
    /// Directory relative asset paths resolve against
    pub asset_root: PathBuf,
    /// Family the text layers are drawn in
    pub font_family: String,
    pub font_weight: u16,
    /// Budget for the font readiness wait in milliseconds
    pub font_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Pause between font readiness and drawing in milliseconds
    pub settle_delay_ms: u64,
    pub share: ShareConfig,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            background: "assets/mtfuji-bg.jpg".to_string(),
            asset_root: PathBuf::from("."),
            font_family: "Zen Maru Gothic".to_string(),
            font_weight: 500,
            font_timeout_ms: 15000,
            poll_interval_ms: 100,
            settle_delay_ms: 50,
            share: ShareConfig::default(),
        }
    }
}

impl ComposerConfig {
    /// Load a JSON config; missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let cfg: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be greater than zero".into()));
        }
        if self.font_family.trim().is_empty() {
            return Err(Error::Config("font_family must not be empty".into()));
        }
        if !(1..=1000).contains(&self.font_weight) {
            return Err(Error::Config(format!("font_weight {} out of range", self.font_weight)));
        }
        if self.background.trim().is_empty() {
            return Err(Error::Config("background must not be empty".into()));
        }
        Ok(())
    }
}

/// Where the share link points. Only the post text varies per card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Posting endpoint the query string is appended to
    pub endpoint: String,
    /// Canonical page URL attached to the post
    pub page_url: String,
    /// Comma-separated hashtags, without `#`
    pub hashtags: String,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://x.com/intent/post".to_string(),
            page_url: "https://manabox.github.io/mtfujihill/".to_string(),
            hashtags: "富士ヒル,Mt富士ヒルクライム".to_string(),
        }
    }
}
