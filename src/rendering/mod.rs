//! Drawing surface abstraction and the raster implementation.

pub mod raster;
pub mod text;

use base64::Engine as _;
use image::RgbaImage;

use crate::{Error, Result};

pub use raster::RasterCanvas;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Start,
    End,
    Left,
    Right,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextBaseline {
    #[default]
    Alphabetic,
    Top,
    Middle,
    Bottom,
}

/// A 2D drawing surface with the subset of canvas operations the composer uses.
///
/// Font and color setters take CSS strings; values that fail to parse are
/// ignored and the previous value stays in effect.
pub trait Canvas {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Resize the surface. The contents are reset to transparent.
    fn resize(&mut self, width: u32, height: u32);

    fn clear_rect(&mut self, x: i64, y: i64, width: u32, height: u32);

    fn draw_image(&mut self, image: &RgbaImage, x: i64, y: i64);

    fn set_font(&mut self, font: &str);
    fn set_fill_style(&mut self, color: &str);
    fn set_text_align(&mut self, align: TextAlign);
    fn set_text_baseline(&mut self, baseline: TextBaseline);

    fn fill_text(&mut self, text: &str, x: f32, y: f32);

    /// Export as a `data:` URL. `image/png` and `image/jpeg` are supported;
    /// other types fall back to PNG.
    fn to_data_url(&self, mime: &str) -> Result<String>;
}

/// A finished card: exported image plus the share link that goes with it.
#[derive(Debug, Clone)]
pub struct Composite {
    pub width: u32,
    pub height: u32,
    pub data_url: String,
    pub intent_url: String,
}

impl Composite {
    /// Decoded image bytes, for saving the card to disk.
    pub fn image_bytes(&self) -> Result<Vec<u8>> {
        decode_data_url(&self.data_url).map(|(_, bytes)| bytes)
    }
}

pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    let payload = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime};base64,{payload}")
}

/// Split a base64 `data:` URL into its media type and payload bytes.
pub fn decode_data_url(url: &str) -> Result<(String, Vec<u8>)> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| Error::Encode("not a data URL".into()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::Encode("data URL has no payload".into()))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| Error::Encode("only base64 data URLs are supported".into()))?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| Error::Encode(format!("invalid base64 payload: {e}")))?;
    Ok((mime.to_string(), bytes))
}
