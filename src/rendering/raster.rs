//! CPU raster canvas backed by an RGBA buffer.

use std::io::Cursor;
use std::sync::Arc;

use cssparser::{ParseError as CssParseError, Parser, ParserInput, Token};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use super::{encode_data_url, text, Canvas, TextAlign, TextBaseline};
use crate::font::{FontBook, FontSpec};
use crate::{Error, Result};

// Same initial state as an HTML canvas.
const DEFAULT_WIDTH: u32 = 300;
const DEFAULT_HEIGHT: u32 = 150;

pub struct RasterCanvas {
    pixels: RgbaImage,
    fonts: Arc<FontBook>,
    font: FontSpec,
    fill: Rgba<u8>,
    align: TextAlign,
    baseline: TextBaseline,
}

impl RasterCanvas {
    pub fn new(fonts: Arc<FontBook>) -> Self {
        Self::with_size(fonts, DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }

    pub fn with_size(fonts: Arc<FontBook>, width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
            fonts,
            font: FontSpec {
                style: Default::default(),
                weight: 400,
                size_px: 10.0,
                families: vec!["sans-serif".to_string()],
            },
            fill: Rgba([0, 0, 0, 255]),
            align: TextAlign::default(),
            baseline: TextBaseline::default(),
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn font(&self) -> &FontSpec {
        &self.font
    }

    pub fn fill_style(&self) -> Rgba<u8> {
        self.fill
    }

    fn encode(&self, format: ImageFormat) -> Result<Vec<u8>> {
        let image = match format {
            // JPEG has no alpha channel
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(self.pixels.clone()).to_rgb8()),
            _ => DynamicImage::ImageRgba8(self.pixels.clone()),
        };
        let mut buf = Cursor::new(Vec::new());
        image
            .write_to(&mut buf, format)
            .map_err(|e| Error::Encode(format!("{format:?} export failed: {e}")))?;
        Ok(buf.into_inner())
    }
}

impl Canvas for RasterCanvas {
    fn width(&self) -> u32 {
        self.pixels.width()
    }

    fn height(&self) -> u32 {
        self.pixels.height()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.pixels = RgbaImage::new(width, height);
    }

    fn clear_rect(&mut self, x: i64, y: i64, width: u32, height: u32) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + i64::from(width)).min(i64::from(self.pixels.width()));
        let y1 = (y + i64::from(height)).min(i64::from(self.pixels.height()));
        for py in y0..y1 {
            for px in x0..x1 {
                self.pixels.put_pixel(px as u32, py as u32, Rgba([0, 0, 0, 0]));
            }
        }
    }

    fn draw_image(&mut self, image: &RgbaImage, x: i64, y: i64) {
        image::imageops::overlay(&mut self.pixels, image, x, y);
    }

    fn set_font(&mut self, font: &str) {
        match FontSpec::parse(font) {
            Ok(spec) => self.font = spec,
            Err(e) => log::warn!("ignoring font {font:?}: {e}"),
        }
    }

    fn set_fill_style(&mut self, color: &str) {
        match parse_color(color) {
            Some(rgba) => self.fill = rgba,
            None => log::warn!("ignoring fill style {color:?}"),
        }
    }

    fn set_text_align(&mut self, align: TextAlign) {
        self.align = align;
    }

    fn set_text_baseline(&mut self, baseline: TextBaseline) {
        self.baseline = baseline;
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32) {
        let Some(face) = self.fonts.resolve(&self.font) else {
            log::warn!("no loaded face for {}; skipping {text:?}", self.font);
            return;
        };
        text::draw_text(
            &mut self.pixels,
            &face,
            self.font.size_px,
            text,
            x,
            y,
            self.align,
            self.baseline,
            self.fill,
        );
    }

    fn to_data_url(&self, mime: &str) -> Result<String> {
        let (mime, format) = match mime.to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => ("image/jpeg", ImageFormat::Jpeg),
            _ => ("image/png", ImageFormat::Png),
        };
        let bytes = self.encode(format)?;
        Ok(encode_data_url(mime, &bytes))
    }
}

/// Parse `#rgb`, `#rrggbb`, `#rrggbbaa` or a few named colors.
pub fn parse_color(s: &str) -> Option<Rgba<u8>> {
    let mut css = ParserInput::new(s);
    let mut parser = Parser::new(&mut css);
    parser.parse_entirely(parse_color_token).ok()
}

fn parse_color_token<'i>(
    parser: &mut Parser<'i, '_>,
) -> std::result::Result<Rgba<u8>, CssParseError<'i, ()>> {
    let token = parser.next()?.clone();
    match token {
        Token::Hash(ref digits) | Token::IDHash(ref digits) => {
            hex_color(digits).ok_or_else(|| parser.new_custom_error(()))
        }
        Token::Ident(ref name) => match name.to_ascii_lowercase().as_str() {
            "white" => Ok(Rgba([255, 255, 255, 255])),
            "black" => Ok(Rgba([0, 0, 0, 255])),
            "transparent" => Ok(Rgba([0, 0, 0, 0])),
            _ => Err(parser.new_custom_error(())),
        },
        _ => Err(parser.new_custom_error(())),
    }
}

fn hex_color(digits: &str) -> Option<Rgba<u8>> {
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 | 8 => digits.to_string(),
        _ => return None,
    };
    let bytes = hex::decode(expanded).ok()?;
    let alpha = bytes.get(3).copied().unwrap_or(255);
    Some(Rgba([bytes[0], bytes[1], bytes[2], alpha]))
}
