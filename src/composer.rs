//! The card pipeline: wait for the font, load the background, draw the text
//! layers, export, and publish the result with its share link.

use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use tokio::sync::Mutex;

use crate::asset::{self, AssetSource};
use crate::font::{wait_for_font_polling, FontProvider, FontSpec};
use crate::page::{self, ResultArea};
use crate::rendering::{Canvas, Composite, TextAlign, TextBaseline};
use crate::{share, ComposerConfig, Result};

const START_SUFFIX: &str = "スタート";
const CLOSING_PHRASE: &str = "目指して頑張ります！";
const FALLBACK_FAMILY: &str = "sans-serif";

/// The two user-chosen values. Used verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderRequest {
    pub wave: String,
    pub goal: String,
}

impl RenderRequest {
    pub fn new(wave: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            wave: wave.into(),
            goal: goal.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLayer {
    pub text: String,
    /// Vertical offset of the anchor from the surface center.
    pub offset_y: f32,
    pub size_px: f32,
    pub color: &'static str,
}

/// The three layers drawn over the background, top to bottom.
pub fn text_layers(request: &RenderRequest) -> [TextLayer; 3] {
    [
        TextLayer {
            text: format!("{}{START_SUFFIX}", request.wave),
            offset_y: -200.0,
            size_px: 90.0,
            color: "#ffffff",
        },
        TextLayer {
            text: request.goal.clone(),
            offset_y: -5.0,
            size_px: 110.0,
            color: "#000066",
        },
        TextLayer {
            text: CLOSING_PHRASE.to_string(),
            offset_y: 200.0,
            size_px: 90.0,
            color: "#ffffff",
        },
    ]
}

/// Draw `background` and `layers` onto `canvas` and export it as PNG.
/// The canvas takes the background's exact pixel size.
pub fn paint_card<C: Canvas + ?Sized>(
    canvas: &mut C,
    background: &RgbaImage,
    face: &FontSpec,
    layers: &[TextLayer],
) -> Result<String> {
    canvas.resize(background.width(), background.height());
    canvas.clear_rect(0, 0, canvas.width(), canvas.height());
    canvas.draw_image(background, 0, 0);

    canvas.set_text_align(TextAlign::Center);
    canvas.set_text_baseline(TextBaseline::Middle);
    let center_x = canvas.width() as f32 / 2.0;
    let center_y = canvas.height() as f32 / 2.0;

    for layer in layers {
        canvas.set_font(&face.with_size(layer.size_px).to_string());
        canvas.set_fill_style(layer.color);
        canvas.fill_text(&layer.text, center_x, center_y + layer.offset_y);
    }

    canvas.to_data_url("image/png")
}

/// Runs one card generation per [`Composer::generate`] call against
/// explicitly owned handles.
///
/// Overlapping calls are not rejected. The canvas lock keeps each call's
/// draw-and-export step whole; the result area shows whichever call wrote last.
pub struct Composer<C> {
    config: ComposerConfig,
    fonts: Arc<dyn FontProvider>,
    canvas: Arc<Mutex<C>>,
    result: ResultArea,
}

impl<C: Canvas + Send> Composer<C> {
    pub fn new(config: ComposerConfig, fonts: Arc<dyn FontProvider>, canvas: C, result: ResultArea) -> Self {
        Self {
            config,
            fonts,
            canvas: Arc::new(Mutex::new(canvas)),
            result,
        }
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    pub fn canvas(&self) -> Arc<Mutex<C>> {
        Arc::clone(&self.canvas)
    }

    pub fn result_area(&self) -> &ResultArea {
        &self.result
    }

    /// The face checked for readiness and drawn with, minus the fallback.
    pub fn readiness_spec(&self) -> FontSpec {
        FontSpec::new(self.config.font_weight, 90.0, self.config.font_family.clone())
    }

    pub async fn generate(&self, request: &RenderRequest) -> Result<Composite> {
        self.result.replace(page::progress_markup());

        let spec = self.readiness_spec();
        let poll = Duration::from_millis(self.config.poll_interval_ms);
        let timeout = Duration::from_millis(self.config.font_timeout_ms);
        if let Err(err) = wait_for_font_polling(self.fonts.as_ref(), &spec, poll, timeout).await {
            log::error!("font preparation failed: {err}");
            self.result.alert(page::FONT_FAILURE_ALERT);
            self.result.replace(page::failure_markup(page::FONT_FAILURE_MESSAGE));
            return Err(err);
        }

        tokio::time::sleep(Duration::from_millis(self.config.settle_delay_ms)).await;

        let source = AssetSource::parse(&self.config.background);
        let background = match asset::load_image(&source, &self.config.asset_root).await {
            Ok(image) => image.to_rgba8(),
            Err(err) => {
                log::error!("background image failed to load, check the path: {err}");
                self.result.alert(page::asset_failure_alert(&self.config.background));
                self.result.replace(page::failure_markup(page::ASSET_FAILURE_MESSAGE));
                return Err(err);
            }
        };

        let face = spec.with_fallback(FALLBACK_FAMILY);
        let layers = text_layers(request);
        let (width, height, data_url) = {
            let mut canvas = self.canvas.lock().await;
            match paint_card(&mut *canvas, &background, &face, &layers) {
                Ok(data_url) => (canvas.width(), canvas.height(), data_url),
                Err(err) => {
                    log::error!("card export failed: {err}");
                    self.result.replace(page::failure_markup(page::EXPORT_FAILURE_MESSAGE));
                    return Err(err);
                }
            }
        };

        let composite = Composite {
            width,
            height,
            data_url,
            intent_url: share::intent_url(&self.config.share, &request.wave, &request.goal),
        };
        log::info!("generated {}x{} card for wave {:?}", width, height, request.wave);
        self.result.replace(page::success_markup(&composite));
        Ok(composite)
    }
}
