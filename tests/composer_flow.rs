use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use image::{Rgba, RgbaImage};

use hillcard::font::{FontBook, FontProvider, FontSpec};
use hillcard::page::{self, ResultArea};
use hillcard::rendering::{decode_data_url, RasterCanvas};
use hillcard::{Composer, ComposerConfig, Error, RenderRequest, Result};

/// Font set that is either always ready or never ready.
struct FixedFonts {
    ready: bool,
}

impl FontProvider for FixedFonts {
    fn load<'a>(&'a self, _spec: &'a FontSpec) -> BoxFuture<'a, Result<usize>> {
        let loaded = usize::from(self.ready);
        async move { Ok::<usize, Error>(loaded) }.boxed()
    }

    fn check(&self, _spec: &FontSpec) -> bool {
        self.ready
    }
}

fn write_background(dir: &Path, name: &str, width: u32, height: u32) {
    RgbaImage::from_pixel(width, height, Rgba([40, 120, 200, 255]))
        .save(dir.join(name))
        .expect("write background fixture");
}

fn composer(dir: &Path, background: &str, fonts_ready: bool) -> Composer<RasterCanvas> {
    composer_with_settle(dir, background, fonts_ready, ComposerConfig::default().settle_delay_ms)
}

fn composer_with_settle(
    dir: &Path,
    background: &str,
    fonts_ready: bool,
    settle_delay_ms: u64,
) -> Composer<RasterCanvas> {
    let config = ComposerConfig {
        background: background.to_string(),
        asset_root: dir.to_path_buf(),
        font_timeout_ms: 300,
        settle_delay_ms,
        ..Default::default()
    };
    Composer::new(
        config,
        Arc::new(FixedFonts { ready: fonts_ready }),
        RasterCanvas::new(Arc::new(FontBook::default())),
        ResultArea::new(),
    )
}

#[tokio::test]
async fn composite_matches_background_size_and_publishes_result() {
    let dir = tempfile::tempdir().unwrap();
    write_background(dir.path(), "mtfuji-bg.png", 640, 480);
    let composer = composer(dir.path(), "mtfuji-bg.png", true);

    let card = composer
        .generate(&RenderRequest::new("A", "3000m"))
        .await
        .expect("generation succeeds");

    assert_eq!((card.width, card.height), (640, 480));
    let (mime, png) = decode_data_url(&card.data_url).unwrap();
    assert_eq!(mime, "image/png");
    let decoded = image::load_from_memory(&png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (640, 480));

    assert!(card.intent_url.starts_with("https://x.com/intent/post?text="));
    assert!(card
        .intent_url
        .contains(&hillcard::share::encode_uri_component(&hillcard::share::status_text("A", "3000m"))));

    let html = composer.result_area().html();
    assert!(html.contains("画像の生成完了！"));
    assert!(html.contains(&card.data_url));
    assert!(composer.result_area().alerts().is_empty());
}

#[tokio::test]
async fn rerun_replaces_result_contents() {
    let dir = tempfile::tempdir().unwrap();
    write_background(dir.path(), "bg.png", 32, 24);
    let composer = composer(dir.path(), "bg.png", true);

    composer.generate(&RenderRequest::new("A", "3000m")).await.unwrap();
    let second = composer.generate(&RenderRequest::new("B", "2500m")).await.unwrap();

    let html = composer.result_area().html();
    assert_eq!(html.matches("<img").count(), 1);
    assert!(html.contains(&*html_escape::encode_double_quoted_attribute(&second.intent_url)));
    assert!(!html.contains(page::PROGRESS_MESSAGE));
}

#[tokio::test]
async fn missing_background_reports_failure_without_image() {
    let dir = tempfile::tempdir().unwrap();
    let composer = composer(dir.path(), "assets/mtfuji-bg.jpg", true);

    let err = composer
        .generate(&RenderRequest::new("A", "3000m"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AssetLoad { .. }));

    let html = composer.result_area().html();
    assert_eq!(html, page::failure_markup(page::ASSET_FAILURE_MESSAGE));
    assert!(!html.contains("<img"));
    let alerts = composer.result_area().alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("assets/mtfuji-bg.jpg"));
}

#[tokio::test]
async fn failed_background_after_success_clears_previous_image() {
    let dir = tempfile::tempdir().unwrap();
    write_background(dir.path(), "bg.png", 16, 16);
    let composer = composer(dir.path(), "bg.png", true);
    composer.generate(&RenderRequest::new("A", "3000m")).await.unwrap();

    std::fs::remove_file(dir.path().join("bg.png")).unwrap();
    assert!(composer.generate(&RenderRequest::new("A", "3000m")).await.is_err());
    assert!(!composer.result_area().html().contains("<img"));
}

#[tokio::test(start_paused = true)]
async fn font_timeout_aborts_before_loading_background() {
    let dir = tempfile::tempdir().unwrap();
    let composer = composer(dir.path(), "never-read.png", false);

    let start = tokio::time::Instant::now();
    let err = composer
        .generate(&RenderRequest::new("A", "3000m"))
        .await
        .unwrap_err();
    assert!(start.elapsed() >= Duration::from_millis(300));

    match err {
        Error::FontTimeout { spec, .. } => assert_eq!(spec, "500 90px \"Zen Maru Gothic\""),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        composer.result_area().html(),
        page::failure_markup(page::FONT_FAILURE_MESSAGE)
    );
    assert_eq!(
        composer.result_area().alerts(),
        vec![page::FONT_FAILURE_ALERT.to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn ready_font_settles_before_drawing() {
    let dir = tempfile::tempdir().unwrap();
    write_background(dir.path(), "bg.png", 8, 8);
    let composer = composer_with_settle(dir.path(), "bg.png", true, 50);

    let start = tokio::time::Instant::now();
    composer.generate(&RenderRequest::new("A", "3000m")).await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(50));
}

#[tokio::test(start_paused = true)]
async fn font_failure_skips_settle_delay() {
    let dir = tempfile::tempdir().unwrap();
    let composer = composer_with_settle(dir.path(), "bg.png", false, 60_000);

    let start = tokio::time::Instant::now();
    assert!(composer.generate(&RenderRequest::new("A", "3000m")).await.is_err());
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(300));
    assert!(elapsed < Duration::from_secs(60), "waited {elapsed:?}");
}

#[tokio::test]
async fn overlapping_invocations_both_complete() {
    let dir = tempfile::tempdir().unwrap();
    write_background(dir.path(), "bg.png", 20, 10);
    let composer = composer(dir.path(), "bg.png", true);

    let req_a = RenderRequest::new("A", "3000m");
    let req_b = RenderRequest::new("B", "2500m");
    let (a, b) = tokio::join!(composer.generate(&req_a), composer.generate(&req_b));
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!((a.width, a.height), (20, 10));
    assert_eq!((b.width, b.height), (20, 10));

    let html = composer.result_area().html();
    assert_eq!(html.matches("<img").count(), 1);
    assert!(
        html.contains(&*html_escape::encode_double_quoted_attribute(&a.intent_url))
            || html.contains(&*html_escape::encode_double_quoted_attribute(&b.intent_url))
    );
}

#[cfg(feature = "remote")]
#[tokio::test]
async fn background_can_be_fetched_over_http() {
    let mut png = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(RgbaImage::from_pixel(12, 8, Rgba([1, 2, 3, 255])))
        .write_to(&mut png, image::ImageFormat::Png)
        .unwrap();
    let body = png.into_inner();

    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    std::thread::spawn(move || {
        if let Ok(req) = server.recv() {
            let _ = req.respond(tiny_http::Response::from_data(body));
        }
    });

    let dir = tempfile::tempdir().unwrap();
    let composer = composer(dir.path(), &format!("http://{addr}/mtfuji-bg.png"), true);
    let card = composer.generate(&RenderRequest::new("A", "3000m")).await.unwrap();
    assert_eq!((card.width, card.height), (12, 8));
}
