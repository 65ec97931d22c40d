use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use hillcard::font::{FontBook, FontFace};
use hillcard::page::{self, ResultArea};
use hillcard::rendering::RasterCanvas;
use hillcard::{Composer, ComposerConfig, RenderRequest};

/// Generate a participation card image and its share link.
#[derive(Parser, Debug)]
#[command(name = "hillcard", version, about)]
struct Cli {
    /// Start wave label, e.g. "A"
    #[arg(long)]
    wave: String,

    /// Goal label, e.g. "3000m"
    #[arg(long)]
    goal: String,

    /// Background image path or URL (overrides the config)
    #[arg(long)]
    background: Option<String>,

    /// Font face to register, as FAMILY[:WEIGHT]=PATH_OR_URL (repeatable)
    #[arg(long = "font", value_name = "FACE")]
    fonts: Vec<FontFace>,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Font readiness budget in milliseconds (overrides the config)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Write the result page here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,

    /// Also save the generated PNG here
    #[arg(long)]
    png: Option<PathBuf>,
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => ComposerConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ComposerConfig::default(),
    };
    if let Some(background) = cli.background {
        config.background = background;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.font_timeout_ms = timeout_ms;
    }
    config.validate()?;

    let fonts = Arc::new(FontBook::new(config.asset_root.clone()));
    for face in cli.fonts {
        fonts.add(face);
    }
    // Font downloads start with the page, before the trigger fires.
    let _preload = fonts.preload();

    let result = ResultArea::new();
    let composer = Composer::new(config, fonts.clone(), RasterCanvas::new(fonts), result.clone());

    let request = RenderRequest::new(cli.wave, cli.goal);
    let outcome = composer.generate(&request).await;

    let document = page::render_document(&result.html());
    match &cli.out {
        Some(path) => std::fs::write(path, &document)
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{document}"),
    }

    let composite = outcome?;
    if let Some(path) = &cli.png {
        let bytes = composite.image_bytes()?;
        std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
        log::info!("saved {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("hillcard: {e:#}");
        std::process::exit(1);
    }
}
