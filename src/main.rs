mod app;
mod kg;
mod util;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use app::LayoutConfig;
use kg::{FileSource, GraphSource};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Graph payload with `nodes` and `edges`. Use `-` to read from stdin.
    #[arg(long, default_value = "graph.json")]
    data: PathBuf,

    /// JSON file overriding the layout tunables.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => LayoutConfig::load(path)
            .with_context(|| format!("could not apply layout config {}", path.display()))?,
        None => LayoutConfig::default(),
    };
    let source: Arc<dyn GraphSource> = Arc::new(FileSource::new(args.data));

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "kg-canvas",
        options,
        Box::new(move |cc| Ok(Box::new(app::KgCanvasApp::new(cc, source, config)))),
    )
    .map_err(|error| anyhow::anyhow!("failed to start viewer: {error}"))
}
