mod app;
mod canvas;
mod layout;
mod source;
mod store;
#[cfg(test)]
mod test_support;
mod util;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app::{AppSettings, ClassPlaneApp};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Project directory to scan for Java sources.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Where panel positions and the viewport are kept. Defaults to
    /// `.class-plane.json` under the root.
    #[arg(long)]
    state_file: Option<PathBuf>,

    #[arg(long, default_value_t = 7)]
    max_zoom_level: u32,

    /// Keep supertype edits in memory instead of rewriting sources.
    #[arg(long)]
    read_only: bool,
}

impl Args {
    fn into_settings(self) -> AppSettings {
        let state_file = self
            .state_file
            .unwrap_or_else(|| self.root.join(".class-plane.json"));
        AppSettings {
            root: self.root,
            state_file,
            max_zoom_level: self.max_zoom_level,
            read_only: self.read_only,
        }
    }
}

fn main() -> Result<()> {
    init_tracing()?;
    let settings = Args::parse().into_settings();
    info!(root = %settings.root.display(), state_file = %settings.state_file.display(), "starting");

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "class-plane",
        options,
        Box::new(move |cc| Ok(Box::new(ClassPlaneApp::new(cc, settings)))),
    )
    .map_err(|error| anyhow::anyhow!("failed to run the viewer: {error}"))
}

fn init_tracing() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,class_plane=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}
