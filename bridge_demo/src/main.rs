//! Headless frame bridge demo
//!
//! Drives a delegated frame host with synthetic producer frames: periodic
//! display rotations, occasional frames referencing unknown resources, and a
//! final resource clear before teardown.
//!
//! Usage: `bridge_demo [config.toml|config.ron] [--offscreen]`

mod headless;
mod producer;

use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;

use frame_bridge::config::ConfigError;
use frame_bridge::foundation::logging;
use frame_bridge::prelude::*;
use thiserror::Error;

use headless::{HeadlessError, HeadlessGpu, HeadlessView};
use producer::FrameProducer;

const FRAME_COUNT: u32 = 24;
const ROTATE_EVERY: u32 = 8;
const CORRUPT_EVERY: u32 = 5;
const DEFAULT_CONFIG: &str = "bridge_demo.toml";

#[derive(Debug, Error)]
enum DemoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Renderer error: {0}")]
    Render(#[from] RenderError),

    #[error("Headless backend error: {0}")]
    Headless(#[from] HeadlessError),
}

/// Headless frame bridge demo
#[derive(Debug, Parser)]
#[command(name = "bridge_demo", about = "Drives a delegated frame host with synthetic frames")]
struct DemoArgs {
    /// Configuration file (.toml or .ron); defaults are used when it is missing
    #[arg(default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Present through the offscreen buffer ring
    #[arg(long)]
    offscreen: bool,
}

fn run(args: &DemoArgs) -> Result<(), DemoError> {
    let config = BridgeConfig::load_or_default(&args.config)?;
    config.validate()?;
    logging::init_with_level(&config.logging.level);

    log::info!(
        "Starting frame bridge demo ({:?} renderer, {})",
        config.renderer.kind,
        if args.offscreen { "offscreen" } else { "onscreen" }
    );

    let gpu = HeadlessGpu::new();
    let view = Rc::new(HeadlessView::new(gpu.clone(), args.offscreen)?);
    let mut host = DelegatedFrameHost::new(
        view.clone(),
        Box::new(LocalResourceProvider::new()),
        config.host_settings(),
    );
    host.try_initialize(config.renderer.kind)?;

    let bounds = Rect::new(0, 0, 800, 480);
    let mut producer = FrameProducer::new(bounds.size(), 0x5EED);
    let mut rejected = 0;

    for frame_number in 1..=FRAME_COUNT {
        if frame_number % ROTATE_EVERY == 0 {
            gpu.set_rotation((gpu.rotation() + 90) % 360);
        }

        let frame = if frame_number % CORRUPT_EVERY == 0 {
            producer.corrupt_frame()
        } else {
            producer.next_frame()
        };
        let passes_before = host.render_passes().len();
        let resources_before = host.resources_in_frame().clone();
        host.swap_delegated_frame(producer.surface_id(), frame);
        if frame_number % CORRUPT_EVERY == 0
            && host.render_passes().len() == passes_before
            && *host.resources_in_frame() == resources_before
        {
            rejected += 1;
        }

        host.render_delegated_frame(bounds);
        if let Some(drawn) = host.last_drawn_frame() {
            log::debug!(
                "Frame {frame_number}: {} passes, {} quads into {}x{}",
                drawn.passes_drawn,
                drawn.quads_drawn,
                drawn.root_output_rect.width,
                drawn.root_output_rect.height
            );
        }
        if let Some(buffer) = host.rendered_offscreen_buffer() {
            log::trace!("Frame {frame_number} presented from {buffer:?}");
        }
    }

    host.clear_all_resources();
    host.destroy();

    let stats = gpu.stats();
    log::info!(
        "Demo finished: {FRAME_COUNT} frames, {rejected} rejected, {} acknowledgments, {} resources returned",
        view.acknowledgments(),
        view.returned()
    );
    log::info!(
        "GPU work: {} draws, {} clears, {} flushes, {} textures and {} native buffers still alive",
        stats.draws,
        stats.clears,
        stats.flushes,
        stats.live_textures,
        stats.live_native_buffers
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC occurred: {panic_info:?}");
        if let Some(location) = panic_info.location() {
            eprintln!("Panic location: {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    let args = DemoArgs::parse();
    if let Err(err) = run(&args) {
        log::error!("Demo failed: {err}");
        return Err(Box::new(err));
    }
    Ok(())
}
