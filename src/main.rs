//! Strata - asset cache driver
//!
//! Loads the assets named on the command line into a headless asset context,
//! then runs the tick loop until the cache has evicted all of them.
//!
//! Usage: `strata [--save-settings] <namespace>/<name>...`

mod settings;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use strata_assets::{AssetKindId, Assets, HeadlessGpu, RequestQueue};
use strata_core::TickClock;

use crate::settings::Settings;

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Starting Strata...");

    let settings = Settings::load();
    let mut names = Vec::new();
    for arg in std::env::args().skip(1) {
        if arg == "--save-settings" {
            settings.save().context("Failed to save settings")?;
        } else {
            names.push(arg);
        }
    }

    let mut clock = TickClock::new(settings.tick.clone()).context("Invalid tick settings")?;
    let gpu = HeadlessGpu::new();
    let mut assets = Assets::new(&settings.assets, gpu.clone());

    let queue = RequestQueue::new();
    for name in &names {
        match AssetKindId::from_name(name) {
            Some(kind) => queue.preload(kind, name.as_str()),
            None => warn!("Cannot tell the asset kind of '{}', skipping", name),
        }
    }
    assets.process(&queue);

    info!(
        "{} assets cached, {} GPU objects ({} bytes)",
        assets.cached(),
        gpu.live_objects(),
        gpu.allocated_bytes()
    );

    let frame_ms = settings.run.frame_ms.max(1);
    let mut elapsed_ms = 0;
    let mut evicted = 0;
    while assets.cached() > 0 && elapsed_ms < settings.run.simulate_ms {
        elapsed_ms += frame_ms;
        clock.advance_ms(frame_ms);
        for _ in 0..clock.fixed_steps() {
            evicted += assets.update(clock.tick_ms());
        }
    }

    info!(
        "Simulated {} ms over {} frames: {} evicted, {} still cached",
        clock.total_ms,
        clock.frame_count,
        evicted,
        assets.cached()
    );

    assets.clear();
    info!("Live GPU objects after shutdown: {}", gpu.live_objects());
    Ok(())
}
