//! campus-kiosk: voice-driven campus assistant
//!
//! Boots every component once, then hands control to the state machine:
//! - Always-on speech capture with echo suppression
//! - Intent resolution against campus records and the campus map
//! - Spoken answers through a single serialized output gate
//!
//! SIGINT/SIGTERM stop the controller from whatever state it is in.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, info_span, warn, Instrument};
use tracing_subscriber::EnvFilter;

use campus_kiosk::campus::{CampusDirectory, CampusMap, JsonDirectory, RouteFinder};
use campus_kiosk::capture::{CaptureCoordinator, CommandSource, ConsoleSource, UtteranceSource};
use campus_kiosk::config::Config;
use campus_kiosk::context::AgentContext;
use campus_kiosk::dispatch::Dispatcher;
use campus_kiosk::events::{drive_renderer, HeadlessRenderer};
use campus_kiosk::intent::{EntityKind, FuzzyMatcher, IntentResolver};
use campus_kiosk::lifecycle::{wait_for_signal, Platform};
use campus_kiosk::output::{select_synthesizer, OutputGate};
use campus_kiosk::state::Controller;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;
    config.ensure_dirs()?;

    let ctx = AgentContext::new(config);
    let span = info_span!("session", id = %ctx.session_id);

    run(ctx).instrument(span).await
}

async fn run(ctx: AgentContext) -> Result<()> {
    let config = Arc::clone(&ctx.config);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %config.data_dir.display(),
        "campus-kiosk starting"
    );

    // Campus records and map are required; anything wrong here is fatal
    let directory = JsonDirectory::load(&config.campus_path(), FuzzyMatcher::new(config.thresholds.default))
        .context("loading campus records")?;
    let map = CampusMap::load(&config.map_path(), config.thresholds.matcher(EntityKind::Location))
        .context("loading campus map")?;

    if map.locate(&config.default_origin).is_none() {
        warn!(origin = %config.default_origin, "default origin is not on the campus map");
    }

    let mut vocabulary = directory.vocabulary();
    vocabulary.set(EntityKind::Location, map.location_names());
    let resolver = IntentResolver::new(vocabulary, config.thresholds.clone()).context("compiling intent patterns")?;

    let dispatcher = Dispatcher::new(Arc::new(directory), Arc::new(map), config.default_origin.clone());

    let platform = Platform::detect();
    info!(%platform, "platform detected");

    let synth = select_synthesizer(platform, config.tts_command.as_deref());
    let output = Arc::new(OutputGate::new(synth, ctx.output_signal.clone(), ctx.events.clone()));

    let primary: Box<dyn UtteranceSource> = match config.stt_command.as_deref().and_then(CommandSource::from_command_line) {
        Some(source) => Box::new(source),
        None => {
            info!("no recognizer command configured, reading requests from the console");
            Box::new(ConsoleSource::new())
        }
    };
    let fallback: Box<dyn UtteranceSource> = Box::new(ConsoleSource::new());
    let capture = CaptureCoordinator::new(&ctx, primary, Some(fallback));

    let renderer = tokio::spawn(drive_renderer(
        HeadlessRenderer::default(),
        ctx.subscribe(),
        ctx.shutdown.clone(),
    ));

    let controller = Controller::new(&ctx, capture, output, resolver, dispatcher);
    let shutdown = controller.shutdown_handle();
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(()) => {
                info!("shutdown signal received");
                shutdown.trigger();
            }
            Err(e) => error!(error = %e, "failed to install signal handlers"),
        }
    });

    controller.run().await;

    ctx.shutdown.trigger();
    if let Err(e) = renderer.await {
        warn!(error = %e, "renderer task failed");
    }

    info!("campus-kiosk stopped");
    Ok(())
}
