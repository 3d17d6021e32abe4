use std::sync::Arc;

use facecaption::app::{OverlayViewer, RecordingSurface};
use facecaption::intake::{ScenarioTimeline, ScriptedMedia, ScriptedModels, ScriptedScenario};
use facecaption::{AppError, Coordinator, Settings};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};

fn init_logging(level: Level) {
    tracing_subscriber::fmt().with_max_level(level).init();
}

fn load_scenario(settings: &Settings) -> Result<ScriptedScenario, AppError> {
    match &settings.scenario_path {
        Some(path) => {
            info!("Loading scenario from {}", path);
            ScriptedScenario::from_file(path)
        }
        None => {
            info!("No scenario configured, replaying the built-in demo");
            Ok(ScriptedScenario::demo())
        }
    }
}

fn shutdown_on_ctrl_c(cancel_token: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, shutting down"),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
        cancel_token.cancel();
    });
}

fn main() -> Result<(), AppError> {
    let config_path = std::env::args().nth(1);
    let settings = Settings::load(config_path.as_deref())?;
    init_logging(settings.log_level());

    let scenario = load_scenario(&settings)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let surface = RecordingSurface::new();
    let frames_rx = surface.subscribe();
    let viewer = settings.viewer;

    let guard = runtime.enter();
    let timeline = ScenarioTimeline::start(scenario);
    let mut coordinator = Coordinator::builder(settings)
        .media_source(Arc::new(ScriptedMedia::new(timeline.clone())))
        .model_loader(Arc::new(ScriptedModels::new(timeline)))
        .surface(Box::new(surface))
        .build()?;
    let cancel_token = coordinator.cancel_token();
    shutdown_on_ctrl_c(cancel_token.clone());
    drop(guard);

    if !viewer {
        runtime.block_on(coordinator.join());
        info!("Stopped with status {:?}", coordinator.status());
        return Ok(());
    }

    let overlay = OverlayViewer::new(
        frames_rx,
        coordinator.subscribe_status(),
        coordinator.subscribe_caption(),
    );
    let detection = std::thread::Builder::new()
        .name("detection".to_string())
        .spawn(move || {
            runtime.block_on(coordinator.join());
            info!("Stopped with status {:?}", coordinator.status());
        })?;

    let result = overlay.run();
    cancel_token.cancel();
    detection
        .join()
        .map_err(|_| AppError::Viewer("Detection thread panicked".to_string()))?;
    result
}
