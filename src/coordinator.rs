use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::app::{
    AppStatus, DisplaySurface, RecordingSurface, RenderTick, CAMERA_PERMISSION_MESSAGE,
    MODEL_LOAD_FAILED_MESSAGE,
};
use crate::config::Settings;
use crate::error::AppError;
use crate::intake::{FaceFeed, LoadedModels, MediaSource, ModelLoader, ObjectFeed, PoseFeed};
use crate::pipeline::{
    Caption, CaptionPolicy, CaptionScheduler, Clock, DetectionState, FeedWriters,
    PriorityCaptionPolicy, SignalExtractor, SystemClock,
};

/// Owns the running feature: bootstrap, the three feeds, the scheduler and the render tick.
pub struct Coordinator {
    bootstrap_task: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
    state: DetectionState,
    status_rx: watch::Receiver<AppStatus>,
    caption_rx: watch::Receiver<Caption>,
}

/// Everything the bootstrap task takes ownership of.
struct Bootstrap {
    settings: Settings,
    media_source: Arc<dyn MediaSource>,
    model_loader: Arc<dyn ModelLoader>,
    surface: Box<dyn DisplaySurface>,
    policy: Box<dyn CaptionPolicy>,
    clock: Arc<dyn Clock>,
    state: DetectionState,
    writers: FeedWriters,
    caption_tx: watch::Sender<Caption>,
    caption_rx: watch::Receiver<Caption>,
    status_tx: watch::Sender<AppStatus>,
}

impl Coordinator {
    pub fn builder(settings: Settings) -> CoordinatorBuilder {
        CoordinatorBuilder::new(settings)
    }

    fn start(bootstrap: Bootstrap, cancel_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let Some(mut tasks) = bootstrap.run(cancel_token.clone()).await else {
                return;
            };
            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    error!("Detection task failed: {}", e);
                }
            }
            info!("All detection tasks stopped");
        })
    }

    pub fn status(&self) -> AppStatus {
        self.status_rx.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<AppStatus> {
        self.status_rx.clone()
    }

    pub fn caption(&self) -> Caption {
        self.caption_rx.borrow().clone()
    }

    pub fn subscribe_caption(&self) -> watch::Receiver<Caption> {
        self.caption_rx.clone()
    }

    pub fn detection_state(&self) -> DetectionState {
        self.state.clone()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn stop(&self) {
        self.cancel_token.cancel();
    }

    /// Waits for bootstrap and every loop it started to finish.
    pub async fn join(&mut self) {
        if let Some(task) = self.bootstrap_task.take() {
            if let Err(e) = task.await {
                error!("Coordinator task failed: {}", e);
            }
        }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Bootstrap {
    /// Acquires the camera, loads the models and starts every loop.
    /// Returns `None` when detection never started.
    async fn run(self, cancel_token: CancellationToken) -> Option<JoinSet<()>> {
        let Bootstrap {
            settings,
            media_source,
            model_loader,
            mut surface,
            policy,
            clock,
            state,
            writers,
            caption_tx,
            caption_rx,
            status_tx,
        } = self;

        let acquired = tokio::select! {
            _ = cancel_token.cancelled() => return None,
            acquired = media_source.acquire_video_stream() => acquired,
        };
        let stream = match acquired {
            Ok(stream) => stream,
            Err(e) => {
                error!("Could not acquire the video stream: {}", e);
                status_tx.send_replace(AppStatus::Failed(CAMERA_PERMISSION_MESSAGE.to_string()));
                return None;
            }
        };
        info!(
            "Video stream {} acquired at {}x{}",
            stream.id(),
            stream.dimensions().width,
            stream.dimensions().height
        );

        let loaded = tokio::select! {
            _ = cancel_token.cancelled() => return None,
            loaded = LoadedModels::load(model_loader.as_ref(), &settings.model_base_url, &stream) => loaded,
        };
        let models = match loaded {
            Ok(models) => models,
            Err(e) => {
                error!("Model loading failed: {}", e);
                status_tx.send_replace(AppStatus::Failed(MODEL_LOAD_FAILED_MESSAGE.to_string()));
                return None;
            }
        };

        surface.match_dimensions(stream.dimensions());
        let display = surface.dimensions();

        let mut tasks = JoinSet::new();
        tasks.spawn(
            FaceFeed::new(models.faces, stream.clone(), display, writers.faces)
                .run(cancel_token.clone()),
        );
        tasks.spawn(ObjectFeed::new(models.objects, stream, writers.objects).run(cancel_token.clone()));
        tasks.spawn(PoseFeed::new(models.poses, writers.poses).run(cancel_token.clone()));
        tasks.spawn(
            CaptionScheduler::new(
                state.clone(),
                SignalExtractor::from(&settings.signals),
                policy,
                clock,
                caption_tx,
            )
            .with_period(settings.caption_period())
            .run(cancel_token.clone()),
        );
        tasks.spawn(
            RenderTick::new(surface, state, caption_rx, status_tx.subscribe())
                .with_period(settings.render_period())
                .with_fallback_text(settings.render.fallback_text.clone())
                .run(cancel_token.clone()),
        );

        status_tx.send_replace(AppStatus::Running);
        info!("Detection running");
        Some(tasks)
    }
}

pub struct CoordinatorBuilder {
    settings: Settings,
    media_source: Option<Arc<dyn MediaSource>>,
    model_loader: Option<Arc<dyn ModelLoader>>,
    surface: Option<Box<dyn DisplaySurface>>,
    policy: Option<Box<dyn CaptionPolicy>>,
    clock: Arc<dyn Clock>,
}

impl CoordinatorBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            media_source: None,
            model_loader: None,
            surface: None,
            policy: None,
            clock: Arc::new(SystemClock),
        }
    }

    // Sets the model location, this will override the configured one.
    pub fn model_base_url(mut self, model_base_url: impl Into<String>) -> Self {
        self.settings.model_base_url = model_base_url.into();
        self
    }

    // Adjusts the caption period, this will override the configured one.
    pub fn caption_period(mut self, period: Duration) -> Self {
        self.settings.caption.period_ms = period.as_millis() as u64;
        self
    }

    // Adjusts the render period, this will override the configured one.
    pub fn render_period(mut self, period: Duration) -> Self {
        self.settings.render.period_ms = period.as_millis() as u64;
        self
    }

    pub fn media_source(mut self, media_source: Arc<dyn MediaSource>) -> Self {
        self.media_source = Some(media_source);
        self
    }

    pub fn model_loader(mut self, model_loader: Arc<dyn ModelLoader>) -> Self {
        self.model_loader = Some(model_loader);
        self
    }

    pub fn surface(mut self, surface: Box<dyn DisplaySurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn policy(mut self, policy: Box<dyn CaptionPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Starts bootstrapping right away; must be called inside a tokio runtime.
    pub fn build(self) -> Result<Coordinator, AppError> {
        self.settings.validate().map_err(AppError::InvalidConfig)?;
        let media_source = self
            .media_source
            .ok_or(AppError::InvalidConfig("Media source not set".to_string()))?;
        let model_loader = self
            .model_loader
            .ok_or(AppError::InvalidConfig("Model loader not set".to_string()))?;
        let surface = self
            .surface
            .unwrap_or_else(|| Box::new(RecordingSurface::new()));
        let policy = self.policy.unwrap_or_else(|| {
            Box::new(PriorityCaptionPolicy::new(self.settings.caption.texts.clone()))
        });

        let (writers, state) = DetectionState::new();
        let (caption_tx, caption_rx) =
            watch::channel(Caption::startup(self.settings.render.fallback_text.clone()));
        let (status_tx, status_rx) = watch::channel(AppStatus::Loading);
        let cancel_token = CancellationToken::new();

        let bootstrap = Bootstrap {
            settings: self.settings,
            media_source,
            model_loader,
            surface,
            policy,
            clock: self.clock,
            state: state.clone(),
            writers,
            caption_tx,
            caption_rx: caption_rx.clone(),
            status_tx,
        };

        Ok(Coordinator {
            bootstrap_task: Some(Coordinator::start(bootstrap, cancel_token.clone())),
            cancel_token,
            state,
            status_rx,
            caption_rx,
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::app::DrawCommand;
    use crate::common::{BoundingBox, Expression, FaceResult};
    use crate::error::{DetectorError, MediaError};
    use crate::intake::{
        FaceDetector, ObjectDetector, PoseEstimator, ScenarioTimeline, ScriptedMedia,
        ScriptedModels, ScriptedScenario, VideoStream,
    };
    use crate::intake::scripted::ScenarioStep;
    use crate::pipeline::{CaptionKind, FixedClock};

    struct DeniedCamera;

    #[async_trait]
    impl MediaSource for DeniedCamera {
        async fn acquire_video_stream(&self) -> Result<VideoStream, MediaError> {
            Err(MediaError::PermissionDenied)
        }
    }

    struct MissingModels;

    #[async_trait]
    impl ModelLoader for MissingModels {
        async fn load_face_detector(
            &self,
            base_url: &str,
        ) -> Result<Arc<dyn FaceDetector>, DetectorError> {
            Err(DetectorError::load("face", format!("{} not found", base_url)))
        }

        async fn load_object_detector(
            &self,
            _base_url: &str,
        ) -> Result<Arc<dyn ObjectDetector>, DetectorError> {
            Err(DetectorError::load("object", "not found"))
        }

        async fn load_pose_estimator(
            &self,
            _base_url: &str,
            _stream: &VideoStream,
        ) -> Result<Box<dyn PoseEstimator>, DetectorError> {
            Err(DetectorError::load("pose", "not found"))
        }
    }

    fn happy_scenario() -> ScriptedScenario {
        let face = FaceResult::new(BoundingBox::new(100.0, 120.0, 160.0, 160.0))
            .with_expressions([(Expression::Happy, 0.9), (Expression::Sad, 0.1)].into_iter().collect());
        ScriptedScenario {
            width: 640,
            height: 480,
            fps: 10,
            face_latency_ms: 20,
            object_latency_ms: 50,
            steps: vec![ScenarioStep {
                label: Some("smiling".to_string()),
                duration_ms: 10_000,
                faces: vec![face],
                objects: Vec::new(),
                poses: Vec::new(),
            }],
        }
    }

    async fn settled(coordinator: &Coordinator) -> AppStatus {
        let mut status_rx = coordinator.subscribe_status();
        let status = status_rx
            .wait_for(|status| *status != AppStatus::Loading)
            .await
            .unwrap()
            .clone();
        status
    }

    #[tokio::test(start_paused = true)]
    async fn camera_denial_reports_permission_message() {
        let timeline = ScenarioTimeline::start(happy_scenario());
        let mut coordinator = Coordinator::builder(Settings::default())
            .media_source(Arc::new(DeniedCamera))
            .model_loader(Arc::new(ScriptedModels::new(timeline)))
            .build()
            .unwrap();

        assert_eq!(
            settled(&coordinator).await,
            AppStatus::Failed("Please allow webcam access.".to_string())
        );
        coordinator.join().await;
        assert_eq!(coordinator.caption().kind, CaptionKind::Startup);
    }

    #[tokio::test(start_paused = true)]
    async fn model_failure_reports_refresh_message() {
        let timeline = ScenarioTimeline::start(happy_scenario());
        let mut coordinator = Coordinator::builder(Settings::default())
            .media_source(Arc::new(ScriptedMedia::new(timeline)))
            .model_loader(Arc::new(MissingModels))
            .build()
            .unwrap();

        assert_eq!(
            settled(&coordinator).await,
            AppStatus::Failed("Failed to load the models. Please refresh.".to_string())
        );
        coordinator.join().await;
        assert!(coordinator.detection_state().faces().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn runs_detection_and_captions_the_face() {
        let timeline = ScenarioTimeline::start(happy_scenario());
        let surface = RecordingSurface::new();
        let frames = surface.subscribe();
        let mut coordinator = Coordinator::builder(Settings::default())
            .media_source(Arc::new(ScriptedMedia::new(timeline.clone())))
            .model_loader(Arc::new(ScriptedModels::new(timeline)))
            .surface(Box::new(surface))
            .clock(Arc::new(FixedClock::at(12, 0)))
            .build()
            .unwrap();

        assert_eq!(settled(&coordinator).await, AppStatus::Running);
        assert_eq!(coordinator.caption().text, "look at the camera");

        tokio::time::sleep(Duration::from_millis(3150)).await;
        let caption = coordinator.caption();
        assert_eq!(caption.kind, CaptionKind::Happy);
        assert_eq!(caption.text, "Looking happy");
        assert_eq!(coordinator.detection_state().faces().len(), 1);

        let frame = frames.borrow().clone();
        assert_eq!(
            frame[0],
            DrawCommand::Clear(BoundingBox::new(0.0, 0.0, 640.0, 480.0))
        );
        assert!(frame
            .iter()
            .any(|command| matches!(command, DrawCommand::FillText { text, .. } if text == "Looking happy")));

        coordinator.stop();
        coordinator.join().await;
    }

    #[test]
    fn build_requires_collaborators() {
        let result = Coordinator::builder(Settings::default()).build();
        assert!(matches!(result, Err(AppError::InvalidConfig(_))));
    }

    #[test]
    fn build_rejects_invalid_settings() {
        let result = Coordinator::builder(Settings::default())
            .caption_period(Duration::ZERO)
            .media_source(Arc::new(DeniedCamera))
            .model_loader(Arc::new(MissingModels))
            .build();
        assert!(matches!(result, Err(AppError::InvalidConfig(_))));
    }
}
