use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::clock::Clock;
use super::policy::{Caption, CaptionPolicy};
use super::signals::SignalExtractor;
use super::state::DetectionState;

pub const DEFAULT_CAPTION_PERIOD: Duration = Duration::from_millis(3000);

/// Re-evaluates the caption policy on a fixed period and publishes the result.
///
/// Owns the only sender of the current caption.
pub struct CaptionScheduler {
    state: DetectionState,
    extractor: SignalExtractor,
    policy: Box<dyn CaptionPolicy>,
    clock: Arc<dyn Clock>,
    caption_tx: watch::Sender<Caption>,
    period: Duration,
}

impl CaptionScheduler {
    pub fn new(
        state: DetectionState,
        extractor: SignalExtractor,
        policy: Box<dyn CaptionPolicy>,
        clock: Arc<dyn Clock>,
        caption_tx: watch::Sender<Caption>,
    ) -> Self {
        Self {
            state,
            extractor,
            policy,
            clock,
            caption_tx,
            period: DEFAULT_CAPTION_PERIOD,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Runs one policy evaluation against the latest snapshot and publishes it.
    pub fn tick(&self) -> Caption {
        let conditions = self.extractor.extract(&self.state.snapshot());
        let caption = self.policy.select_caption(&conditions, self.clock.now());
        let previous = self.caption_tx.send_replace(caption.clone());
        if previous.kind != caption.kind {
            info!(
                "Caption changed to {:?} by {}: {}",
                caption.kind,
                self.policy.name(),
                caption.text
            );
        } else {
            debug!("Caption unchanged ({:?}) for {:?}", caption.kind, conditions);
        }
        caption
    }

    /// Ticks every period, first one period after start, until cancelled.
    pub async fn run(self, cancel_token: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Caption scheduler started, period {:?}", self.period);
        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick();
                }
            }
        }
        info!("Caption scheduler stopped");
    }

    pub fn spawn(self, cancel_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{BoundingBox, Expression, FaceResult, ObjectResult};
    use crate::pipeline::clock::FixedClock;
    use crate::pipeline::policy::{CaptionKind, PriorityCaptionPolicy};
    use crate::pipeline::state::FeedWriters;

    fn scheduler() -> (FeedWriters, CaptionScheduler, watch::Receiver<Caption>) {
        let (writers, state) = DetectionState::new();
        let (caption_tx, caption_rx) = watch::channel(Caption::startup("look at the camera"));
        let scheduler = CaptionScheduler::new(
            state,
            SignalExtractor::default(),
            Box::new(PriorityCaptionPolicy::default()),
            Arc::new(FixedClock::at(9, 5)),
            caption_tx,
        );
        (writers, scheduler, caption_rx)
    }

    #[test]
    fn tick_reads_the_latest_snapshot() {
        let (writers, scheduler, caption_rx) = scheduler();
        assert_eq!(scheduler.tick().kind, CaptionKind::Idle);

        let face = FaceResult::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0))
            .with_expressions([(Expression::Happy, 0.8)].into_iter().collect());
        writers.faces.publish(vec![face]);
        assert_eq!(scheduler.tick().kind, CaptionKind::Happy);

        writers
            .objects
            .publish(vec![ObjectResult::new("hat", 0.3, BoundingBox::default())]);
        scheduler.tick();
        assert_eq!(caption_rx.borrow().kind, CaptionKind::Hat);
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_only_after_each_period() {
        let (writers, scheduler, mut caption_rx) = scheduler();
        let cancel_token = CancellationToken::new();
        let handle = scheduler.spawn(cancel_token.clone());

        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert_eq!(caption_rx.borrow_and_update().kind, CaptionKind::Startup);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let caption = caption_rx.borrow_and_update().clone();
        assert_eq!(caption.kind, CaptionKind::Idle);
        assert!(caption.text.ends_with("09:05"));

        writers
            .objects
            .publish(vec![ObjectResult::new("sunglasses", 0.9, BoundingBox::default())]);
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(caption_rx.borrow().kind, CaptionKind::Idle);
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(caption_rx.borrow().kind, CaptionKind::Sunglasses);

        cancel_token.cancel();
        handle.await.unwrap();
    }
}
