pub mod clock;
pub mod policy;
pub mod scheduler;
pub mod signals;
pub mod state;

pub use clock::{Clock, FixedClock, SystemClock};
pub use policy::{Caption, CaptionKind, CaptionPolicy, CaptionTexts, PriorityCaptionPolicy};
pub use scheduler::CaptionScheduler;
pub use signals::{Conditions, SignalExtractor};
pub use state::{DetectionSnapshot, DetectionState, FeedWriters, SliceWriter};
