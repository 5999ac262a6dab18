pub mod concat;
pub mod config;
pub mod daily;
pub mod deal;
pub mod design;
pub mod error;
pub mod filter;
pub mod media;
pub mod segment;
pub mod soundtrack;
pub mod trailer;

pub use concat::{ConcatError, ConcatResult, ConcatSummary, Concatenator, CrossfadePlan};
pub use config::{load_reel_config, ReelConfig};
pub use daily::{
    Clock, DailyMarker, DailyRunController, ManualClock, MarkerError, ReelError, ReelResult,
    RenderPlan, RunOutcome, RunReport, ScratchDir, SkippedDeal, SystemClock,
};
pub use deal::{format_price, Deal, DealEntry, TrailerCandidates};
pub use design::ShortsDesign;
pub use error::{ConfigError, Result};
pub use media::{
    CommandExecutor, CommandOutcome, CommandOutput, MediaProber, ProbedDuration,
    SystemCommandExecutor,
};
pub use segment::{BuildError, BuildResult, Segment, SegmentBuilder, SegmentRole, SegmentSpec};
pub use soundtrack::SoundtrackPicker;
pub use trailer::{clip_start_offset, SelectionOutcome, TrailerFailure, TrailerSelector};
