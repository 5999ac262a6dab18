mod clock;
mod error;
mod marker;
mod plan;
mod report;
mod scratch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::fs;
use tracing::{error, info, warn};

use crate::concat::Concatenator;
use crate::config::ReelConfig;
use crate::deal::DealEntry;
use crate::design::ShortsDesign;
use crate::media::{CommandExecutor, MediaProber};
use crate::segment::{SegmentBuilder, SegmentSpec};
use crate::soundtrack::SoundtrackPicker;
use crate::trailer::{SelectionOutcome, TrailerSelector};

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{MarkerError, MarkerResult, ReelError, ReelResult};
pub use marker::DailyMarker;
pub use plan::RenderPlan;
pub use report::{file_digest, FailedAttempt, ReportedSegment, RunReport, SkippedDeal};
pub use scratch::ScratchDir;

/// Terminal state of one invocation.
#[derive(Debug)]
pub enum RunOutcome {
    Produced(RunReport),
    SkippedAlreadyDone { date: NaiveDate },
    SkippedNoContent { date: NaiveDate, skipped_deals: usize },
    Failed { date: NaiveDate, error: ReelError },
}

impl RunOutcome {
    pub fn date(&self) -> NaiveDate {
        match self {
            RunOutcome::Produced(report) => report.date,
            RunOutcome::SkippedAlreadyDone { date }
            | RunOutcome::SkippedNoContent { date, .. }
            | RunOutcome::Failed { date, .. } => *date,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunOutcome::Produced(_) => "produced",
            RunOutcome::SkippedAlreadyDone { .. } => "skipped_already_done",
            RunOutcome::SkippedNoContent { .. } => "skipped_no_content",
            RunOutcome::Failed { .. } => "failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RunOutcome::Failed { .. })
    }
}

pub struct DailyRunController {
    config: ReelConfig,
    clock: Arc<dyn Clock>,
    marker: DailyMarker,
    prober: MediaProber,
    builder: SegmentBuilder,
    concatenator: Concatenator,
    soundtrack: SoundtrackPicker,
    scratch_root: PathBuf,
}

impl DailyRunController {
    pub fn new(
        config: ReelConfig,
        executor: Arc<dyn CommandExecutor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let tools = &config.tools;
        let prober = MediaProber::new(&tools.ffprobe, tools.probe_timeout(), executor.clone());
        let design = ShortsDesign::new(
            config.design.clone(),
            config.video.clone(),
            &config.paths.font_file,
        );
        let builder = SegmentBuilder::new(
            &tools.ffmpeg,
            tools.segment_timeout(),
            executor.clone(),
            prober.clone(),
            design,
            config.segments.clone(),
        );
        let concatenator = Concatenator::new(
            &tools.ffmpeg,
            tools.concat_timeout(),
            executor,
            prober.clone(),
            config.video.clone(),
        )
        .with_crossfade(config.segments.max_crossfade, config.segments.crossfade_floor);
        let soundtrack = SoundtrackPicker::new(config.paths.music_dir.as_ref());
        Self {
            marker: DailyMarker::new(config.marker_path()),
            scratch_root: PathBuf::from(&config.paths.work_dir),
            clock,
            prober,
            builder,
            concatenator,
            soundtrack,
            config,
        }
    }

    pub fn marker(&self) -> &DailyMarker {
        &self.marker
    }

    /// Calendar date at the configured offset.
    pub fn today(&self) -> NaiveDate {
        self.clock
            .now()
            .with_timezone(&self.config.schedule.offset())
            .date_naive()
    }

    pub fn should_generate_today(&self) -> ReelResult<bool> {
        Ok(self.marker.read()? != Some(self.today()))
    }

    pub async fn run(&self, deals: &[DealEntry]) -> RunOutcome {
        self.run_inner(deals, false).await
    }

    /// Renders even when today's video already exists, replacing it.
    pub async fn run_forced(&self, deals: &[DealEntry]) -> RunOutcome {
        self.run_inner(deals, true).await
    }

    async fn run_inner(&self, deals: &[DealEntry], force: bool) -> RunOutcome {
        let date = self.today();
        // Nothing locks between this check and the marker write. Two runs on
        // the same day may both render; each uses its own partial file and the
        // final rename is atomic, so the cost is one extra render.
        if !force {
            match self.should_generate_today() {
                Ok(true) => {}
                Ok(false) => {
                    info!(%date, "video already produced today");
                    return RunOutcome::SkippedAlreadyDone { date };
                }
                Err(error) => return self.failed(date, error),
            }
        }

        let started_at = self.clock.now();
        let scratch = match ScratchDir::create(&self.scratch_root, started_at) {
            Ok(scratch) => scratch,
            Err(source) => {
                let error = ReelError::Io {
                    source,
                    path: self.scratch_root.clone(),
                };
                return self.failed(date, error);
            }
        };

        let mut skipped = Vec::new();
        let result = self
            .render(date, deals, &scratch, started_at, &mut skipped)
            .await;
        drop(scratch);

        match result {
            Ok(report) => RunOutcome::Produced(report),
            Err(ReelError::NoContent) => {
                warn!(%date, deals = deals.len(), "no deal produced a usable segment");
                RunOutcome::SkippedNoContent {
                    date,
                    skipped_deals: skipped.len(),
                }
            }
            Err(error) => self.failed(date, error),
        }
    }

    fn failed(&self, date: NaiveDate, error: ReelError) -> RunOutcome {
        error!(%date, error = %error, "daily run failed");
        RunOutcome::Failed { date, error }
    }

    async fn render(
        &self,
        date: NaiveDate,
        deals: &[DealEntry],
        scratch: &ScratchDir,
        started_at: DateTime<Utc>,
        skipped: &mut Vec<SkippedDeal>,
    ) -> ReelResult<RunReport> {
        let date_label = date.format("%Y-%m-%d").to_string();
        info!(%date, deals = deals.len(), scratch = %scratch.path().display(), "daily run started");

        let intro = self
            .builder
            .build(
                SegmentSpec::Intro {
                    date_label: &date_label,
                },
                &scratch.file("intro.mp4"),
            )
            .await
            .map_err(ReelError::Intro)?;
        let mut reported = vec![ReportedSegment::framing(&intro)];
        let mut plan = RenderPlan::new(intro);

        let selector = TrailerSelector::new(
            &self.prober,
            &self.builder,
            self.config.segments.fallback_start_offset,
        );
        let limit = self.config.segments.max_game_segments;
        for (index, entry) in deals.iter().enumerate() {
            if limit.is_some_and(|limit| plan.game_count() >= limit) {
                info!(
                    limit = plan.game_count(),
                    remaining = deals.len() - index,
                    "game segment limit reached"
                );
                break;
            }
            let out_path = scratch.file(&format!("game_{index:03}_{}.mp4", entry.deal.appid));
            match selector
                .select_and_build(&entry.deal, &entry.trailers, &out_path)
                .await
            {
                SelectionOutcome::Built { segment, url, .. } => {
                    reported.push(ReportedSegment::game(&segment, &entry.deal, &url));
                    plan.push_game(segment);
                }
                SelectionOutcome::NoSegment { failures } => {
                    skipped.push(SkippedDeal::new(&entry.deal, &failures));
                }
            }
        }

        let outro = self
            .builder
            .build(SegmentSpec::Outro, &scratch.file("outro.mp4"))
            .await
            .map_err(ReelError::Outro)?;
        reported.push(ReportedSegment::framing(&outro));
        let segments = plan.finish(outro)?;

        let output_dir = Path::new(&self.config.paths.output_dir);
        fs::create_dir_all(output_dir)
            .await
            .map_err(|source| ReelError::Io {
                source,
                path: output_dir.to_path_buf(),
            })?;
        let final_path = self.config.output_path(&date_label);
        let partial_name = format!("{date_label}.{}.partial.mp4", scratch.name());
        let partial_path = output_dir.join(partial_name);
        let soundtrack = self.soundtrack.pick(date);
        let inputs: Vec<PathBuf> = segments.iter().map(|segment| segment.path.clone()).collect();

        let summary = self
            .concatenator
            .concatenate_with_soundtrack(&inputs, soundtrack.as_deref(), &partial_path)
            .await?;
        let (sha256, size_bytes) = match file_digest(&partial_path) {
            Ok(digest) => digest,
            Err(err) => {
                remove_quietly(&partial_path).await;
                return Err(err);
            }
        };
        let probed_duration = self
            .prober
            .probe_duration(&partial_path.to_string_lossy())
            .await
            .seconds();
        if let Err(source) = fs::rename(&partial_path, &final_path).await {
            remove_quietly(&partial_path).await;
            return Err(ReelError::Io {
                source,
                path: final_path,
            });
        }

        if let Err(err) = self.marker.write(date) {
            remove_quietly(&final_path).await;
            return Err(err.into());
        }

        let report = RunReport {
            date,
            output: final_path.clone(),
            sha256,
            size_bytes,
            expected_duration: summary.expected_duration,
            probed_duration,
            crossfade: summary.crossfade.as_ref().map(|plan| plan.crossfade),
            soundtrack: summary.soundtrack,
            segments: reported,
            skipped_deals: std::mem::take(skipped),
            started_at,
            finished_at: self.clock.now(),
        };
        let report_path = self.config.report_path(&date_label);
        if let Err(err) = report.write_to(&report_path) {
            warn!(path = %report_path.display(), error = %err, "failed to write run report");
        }
        info!(
            %date,
            path = %final_path.display(),
            games = report.game_count(),
            skipped = report.skipped_deals.len(),
            duration = report.expected_duration,
            "daily video produced"
        );
        Ok(report)
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(err) = fs::remove_file(path).await {
        if err.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %err, "failed to remove output");
        }
    }
}
