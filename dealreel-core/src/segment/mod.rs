mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::fs;
use tracing::{debug, warn};

use crate::config::SegmentsSection;
use crate::deal::Deal;
use crate::design::ShortsDesign;
use crate::filter::{fmt_num, FilterChain};
use crate::media::{CommandExecutor, CommandOutcome, MediaProber, ProbedDuration};

pub use error::{BuildError, BuildResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentRole {
    Intro,
    Game,
    Outro,
}

/// A rendered clip that passed probe validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub path: PathBuf,
    pub role: SegmentRole,
    pub target_duration: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, Copy)]
pub enum SegmentSpec<'a> {
    Intro {
        date_label: &'a str,
    },
    Outro,
    Game {
        deal: &'a Deal,
        source: &'a str,
        start_offset: f64,
    },
}

impl SegmentSpec<'_> {
    pub fn role(&self) -> SegmentRole {
        match self {
            SegmentSpec::Intro { .. } => SegmentRole::Intro,
            SegmentSpec::Outro => SegmentRole::Outro,
            SegmentSpec::Game { .. } => SegmentRole::Game,
        }
    }
}

#[derive(Clone)]
pub struct SegmentBuilder {
    ffmpeg: PathBuf,
    timeout: Duration,
    executor: Arc<dyn CommandExecutor>,
    prober: MediaProber,
    design: ShortsDesign,
    segments: SegmentsSection,
}

impl SegmentBuilder {
    pub fn new(
        ffmpeg: impl Into<PathBuf>,
        timeout: Duration,
        executor: Arc<dyn CommandExecutor>,
        prober: MediaProber,
        design: ShortsDesign,
        segments: SegmentsSection,
    ) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            timeout,
            executor,
            prober,
            design,
            segments,
        }
    }

    pub fn game_duration(&self) -> f64 {
        self.segments.game_seconds
    }

    pub fn target_duration(&self, role: SegmentRole) -> f64 {
        match role {
            SegmentRole::Intro => self.segments.intro_seconds,
            SegmentRole::Game => self.segments.game_seconds,
            SegmentRole::Outro => self.segments.outro_seconds,
        }
    }

    /// Renders one segment and re-probes it; a zero-length output is rejected
    /// even when the transcoder exited cleanly.
    pub async fn build(&self, spec: SegmentSpec<'_>, out_path: &Path) -> BuildResult<Segment> {
        let role = spec.role();
        let target = self.target_duration(role);
        let args = self.arguments(&spec, target, out_path);
        debug!(?role, path = %out_path.display(), "rendering segment");

        match self.executor.run(&self.ffmpeg, &args, self.timeout).await {
            Ok(CommandOutcome::Finished(output)) if output.success() => {}
            Ok(CommandOutcome::Finished(output)) => {
                discard(out_path).await;
                return Err(BuildError::TranscodeFailed {
                    exit_code: output.exit_code,
                    stderr: output.stderr_tail(),
                });
            }
            Ok(CommandOutcome::TimedOut) => {
                discard(out_path).await;
                return Err(BuildError::TranscodeTimeout {
                    timeout: self.timeout,
                });
            }
            Err(source) => {
                return Err(BuildError::Spawn {
                    program: self.ffmpeg.clone(),
                    source,
                });
            }
        }

        let probed = self
            .prober
            .probe_duration(&out_path.to_string_lossy())
            .await;
        match probed {
            ProbedDuration::Known(duration) if duration >= self.segments.min_valid_seconds => {
                Ok(Segment {
                    path: out_path.to_path_buf(),
                    role,
                    target_duration: target,
                    duration,
                })
            }
            other => {
                discard(out_path).await;
                Err(BuildError::EmptySegment {
                    path: out_path.to_path_buf(),
                    duration: other.seconds(),
                })
            }
        }
    }

    fn arguments(&self, spec: &SegmentSpec<'_>, target: f64, out_path: &Path) -> Vec<String> {
        let video = self.design.video();
        let duration = fmt_num(target);
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
        ];
        let chain: FilterChain = match spec {
            SegmentSpec::Intro { date_label } => {
                args.extend(self.canvas_input(&duration));
                self.design.intro_chain(date_label, target)
            }
            SegmentSpec::Outro => {
                args.extend(self.canvas_input(&duration));
                self.design.outro_chain(target)
            }
            SegmentSpec::Game {
                deal,
                source,
                start_offset,
            } => {
                args.push("-ss".to_string());
                args.push(format!("{:.3}", start_offset.max(0.0)));
                args.push("-i".to_string());
                args.push(source.to_string());
                self.design.game_chain(deal, target)
            }
        };
        args.push("-t".to_string());
        args.push(duration);
        args.push("-vf".to_string());
        args.push(chain.render());
        args.push("-an".to_string());
        args.push("-c:v".to_string());
        args.push(video.codec.clone());
        args.push("-preset".to_string());
        args.push(video.preset.clone());
        args.push("-crf".to_string());
        args.push(video.crf.to_string());
        args.push("-pix_fmt".to_string());
        args.push(video.pix_fmt.clone());
        args.push("-movflags".to_string());
        args.push("+faststart".to_string());
        args.push(out_path.to_string_lossy().to_string());
        args
    }

    fn canvas_input(&self, duration: &str) -> Vec<String> {
        let video = self.design.video();
        vec![
            "-f".to_string(),
            "lavfi".to_string(),
            "-i".to_string(),
            format!(
                "color=c={}:s={}x{}:r={}:d={}",
                video.background, video.width, video.height, video.fps, duration
            ),
        ]
    }
}

async fn discard(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(path = %path.display(), error = %err, "failed to remove rejected segment"),
    }
}
