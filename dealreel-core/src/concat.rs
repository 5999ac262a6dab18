use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::VideoSection;
use crate::filter::{FadeDirection, Filter, FilterChain, FilterGraph};
use crate::media::{CommandExecutor, CommandOutcome, MediaProber};

const SOUNDTRACK_FADE_SECONDS: f64 = 1.5;

#[derive(Debug, Error)]
pub enum ConcatError {
    #[error("no segments to concatenate")]
    NoSegments,
    #[error("concatenation failed (status {exit_code:?}): {reason}")]
    ConcatFailed {
        exit_code: Option<i32>,
        reason: String,
    },
    #[error("io error at {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
}

pub type ConcatResult<T> = Result<T, ConcatError>;

/// Timing of a left-to-right crossfade chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossfadePlan {
    pub crossfade: f64,
    pub offsets: Vec<f64>,
    pub total: f64,
}

impl CrossfadePlan {
    /// `durations` of zero stand for segments whose length could not be probed;
    /// the transition falls back to the floor and offsets are clamped at zero.
    pub fn compute(durations: &[f64], max_crossfade: f64, floor: f64) -> Self {
        let durations: Vec<f64> = durations.iter().map(|d| d.max(0.0)).collect();
        let shortest = durations.iter().copied().fold(f64::INFINITY, f64::min);
        let shortest = if shortest.is_finite() { shortest } else { 0.0 };
        let crossfade = max_crossfade.min(shortest / 3.0).max(floor);

        let mut offsets = Vec::with_capacity(durations.len().saturating_sub(1));
        let mut length = durations.first().copied().unwrap_or(0.0);
        for duration in durations.iter().skip(1) {
            let offset = (length - crossfade).max(0.0);
            offsets.push(offset);
            length = offset + duration;
        }
        Self {
            crossfade,
            offsets,
            total: length,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConcatSummary {
    pub segment_durations: Vec<f64>,
    pub crossfade: Option<CrossfadePlan>,
    pub expected_duration: f64,
    pub soundtrack: Option<PathBuf>,
}

#[derive(Clone)]
pub struct Concatenator {
    ffmpeg: PathBuf,
    timeout: Duration,
    executor: Arc<dyn CommandExecutor>,
    prober: MediaProber,
    video: VideoSection,
    max_crossfade: f64,
    crossfade_floor: f64,
}

impl Concatenator {
    pub fn new(
        ffmpeg: impl Into<PathBuf>,
        timeout: Duration,
        executor: Arc<dyn CommandExecutor>,
        prober: MediaProber,
        video: VideoSection,
    ) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            timeout,
            executor,
            prober,
            video,
            max_crossfade: 0.35,
            crossfade_floor: 0.1,
        }
    }

    pub fn with_crossfade(mut self, max_crossfade: f64, floor: f64) -> Self {
        self.max_crossfade = max_crossfade;
        self.crossfade_floor = floor;
        self
    }

    pub async fn concatenate(
        &self,
        segments: &[PathBuf],
        out_path: &Path,
    ) -> ConcatResult<ConcatSummary> {
        self.concatenate_with_soundtrack(segments, None, out_path).await
    }

    pub async fn concatenate_with_soundtrack(
        &self,
        segments: &[PathBuf],
        soundtrack: Option<&Path>,
        out_path: &Path,
    ) -> ConcatResult<ConcatSummary> {
        if segments.is_empty() {
            return Err(ConcatError::NoSegments);
        }

        if segments.len() == 1 && soundtrack.is_none() {
            fs::copy(&segments[0], out_path)
                .await
                .map_err(|source| ConcatError::Io {
                    source,
                    path: out_path.to_path_buf(),
                })?;
            let duration = self
                .prober
                .probe_duration(&segments[0].to_string_lossy())
                .await
                .or_zero();
            return Ok(ConcatSummary {
                segment_durations: vec![duration],
                crossfade: None,
                expected_duration: duration,
                soundtrack: None,
            });
        }

        let mut durations = Vec::with_capacity(segments.len());
        for segment in segments {
            let probed = self.prober.probe_duration(&segment.to_string_lossy()).await;
            if !probed.is_known() {
                warn!(path = %segment.display(), "segment duration unknown, transition degrades to a cut");
            }
            durations.push(probed.or_zero());
        }
        let plan = CrossfadePlan::compute(&durations, self.max_crossfade, self.crossfade_floor);
        let (graph, video_label, audio_label) =
            self.build_graph(segments.len(), &plan, soundtrack);
        let args = self.arguments(
            segments,
            soundtrack,
            &graph,
            &video_label,
            audio_label.as_deref(),
            out_path,
        );
        debug!(
            segments = segments.len(),
            crossfade = plan.crossfade,
            total = plan.total,
            "concatenating segments"
        );

        let failure = match self.executor.run(&self.ffmpeg, &args, self.timeout).await {
            Ok(CommandOutcome::Finished(output)) if output.success() => None,
            Ok(CommandOutcome::Finished(output)) => Some(ConcatError::ConcatFailed {
                exit_code: output.exit_code,
                reason: output.stderr_tail(),
            }),
            Ok(CommandOutcome::TimedOut) => Some(ConcatError::ConcatFailed {
                exit_code: None,
                reason: format!("timed out after {:?}", self.timeout),
            }),
            Err(err) => Some(ConcatError::ConcatFailed {
                exit_code: None,
                reason: format!("failed to start {}: {err}", self.ffmpeg.display()),
            }),
        };
        if let Some(err) = failure {
            if let Err(remove_err) = fs::remove_file(out_path).await {
                if remove_err.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %out_path.display(), error = %remove_err, "failed to remove partial output");
                }
            }
            return Err(err);
        }

        info!(
            path = %out_path.display(),
            segments = segments.len(),
            expected_duration = plan.total,
            "concatenation finished"
        );
        Ok(ConcatSummary {
            segment_durations: durations,
            expected_duration: plan.total,
            crossfade: Some(plan),
            soundtrack: soundtrack.map(Path::to_path_buf),
        })
    }

    fn build_graph(
        &self,
        count: usize,
        plan: &CrossfadePlan,
        soundtrack: Option<&Path>,
    ) -> (FilterGraph, String, Option<String>) {
        let mut graph = FilterGraph::new();
        for index in 0..count {
            graph.node(
                [format!("{index}:v")],
                FilterChain::new()
                    .then(Filter::Fps(self.video.fps))
                    .then(Filter::TimeBase)
                    .then(Filter::Format(self.video.pix_fmt.clone())),
                format!("v{index}"),
            );
        }

        let mut current = "v0".to_string();
        for (index, offset) in plan.offsets.iter().enumerate() {
            let output = format!("x{index}");
            graph.node(
                [current.clone(), format!("v{}", index + 1)],
                FilterChain::new().then(Filter::Crossfade {
                    duration: plan.crossfade,
                    offset: *offset,
                }),
                output.clone(),
            );
            current = output;
        }

        let audio = soundtrack.map(|_| {
            let fade = SOUNDTRACK_FADE_SECONDS.min(plan.total / 2.0);
            graph.node(
                [format!("{count}:a")],
                FilterChain::new()
                    .then(Filter::AudioTrim {
                        duration: plan.total,
                    })
                    .then(Filter::AudioResetTimestamps)
                    .then(Filter::AudioFade {
                        direction: FadeDirection::Out,
                        start: (plan.total - fade).max(0.0),
                        duration: fade,
                    }),
                "aout",
            );
            "aout".to_string()
        });
        (graph, current, audio)
    }

    fn arguments(
        &self,
        segments: &[PathBuf],
        soundtrack: Option<&Path>,
        graph: &FilterGraph,
        video_label: &str,
        audio_label: Option<&str>,
        out_path: &Path,
    ) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
        ];
        for segment in segments {
            args.push("-i".to_string());
            args.push(segment.to_string_lossy().to_string());
        }
        if let Some(track) = soundtrack {
            args.push("-stream_loop".to_string());
            args.push("-1".to_string());
            args.push("-i".to_string());
            args.push(track.to_string_lossy().to_string());
        }
        args.push("-filter_complex".to_string());
        args.push(graph.render());
        args.push("-map".to_string());
        args.push(format!("[{video_label}]"));
        if let Some(label) = audio_label {
            args.push("-map".to_string());
            args.push(format!("[{label}]"));
        }
        args.push("-c:v".to_string());
        args.push(self.video.codec.clone());
        args.push("-preset".to_string());
        args.push(self.video.preset.clone());
        args.push("-crf".to_string());
        args.push(self.video.crf.to_string());
        args.push("-pix_fmt".to_string());
        args.push(self.video.pix_fmt.clone());
        if audio_label.is_some() {
            args.push("-c:a".to_string());
            args.push("aac".to_string());
            args.push("-b:a".to_string());
            args.push("192k".to_string());
            args.push("-shortest".to_string());
        }
        args.push("-movflags".to_string());
        args.push("+faststart".to_string());
        args.push(out_path.to_string_lossy().to_string());
        args
    }
}
