use std::path::Path;

use tracing::{info, warn};

use crate::daily::ReelError;
use crate::deal::{Deal, TrailerCandidates};
use crate::media::{MediaProber, ProbedDuration};
use crate::segment::{BuildError, Segment, SegmentBuilder, SegmentSpec};

/// One candidate that could not be turned into a segment.
#[derive(Debug)]
pub struct TrailerFailure {
    pub url: String,
    pub start_offset: f64,
    pub error: BuildError,
}

#[derive(Debug)]
pub enum SelectionOutcome {
    Built {
        segment: Segment,
        url: String,
        failures: Vec<TrailerFailure>,
    },
    NoSegment {
        failures: Vec<TrailerFailure>,
    },
}

impl SelectionOutcome {
    pub fn is_built(&self) -> bool {
        matches!(self, SelectionOutcome::Built { .. })
    }

    pub fn failures(&self) -> &[TrailerFailure] {
        match self {
            SelectionOutcome::Built { failures, .. } | SelectionOutcome::NoSegment { failures } => {
                failures
            }
        }
    }
}

/// Window start inside a trailer: centered when the trailer is long enough,
/// otherwise the configured fallback.
pub fn clip_start_offset(probed: ProbedDuration, target: f64, fallback: f64) -> f64 {
    match probed {
        ProbedDuration::Known(duration) if duration > target => (duration - target) / 2.0,
        _ => fallback,
    }
}

pub struct TrailerSelector<'a> {
    prober: &'a MediaProber,
    builder: &'a SegmentBuilder,
    fallback_start_offset: f64,
}

impl<'a> TrailerSelector<'a> {
    pub fn new(
        prober: &'a MediaProber,
        builder: &'a SegmentBuilder,
        fallback_start_offset: f64,
    ) -> Self {
        Self {
            prober,
            builder,
            fallback_start_offset,
        }
    }

    /// Never fails: a dead link only costs this deal its place in the video.
    pub async fn select_and_build(
        &self,
        deal: &Deal,
        candidates: &TrailerCandidates,
        out_path: &Path,
    ) -> SelectionOutcome {
        let mut failures = Vec::new();
        match self
            .try_candidates(deal, candidates, out_path, &mut failures)
            .await
        {
            Ok((segment, url)) => {
                info!(
                    deal_id = deal.appid,
                    url = %url,
                    duration = segment.duration,
                    failed_candidates = failures.len(),
                    "game segment ready"
                );
                SelectionOutcome::Built {
                    segment,
                    url,
                    failures,
                }
            }
            Err(err) => {
                warn!(
                    deal_id = deal.appid,
                    name = %deal.name,
                    candidates = candidates.len(),
                    error = %err,
                    "deal skipped from video"
                );
                SelectionOutcome::NoSegment { failures }
            }
        }
    }

    async fn try_candidates(
        &self,
        deal: &Deal,
        candidates: &TrailerCandidates,
        out_path: &Path,
        failures: &mut Vec<TrailerFailure>,
    ) -> Result<(Segment, String), ReelError> {
        let target = self.builder.game_duration();
        for (attempt, url) in candidates.iter().enumerate() {
            let probed = self.prober.probe_duration(url).await;
            let start_offset = clip_start_offset(probed, target, self.fallback_start_offset);
            let spec = SegmentSpec::Game {
                deal,
                source: url,
                start_offset,
            };
            match self.builder.build(spec, out_path).await {
                Ok(segment) => return Ok((segment, url.to_string())),
                Err(error) => {
                    warn!(
                        deal_id = deal.appid,
                        url,
                        attempt = attempt + 1,
                        probed_duration = ?probed.seconds(),
                        start_offset,
                        error = %error,
                        "trailer candidate failed"
                    );
                    failures.push(TrailerFailure {
                        url: url.to_string(),
                        start_offset,
                        error,
                    });
                }
            }
        }
        Err(ReelError::NoUsableTrailer {
            deal_id: deal.appid,
        })
    }
}
