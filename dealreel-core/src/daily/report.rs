use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use hex::encode as hex_encode;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::deal::Deal;
use crate::segment::{Segment, SegmentRole};
use crate::trailer::TrailerFailure;

use super::error::{ReelError, ReelResult};

#[derive(Debug, Clone, Serialize)]
pub struct ReportedSegment {
    pub role: SegmentRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deal_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub target_duration: f64,
    pub duration: f64,
}

impl ReportedSegment {
    pub fn framing(segment: &Segment) -> Self {
        Self {
            role: segment.role,
            deal_id: None,
            source: None,
            target_duration: segment.target_duration,
            duration: segment.duration,
        }
    }

    pub fn game(segment: &Segment, deal: &Deal, url: &str) -> Self {
        Self {
            role: segment.role,
            deal_id: Some(deal.appid),
            source: Some(url.to_string()),
            target_duration: segment.target_duration,
            duration: segment.duration,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedAttempt {
    pub url: String,
    pub start_offset: f64,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedDeal {
    pub deal_id: u64,
    pub name: String,
    pub attempts: Vec<FailedAttempt>,
}

impl SkippedDeal {
    pub fn new(deal: &Deal, failures: &[TrailerFailure]) -> Self {
        Self {
            deal_id: deal.appid,
            name: deal.name.clone(),
            attempts: failures
                .iter()
                .map(|failure| FailedAttempt {
                    url: failure.url.clone(),
                    start_offset: failure.start_offset,
                    error: failure.error.to_string(),
                })
                .collect(),
        }
    }
}

/// Summary persisted next to every produced video.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub date: NaiveDate,
    pub output: PathBuf,
    pub sha256: String,
    pub size_bytes: u64,
    pub expected_duration: f64,
    pub probed_duration: Option<f64>,
    pub crossfade: Option<f64>,
    pub soundtrack: Option<PathBuf>,
    pub segments: Vec<ReportedSegment>,
    pub skipped_deals: Vec<SkippedDeal>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn game_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|segment| segment.role == SegmentRole::Game)
            .count()
    }

    pub fn write_to(&self, path: &Path) -> ReelResult<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, bytes).map_err(|source| ReelError::Io {
            source,
            path: path.to_path_buf(),
        })
    }
}

/// Hex digest and byte length of a file, streamed in chunks.
pub fn file_digest(path: &Path) -> ReelResult<(String, u64)> {
    let io_err = |source: std::io::Error| ReelError::Io {
        source,
        path: path.to_path_buf(),
    };
    let mut file = std::fs::File::open(path).map_err(io_err)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 64 * 1024];
    let mut size = 0u64;
    loop {
        let read = file.read(&mut buffer).map_err(io_err)?;
        if read == 0 {
            break;
        }
        size += read as u64;
        hasher.update(&buffer[..read]);
    }
    Ok((hex_encode(hasher.finalize()), size))
}
