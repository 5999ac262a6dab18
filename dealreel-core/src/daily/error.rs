use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::concat::ConcatError;
use crate::segment::BuildError;

#[derive(Debug, Error)]
pub enum MarkerError {
    #[error("failed to read marker {path}: {source}")]
    Read { source: io::Error, path: PathBuf },
    #[error("failed to write marker {path}: {source}")]
    Write { source: io::Error, path: PathBuf },
}

pub type MarkerResult<T> = std::result::Result<T, MarkerError>;

#[derive(Debug, Error)]
pub enum ReelError {
    #[error("intro segment failed: {0}")]
    Intro(#[source] BuildError),
    #[error("outro segment failed: {0}")]
    Outro(#[source] BuildError),
    #[error(transparent)]
    ConcatFailed(#[from] ConcatError),
    #[error("no usable trailer for deal {deal_id}")]
    NoUsableTrailer { deal_id: u64 },
    #[error("no game segments could be built")]
    NoContent,
    #[error(transparent)]
    MarkerIo(#[from] MarkerError),
    #[error("io error at {path}: {source}")]
    Io { source: io::Error, path: PathBuf },
    #[error("failed to encode run report: {0}")]
    Report(#[from] serde_json::Error),
}

impl ReelError {
    /// Underlying segment failure, when the run died building intro or outro.
    pub fn build_error(&self) -> Option<&BuildError> {
        match self {
            ReelError::Intro(err) | ReelError::Outro(err) => Some(err),
            _ => None,
        }
    }
}

pub type ReelResult<T> = std::result::Result<T, ReelError>;
