use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("transcode exited with status {exit_code:?}: {stderr}")]
    TranscodeFailed {
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("transcode exceeded timeout of {timeout:?}")]
    TranscodeTimeout { timeout: Duration },
    #[error("segment {path} is unusable (probed duration {duration:?})")]
    EmptySegment {
        path: PathBuf,
        duration: Option<f64>,
    },
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },
}

pub type BuildResult<T> = Result<T, BuildError>;
