use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use super::exec::{CommandExecutor, CommandOutcome};

/// Container duration as reported by the prober. `Unknown` is not "short".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbedDuration {
    Known(f64),
    Unknown,
}

impl ProbedDuration {
    pub fn seconds(self) -> Option<f64> {
        match self {
            ProbedDuration::Known(seconds) => Some(seconds),
            ProbedDuration::Unknown => None,
        }
    }

    pub fn or_zero(self) -> f64 {
        self.seconds().unwrap_or(0.0)
    }

    pub fn is_known(self) -> bool {
        matches!(self, ProbedDuration::Known(_))
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    #[serde(default)]
    duration: Option<String>,
}

pub(crate) fn parse_duration(stdout: &[u8]) -> ProbedDuration {
    let Ok(parsed) = serde_json::from_slice::<FfprobeOutput>(stdout) else {
        return ProbedDuration::Unknown;
    };
    parsed
        .format
        .and_then(|format| format.duration)
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite() && *value > 0.0)
        .map(ProbedDuration::Known)
        .unwrap_or(ProbedDuration::Unknown)
}

#[derive(Clone)]
pub struct MediaProber {
    ffprobe: PathBuf,
    timeout: Duration,
    executor: Arc<dyn CommandExecutor>,
}

impl MediaProber {
    pub fn new(
        ffprobe: impl Into<PathBuf>,
        timeout: Duration,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            ffprobe: ffprobe.into(),
            timeout,
            executor,
        }
    }

    /// Accepts a local path or a remote URL.
    pub async fn probe_duration(&self, source: &str) -> ProbedDuration {
        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-show_entries".to_string(),
            "format=duration".to_string(),
            "-of".to_string(),
            "json".to_string(),
            source.to_string(),
        ];
        match self.executor.run(&self.ffprobe, &args, self.timeout).await {
            Ok(CommandOutcome::Finished(output)) if output.success() => {
                let duration = parse_duration(&output.stdout);
                if !duration.is_known() {
                    debug!(source, stdout = %output.stdout_lossy(), "ffprobe returned no usable duration");
                }
                duration
            }
            Ok(CommandOutcome::Finished(output)) => {
                debug!(
                    source,
                    exit_code = ?output.exit_code,
                    stderr = %output.stderr_tail(),
                    "ffprobe returned non-zero status"
                );
                ProbedDuration::Unknown
            }
            Ok(CommandOutcome::TimedOut) => {
                warn!(source, timeout = ?self.timeout, "ffprobe timed out");
                ProbedDuration::Unknown
            }
            Err(err) => {
                warn!(source, error = %err, program = %self.ffprobe.display(), "failed to run ffprobe");
                ProbedDuration::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_format_duration() {
        let payload = br#"{"format": {"duration": "12.480000"}}"#;
        assert_eq!(parse_duration(payload), ProbedDuration::Known(12.48));
    }

    #[test]
    fn unusable_payloads_are_unknown() {
        assert_eq!(
            parse_duration(br#"{"format": {"duration": "N/A"}}"#),
            ProbedDuration::Unknown
        );
        assert_eq!(
            parse_duration(br#"{"format": {"duration": "0.000000"}}"#),
            ProbedDuration::Unknown
        );
        assert_eq!(
            parse_duration(br#"{"format": {"duration": "-3"}}"#),
            ProbedDuration::Unknown
        );
        assert_eq!(parse_duration(br#"{"format": {}}"#), ProbedDuration::Unknown);
        assert_eq!(parse_duration(br#"{}"#), ProbedDuration::Unknown);
        assert_eq!(parse_duration(b"garbage"), ProbedDuration::Unknown);
    }

    #[test]
    fn unknown_falls_back_to_zero() {
        assert_eq!(ProbedDuration::Unknown.or_zero(), 0.0);
        assert_eq!(ProbedDuration::Known(2.5).or_zero(), 2.5);
        assert_eq!(ProbedDuration::Known(2.5).seconds(), Some(2.5));
    }
}
