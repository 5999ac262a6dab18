use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::error::{MarkerError, MarkerResult};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Single-line file holding the date of the last produced video.
#[derive(Debug, Clone)]
pub struct DailyMarker {
    path: PathBuf,
}

impl DailyMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing or unparsable marker reads as "never produced".
    pub fn read(&self) -> MarkerResult<Option<NaiveDate>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no marker yet");
                return Ok(None);
            }
            Err(source) => {
                return Err(MarkerError::Read {
                    source,
                    path: self.path.clone(),
                })
            }
        };
        let line = content.trim();
        match NaiveDate::parse_from_str(line, DATE_FORMAT) {
            Ok(date) => Ok(Some(date)),
            Err(err) => {
                warn!(path = %self.path.display(), content = line, error = %err, "ignoring unreadable marker");
                Ok(None)
            }
        }
    }

    /// Replaces the marker atomically so a crash never leaves a torn line behind.
    pub fn write(&self, date: NaiveDate) -> MarkerResult<()> {
        let write_err = |source: std::io::Error| MarkerError::Write {
            source,
            path: self.path.clone(),
        };
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(write_err)?;
        let mut file = NamedTempFile::new_in(dir).map_err(write_err)?;
        writeln!(file, "{}", date.format(DATE_FORMAT)).map_err(write_err)?;
        file.as_file().sync_all().map_err(write_err)?;
        file.persist(&self.path)
            .map_err(|err| write_err(err.error))?;
        debug!(path = %self.path.display(), %date, "marker updated");
        Ok(())
    }
}
