use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

/// Per-run working directory, removed when dropped.
#[derive(Debug)]
pub struct ScratchDir {
    name: String,
    path: PathBuf,
}

impl ScratchDir {
    pub fn create(root: &Path, now: DateTime<Utc>) -> io::Result<Self> {
        let suffix = Uuid::new_v4().simple().to_string();
        let name = format!("run_{}_{}", now.format("%Y%m%d_%H%M%S"), &suffix[..8]);
        let path = root.join(&name);
        std::fs::create_dir_all(&path)?;
        debug!(path = %path.display(), "scratch directory created");
        Ok(Self { name, path })
    }

    /// Directory name, unique per run.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "scratch directory removed"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to remove scratch directory")
            }
        }
    }
}
