use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use tracing::{debug, warn};
use walkdir::WalkDir;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "aac", "ogg", "flac"];

/// Background music rotation over a flat directory of audio files.
#[derive(Debug, Clone)]
pub struct SoundtrackPicker {
    dir: Option<PathBuf>,
}

impl SoundtrackPicker {
    pub fn new(dir: Option<impl Into<PathBuf>>) -> Self {
        Self {
            dir: dir.map(Into::into),
        }
    }

    pub fn tracks(&self) -> Vec<PathBuf> {
        let Some(dir) = &self.dir else {
            return Vec::new();
        };
        if !dir.is_dir() {
            debug!(path = %dir.display(), "music directory missing");
            return Vec::new();
        }
        let mut tracks: Vec<PathBuf> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(error = %err, "skipping unreadable music entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| is_audio(path))
            .collect();
        tracks.sort();
        tracks
    }

    /// Same date, same track.
    pub fn pick(&self, date: NaiveDate) -> Option<PathBuf> {
        let mut tracks = self.tracks();
        if tracks.is_empty() {
            return None;
        }
        let index = date.ordinal() as usize % tracks.len();
        Some(tracks.swap_remove(index))
    }
}

fn is_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            AUDIO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn picks_by_day_of_year() {
        let dir = tempdir().unwrap();
        for name in ["b.mp3", "a.WAV", "notes.txt", "c.flac"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.mp3")).unwrap();
        let picker = SoundtrackPicker::new(Some(dir.path()));
        let tracks = picker.tracks();
        assert_eq!(tracks.len(), 3);
        assert!(tracks[0].ends_with("a.WAV"));

        // Day 1 of the year, index 1 of three.
        let jan1 = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert!(picker.pick(jan1).unwrap().ends_with("b.mp3"));
        assert_eq!(picker.pick(jan1), picker.pick(jan1));
    }

    #[test]
    fn missing_directory_means_silence() {
        let picker = SoundtrackPicker::new(Some("/definitely/not/here"));
        assert!(picker.pick(NaiveDate::from_ymd_opt(2026, 3, 3).unwrap()).is_none());
        let none = SoundtrackPicker::new(None::<PathBuf>);
        assert!(none.tracks().is_empty());
    }
}
