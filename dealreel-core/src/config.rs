use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReelConfig {
    pub paths: PathsSection,
    pub video: VideoSection,
    pub segments: SegmentsSection,
    pub tools: ToolsSection,
    pub schedule: ScheduleSection,
    pub design: DesignSection,
}

impl ReelConfig {
    /// Final video location for a given run date.
    pub fn output_path(&self, date_label: &str) -> PathBuf {
        Path::new(&self.paths.output_dir).join(format!("{date_label}.mp4"))
    }

    pub fn report_path(&self, date_label: &str) -> PathBuf {
        Path::new(&self.paths.output_dir).join(format!("{date_label}.json"))
    }

    pub fn marker_path(&self) -> PathBuf {
        match &self.paths.marker_file {
            Some(path) => PathBuf::from(path),
            None => Path::new(&self.paths.output_dir).join(".last_video_date"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    pub output_dir: String,
    pub work_dir: String,
    #[serde(default)]
    pub marker_file: Option<String>,
    pub font_file: String,
    #[serde(default)]
    pub music_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoSection {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub background: String,
    pub codec: String,
    pub preset: String,
    pub crf: u8,
    pub pix_fmt: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SegmentsSection {
    pub intro_seconds: f64,
    pub outro_seconds: f64,
    pub game_seconds: f64,
    pub fallback_start_offset: f64,
    pub min_valid_seconds: f64,
    pub max_crossfade: f64,
    pub crossfade_floor: f64,
    #[serde(default)]
    pub max_game_segments: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    pub ffmpeg: String,
    pub ffprobe: String,
    pub probe_timeout_seconds: u64,
    pub segment_timeout_seconds: u64,
    pub concat_timeout_seconds: u64,
}

impl ToolsSection {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }

    pub fn segment_timeout(&self) -> Duration {
        Duration::from_secs(self.segment_timeout_seconds)
    }

    pub fn concat_timeout(&self) -> Duration {
        Duration::from_secs(self.concat_timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSection {
    pub utc_offset_minutes: i32,
}

impl ScheduleSection {
    /// Offset used to decide where one "day" ends. Out-of-range values fall back to UTC.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DesignSection {
    pub intro_title_template: String,
    pub intro_subtitle: String,
    pub outro_title: String,
    pub cta_url: String,
    pub overlay_box_y: u32,
    pub overlay_box_h: u32,
    pub overlay_title_y: u32,
    pub overlay_discount_y: u32,
    pub overlay_old_price_y: u32,
    pub overlay_new_price_y: u32,
    pub text_fade_in_seconds: f64,
    pub text_fade_out_seconds: f64,
    pub title_delay_seconds: f64,
    pub discount_delay_seconds: f64,
    pub old_price_delay_seconds: f64,
    pub new_price_delay_seconds: f64,
    pub segment_fade_in_seconds: f64,
    pub segment_fade_out_seconds: f64,
}

pub fn load_reel_config<P: AsRef<Path>>(path: P) -> Result<ReelConfig> {
    load_toml(path)
}

fn load_toml<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}
