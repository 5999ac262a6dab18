#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use dealreel_core::config::{load_reel_config, ReelConfig};
use dealreel_core::{
    CommandExecutor, CommandOutcome, CommandOutput, Deal, DealEntry, ManualClock,
    TrailerCandidates,
};

#[derive(Debug, Clone)]
pub struct Call {
    pub program: String,
    pub args: Vec<String>,
}

impl Call {
    pub fn is_ffprobe(&self) -> bool {
        self.program.contains("ffprobe")
    }

    pub fn is_ffmpeg(&self) -> bool {
        self.program.contains("ffmpeg")
    }

    pub fn is_concat(&self) -> bool {
        self.args.iter().any(|arg| arg == "-filter_complex")
    }

    pub fn is_canvas(&self) -> bool {
        self.args.iter().any(|arg| arg == "lavfi")
    }

    pub fn value_after(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|arg| arg == flag)
            .and_then(|index| self.args.get(index + 1))
            .map(String::as_str)
    }

    pub fn output(&self) -> &str {
        self.args.last().map(String::as_str).unwrap_or_default()
    }
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    durations: HashMap<String, f64>,
    broken: HashSet<String>,
    hanging: HashSet<String>,
    empty: HashSet<String>,
    fail_canvas: bool,
    fail_outro: bool,
    fail_concat: bool,
}

/// Scripted stand-in for ffmpeg and ffprobe. Outputs are real files so the
/// pipeline can copy, hash and rename them.
#[derive(Default)]
pub struct FakeToolchain {
    state: Mutex<State>,
}

impl FakeToolchain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn source(&self, url: &str, duration: f64) {
        self.state
            .lock()
            .unwrap()
            .durations
            .insert(url.to_string(), duration);
    }

    pub fn break_source(&self, url: &str) {
        self.state.lock().unwrap().broken.insert(url.to_string());
    }

    pub fn hang_source(&self, url: &str) {
        self.state.lock().unwrap().hanging.insert(url.to_string());
    }

    /// Transcoder exits cleanly but writes a zero-length clip.
    pub fn empty_source(&self, url: &str) {
        self.state.lock().unwrap().empty.insert(url.to_string());
    }

    pub fn fail_canvas(&self, fail: bool) {
        self.state.lock().unwrap().fail_canvas = fail;
    }

    /// Fails only the outro card, leaving the intro intact.
    pub fn fail_outro(&self, fail: bool) {
        self.state.lock().unwrap().fail_outro = fail;
    }

    pub fn fail_concat(&self, fail: bool) {
        self.state.lock().unwrap().fail_concat = fail;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn ffmpeg_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_ffmpeg).collect()
    }

    /// Trailer URLs handed to the transcoder, in order.
    pub fn game_inputs(&self) -> Vec<String> {
        self.ffmpeg_calls()
            .into_iter()
            .filter(|call| !call.is_concat() && !call.is_canvas())
            .filter_map(|call| call.value_after("-i").map(str::to_string))
            .collect()
    }

    pub fn concat_calls(&self) -> Vec<Call> {
        self.ffmpeg_calls()
            .into_iter()
            .filter(Call::is_concat)
            .collect()
    }

    fn probe(&self, call: &Call) -> CommandOutcome {
        let state = self.state.lock().unwrap();
        match state.durations.get(call.output()) {
            Some(duration) => finished(
                0,
                format!("{{\"format\":{{\"duration\":\"{duration:.3}\"}}}}"),
                "",
            ),
            None => finished(1, String::new(), "No such file or directory"),
        }
    }

    fn transcode(&self, call: &Call) -> CommandOutcome {
        let mut state = self.state.lock().unwrap();
        let out = call.output().to_string();
        let requested = call
            .value_after("-t")
            .and_then(|value| value.parse::<f64>().ok())
            .unwrap_or(10.0);

        if call.is_concat() {
            std::fs::write(&out, b"reel").unwrap();
            if state.fail_concat {
                return finished(1, String::new(), "Error while filtering");
            }
            state.durations.insert(out, 20.0);
            return finished(0, String::new(), "");
        }
        if call.is_canvas() {
            if state.fail_canvas || (state.fail_outro && out.ends_with("outro.mp4")) {
                return finished(1, String::new(), "Cannot load font");
            }
            std::fs::write(&out, b"canvas").unwrap();
            state.durations.insert(out, requested);
            return finished(0, String::new(), "");
        }

        let source = call.value_after("-i").unwrap_or_default().to_string();
        if state.hanging.contains(&source) {
            return CommandOutcome::TimedOut;
        }
        if state.broken.contains(&source) {
            return finished(1, String::new(), "Server returned 404 Not Found");
        }
        std::fs::write(&out, b"game").unwrap();
        let duration = if state.empty.contains(&source) {
            0.0
        } else {
            requested
        };
        state.durations.insert(out, duration);
        finished(0, String::new(), "")
    }
}

#[async_trait]
impl CommandExecutor for FakeToolchain {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        _deadline: Duration,
    ) -> std::io::Result<CommandOutcome> {
        let call = Call {
            program: program.to_string_lossy().to_string(),
            args: args.to_vec(),
        };
        self.state.lock().unwrap().calls.push(call.clone());
        if call.is_ffprobe() {
            return Ok(self.probe(&call));
        }
        if call.is_ffmpeg() {
            return Ok(self.transcode(&call));
        }
        Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "unknown program",
        ))
    }
}

fn finished(code: i32, stdout: String, stderr: &str) -> CommandOutcome {
    CommandOutcome::Finished(CommandOutput {
        exit_code: Some(code),
        stdout: stdout.into_bytes(),
        stderr: stderr.as_bytes().to_vec(),
    })
}

pub fn fixture_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(relative)
}

/// Fixture config with every writable path moved under `root`.
pub fn config_in(root: &Path) -> ReelConfig {
    let mut config = load_reel_config(fixture_path("configs/dealreel.toml")).unwrap();
    config.paths.output_dir = root.join("out").to_string_lossy().to_string();
    config.paths.work_dir = root.join("work").to_string_lossy().to_string();
    config.paths.marker_file = None;
    config.paths.music_dir = None;
    config
}

pub fn deal(appid: u64, name: &str) -> Deal {
    Deal {
        appid,
        name: name.to_string(),
        currency: "USD".to_string(),
        original_price: 1999,
        final_price: 499,
        discount_percent: 75,
        discount_expiration: 1_792_000_000,
    }
}

pub fn entry(appid: u64, trailers: &[&str]) -> DealEntry {
    DealEntry {
        deal: deal(appid, &format!("Game {appid}")),
        trailers: TrailerCandidates::new(trailers.iter().copied()),
    }
}

/// 2026-10-14 08:00 UTC, which is 10:00 at the fixture's +02:00 offset.
pub fn morning_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 10, 14, 8, 0, 0).unwrap(),
    ))
}

/// Names of partial outputs still sitting in `dir`.
pub fn partial_files(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(".partial.mp4"))
            .collect(),
        Err(_) => Vec::new(),
    }
}

pub fn dir_is_empty(path: &Path) -> bool {
    match std::fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}
