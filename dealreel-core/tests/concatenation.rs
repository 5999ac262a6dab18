mod support;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::tempdir;

use dealreel_core::{CommandExecutor, ConcatError, Concatenator, MediaProber};
use support::{config_in, FakeToolchain};

fn concatenator(fake: &Arc<FakeToolchain>, root: &Path) -> Concatenator {
    let config = config_in(root);
    let executor: Arc<dyn CommandExecutor> = fake.clone();
    let prober = MediaProber::new(
        &config.tools.ffprobe,
        config.tools.probe_timeout(),
        executor.clone(),
    );
    Concatenator::new(
        &config.tools.ffmpeg,
        config.tools.concat_timeout(),
        executor,
        prober,
        config.video,
    )
    .with_crossfade(config.segments.max_crossfade, config.segments.crossfade_floor)
}

fn clips(fake: &FakeToolchain, root: &Path, durations: &[f64]) -> Vec<PathBuf> {
    durations
        .iter()
        .enumerate()
        .map(|(index, duration)| {
            let path = root.join(format!("clip_{index}.mp4"));
            std::fs::write(&path, b"clip").unwrap();
            fake.source(&path.to_string_lossy(), *duration);
            path
        })
        .collect()
}

#[tokio::test]
async fn chains_crossfades_left_to_right() {
    let dir = tempdir().unwrap();
    let fake = FakeToolchain::new();
    let inputs = clips(&fake, dir.path(), &[3.0, 5.0, 5.0, 3.0]);
    let out = dir.path().join("reel.mp4");

    let summary = concatenator(&fake, dir.path())
        .concatenate(&inputs, &out)
        .await
        .unwrap();

    let plan = summary.crossfade.unwrap();
    assert_eq!(plan.crossfade, 0.35);
    assert!((summary.expected_duration - (16.0 - 3.0 * 0.35)).abs() < 1e-9);

    let call = &fake.concat_calls()[0];
    let graph = call.value_after("-filter_complex").unwrap();
    assert!(graph.starts_with("[0:v]fps=30,settb=AVTB,format=yuv420p[v0];"));
    assert!(graph.contains("[v0][v1]xfade=transition=fade:duration=0.350:offset=2.650[x0]"));
    assert!(graph.contains("[x0][v2]xfade=transition=fade:duration=0.350:offset=7.300[x1]"));
    assert!(graph.ends_with("[x1][v3]xfade=transition=fade:duration=0.350:offset=11.950[x2]"));
    assert_eq!(call.value_after("-map"), Some("[x2]"));
    assert!(!call.args.iter().any(|arg| arg == "-stream_loop"));
    assert!(out.exists());
}

#[tokio::test]
async fn single_segment_is_copied() {
    let dir = tempdir().unwrap();
    let fake = FakeToolchain::new();
    let inputs = clips(&fake, dir.path(), &[4.0]);
    let out = dir.path().join("reel.mp4");

    let summary = concatenator(&fake, dir.path())
        .concatenate(&inputs, &out)
        .await
        .unwrap();

    assert!(summary.crossfade.is_none());
    assert_eq!(summary.expected_duration, 4.0);
    assert!(fake.ffmpeg_calls().is_empty());
    assert_eq!(std::fs::read(&out).unwrap(), b"clip");
}

#[tokio::test]
async fn failure_removes_partial_output() {
    let dir = tempdir().unwrap();
    let fake = FakeToolchain::new();
    fake.fail_concat(true);
    let inputs = clips(&fake, dir.path(), &[3.0, 5.0, 3.0]);
    let out = dir.path().join("reel.mp4");

    let err = concatenator(&fake, dir.path())
        .concatenate(&inputs, &out)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ConcatError::ConcatFailed {
            exit_code: Some(1),
            ..
        }
    ));
    assert!(!out.exists());
}

#[tokio::test]
async fn unknown_durations_still_produce_a_valid_graph() {
    let dir = tempdir().unwrap();
    let fake = FakeToolchain::new();
    let mut inputs = clips(&fake, dir.path(), &[3.0, 5.0]);
    let unprobed = dir.path().join("unprobed.mp4");
    std::fs::write(&unprobed, b"clip").unwrap();
    inputs.insert(1, unprobed);

    let summary = concatenator(&fake, dir.path())
        .concatenate(&inputs, &dir.path().join("reel.mp4"))
        .await
        .unwrap();

    let plan = summary.crossfade.unwrap();
    assert_eq!(plan.crossfade, 0.1);
    assert!(plan.offsets.iter().all(|offset| *offset >= 0.0));
    let graph = fake.concat_calls()[0]
        .value_after("-filter_complex")
        .unwrap()
        .to_string();
    assert!(!graph.contains("offset=-"));
}

#[tokio::test]
async fn soundtrack_is_looped_and_trimmed() {
    let dir = tempdir().unwrap();
    let fake = FakeToolchain::new();
    let inputs = clips(&fake, dir.path(), &[3.0, 5.0, 3.0]);
    let music = dir.path().join("theme.mp3");
    std::fs::write(&music, b"music").unwrap();

    concatenator(&fake, dir.path())
        .concatenate_with_soundtrack(&inputs, Some(&music), &dir.path().join("reel.mp4"))
        .await
        .unwrap();

    let call = &fake.concat_calls()[0];
    assert_eq!(call.value_after("-stream_loop"), Some("-1"));
    let graph = call.value_after("-filter_complex").unwrap();
    assert!(graph.contains("[3:a]atrim=duration=10.300,asetpts=PTS-STARTPTS,afade=t=out"));
    assert!(graph.ends_with("[aout]"));
    assert!(call.args.iter().any(|arg| arg == "[aout]"));
    assert!(call.args.iter().any(|arg| arg == "-shortest"));
}
