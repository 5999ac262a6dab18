mod support;

use std::sync::Arc;

use tempfile::tempdir;

use dealreel_core::{
    BuildError, CommandExecutor, MediaProber, SegmentBuilder, SelectionOutcome, ShortsDesign,
    TrailerSelector,
};
use support::{config_in, entry, FakeToolchain};

struct Rig {
    prober: MediaProber,
    builder: SegmentBuilder,
    fallback: f64,
}

fn rig(fake: &Arc<FakeToolchain>, root: &std::path::Path) -> Rig {
    let config = config_in(root);
    let executor: Arc<dyn CommandExecutor> = fake.clone();
    let prober = MediaProber::new(
        &config.tools.ffprobe,
        config.tools.probe_timeout(),
        executor.clone(),
    );
    let design = ShortsDesign::new(config.design, config.video, &config.paths.font_file);
    let fallback = config.segments.fallback_start_offset;
    let builder = SegmentBuilder::new(
        &config.tools.ffmpeg,
        config.tools.segment_timeout(),
        executor,
        prober.clone(),
        design,
        config.segments,
    );
    Rig {
        prober,
        builder,
        fallback,
    }
}

#[tokio::test]
async fn empty_candidate_list_never_transcodes() {
    let dir = tempdir().unwrap();
    let fake = FakeToolchain::new();
    let rig = rig(&fake, dir.path());
    let selector = TrailerSelector::new(&rig.prober, &rig.builder, rig.fallback);
    let deal = entry(1, &[]);

    let outcome = selector
        .select_and_build(&deal.deal, &deal.trailers, &dir.path().join("g.mp4"))
        .await;

    assert!(!outcome.is_built());
    assert!(outcome.failures().is_empty());
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn falls_through_broken_candidates_in_order() {
    let dir = tempdir().unwrap();
    let fake = FakeToolchain::new();
    fake.break_source("https://cdn.example/one.mp4");
    fake.empty_source("https://cdn.example/two.mp4");
    fake.source("https://cdn.example/three.mp4", 40.0);
    let rig = rig(&fake, dir.path());
    let selector = TrailerSelector::new(&rig.prober, &rig.builder, rig.fallback);
    let deal = entry(
        2,
        &[
            "https://cdn.example/one.mp4",
            "https://cdn.example/two.mp4",
            "https://cdn.example/three.mp4",
            "https://cdn.example/four.mp4",
        ],
    );

    let outcome = selector
        .select_and_build(&deal.deal, &deal.trailers, &dir.path().join("g.mp4"))
        .await;

    let failures: Vec<_> = outcome.failures().iter().map(|f| f.url.clone()).collect();
    assert_eq!(
        failures,
        ["https://cdn.example/one.mp4", "https://cdn.example/two.mp4"]
    );
    assert!(matches!(
        outcome.failures()[0].error,
        BuildError::TranscodeFailed { .. }
    ));
    assert!(matches!(
        outcome.failures()[1].error,
        BuildError::EmptySegment { .. }
    ));
    match outcome {
        SelectionOutcome::Built { url, segment, .. } => {
            assert_eq!(url, "https://cdn.example/three.mp4");
            assert!(segment.path.exists());
        }
        other => panic!("expected a segment, got {other:?}"),
    }
    assert_eq!(
        fake.game_inputs(),
        [
            "https://cdn.example/one.mp4",
            "https://cdn.example/two.mp4",
            "https://cdn.example/three.mp4",
        ]
    );
}

#[tokio::test]
async fn long_trailer_window_is_centered() {
    let dir = tempdir().unwrap();
    let fake = FakeToolchain::new();
    fake.source("https://cdn.example/long.mp4", 65.0);
    let rig = rig(&fake, dir.path());
    let selector = TrailerSelector::new(&rig.prober, &rig.builder, rig.fallback);
    let deal = entry(3, &["https://cdn.example/long.mp4"]);

    let outcome = selector
        .select_and_build(&deal.deal, &deal.trailers, &dir.path().join("g.mp4"))
        .await;

    assert!(outcome.is_built());
    let transcode = fake
        .ffmpeg_calls()
        .into_iter()
        .find(|call| call.value_after("-i") == Some("https://cdn.example/long.mp4"))
        .unwrap();
    assert_eq!(transcode.value_after("-ss"), Some("30.000"));
}

#[tokio::test]
async fn unprobeable_trailer_uses_fallback_offset() {
    let dir = tempdir().unwrap();
    let fake = FakeToolchain::new();
    let rig = rig(&fake, dir.path());
    let selector = TrailerSelector::new(&rig.prober, &rig.builder, rig.fallback);
    let deal = entry(4, &["https://cdn.example/mystery.mp4"]);

    let outcome = selector
        .select_and_build(&deal.deal, &deal.trailers, &dir.path().join("g.mp4"))
        .await;

    assert!(outcome.is_built());
    let transcode = fake.ffmpeg_calls().pop().unwrap();
    assert_eq!(transcode.value_after("-ss"), Some("8.000"));
}

#[tokio::test]
async fn every_candidate_failing_yields_no_segment() {
    let dir = tempdir().unwrap();
    let fake = FakeToolchain::new();
    fake.break_source("https://cdn.example/a.mp4");
    fake.hang_source("https://cdn.example/b.mp4");
    let rig = rig(&fake, dir.path());
    let selector = TrailerSelector::new(&rig.prober, &rig.builder, rig.fallback);
    let deal = entry(
        5,
        &["https://cdn.example/a.mp4", "https://cdn.example/b.mp4"],
    );
    let out = dir.path().join("g.mp4");

    let outcome = selector
        .select_and_build(&deal.deal, &deal.trailers, &out)
        .await;

    assert!(!outcome.is_built());
    assert_eq!(outcome.failures().len(), 2);
    assert!(matches!(
        outcome.failures()[1].error,
        BuildError::TranscodeTimeout { .. }
    ));
    assert!(!out.exists());
}
