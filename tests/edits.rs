mod common;

use std::sync::atomic::Ordering;

use common::{ffmpeg_available, hd_clip, make_av_clip, stream_duration, Behaviour, Rig, ScriptedLauncher, StubLibrary};
use synoid_forge::engine::EngineKind;
use synoid_forge::error::ForgeError;
use synoid_forge::forge::ops::{edit, still};
use synoid_forge::forge::Progress;
use synoid_forge::native::{LibavLibrary, MediaLibrary, RenderPlan, Segment};

#[tokio::test]
async fn trim_uses_stream_copy_first() {
    let rig = Rig::new(ScriptedLauncher::new(hd_clip()), StubLibrary::new(hd_clip()));
    let input = rig.input("clip.mp4");

    edit::trim(&rig.ctx, &input, &rig.out("cut.mp4"), 2.0, 5.5, &Progress::silent())
        .await
        .unwrap();

    let calls = rig.launcher.calls_to(EngineKind::Ffmpeg);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].arg_after("-ss").as_deref(), Some("2.000"));
    assert_eq!(calls[0].arg_after("-t").as_deref(), Some("3.500"));
    assert_eq!(rig.library.render_count(), 0);
}

#[tokio::test]
async fn trim_falls_back_to_native_render() {
    let launcher = ScriptedLauncher::new(hd_clip()).then(EngineKind::Ffmpeg, Behaviour::Crash);
    let rig = Rig::new(launcher, StubLibrary::new(hd_clip()));
    let input = rig.input("clip.mp4");

    let out = edit::trim(&rig.ctx, &input, &rig.out("cut.mp4"), 1.0, 4.0, &Progress::silent())
        .await
        .unwrap();

    assert_eq!(std::fs::read(out).unwrap(), b"native");
    let renders = rig.library.renders.lock().unwrap();
    assert_eq!(renders[0].segments, vec![Segment::range(&input, 1.0, 4.0)]);
}

#[tokio::test]
async fn trim_rejects_inverted_range_before_any_engine() {
    let rig = Rig::new(ScriptedLauncher::new(hd_clip()), StubLibrary::new(hd_clip()));
    let input = rig.input("clip.mp4");

    let err = edit::trim(&rig.ctx, &input, &rig.out("cut.mp4"), 5.0, 2.0, &Progress::silent())
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::Configuration(_)));
    assert!(rig.launcher.calls().is_empty());
}

#[tokio::test]
async fn delete_middle_renders_both_sides() {
    let rig = Rig::new(ScriptedLauncher::new(hd_clip()), StubLibrary::new(hd_clip()));
    let input = rig.input("clip.mp4");

    edit::delete_section(&rig.ctx, &input, &rig.out("gap.mp4"), 3.0, 6.0, &Progress::silent())
        .await
        .unwrap();

    let renders = rig.library.renders.lock().unwrap();
    assert_eq!(
        renders[0].segments,
        vec![Segment::range(&input, 0.0, 3.0), Segment::tail(&input, 6.0)]
    );
}

#[tokio::test]
async fn insert_in_the_middle_splits_main_clip() {
    let rig = Rig::new(ScriptedLauncher::new(hd_clip()), StubLibrary::new(hd_clip()));
    let main = rig.input("main.mp4");
    let clip = rig.input("insert.mp4");

    edit::insert_clip(&rig.ctx, &main, &clip, 4.0, &rig.out("spliced.mp4"), &Progress::silent())
        .await
        .unwrap();

    let renders = rig.library.renders.lock().unwrap();
    assert_eq!(
        renders[0].segments,
        vec![Segment::range(&main, 0.0, 4.0), Segment::whole(&clip), Segment::tail(&main, 4.0)]
    );
}

#[tokio::test]
async fn concatenate_keeps_input_order() {
    let rig = Rig::new(ScriptedLauncher::new(hd_clip()), StubLibrary::new(hd_clip()));
    let a = rig.input("a.mp4");
    let b = rig.input("b.mp4");

    edit::concatenate(&rig.ctx, &[b.clone(), a.clone()], &rig.out("ba.mp4"), &Progress::silent())
        .await
        .unwrap();

    let renders = rig.library.renders.lock().unwrap();
    assert_eq!(renders[0].segments, vec![Segment::whole(&b), Segment::whole(&a)]);
}

#[tokio::test]
async fn empty_frame_grab_falls_back_to_native_still() {
    let launcher = ScriptedLauncher::new(hd_clip()).then(EngineKind::Ffmpeg, Behaviour::EmptyArtifact);
    let rig = Rig::new(launcher, StubLibrary::new(hd_clip()));
    let input = rig.input("clip.mp4");

    let out = still::extract_frame(&rig.ctx, &input, 2.0, &rig.out("frame.png"), &Progress::silent())
        .await
        .unwrap();

    assert_eq!(std::fs::read(out).unwrap(), b"native");
    assert_eq!(rig.library.stills.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn frame_grab_near_the_end_snaps_to_last_frame() {
    let rig = Rig::new(ScriptedLauncher::new(hd_clip()), StubLibrary::new(hd_clip()));
    let input = rig.input("clip.mp4");

    still::extract_frame(&rig.ctx, &input, 9.99, &rig.out("last.png"), &Progress::silent())
        .await
        .unwrap();

    let calls = rig.launcher.calls_to(EngineKind::Ffmpeg);
    let at: f64 = calls[0].arg_after("-ss").unwrap().parse().unwrap();
    assert!((at - (10.0 - 1.0 / 30.0)).abs() < 1e-3, "got {}", at);
}

fn assert_near(actual: Option<f64>, expected: f64, tolerance: f64) {
    let actual = actual.expect("stream duration missing");
    assert!((actual - expected).abs() <= tolerance, "expected {:.3}s, got {:.3}s", expected, actual);
}

#[test]
fn native_concat_of_mixed_rates_keeps_each_duration() {
    if !ffmpeg_available() {
        eprintln!("ffmpeg not on PATH, skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let a = make_av_clip(dir.path(), "a30.mp4", 1, 30, 48_000);
    let b = make_av_clip(dir.path(), "b60.mp4", 2, 60, 48_000);
    let out = dir.path().join("joined.mp4");

    LibavLibrary
        .render(&RenderPlan::splice(vec![Segment::whole(&a), Segment::whole(&b)]), &out)
        .unwrap();

    assert_near(stream_duration(&out, "v:0"), 3.0, 0.1);
    assert_near(stream_duration(&out, "a:0"), 3.0, 0.15);
    let info = synoid_forge::native::inspect(&out).unwrap();
    assert!((info.fps - 30.0).abs() < 0.01, "fps {}", info.fps);
}

#[test]
fn native_concat_silences_mismatched_audio() {
    if !ffmpeg_available() {
        eprintln!("ffmpeg not on PATH, skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let a = make_av_clip(dir.path(), "a48k.mp4", 1, 30, 48_000);
    let b = make_av_clip(dir.path(), "b44k.mp4", 1, 30, 44_100);
    let out = dir.path().join("joined.mp4");

    LibavLibrary
        .render(&RenderPlan::splice(vec![Segment::whole(&a), Segment::whole(&b)]), &out)
        .unwrap();

    assert_near(stream_duration(&out, "v:0"), 2.0, 0.1);
    assert_near(stream_duration(&out, "a:0"), 1.0, 0.15);
}

#[test]
fn native_delete_and_insert_shift_later_segments() {
    if !ffmpeg_available() {
        eprintln!("ffmpeg not on PATH, skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let main = make_av_clip(dir.path(), "main.mp4", 3, 30, 48_000);
    let clip = make_av_clip(dir.path(), "clip.mp4", 1, 30, 48_000);

    let gap = dir.path().join("gap.mp4");
    LibavLibrary
        .render(&RenderPlan::splice(vec![Segment::range(&main, 0.0, 1.0), Segment::tail(&main, 2.0)]), &gap)
        .unwrap();
    assert_near(stream_duration(&gap, "v:0"), 2.0, 0.1);
    assert_near(stream_duration(&gap, "a:0"), 2.0, 0.15);

    let spliced = dir.path().join("spliced.mp4");
    let plan = RenderPlan::splice(vec![
        Segment::range(&main, 0.0, 1.5),
        Segment::whole(&clip),
        Segment::tail(&main, 1.5),
    ]);
    LibavLibrary.render(&plan, &spliced).unwrap();
    assert_near(stream_duration(&spliced, "v:0"), 4.0, 0.1);
    assert_near(stream_duration(&spliced, "a:0"), 4.0, 0.15);
}

#[test]
fn native_render_rejects_odd_target_size() {
    if !ffmpeg_available() {
        eprintln!("ffmpeg not on PATH, skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let main = make_av_clip(dir.path(), "main.mp4", 1, 30, 48_000);
    let geometry = synoid_forge::native::Geometry {
        width: 641,
        height: 481,
        mode: synoid_forge::forge::request::ResizeMode::Stretch,
        anchor: synoid_forge::forge::request::Anchor::Center,
    };

    let err = LibavLibrary
        .render(&RenderPlan::reshape(&main, geometry), &dir.path().join("odd.mp4"))
        .unwrap_err();
    assert!(matches!(err, ForgeError::Configuration(_)));
}

#[test]
fn native_still_near_the_end_still_decodes_a_frame() {
    if !ffmpeg_available() {
        eprintln!("ffmpeg not on PATH, skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let clip = make_av_clip(dir.path(), "clip.mp4", 2, 30, 48_000);
    let out = dir.path().join("last.png");

    let at = LibavLibrary.still(&clip, 1.99, &out).unwrap();
    assert!(at < 2.0, "timestamp {}", at);
    let frame = image::open(&out).unwrap().to_rgb8();
    assert_eq!(frame.dimensions(), (320, 240));
}
